use crate::config::DownloadSettings;
use crate::job::JobConfig;
use crate::paths::AppPaths;
use crate::{EngineError, Result};
use std::ffi::OsStr;
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;

const TOOL_NAME: &str = "yt-dlp";
const READ_CHUNK_BYTES: usize = 8 * 1024;
const STDERR_TAIL_BYTES: usize = 4 * 1024;

/// The external download boundary: fetch `urls` according to `job`, writing
/// the tool's progress text to `sink` as it is produced.
pub trait MediaDownloader: Send + Sync {
    fn download(&self, job: &JobConfig, urls: &[String], sink: &mut dyn Write) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub prefix: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, prefix: &[&str]) -> Self {
        Self {
            program: program.into(),
            prefix: prefix.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct YtDlp {
    candidates: Vec<Invocation>,
    ffmpeg_location: Option<PathBuf>,
}

impl YtDlp {
    /// Candidates in order: configured path, bundled copy, PATH, then the
    /// python module under `python` and `python3`.
    pub fn discover(paths: Option<&AppPaths>, settings: &DownloadSettings) -> Self {
        let mut candidates = Vec::new();
        if let Some(path) = settings
            .yt_dlp_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            candidates.push(Invocation::new(path, &[]));
        }
        if let Some(paths) = paths {
            let bundled = paths.bundled_yt_dlp_path();
            if bundled.exists() {
                candidates.push(Invocation::new(bundled.to_string_lossy(), &[]));
            }
        }
        candidates.push(Invocation::new(TOOL_NAME, &[]));
        candidates.push(Invocation::new("python", &["-m", "yt_dlp"]));
        candidates.push(Invocation::new("python3", &["-m", "yt_dlp"]));

        let ffmpeg_location = paths
            .map(AppPaths::bundled_ffmpeg_path)
            .filter(|p| p.exists());

        Self {
            candidates,
            ffmpeg_location,
        }
    }

    pub fn with_candidates(candidates: Vec<Invocation>) -> Self {
        Self {
            candidates,
            ffmpeg_location: None,
        }
    }

    pub fn candidates(&self) -> &[Invocation] {
        &self.candidates
    }

    /// Arguments after the program prefix: job options, then the URLs.
    pub fn build_args(&self, job: &JobConfig, urls: &[String]) -> Vec<String> {
        let mut args = job.to_yt_dlp_args();
        if let Some(ffmpeg) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.to_string_lossy().to_string());
        }
        args.push("--".to_string());
        args.extend(urls.iter().cloned());
        args
    }
}

impl MediaDownloader for YtDlp {
    fn download(&self, job: &JobConfig, urls: &[String], sink: &mut dyn Write) -> Result<()> {
        let args = self.build_args(job, urls);
        for candidate in &self.candidates {
            let mut cmd = background_command(&candidate.program);
            cmd.args(&candidate.prefix);
            cmd.args(&args);
            match run_streaming(&mut cmd, sink) {
                Ok(outcome) => {
                    if outcome.code == Some(0) {
                        return Ok(());
                    }
                    return Err(EngineError::ExternalToolFailed {
                        tool: TOOL_NAME.to_string(),
                        code: outcome.code,
                        stderr: outcome.last_stderr_line,
                    });
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    log::debug!("{} not found, trying next candidate", candidate.program);
                    continue;
                }
                Err(e) => return Err(EngineError::Io(e)),
            }
        }
        Err(EngineError::ExternalToolMissing {
            tool: TOOL_NAME.to_string(),
        })
    }
}

fn background_command(program: impl AsRef<OsStr>) -> Command {
    let mut cmd = Command::new(program);
    hide_console_window(&mut cmd);
    cmd
}

#[cfg(windows)]
fn hide_console_window(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;

    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console_window(_cmd: &mut Command) {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug)]
struct RunOutcome {
    code: Option<i32>,
    last_stderr_line: String,
}

fn pump(mut reader: impl Read, stream: Stream, tx: mpsc::Sender<(Stream, Vec<u8>)>) {
    let mut buf = vec![0u8; READ_CHUNK_BYTES];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.send((stream, buf[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                log::debug!("{stream:?} pipe closed early: {e}");
                break;
            }
        }
    }
}

/// Runs `cmd` to completion, copying stdout and stderr into `sink` in arrival
/// order. Spawn errors are returned untouched so callers can tell a missing
/// executable apart.
fn run_streaming(cmd: &mut Command, sink: &mut dyn Write) -> std::io::Result<RunOutcome> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = cmd.spawn()?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::new(ErrorKind::Other, "stdout pipe missing"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::new(ErrorKind::Other, "stderr pipe missing"))?;

    let (tx, rx) = mpsc::channel();
    let stderr_tx = tx.clone();
    let stdout_handle = thread::spawn(move || pump(stdout, Stream::Stdout, tx));
    let stderr_handle = thread::spawn(move || pump(stderr, Stream::Stderr, stderr_tx));

    let mut stderr_tail: Vec<u8> = Vec::new();
    let mut sink_error: Option<std::io::Error> = None;
    for (stream, chunk) in rx {
        if stream == Stream::Stderr {
            stderr_tail.extend_from_slice(&chunk);
            if stderr_tail.len() > STDERR_TAIL_BYTES {
                let excess = stderr_tail.len() - STDERR_TAIL_BYTES;
                stderr_tail.drain(..excess);
            }
        }
        if let Err(e) = sink.write_all(&chunk) {
            sink_error = Some(e);
            let _ = child.kill();
            break;
        }
    }

    let status = child.wait()?;
    let _ = stdout_handle.join();
    let _ = stderr_handle.join();
    if let Some(e) = sink_error {
        return Err(e);
    }

    let last_stderr_line = String::from_utf8_lossy(&stderr_tail)
        .split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or("unknown error")
        .to_string();

    Ok(RunOutcome {
        code: status.code(),
        last_stderr_line,
    })
}
