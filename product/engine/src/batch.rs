use crate::job::JobConfig;
use crate::relay::{LogRelay, LogSender};
use crate::worklist::{read_work_file, rewrite_work_file};
use crate::ytdlp::MediaDownloader;
use crate::{EngineError, Result};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::thread;

pub const DONE_MARKER: &str = "--- Done! ---";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    /// Failed lines exactly as they appeared in the work file.
    pub retained: Vec<String>,
}

/// Downloads every non-blank line of `work_file` one at a time, then rewrites
/// the file to hold only the lines that failed.
pub fn run_unattended(
    downloader: &dyn MediaDownloader,
    job: &JobConfig,
    work_file: &Path,
    sink: &mut dyn Write,
) -> Result<BatchReport> {
    let lines = read_work_file(work_file)?;
    let mut report = BatchReport::default();

    for raw in lines {
        let url = raw.trim();
        if url.is_empty() {
            continue;
        }
        report.attempted += 1;
        log::info!("Downloading {url}");
        match downloader.download(job, &[url.to_string()], sink) {
            Ok(()) => report.succeeded += 1,
            Err(err) => {
                log::warn!("Failed to download {url}: {err}");
                report.retained.push(raw);
            }
        }
    }

    rewrite_work_file(work_file, &report.retained)?;
    Ok(report)
}

#[derive(Debug)]
pub struct BatchWorker {
    handle: thread::JoinHandle<Result<()>>,
}

impl BatchWorker {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn join(self) -> Result<()> {
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(EngineError::WorkerPanicked(message))
            }
        }
    }
}

/// Runs the whole URL list through one download call on a background thread.
/// Tool output reaches `lines` one entry at a time; the relay is flushed on every exit
/// path and a final marker line reports the outcome.
pub fn spawn_interactive(
    downloader: Arc<dyn MediaDownloader>,
    job: JobConfig,
    urls: Vec<String>,
    lines: LogSender,
) -> Result<BatchWorker> {
    let handle = thread::Builder::new()
        .name("ytmad-batch".to_string())
        .spawn(move || {
            let result = {
                let mut relay = LogRelay::new(lines.clone());
                let result = downloader.download(&job, &urls, &mut relay);
                let _ = relay.flush();
                result
            };
            match &result {
                Ok(()) => {
                    let _ = lines.send(DONE_MARKER.to_string());
                }
                Err(err) => {
                    log::error!("Download batch failed: {err}");
                    let _ = lines.send(format!("--- Failed: {err} ---"));
                }
            }
            result
        })?;
    Ok(BatchWorker { handle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::build_job_config;
    use crate::relay::log_channel;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeDownloader {
        failing: HashSet<String>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl FakeDownloader {
        fn failing(urls: &[&str]) -> Self {
            Self {
                failing: urls.iter().map(|u| u.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().expect("lock").clone()
        }
    }

    impl MediaDownloader for FakeDownloader {
        fn download(&self, _job: &JobConfig, urls: &[String], sink: &mut dyn Write) -> Result<()> {
            self.calls.lock().expect("lock").push(urls.to_vec());
            write!(sink, "[download] {}\r[download] 100%", urls.join(" "))?;
            if urls.iter().any(|u| self.failing.contains(u)) {
                return Err(EngineError::ExternalToolFailed {
                    tool: "yt-dlp".to_string(),
                    code: Some(1),
                    stderr: "ERROR: Video unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    struct PanickingDownloader;

    impl MediaDownloader for PanickingDownloader {
        fn download(&self, _job: &JobConfig, _urls: &[String], sink: &mut dyn Write) -> Result<()> {
            sink.write_all(b"half a line")?;
            panic!("extractor blew up");
        }
    }

    #[test]
    fn blank_lines_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let work = dir.path().join("urls.txt");
        std::fs::write(&work, "a\n\n  \nb\n").expect("write");
        let fake = FakeDownloader::default();

        let report =
            run_unattended(&fake, &build_job_config("/x"), &work, &mut Vec::new()).expect("run");

        assert_eq!(fake.calls(), vec![vec!["a".to_string()], vec!["b".to_string()]]);
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 2);
    }

    #[test]
    fn only_the_failed_url_is_kept() {
        let dir = tempfile::tempdir().expect("tempdir");
        let work = dir.path().join("urls.txt");
        std::fs::write(&work, "https://one\n  https://two  \nhttps://three\n").expect("write");
        let fake = FakeDownloader::failing(&["https://two"]);

        let report =
            run_unattended(&fake, &build_job_config("/x"), &work, &mut Vec::new()).expect("run");

        assert_eq!(fake.calls().len(), 3);
        assert_eq!(report.retained, vec!["  https://two  ".to_string()]);
        assert_eq!(
            std::fs::read_to_string(&work).expect("read"),
            "  https://two  \n"
        );
    }

    #[test]
    fn no_failures_empties_the_work_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let work = dir.path().join("urls.txt");
        std::fs::write(&work, "https://one\nhttps://two\n").expect("write");

        run_unattended(
            &FakeDownloader::default(),
            &build_job_config("/x"),
            &work,
            &mut Vec::new(),
        )
        .expect("run");

        assert!(work.exists());
        assert_eq!(std::fs::read_to_string(&work).expect("read"), "");
    }

    #[test]
    fn failures_keep_original_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let work = dir.path().join("urls.txt");
        std::fs::write(&work, "c\na\nb\n").expect("write");
        let fake = FakeDownloader::failing(&["c", "b"]);

        run_unattended(&fake, &build_job_config("/x"), &work, &mut Vec::new()).expect("run");

        assert_eq!(std::fs::read_to_string(&work).expect("read"), "c\nb\n");
    }

    #[test]
    fn missing_work_file_downloads_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fake = FakeDownloader::default();

        let err = run_unattended(
            &fake,
            &build_job_config("/x"),
            &dir.path().join("urls.txt"),
            &mut Vec::new(),
        )
        .expect_err("missing");

        assert!(matches!(err, EngineError::WorkFileMissing(_)));
        assert!(fake.calls().is_empty());
        assert!(!dir.path().join("urls.txt").exists());
    }

    #[test]
    fn tool_output_is_passed_to_the_sink() {
        let dir = tempfile::tempdir().expect("tempdir");
        let work = dir.path().join("urls.txt");
        std::fs::write(&work, "a\n").expect("write");
        let mut sink = Vec::new();

        run_unattended(&FakeDownloader::default(), &build_job_config("/x"), &work, &mut sink)
            .expect("run");

        assert_eq!(sink, b"[download] a\r[download] 100%");
    }

    #[test]
    fn interactive_batch_sends_whole_list_once() {
        let fake = Arc::new(FakeDownloader::default());
        let (tx, rx) = log_channel();
        let urls = vec!["a".to_string(), "b".to_string()];

        let worker = spawn_interactive(fake.clone(), build_job_config("/x"), urls.clone(), tx)
            .expect("spawn");
        worker.join().expect("join");

        assert_eq!(fake.calls(), vec![urls]);
        let lines: Vec<String> = rx.try_iter().collect();
        assert_eq!(lines, vec!["[download] a b", "[download] 100%", DONE_MARKER]);
    }

    #[test]
    fn interactive_failure_still_flushes_and_reports() {
        let fake = Arc::new(FakeDownloader::failing(&["bad"]));
        let (tx, rx) = log_channel();

        let worker =
            spawn_interactive(fake, build_job_config("/x"), vec!["bad".to_string()], tx)
                .expect("spawn");
        let err = worker.join().expect_err("should fail");

        assert!(matches!(err, EngineError::ExternalToolFailed { .. }));
        let lines: Vec<String> = rx.try_iter().collect();
        assert_eq!(lines[0], "[download] bad");
        assert_eq!(lines[1], "[download] 100%");
        assert!(lines[2].starts_with("--- Failed: "));
        assert!(lines[2].contains("ERROR: Video unavailable"));
    }

    #[test]
    fn interactive_panic_becomes_an_error() {
        let (tx, rx) = log_channel();
        let worker = spawn_interactive(
            Arc::new(PanickingDownloader),
            build_job_config("/x"),
            vec!["a".to_string()],
            tx,
        )
        .expect("spawn");

        match worker.join() {
            Err(EngineError::WorkerPanicked(message)) => {
                assert_eq!(message, "extractor blew up")
            }
            other => panic!("unexpected result: {other:?}"),
        }
        // The relay's drop still delivered the partial line.
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec!["half a line"]);
    }
}
