use crate::batch::run_unattended;
use crate::config::{load_download_settings, DownloadSettings};
use crate::job::build_job_config_with;
use crate::paths::AppPaths;
use crate::worklist::DEFAULT_WORK_FILE;
use crate::ytdlp::YtDlp;
use crate::{EngineError, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "ytmad",
    about = "Archive playlists as tagged audio files in an artist/album tree"
)]
pub struct Args {
    /// Run unattended over the work file instead of opening the window
    #[arg(long)]
    pub cli: bool,

    /// Output folder
    #[arg(long, default_value = "./")]
    pub dir: String,

    /// One URL per line; rewritten afterwards with only the failures
    #[arg(long, default_value = DEFAULT_WORK_FILE)]
    pub work_file: PathBuf,

    /// App data directory holding settings and bundled tools
    #[arg(long, env = "YTMAD_BASE_DIR")]
    pub base_dir: Option<PathBuf>,

    /// Print the yt-dlp arguments for the job and exit
    #[arg(long)]
    pub print_args: bool,
}

impl Args {
    pub fn app_paths(&self) -> Option<AppPaths> {
        self.base_dir
            .clone()
            .or_else(AppPaths::default_base_dir)
            .map(AppPaths::new)
    }
}

pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init();
}

/// Unattended mode: downloads every URL in the work file, one per call, and
/// keeps the failures for the next run. Missing inputs are reported and are
/// not errors.
pub fn run(args: &Args) -> Result<()> {
    if args.dir.trim().is_empty() {
        println!("Please enter an output directory with --dir=DIR");
        return Ok(());
    }

    let paths = args.app_paths();
    let settings = match &paths {
        Some(paths) => load_download_settings(paths)?,
        None => DownloadSettings::default(),
    };
    let job = build_job_config_with(&args.dir, &settings);
    let downloader = YtDlp::discover(paths.as_ref(), &settings);

    if args.print_args {
        println!("{}", downloader.build_args(&job, &[]).join(" "));
        return Ok(());
    }

    let mut stdout = std::io::stdout();
    match run_unattended(&downloader, &job, &args.work_file, &mut stdout) {
        Ok(report) => {
            println!(
                "Done. {} of {} URL(s) downloaded, {} kept in {} for retry.",
                report.succeeded,
                report.attempted,
                report.retained.len(),
                args.work_file.display()
            );
            Ok(())
        }
        Err(err @ EngineError::WorkFileMissing(_)) => {
            println!("{err}");
            Ok(())
        }
        Err(err) => Err(err),
    }
}
