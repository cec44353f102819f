use clap::Parser;
use ytmad_engine::cli::{self, Args};

/// Headless entry point: always runs the unattended work-file batch, so
/// `--cli` is accepted but not required.
fn main() -> Result<(), String> {
    cli::init_logging();
    let args = Args::parse();
    cli::run(&args).map_err(|e| e.to_string())
}
