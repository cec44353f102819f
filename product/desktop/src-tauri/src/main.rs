// Prevents an additional console window on Windows in release.
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use clap::Parser;
use ytmad_engine::cli::{self, Args};

fn main() {
    cli::init_logging();
    let args = Args::parse();
    if args.cli || args.print_args {
        if let Err(err) = cli::run(&args) {
            log::error!("{err}");
            std::process::exit(1);
        }
        return;
    }
    ytmad_desktop_lib::run()
}
