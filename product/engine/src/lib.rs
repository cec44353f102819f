pub mod batch;
pub mod cli;
pub mod config;
mod error;
pub mod job;
pub mod paths;
pub mod relay;
pub mod shell;
pub mod worklist;
pub mod ytdlp;

pub use error::{EngineError, Result};
