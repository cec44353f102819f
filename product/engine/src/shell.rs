//! Toolkit-independent state behind the interactive window: folder choice,
//! URL text, status line, start button and log pane.

use crate::batch::{spawn_interactive, BatchWorker};
use crate::config::DownloadSettings;
use crate::job::build_job_config_with;
use crate::relay::{log_channel, LogReceiver, LogSender};
use crate::worklist::parse_url_list;
use crate::ytdlp::MediaDownloader;
use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// How often a front end should call [`Shell::poll`].
pub const LOG_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub const STATUS_NO_FOLDER: &str = "Please select a folder first.";
pub const STATUS_NO_URLS: &str = "No URLs entered.";
pub const STATUS_DOWNLOADING: &str = "Downloading...";
pub const STATUS_DONE: &str = "Done.";

#[derive(Debug, Clone, Serialize)]
pub struct ShellView {
    pub folder: String,
    pub urls_text: String,
    pub status: String,
    pub start_enabled: bool,
    pub log_lines: Vec<String>,
}

/// What changed since the previous poll.
#[derive(Debug, Clone, Serialize)]
pub struct ShellTick {
    pub new_lines: Vec<String>,
    pub status: String,
    pub start_enabled: bool,
}

pub struct Shell {
    downloader: Arc<dyn MediaDownloader>,
    settings: DownloadSettings,
    folder: String,
    urls_text: String,
    status: String,
    log_lines: Vec<String>,
    log_tx: LogSender,
    log_rx: LogReceiver,
    worker: Option<BatchWorker>,
}

impl Shell {
    pub fn new(downloader: Arc<dyn MediaDownloader>, settings: DownloadSettings) -> Self {
        let (log_tx, log_rx) = log_channel();
        Self {
            downloader,
            settings,
            folder: String::new(),
            urls_text: String::new(),
            status: String::new(),
            log_lines: Vec::new(),
            log_tx,
            log_rx,
            worker: None,
        }
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn set_folder(&mut self, folder: impl Into<String>) {
        self.folder = folder.into();
    }

    pub fn set_urls_text(&mut self, text: impl Into<String>) {
        self.urls_text = text.into();
    }

    pub fn clear_urls(&mut self) {
        self.urls_text.clear();
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn log_lines(&self) -> &[String] {
        &self.log_lines
    }

    pub fn start_enabled(&self) -> bool {
        self.worker.is_none()
    }

    pub fn view(&self) -> ShellView {
        ShellView {
            folder: self.folder.clone(),
            urls_text: self.urls_text.clone(),
            status: self.status.clone(),
            start_enabled: self.start_enabled(),
            log_lines: self.log_lines.clone(),
        }
    }

    /// Validates the inputs and starts a background batch. Returns `false`
    /// when nothing was started.
    pub fn start(&mut self) -> Result<bool> {
        if self.worker.is_some() {
            return Ok(false);
        }
        if self.folder.trim().is_empty() {
            self.status = STATUS_NO_FOLDER.to_string();
            return Ok(false);
        }
        let urls = parse_url_list(&self.urls_text);
        if urls.is_empty() {
            self.status = STATUS_NO_URLS.to_string();
            return Ok(false);
        }

        let job = build_job_config_with(&self.folder, &self.settings);
        log::info!("Starting batch of {} URL(s) into {}", urls.len(), self.folder);
        match spawn_interactive(self.downloader.clone(), job, urls, self.log_tx.clone()) {
            Ok(worker) => {
                self.worker = Some(worker);
                self.status = STATUS_DOWNLOADING.to_string();
                Ok(true)
            }
            Err(err) => {
                self.status = format!("Download failed: {err}");
                Err(err)
            }
        }
    }

    /// Drains every queued log line and, once the worker has exited, joins
    /// it and re-enables start.
    pub fn poll(&mut self) -> ShellTick {
        let mut new_lines: Vec<String> = self.log_rx.try_iter().collect();

        if self.worker.as_ref().is_some_and(BatchWorker::is_finished) {
            if let Some(worker) = self.worker.take() {
                // Anything sent before the thread exited is queued by now.
                new_lines.extend(self.log_rx.try_iter());
                match worker.join() {
                    Ok(()) => self.status = STATUS_DONE.to_string(),
                    Err(err) => {
                        log::error!("Download batch ended with an error: {err}");
                        self.status = format!("Download failed: {err}");
                    }
                }
            }
        }

        self.log_lines.extend(new_lines.iter().cloned());
        ShellTick {
            new_lines,
            status: self.status.clone(),
            start_enabled: self.start_enabled(),
        }
    }
}
