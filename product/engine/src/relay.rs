use std::io::Write;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

pub const LOG_CHANNEL_CAPACITY: usize = 1024;

pub type LogSender = SyncSender<String>;
pub type LogReceiver = Receiver<String>;

pub fn log_channel() -> (LogSender, LogReceiver) {
    sync_channel(LOG_CHANNEL_CAPACITY)
}

/// Turns arbitrarily chunked tool output into trimmed, non-empty lines.
///
/// Both `\n` and `\r` end a line, so in-place progress updates arrive as
/// separate entries. Whatever is still buffered goes out on [`Write::flush`]
/// and again on drop, so a partial last line is never lost.
#[derive(Debug)]
pub struct LogRelay {
    buffer: Vec<u8>,
    sender: LogSender,
}

impl LogRelay {
    pub fn new(sender: LogSender) -> Self {
        Self {
            buffer: Vec::new(),
            sender,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n' || *b == b'\r') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            self.emit(&line[..end]);
        }
    }

    pub fn finish(&mut self) {
        let rest = std::mem::take(&mut self.buffer);
        self.emit(&rest);
    }

    fn emit(&self, raw: &[u8]) {
        let text = String::from_utf8_lossy(raw);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        // A closed receiver means nobody is watching anymore.
        let _ = self.sender.send(trimmed.to_string());
    }
}

impl Write for LogRelay {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.push(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.finish();
        Ok(())
    }
}

impl Drop for LogRelay {
    fn drop(&mut self) {
        self.finish();
    }
}
