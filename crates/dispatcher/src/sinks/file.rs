//! FileSink - appends events to an NDJSON file

use contracts::{ContractError, Event, EventSink};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

use crate::error::DispatcherError;

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file, created with its parent directories
    pub path: PathBuf,
    /// Append instead of truncating an existing file
    pub append: bool,
}

impl FileSinkConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append: true,
        }
    }
}

/// Sink that writes one JSON object per event and line
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: BufWriter<File>,
    lines: u64,
}

impl FileSink {
    /// Create a new FileSink
    ///
    /// # Errors
    /// `DispatcherError::SinkCreation` when the file cannot be opened
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> Result<Self, DispatcherError> {
        let name = name.into();
        let file = Self::open(&config).map_err(|e| {
            DispatcherError::sink_creation(&name, format!("{}: {e}", config.path.display()))
        })?;

        Ok(Self {
            name,
            config,
            writer: BufWriter::new(file),
            lines: 0,
        })
    }

    fn open(config: &FileSinkConfig) -> std::io::Result<File> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&config.path)
    }

    fn write_event(&mut self, event: &Event) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, event)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.writer.write_all(b"\n")?;
        self.lines += 1;

        // Status events are flushed immediately
        if matches!(event, Event::StatusChanged(_)) {
            self.writer.flush()?;
        }
        Ok(())
    }

    fn sink_error(&self, e: std::io::Error) -> ContractError {
        error!(sink = %self.name, path = %self.config.path.display(), error = %e, "Write failed");
        ContractError::sink_write(&self.name, e.to_string())
    }
}

impl EventSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "file_sink_handle", skip(self, event), fields(sink = %self.name))]
    async fn handle(&mut self, event: &Event) -> Result<(), ContractError> {
        self.write_event(event).map_err(|e| self.sink_error(e))
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.writer.flush().map_err(|e| self.sink_error(e))
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.writer.flush().map_err(|e| self.sink_error(e))?;
        debug!(sink = %self.name, lines = self.lines, "FileSink closed");
        Ok(())
    }
}
