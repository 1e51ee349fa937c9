//! Audit record sinks

use crate::context::AuditRecord;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Sink errors
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("sink error: {0}")]
    Other(String),
}

/// Transport for formatted audit records.
///
/// A sink receives one formatted line per record and writes it somewhere.
/// Sinks are invoked concurrently from every request task, so
/// implementations must be safe for concurrent calls. Durability and
/// delivery are the sink's own business; the emission pipeline treats
/// `write` as fire-and-forget and degrades failures to local diagnostics.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Write one formatted record.
    async fn write(&self, line: &str) -> Result<(), SinkError>;

    /// Flush any pending writes.
    async fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Stdout sink, the default transport.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl StdoutSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditSink for StdoutSink {
    async fn write(&self, line: &str) -> Result<(), SinkError> {
        println!("{}", line);
        Ok(())
    }
}

/// File sink, one record per line, append-only.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AuditSink for FileSink {
    async fn write(&self, line: &str) -> Result<(), SinkError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;

        Ok(())
    }
}

/// In-memory sink for tests.
///
/// Stores formatted lines; `records` parses them back into typed records.
#[derive(Clone, Default)]
pub struct MemorySink {
    lines: std::sync::Arc<tokio::sync::Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines written so far.
    pub async fn lines(&self) -> Vec<String> {
        self.lines.lock().await.clone()
    }

    /// All records written so far, parsed back from their JSON lines.
    pub async fn records(&self) -> Result<Vec<AuditRecord>, SinkError> {
        self.lines
            .lock()
            .await
            .iter()
            .map(|line| serde_json::from_str(line).map_err(SinkError::from))
            .collect()
    }

    pub async fn clear(&self) {
        self.lines.lock().await.clear();
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn write(&self, line: &str) -> Result<(), SinkError> {
        self.lines.lock().await.push(line.to_string());
        Ok(())
    }
}
