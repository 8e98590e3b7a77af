use std::path::PathBuf;
use std::time::Duration;

/// Server tunables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding the persisted `<name>.parquet` artifacts. It is
    /// rescanned at startup to repopulate the registry.
    pub data_dir: PathBuf,
    /// How long the server keeps serving after acknowledging a shutdown
    /// action, so the acknowledgment can flush over the transport.
    pub shutdown_grace: Duration,
    /// Batch size when streaming a path-keyed dataset from its file.
    pub stream_batch_size: usize,
}

impl ServerConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn with_stream_batch_size(mut self, batch_size: usize) -> Self {
        self.stream_batch_size = batch_size;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("datasets"),
            shutdown_grace: Duration::from_secs(2),
            stream_batch_size: 1024,
        }
    }
}
