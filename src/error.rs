use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config Error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Store Error: {0}")]
    Store(String),

    #[error("store write did not complete within {0:?}")]
    WriteTimeout(Duration),

    #[error("event pipeline is closed")]
    PipelineClosed,

    #[error("event pipeline worker panicked")]
    WorkerPanicked,

    #[error("unknown statistics handle {0}")]
    UnknownStatistics(usize),
}
