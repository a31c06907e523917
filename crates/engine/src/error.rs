use std::path::PathBuf;

use thiserror::Error;

/// Infrastructure failures inside the engine. Distinct from
/// [`TaskError`](drossel_core::TaskError): these are never task outcomes.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] drossel_core::CodecError),

    #[error("wire protocol error: {0}")]
    Protocol(String),

    #[error("failed to spawn worker binary {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        source: std::io::Error,
    },

    #[error("worker channel closed")]
    ChannelClosed,

    #[error("config error: {0}")]
    Config(String),
}
