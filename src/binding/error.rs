//! Binding error types

use thiserror::Error;

use crate::audio::InvalidAudioOptions;
use crate::media::StreamId;
use crate::sink::{SinkError, SinkId};

/// Error type for stream binding operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BindingError {
    /// Target could not be resolved to a container
    #[error("target couldn't be resolved to any container: {0}")]
    InvalidTargetElement(String),

    /// Platform rejected the sink operation
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Sink is not bound to this binding
    #[error("{0} is not bound to this stream")]
    SinkNotBound(SinkId),

    /// Operation needs at least one bound sink
    #[error("no sinks are bound to this stream")]
    NoSinks,

    /// Mirroring requested for a stream that isn't captured locally
    #[error("stream {0} is not local and cannot be mirrored")]
    MirrorUnavailable(StreamId),

    /// Rejected audio options
    #[error("invalid audio options: {0}")]
    InvalidAudioOptions(#[from] InvalidAudioOptions),

    /// Audio monitoring needs a tokio runtime
    #[error("audio events require a running tokio runtime")]
    NoRuntime,
}
