//! Registry error types

use thiserror::Error;

use crate::binding::BindingError;
use crate::media::StreamId;

/// Error type for registry operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegistryError {
    /// A binding already exists for the stream
    #[error("stream already bound: {0}")]
    StreamAlreadyBound(StreamId),

    /// No binding exists for the stream
    #[error("stream not found: {0}")]
    StreamNotFound(StreamId),

    /// The binding rejected the operation
    #[error(transparent)]
    Binding(#[from] BindingError),
}
