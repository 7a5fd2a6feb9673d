//! Sink error types

use thiserror::Error;

use super::target::{ContainerRef, InsertMode};

/// Errors reported by a rendering platform
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    /// Container has no parent, so sibling placement is impossible
    #[error("{container} has no parent for insert mode {mode:?}")]
    NoParent {
        container: ContainerRef,
        mode: InsertMode,
    },

    /// Container no longer exists
    #[error("{0} is no longer available")]
    ContainerGone(ContainerRef),

    /// Platform could not produce a mirror overlay
    #[error("mirror overlay unavailable: {0}")]
    Mirror(String),
}
