//! Media stream handles
//!
//! The stream itself is produced by the peer-connection layer; this crate
//! only needs an identity, an origin (local or remote) and a few capability
//! flags to decide muting and mirroring.

pub mod handle;

pub use handle::{MediaStreamHandle, StreamId, StreamOrigin, VideoSource};
