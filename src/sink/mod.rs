//! Rendering sinks
//!
//! A sink is anything that can display a media stream. This module defines
//! the capability a binding needs from a sink (mount, unmount, set source,
//! readiness listener) and the platform factory that creates sinks and
//! mirror overlays. No platform code lives here.

pub mod error;
pub mod surface;
pub mod target;

pub use error::SinkError;
pub use surface::{
    ListenerId, MirrorOverlay, ReadinessListener, Sink, SinkHandle, SinkId, SurfacePlatform,
};
pub use target::{ContainerRef, InsertMode, PlaybackProps, TargetElement};
