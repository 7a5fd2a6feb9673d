//! Rendering capability traits
//!
//! Concrete surfaces (DOM video elements, GPU textures, native views) live in
//! the platform layer. Bindings only talk to them through these traits.

use std::fmt;
use std::sync::Arc;

use crate::media::MediaStreamHandle;

use super::error::SinkError;
use super::target::{ContainerRef, InsertMode, PlaybackProps, TargetElement};

/// Unique identifier of a rendering surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SinkId(u64);

impl SinkId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink#{}", self.0)
    }
}

/// Identifies a readiness listener attached to a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// One-shot callback fired when a sink has buffered its first frame
pub type ReadinessListener = Box<dyn FnOnce() + Send + 'static>;

/// A surface able to display one media stream
pub trait Sink: Send + Sync + fmt::Debug {
    /// Stable identity of this surface
    fn id(&self) -> SinkId;

    /// Insert the surface relative to `container`
    fn mount(&self, container: ContainerRef, mode: InsertMode) -> Result<(), SinkError>;

    /// Remove the surface from its container
    fn unmount(&self);

    /// Point the surface at a stream, or clear it with `None`
    fn set_source(&self, source: Option<&MediaStreamHandle>);

    /// Apply autoplay/mute/inline properties
    fn apply_playback(&self, props: PlaybackProps);

    /// Attach a one-shot listener for the first-frame-ready signal
    ///
    /// The listener fires at most once. Implementations may fire it
    /// synchronously from inside this call if the surface is already ready.
    fn attach_readiness_listener(&self, listener: ReadinessListener) -> ListenerId;

    /// Drop a listener that has not fired yet; unknown ids are ignored
    fn detach_readiness_listener(&self, id: ListenerId);
}

/// Shared handle to a sink
pub type SinkHandle = Arc<dyn Sink>;

/// Horizontally flipped overlay used for self-view
pub trait MirrorOverlay: Send + Sync + fmt::Debug {
    /// Tear the overlay down
    fn remove(&self);
}

/// The platform layer that creates surfaces and resolves containers
pub trait SurfacePlatform: Send + Sync {
    /// Resolve a target to a live container
    fn resolve_target(&self, target: &TargetElement) -> Option<ContainerRef>;

    /// Build a new, unmounted surface for `stream`
    fn create_sink(&self, stream: &MediaStreamHandle) -> SinkHandle;

    /// Build a mirror overlay rendering `sink` flipped horizontally
    fn create_mirror(&self, sink: &SinkHandle) -> Result<Box<dyn MirrorOverlay>, SinkError>;
}
