//! Media stream handles
//!
//! A [`MediaStreamHandle`] is an opaque reference to a live audio/video
//! source. The session/transport layer owns the underlying resource; bindings
//! only hold a handle and hand it to their sinks.

use std::fmt;
use std::sync::Arc;

/// Unique identifier for a media stream (assigned by the session layer)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamId(Arc<str>);

impl StreamId {
    /// Create a new stream id
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Where the media of a stream originates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOrigin {
    /// Captured on this device (publisher side)
    Local,
    /// Received from a remote participant (subscriber side)
    Remote,
}

/// Kind of video carried by a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSource {
    /// Camera capture
    Camera,
    /// Screen or window capture
    Screen,
    /// Audio-only stream
    None,
}

/// Opaque handle to a live media stream
///
/// Cheap to clone. Two handles are equal when they refer to the same stream
/// generation: a renegotiated stream keeps its id but gets a new generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStreamHandle {
    id: StreamId,
    origin: StreamOrigin,
    video: VideoSource,
    has_audio: bool,
    generation: u32,
}

impl MediaStreamHandle {
    /// Handle for a locally captured camera stream with audio
    pub fn local(id: impl Into<StreamId>) -> Self {
        Self {
            id: id.into(),
            origin: StreamOrigin::Local,
            video: VideoSource::Camera,
            has_audio: true,
            generation: 0,
        }
    }

    /// Handle for a remote stream with camera video and audio
    pub fn remote(id: impl Into<StreamId>) -> Self {
        Self {
            origin: StreamOrigin::Remote,
            ..Self::local(id)
        }
    }

    /// Set the video source kind
    pub fn with_video(mut self, video: VideoSource) -> Self {
        self.video = video;
        self
    }

    /// Set whether the stream carries audio
    pub fn with_audio(mut self, has_audio: bool) -> Self {
        self.has_audio = has_audio;
        self
    }

    /// Same stream, next generation (after the transport swapped tracks)
    pub fn renegotiated(&self) -> Self {
        Self {
            generation: self.generation.wrapping_add(1),
            ..self.clone()
        }
    }

    pub fn id(&self) -> &StreamId {
        &self.id
    }

    pub fn origin(&self) -> StreamOrigin {
        self.origin
    }

    pub fn video(&self) -> VideoSource {
        self.video
    }

    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Check if the stream is captured locally
    pub fn is_local(&self) -> bool {
        self.origin == StreamOrigin::Local
    }

    /// Check if the stream is a screen share
    pub fn is_screen(&self) -> bool {
        self.video == VideoSource::Screen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_and_remote() {
        let local = MediaStreamHandle::local("cam");
        assert!(local.is_local());
        assert!(local.has_audio());
        assert!(!local.is_screen());

        let remote = MediaStreamHandle::remote("cam");
        assert!(!remote.is_local());
        assert_eq!(remote.id(), local.id());
        assert_ne!(remote, local);
    }

    #[test]
    fn test_renegotiated_keeps_id() {
        let handle = MediaStreamHandle::local("cam").with_video(VideoSource::Screen);
        let next = handle.renegotiated();

        assert_eq!(next.id(), handle.id());
        assert_eq!(next.generation(), 1);
        assert!(next.is_screen());
        assert_ne!(next, handle);
    }
}
