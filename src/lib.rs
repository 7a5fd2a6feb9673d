//! Bind live media streams to rendering sinks
//!
//! `streamview-rs` keeps a live media stream (a local capture or a remote
//! feed) attached to any number of display surfaces, reassigns surfaces
//! between streams, mirrors self-view, and reports lifecycle events
//! (`sinkCreated`, `sinkDestroyed`, `streamPlaying`, audio levels) through a
//! typed event bus.
//!
//! The platform that actually draws pixels is abstracted behind the
//! [`SurfacePlatform`](sink::SurfacePlatform) and [`Sink`](sink::Sink)
//! traits.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use streamview_rs::{BindingRegistry, EventKind, MediaStreamHandle};
//!
//! let registry = Arc::new(BindingRegistry::new(platform));
//! let binding = registry
//!     .start_stream(MediaStreamHandle::remote("peer-1"), Some("grid".into()), None)
//!     .await?;
//!
//! binding.on(EventKind::StreamPlaying, |event| {
//!     println!("{} is playing", event.origin);
//! });
//! ```

pub mod audio;
pub mod binding;
pub mod error;
pub mod event;
pub mod media;
pub mod registry;
pub mod sink;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use audio::{AudioLevelSource, AudioOptions, AudioOptionsUpdate};
pub use binding::{AddSinkOutcome, BindingConfig, BindingError, BindingId, SinkLedger, StreamBinding};
pub use error::{Error, Result};
pub use event::{Event, EventBus, EventKind, EventPayload, HandlerToken};
pub use media::{MediaStreamHandle, StreamId};
pub use registry::{BindingRegistry, RegistryConfig, RegistryError, TransportNotice};
pub use sink::{InsertMode, Sink, SinkHandle, SinkId, SurfacePlatform, TargetElement};
