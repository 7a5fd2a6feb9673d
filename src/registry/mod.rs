//! Registry of stream bindings
//!
//! The registry is the session-facing side of the crate: the transport layer
//! reports streams starting, being renegotiated and stopping, and the
//! registry keeps one [`StreamBinding`](crate::binding::StreamBinding) per
//! stream in step with those notices.
//!
//! ```text
//!   transport ──► mpsc::Sender<TransportNotice>
//!                          │
//!                          ▼
//!            BindingRegistry::spawn_notice_task
//!                          │
//!        ┌─────────────────┼──────────────────┐
//!        ▼                 ▼                  ▼
//!   StreamStarted     StreamReplaced     StreamStopped
//!   new binding       update_media_      teardown +
//!   + initial sink    stream()           remove
//! ```
//!
//! All bindings share one [`SinkLedger`](crate::binding::SinkLedger), so
//! sinks can move between them with `add_sink`.

pub mod config;
pub mod error;
pub mod store;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use store::{BindingRegistry, TransportNotice};
