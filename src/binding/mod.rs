//! Stream to sink bindings
//!
//! A [`StreamBinding`] connects one media stream to any number of display
//! sinks. Bindings that may hand sinks to each other share a [`SinkLedger`]
//! so a sink is never owned by two bindings at once.
//!
//! # Architecture
//!
//! ```text
//!                     Arc<SinkLedger>
//!                 ┌────────────────────┐
//!                 │ SinkId -> Binding  │
//!                 └─────────┬──────────┘
//!                           │
//!          ┌────────────────┼────────────────┐
//!          ▼                                 ▼
//!   StreamBinding (publisher)        StreamBinding (subscriber)
//!   stream, sinks[], EventBus        stream, sinks[], EventBus
//!          │                                 │
//!          └──► add_sink() reassigns ◄───────┘
//! ```

pub mod config;
pub mod error;
pub mod ledger;
pub mod sink_binding;
pub mod stream;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub use config::BindingConfig;
pub use error::BindingError;
pub use ledger::SinkLedger;
pub use sink_binding::{SinkBinding, SinkOrigin};
pub use stream::{AddSinkOutcome, StreamBinding};

/// Process-unique binding identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(1);

impl BindingId {
    /// Allocate the next identifier
    pub fn next() -> Self {
        Self(NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_ids_are_unique() {
        let a = BindingId::next();
        let b = BindingId::next();

        assert_ne!(a, b);
        assert!(b > a);
        assert_eq!(a.to_string(), format!("binding#{}", a.raw()));
    }
}
