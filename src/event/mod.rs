//! Event dispatch
//!
//! [`EventBus`] is a generic typed publish/subscribe mechanism. It knows
//! nothing about bindings and can carry any [`BusEvent`]. [`Event`] is the
//! envelope stream bindings publish on it.
//!
//! # Removal
//!
//! Every registration returns a [`HandlerToken`]. Removing by token touches
//! exactly one record. Shared handlers (`Arc<dyn Fn>`) can also be removed by
//! reference with [`EventBus::off_handler`], which is scoped to one event
//! kind so a handler reused across kinds is never removed from the wrong one.

pub mod bus;
pub mod types;

pub use bus::{BusEvent, DispatchReport, EventBus, Handler, HandlerToken};
pub use types::{Event, EventKind, EventPayload};
