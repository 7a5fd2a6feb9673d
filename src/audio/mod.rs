//! Audio event configuration and monitoring
//!
//! Level analysis itself belongs to the platform; this module defines the
//! options contract (interval, threshold), how per-binding overrides merge
//! over the process-wide default, and the polling task that turns levels
//! into volume and speaking events.

pub mod monitor;
pub mod options;

pub use monitor::{AudioLevelSource, AudioMonitor, AudioSignal, SILENCE_DB};
pub use options::{
    AudioOptions, AudioOptionsUpdate, InvalidAudioOptions, DEFAULT_INTERVAL, DEFAULT_THRESHOLD_DB,
};
