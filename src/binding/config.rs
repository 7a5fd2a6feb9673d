//! Binding configuration

use crate::sink::{InsertMode, TargetElement};

/// Per-binding configuration options
#[derive(Debug, Clone, PartialEq)]
pub struct BindingConfig {
    /// Defer `sinkCreated` until the new sink's first frame is ready
    pub lazy_sink_events: bool,

    /// Mirror sinks of local, non-screen streams (self-view)
    pub mirror_local: bool,

    /// Insert mode used when `create_sink` is called without one
    pub default_insert_mode: InsertMode,

    /// Target used when `create_sink` is called without one
    pub default_target: Option<TargetElement>,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            lazy_sink_events: false,
            mirror_local: false,
            default_insert_mode: InsertMode::Append,
            default_target: None,
        }
    }
}

impl BindingConfig {
    /// Create a config with a default target
    pub fn with_target(target: impl Into<TargetElement>) -> Self {
        Self {
            default_target: Some(target.into()),
            ..Default::default()
        }
    }

    /// Enable or disable lazy `sinkCreated` events
    pub fn lazy_sink_events(mut self, lazy: bool) -> Self {
        self.lazy_sink_events = lazy;
        self
    }

    /// Enable or disable self-view mirroring
    pub fn mirror_local(mut self, mirror: bool) -> Self {
        self.mirror_local = mirror;
        self
    }

    /// Set the default insert mode
    pub fn insert_mode(mut self, mode: InsertMode) -> Self {
        self.default_insert_mode = mode;
        self
    }

    /// Set the default target
    pub fn target(mut self, target: impl Into<TargetElement>) -> Self {
        self.default_target = Some(target.into());
        self
    }
}
