//! Per-sink state held by a stream binding

use crate::sink::{ContainerRef, InsertMode, ListenerId, MirrorOverlay, SinkHandle, SinkId};

/// How a sink came to be bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkOrigin {
    /// Created and mounted by the binding
    Created {
        container: ContainerRef,
        mode: InsertMode,
    },
    /// Supplied by the application through `add_sink`
    Attached,
}

/// One sink bound to a stream
#[derive(Debug)]
pub struct SinkBinding {
    sink: SinkHandle,
    origin: SinkOrigin,
    loaded: bool,
    mirror: Option<Box<dyn MirrorOverlay>>,
    /// `sinkCreated` is held back until the first frame is ready
    deferred: bool,
    /// Lazy-mode listener that will emit `sinkCreated`
    pending_created: Option<ListenerId>,
}

impl SinkBinding {
    pub(crate) fn new(sink: SinkHandle, origin: SinkOrigin) -> Self {
        Self {
            sink,
            origin,
            loaded: false,
            mirror: None,
            deferred: false,
            pending_created: None,
        }
    }

    pub fn sink(&self) -> &SinkHandle {
        &self.sink
    }

    pub fn id(&self) -> SinkId {
        self.sink.id()
    }

    pub fn origin(&self) -> SinkOrigin {
        self.origin
    }

    /// Check if the binding created (and therefore owns the placement of) the sink
    pub fn is_created(&self) -> bool {
        matches!(self.origin, SinkOrigin::Created { .. })
    }

    /// Check if the first frame has been reported ready
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirror.is_some()
    }

    pub(crate) fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    pub(crate) fn set_mirror(&mut self, overlay: Box<dyn MirrorOverlay>) {
        self.mirror = Some(overlay);
    }

    pub(crate) fn take_mirror(&mut self) -> Option<Box<dyn MirrorOverlay>> {
        self.mirror.take()
    }

    pub(crate) fn defer_created(&mut self) {
        self.deferred = true;
    }

    /// Store the lazy-mode listener; false if the sink already reported ready
    pub(crate) fn set_pending_created(&mut self, listener: ListenerId) -> bool {
        if !self.deferred {
            return false;
        }
        self.pending_created = Some(listener);
        true
    }

    /// Clear the deferred `sinkCreated`, returning whether it was pending
    pub(crate) fn take_deferred(&mut self) -> bool {
        self.pending_created = None;
        std::mem::replace(&mut self.deferred, false)
    }

    /// Release everything this record holds on the sink
    ///
    /// Drops the lazy listener, tears down the mirror and clears the source.
    /// Does not unmount.
    pub(crate) fn release(&mut self) {
        self.deferred = false;
        if let Some(listener) = self.pending_created.take() {
            self.sink.detach_readiness_listener(listener);
        }
        if let Some(mirror) = self.mirror.take() {
            mirror.remove();
        }
        self.sink.set_source(None);
    }
}
