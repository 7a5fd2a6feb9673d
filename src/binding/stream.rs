//! Stream binding implementation
//!
//! A [`StreamBinding`] owns one media stream handle and the ordered list of
//! sinks displaying it. It creates, attaches, detaches and reassigns sinks,
//! mirrors self-view, and reports when the stream starts playing.
//!
//! # Locking
//!
//! State lives behind a single mutex that is never held while calling into a
//! sink or emitting an event. Handlers may therefore call back into the
//! binding (e.g. `remove_all_sinks` from a `sinkCreated` handler), and sinks
//! may fire readiness listeners synchronously.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::audio::{AudioLevelSource, AudioMonitor, AudioOptions, AudioOptionsUpdate, AudioSignal};
use crate::event::{DispatchReport, Event, EventBus, EventKind, EventPayload, HandlerToken};
use crate::media::MediaStreamHandle;
use crate::sink::{
    InsertMode, ListenerId, PlaybackProps, SinkHandle, SinkId, SurfacePlatform, TargetElement,
};

use super::config::BindingConfig;
use super::error::BindingError;
use super::ledger::SinkLedger;
use super::sink_binding::{SinkBinding, SinkOrigin};
use super::BindingId;

/// Result of [`StreamBinding::add_sink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddSinkOutcome {
    /// Sink was already bound to this binding; nothing changed
    AlreadyBound,
    /// Sink was unbound and is now bound here
    Added,
    /// Sink was taken over from another binding
    Reassigned,
}

impl AddSinkOutcome {
    /// Numeric code: 0 already bound, 1 added, -1 reassigned
    pub fn code(&self) -> i32 {
        match self {
            AddSinkOutcome::AlreadyBound => 0,
            AddSinkOutcome::Added => 1,
            AddSinkOutcome::Reassigned => -1,
        }
    }
}

/// Aggregate "stream playing" detection
///
/// Only the first sink ever bound is watched. The watch never moves to
/// another sink, even when the first one is removed before it fires.
enum PlayingWatch {
    /// No sink bound yet
    Unarmed,
    /// Listening on the first sink
    Armed {
        sink: SinkHandle,
        listener: Option<ListenerId>,
    },
    /// `streamPlaying` has been emitted
    Fired,
    /// First sink left before it became ready
    Abandoned,
}

impl PlayingWatch {
    /// Abandon the watch if it is armed on `sink`, returning its listener
    fn abandon_if(&mut self, sink: SinkId) -> Option<ListenerId> {
        match self {
            PlayingWatch::Armed { sink: armed, .. } if armed.id() == sink => {}
            _ => return None,
        }
        match std::mem::replace(self, PlayingWatch::Abandoned) {
            PlayingWatch::Armed { listener, .. } => listener,
            _ => None,
        }
    }

    fn is_armed_on(&self, sink: SinkId) -> bool {
        matches!(self, PlayingWatch::Armed { sink: armed, .. } if armed.id() == sink)
    }
}

struct BindingState {
    stream: MediaStreamHandle,
    config: BindingConfig,
    sinks: Vec<SinkBinding>,
    playing: PlayingWatch,
    audio: AudioOptions,
    monitor: Option<AudioMonitor>,
}

impl BindingState {
    fn find(&self, sink: SinkId) -> Option<&SinkBinding> {
        self.sinks.iter().find(|record| record.id() == sink)
    }

    fn find_mut(&mut self, sink: SinkId) -> Option<&mut SinkBinding> {
        self.sinks.iter_mut().find(|record| record.id() == sink)
    }
}

/// Binding between one media stream and its sinks
pub struct StreamBinding {
    id: BindingId,
    this: Weak<StreamBinding>,
    platform: Arc<dyn SurfacePlatform>,
    ledger: Arc<SinkLedger>,
    events: EventBus<Event>,
    state: Mutex<BindingState>,
}

impl StreamBinding {
    /// Create a binding for `stream`
    ///
    /// Bindings that may exchange sinks must share `ledger`.
    pub fn new(
        stream: MediaStreamHandle,
        platform: Arc<dyn SurfacePlatform>,
        ledger: Arc<SinkLedger>,
        config: BindingConfig,
        audio: AudioOptions,
    ) -> Arc<Self> {
        let id = BindingId::next();
        let label = if stream.is_local() {
            "publisher"
        } else {
            "subscriber"
        };

        tracing::info!(
            binding = %id,
            stream = %stream.id(),
            local = stream.is_local(),
            lazy = config.lazy_sink_events,
            "Stream binding created"
        );

        Arc::new_cyclic(|this| Self {
            id,
            this: this.clone(),
            platform,
            ledger,
            events: EventBus::new(label),
            state: Mutex::new(BindingState {
                stream,
                config,
                sinks: Vec::new(),
                playing: PlayingWatch::Unarmed,
                audio,
                monitor: None,
            }),
        })
    }

    /// Create a binding with default config and audio options
    pub fn with_defaults(
        stream: MediaStreamHandle,
        platform: Arc<dyn SurfacePlatform>,
        ledger: Arc<SinkLedger>,
    ) -> Arc<Self> {
        Self::new(
            stream,
            platform,
            ledger,
            BindingConfig::default(),
            AudioOptions::default(),
        )
    }

    pub fn id(&self) -> BindingId {
        self.id
    }

    /// Current stream handle
    pub fn stream(&self) -> MediaStreamHandle {
        self.state.lock().stream.clone()
    }

    pub fn config(&self) -> BindingConfig {
        self.state.lock().config.clone()
    }

    /// Event bus the binding publishes on
    pub fn events(&self) -> &EventBus<Event> {
        &self.events
    }

    /// Register a handler, see [`EventBus::on`]
    pub fn on<F>(&self, kind: EventKind, handler: F) -> HandlerToken
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.events.on(kind, handler)
    }

    /// Register a one-shot handler, see [`EventBus::once`]
    pub fn once<F>(&self, kind: EventKind, handler: F) -> HandlerToken
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.events.once(kind, handler)
    }

    /// Remove handlers, see [`EventBus::off`]
    pub fn off(&self, kind: EventKind, token: Option<HandlerToken>) -> usize {
        self.events.off(kind, token)
    }

    /// Publish an event on this binding's bus
    pub fn emit(&self, event: &Event) -> DispatchReport {
        self.events.emit(event)
    }

    /// Snapshot of the bound sinks, in insertion order
    pub fn sinks(&self) -> Vec<SinkHandle> {
        self.state
            .lock()
            .sinks
            .iter()
            .map(|record| Arc::clone(record.sink()))
            .collect()
    }

    pub fn sink_count(&self) -> usize {
        self.state.lock().sinks.len()
    }

    /// First sink in the current collection
    pub fn first_sink(&self) -> Option<SinkHandle> {
        self.state
            .lock()
            .sinks
            .first()
            .map(|record| Arc::clone(record.sink()))
    }

    pub fn contains(&self, sink: SinkId) -> bool {
        self.state.lock().find(sink).is_some()
    }

    /// Whether `sink` has reported its first frame, `None` if not bound
    pub fn is_loaded(&self, sink: SinkId) -> Option<bool> {
        self.state.lock().find(sink).map(SinkBinding::is_loaded)
    }

    /// Whether `sink` has a mirror overlay, `None` if not bound
    pub fn is_mirrored(&self, sink: SinkId) -> Option<bool> {
        self.state.lock().find(sink).map(SinkBinding::is_mirrored)
    }

    /// Whether `streamPlaying` has been emitted
    pub fn is_playing(&self) -> bool {
        matches!(self.state.lock().playing, PlayingWatch::Fired)
    }

    /// Create a new sink displaying this stream
    ///
    /// Falls back to the configured default target and insert mode. Fails
    /// with [`BindingError::InvalidTargetElement`] if the target does not
    /// resolve; no sink is registered in that case.
    pub fn create_sink(
        &self,
        target: Option<TargetElement>,
        mode: Option<InsertMode>,
    ) -> Result<SinkHandle, BindingError> {
        let (stream, config) = {
            let state = self.state.lock();
            (state.stream.clone(), state.config.clone())
        };

        let target = target
            .or(config.default_target)
            .ok_or_else(|| BindingError::InvalidTargetElement("no target supplied".into()))?;
        let mode = mode.unwrap_or(config.default_insert_mode);

        let container = self
            .platform
            .resolve_target(&target)
            .ok_or_else(|| BindingError::InvalidTargetElement(target.to_string()))?;

        let sink = self.platform.create_sink(&stream);
        sink.mount(container, mode)?;
        sink.apply_playback(PlaybackProps::for_stream(stream.is_local()));
        sink.set_source(Some(&stream));

        let mut record = SinkBinding::new(Arc::clone(&sink), SinkOrigin::Created { container, mode });
        self.attach_mirror(&stream, config.mirror_local, &mut record);
        if config.lazy_sink_events {
            record.defer_created();
        }
        let first = self.push_sink(record);

        tracing::info!(
            binding = %self.id,
            sink = %sink.id(),
            target = %target,
            mode = ?mode,
            "Sink created"
        );

        // sinkCreated goes out before streamPlaying
        if config.lazy_sink_events {
            self.watch_created(&sink);
        } else {
            self.events.emit(&Event::sink_created(self.id, Arc::clone(&sink)));
        }
        if first {
            self.arm_playing(&sink);
        }

        Ok(sink)
    }

    /// Bind an externally supplied sink to this stream
    ///
    /// A sink owned by another binding is fully detached from it first.
    pub fn add_sink(&self, sink: SinkHandle) -> AddSinkOutcome {
        let sink_id = sink.id();
        if self.contains(sink_id) {
            return AddSinkOutcome::AlreadyBound;
        }

        let outcome = match self.ledger.owner_binding(sink_id) {
            Some((owner, Some(previous))) if owner != self.id => {
                if previous.disassociate_sink(sink_id) {
                    AddSinkOutcome::Reassigned
                } else {
                    AddSinkOutcome::Added
                }
            }
            _ => AddSinkOutcome::Added,
        };

        let (stream, mirror) = {
            let state = self.state.lock();
            (state.stream.clone(), state.config.mirror_local)
        };

        sink.apply_playback(PlaybackProps::for_stream(stream.is_local()));
        sink.set_source(Some(&stream));

        let mut record = SinkBinding::new(Arc::clone(&sink), SinkOrigin::Attached);
        self.attach_mirror(&stream, mirror, &mut record);
        if self.push_sink(record) {
            self.arm_playing(&sink);
        }

        tracing::info!(
            binding = %self.id,
            sink = %sink_id,
            outcome = ?outcome,
            "Sink attached"
        );

        outcome
    }

    /// Unbind one sink
    ///
    /// Clears its source and removes its mirror overlay; the sink stays
    /// mounted. Returns false if the sink was not bound here.
    pub fn disassociate_sink(&self, sink: SinkId) -> bool {
        let (mut record, playing_listener) = {
            let mut state = self.state.lock();
            let Some(index) = state.sinks.iter().position(|record| record.id() == sink) else {
                return false;
            };
            let record = state.sinks.remove(index);
            let listener = state.playing.abandon_if(sink);
            (record, listener)
        };

        if let Some(listener) = playing_listener {
            record.sink().detach_readiness_listener(listener);
        }
        record.release();
        self.ledger.release(sink, self.id);

        tracing::info!(binding = %self.id, sink = %sink, "Sink disassociated");
        true
    }

    /// Unbind every sink
    ///
    /// Works on a snapshot taken up front, so handlers reacting to
    /// `sinkDestroyed` may freely mutate the binding. Sinks the binding
    /// created are unmounted and reported with `sinkDestroyed`.
    pub fn remove_all_sinks(&self) {
        let (records, playing) = {
            let mut state = self.state.lock();
            let records = std::mem::take(&mut state.sinks);
            let playing = records
                .iter()
                .find(|record| state.playing.is_armed_on(record.id()))
                .map(SinkBinding::id)
                .and_then(|first| state.playing.abandon_if(first).map(|l| (first, l)));
            (records, playing)
        };

        if records.is_empty() {
            return;
        }
        tracing::info!(binding = %self.id, sinks = records.len(), "Removing all sinks");

        for mut record in records {
            let sink_id = record.id();
            if let Some((first, listener)) = playing {
                if first == sink_id {
                    record.sink().detach_readiness_listener(listener);
                }
            }
            record.release();
            self.ledger.release(sink_id, self.id);

            if record.is_created() {
                record.sink().unmount();
                self.events
                    .emit(&Event::sink_destroyed(self.id, Arc::clone(record.sink())));
            }
        }
    }

    /// Swap the stream handle without recreating any sink
    pub fn update_media_stream(&self, stream: MediaStreamHandle) {
        let sinks: Vec<SinkHandle> = {
            let mut state = self.state.lock();
            state.stream = stream.clone();
            state
                .sinks
                .iter()
                .map(|record| Arc::clone(record.sink()))
                .collect()
        };

        for sink in &sinks {
            sink.set_source(Some(&stream));
        }

        tracing::info!(
            binding = %self.id,
            stream = %stream.id(),
            generation = stream.generation(),
            sinks = sinks.len(),
            "Media stream updated"
        );
    }

    /// Add a mirror overlay to a bound sink
    ///
    /// Returns `Ok(false)` if the sink is already mirrored.
    pub fn mirror_sink(&self, sink: SinkId) -> Result<bool, BindingError> {
        let (stream, handle) = {
            let state = self.state.lock();
            let record = state.find(sink).ok_or(BindingError::SinkNotBound(sink))?;
            if record.is_mirrored() {
                return Ok(false);
            }
            (state.stream.clone(), Arc::clone(record.sink()))
        };

        if !stream.is_local() {
            return Err(BindingError::MirrorUnavailable(stream.id().clone()));
        }

        let overlay = self.platform.create_mirror(&handle)?;
        let leftover = {
            let mut state = self.state.lock();
            match state.find_mut(sink) {
                Some(record) if !record.is_mirrored() => {
                    record.set_mirror(overlay);
                    None
                }
                _ => Some(overlay),
            }
        };

        match leftover {
            Some(overlay) => {
                overlay.remove();
                Ok(false)
            }
            None => {
                tracing::debug!(binding = %self.id, sink = %sink, "Sink mirrored");
                Ok(true)
            }
        }
    }

    /// Tear down a sink's mirror overlay; returns false if there was none
    pub fn remove_mirror(&self, sink: SinkId) -> bool {
        let overlay = self
            .state
            .lock()
            .find_mut(sink)
            .and_then(SinkBinding::take_mirror);

        match overlay {
            Some(overlay) => {
                overlay.remove();
                tracing::debug!(binding = %self.id, sink = %sink, "Mirror removed");
                true
            }
            None => false,
        }
    }

    /// Mirror the first bound sink (self-view)
    pub fn mirror_video(&self) -> Result<bool, BindingError> {
        let first = self.first_sink().ok_or(BindingError::NoSinks)?;
        self.mirror_sink(first.id())
    }

    /// Remove the first bound sink's mirror overlay
    pub fn remove_mirror_video(&self) -> bool {
        self.first_sink()
            .is_some_and(|first| self.remove_mirror(first.id()))
    }

    /// Audio options in effect for this binding
    pub fn audio_options(&self) -> AudioOptions {
        self.state.lock().audio
    }

    /// Merge `update` into this binding's audio options
    ///
    /// Applies immediately to a running audio monitor.
    pub fn update_audio_options(
        &self,
        update: AudioOptionsUpdate,
    ) -> Result<AudioOptions, BindingError> {
        let mut state = self.state.lock();
        let merged = state.audio.merged(update)?;
        state.audio = merged;
        if let Some(monitor) = &state.monitor {
            monitor.update(merged)?;
        }

        tracing::info!(
            binding = %self.id,
            interval_ms = merged.interval.as_millis() as u64,
            threshold = merged.threshold,
            "Audio options updated"
        );
        Ok(merged)
    }

    /// Start emitting audio volume and speaking events
    ///
    /// Must be called from within a tokio runtime. Replaces any running monitor.
    /// Fails without touching a running monitor if the binding's audio
    /// options are invalid.
    pub fn enable_audio_events(&self, source: Arc<dyn AudioLevelSource>) -> Result<(), BindingError> {
        let runtime = Handle::try_current().map_err(|_| BindingError::NoRuntime)?;
        let options = self.state.lock().audio;
        let this = self.this.clone();

        let monitor = AudioMonitor::spawn(&runtime, options, source, move |signal| {
            match this.upgrade() {
                Some(binding) => {
                    binding.emit_audio(signal);
                    true
                }
                None => false,
            }
        })?;

        let previous = self.state.lock().monitor.replace(monitor);
        drop(previous);

        tracing::info!(binding = %self.id, "Audio events enabled");
        Ok(())
    }

    /// Stop audio events; returns false if they were not enabled
    pub fn disable_audio_events(&self) -> bool {
        let monitor = self.state.lock().monitor.take();
        let stopped = monitor.is_some();
        drop(monitor);

        if stopped {
            tracing::info!(binding = %self.id, "Audio events disabled");
        }
        stopped
    }

    pub fn audio_events_enabled(&self) -> bool {
        self.state.lock().monitor.is_some()
    }

    /// Release every sink and stop background work (stream ended)
    pub fn teardown(&self) {
        self.remove_all_sinks();
        self.disable_audio_events();

        let mut state = self.state.lock();
        if matches!(state.playing, PlayingWatch::Unarmed) {
            state.playing = PlayingWatch::Abandoned;
        }
        drop(state);

        tracing::info!(binding = %self.id, "Stream binding torn down");
    }

    fn emit_audio(&self, signal: AudioSignal) {
        let event = match signal {
            AudioSignal::Volume {
                new_value,
                old_value,
            } => Event::audio_volume(self.id, new_value, old_value),
            AudioSignal::StartSpeaking => Event::new(self.id, EventPayload::PublisherStartSpeaking),
            AudioSignal::StopSpeaking => Event::new(self.id, EventPayload::PublisherStopSpeaking),
        };
        self.events.emit(&event);
    }

    fn attach_mirror(&self, stream: &MediaStreamHandle, enabled: bool, record: &mut SinkBinding) {
        if !enabled || !stream.is_local() || stream.is_screen() {
            return;
        }
        match self.platform.create_mirror(record.sink()) {
            Ok(overlay) => record.set_mirror(overlay),
            Err(e) => {
                tracing::warn!(
                    binding = %self.id,
                    sink = %record.id(),
                    error = %e,
                    "Failed to mirror sink"
                );
            }
        }
    }

    /// Append a record and claim the sink
    ///
    /// Returns true if this is the first sink ever bound; the caller then
    /// arms playing detection on it.
    fn push_sink(&self, record: SinkBinding) -> bool {
        let sink = Arc::clone(record.sink());
        let arm = {
            let mut state = self.state.lock();
            state.sinks.push(record);
            if matches!(state.playing, PlayingWatch::Unarmed) {
                state.playing = PlayingWatch::Armed {
                    sink: Arc::clone(&sink),
                    listener: None,
                };
                true
            } else {
                false
            }
        };

        self.ledger.claim(sink.id(), self.id, self.this.clone());
        arm
    }

    fn arm_playing(&self, sink: &SinkHandle) {
        let sink_id = sink.id();
        let this = self.this.clone();
        let listener = sink.attach_readiness_listener(Box::new(move || {
            if let Some(binding) = this.upgrade() {
                binding.on_first_frame(sink_id);
            }
        }));

        let stored = {
            let mut state = self.state.lock();
            match &mut state.playing {
                PlayingWatch::Armed {
                    sink: armed,
                    listener: slot,
                } if armed.id() == sink_id => {
                    *slot = Some(listener);
                    true
                }
                // Fired synchronously
                PlayingWatch::Fired => true,
                _ => false,
            }
        };

        if !stored {
            sink.detach_readiness_listener(listener);
        }
    }

    fn on_first_frame(&self, sink: SinkId) {
        let fire = {
            let mut state = self.state.lock();
            if let Some(record) = state.find_mut(sink) {
                record.mark_loaded();
            }
            if state.playing.is_armed_on(sink) {
                state.playing = PlayingWatch::Fired;
                true
            } else {
                false
            }
        };

        if fire {
            tracing::info!(binding = %self.id, sink = %sink, "Stream playing");
            self.events.emit(&Event::stream_playing(self.id));
        }
    }

    /// Lazy mode: emit `sinkCreated` once the sink's first frame is ready
    fn watch_created(&self, sink: &SinkHandle) {
        let sink_id = sink.id();
        let this = self.this.clone();
        let listener = sink.attach_readiness_listener(Box::new(move || {
            if let Some(binding) = this.upgrade() {
                binding.on_sink_ready(sink_id);
            }
        }));

        let stored = self
            .state
            .lock()
            .find_mut(sink_id)
            .is_some_and(|record| record.set_pending_created(listener));

        if !stored {
            sink.detach_readiness_listener(listener);
        }
    }

    fn on_sink_ready(&self, sink: SinkId) {
        let created = {
            let mut state = self.state.lock();
            let Some(record) = state.find_mut(sink) else {
                return;
            };
            record.mark_loaded();
            if !record.take_deferred() {
                return;
            }
            Arc::clone(record.sink())
        };

        tracing::debug!(binding = %self.id, sink = %sink, "Deferred sink creation reported");
        self.events.emit(&Event::sink_created(self.id, created));
    }
}

impl Drop for StreamBinding {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for record in &state.sinks {
            self.ledger.release(record.id(), self.id);
        }
    }
}

impl std::fmt::Debug for StreamBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBinding")
            .field("id", &self.id)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
