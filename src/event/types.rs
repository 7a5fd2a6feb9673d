//! Events emitted by stream bindings
//!
//! Every event shares one envelope (origin binding, kind, cancelable flag)
//! and carries a kind-specific payload.

use crate::binding::BindingId;
use crate::sink::{SinkHandle, SinkId};

use super::bus::BusEvent;

/// Discriminant handlers subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A sink created by the binding was inserted (or became ready, in lazy mode)
    SinkCreated,
    /// A sink created by the binding was removed from its container
    SinkDestroyed,
    /// The binding's first sink started rendering
    StreamPlaying,
    /// Periodic audio level report
    AudioVolumeChange,
    /// Audio level rose above the speaking threshold
    PublisherStartSpeaking,
    /// Audio level fell back below the speaking threshold
    PublisherStopSpeaking,
}

impl EventKind {
    /// Every kind, in declaration order
    pub const ALL: [EventKind; 6] = [
        EventKind::SinkCreated,
        EventKind::SinkDestroyed,
        EventKind::StreamPlaying,
        EventKind::AudioVolumeChange,
        EventKind::PublisherStartSpeaking,
        EventKind::PublisherStopSpeaking,
    ];

    /// Name used by the wire-level event vocabulary
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::SinkCreated => "sinkCreated",
            EventKind::SinkDestroyed => "sinkDestroyed",
            EventKind::StreamPlaying => "streamPlaying",
            EventKind::AudioVolumeChange => "audioVolumeChange",
            EventKind::PublisherStartSpeaking => "publisherStartSpeaking",
            EventKind::PublisherStopSpeaking => "publisherStopSpeaking",
        }
    }

    /// Whether the kind is produced by the audio monitor
    pub fn is_audio(&self) -> bool {
        matches!(
            self,
            EventKind::AudioVolumeChange
                | EventKind::PublisherStartSpeaking
                | EventKind::PublisherStopSpeaking
        )
    }
}

/// Kind-specific event data
#[derive(Debug, Clone)]
pub enum EventPayload {
    SinkCreated { sink: SinkHandle },
    SinkDestroyed { sink: SinkHandle },
    StreamPlaying,
    AudioVolumeChange { new_value: f64, old_value: f64 },
    PublisherStartSpeaking,
    PublisherStopSpeaking,
}

/// Event envelope
#[derive(Debug, Clone)]
pub struct Event {
    /// Binding that emitted the event
    pub origin: BindingId,
    /// Whether a handler may veto the default behavior (never, for now)
    pub cancelable: bool,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(origin: BindingId, payload: EventPayload) -> Self {
        Self {
            origin,
            cancelable: false,
            payload,
        }
    }

    pub fn sink_created(origin: BindingId, sink: SinkHandle) -> Self {
        Self::new(origin, EventPayload::SinkCreated { sink })
    }

    pub fn sink_destroyed(origin: BindingId, sink: SinkHandle) -> Self {
        Self::new(origin, EventPayload::SinkDestroyed { sink })
    }

    pub fn stream_playing(origin: BindingId) -> Self {
        Self::new(origin, EventPayload::StreamPlaying)
    }

    pub fn audio_volume(origin: BindingId, new_value: f64, old_value: f64) -> Self {
        Self::new(
            origin,
            EventPayload::AudioVolumeChange {
                new_value,
                old_value,
            },
        )
    }

    /// The sink this event is about, if any
    pub fn sink(&self) -> Option<&SinkHandle> {
        match &self.payload {
            EventPayload::SinkCreated { sink } | EventPayload::SinkDestroyed { sink } => Some(sink),
            _ => None,
        }
    }

    /// Id of the sink this event is about, if any
    pub fn sink_id(&self) -> Option<SinkId> {
        self.sink().map(|sink| sink.id())
    }
}

impl BusEvent for Event {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        match self.payload {
            EventPayload::SinkCreated { .. } => EventKind::SinkCreated,
            EventPayload::SinkDestroyed { .. } => EventKind::SinkDestroyed,
            EventPayload::StreamPlaying => EventKind::StreamPlaying,
            EventPayload::AudioVolumeChange { .. } => EventKind::AudioVolumeChange,
            EventPayload::PublisherStartSpeaking => EventKind::PublisherStartSpeaking,
            EventPayload::PublisherStopSpeaking => EventKind::PublisherStopSpeaking,
        }
    }

    fn has_payload(&self) -> bool {
        matches!(
            self.payload,
            EventPayload::SinkCreated { .. }
                | EventPayload::SinkDestroyed { .. }
                | EventPayload::AudioVolumeChange { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_payload() {
        let origin = BindingId::next();

        let playing = Event::stream_playing(origin);
        assert_eq!(playing.kind(), EventKind::StreamPlaying);
        assert!(!playing.has_payload());
        assert!(!playing.cancelable);

        let volume = Event::audio_volume(origin, -40.0, -60.0);
        assert_eq!(volume.kind(), EventKind::AudioVolumeChange);
        assert!(volume.has_payload());
        assert!(volume.kind().is_audio());
        assert_eq!(volume.sink_id(), None);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(EventKind::SinkCreated.name(), "sinkCreated");
        assert_eq!(EventKind::StreamPlaying.name(), "streamPlaying");
    }
}
