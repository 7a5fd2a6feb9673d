//! Binding registry implementation
//!
//! Owns one binding per active stream and applies transport notices to them.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use crate::binding::{BindingConfig, SinkLedger, StreamBinding};
use crate::media::{MediaStreamHandle, StreamId};
use crate::sink::{SurfacePlatform, TargetElement};

use super::config::RegistryConfig;
use super::error::RegistryError;

/// Stream lifecycle notice from the transport layer
#[derive(Debug, Clone)]
pub enum TransportNotice {
    /// A stream is available; optionally create its first sink at `target`
    StreamStarted {
        stream: MediaStreamHandle,
        target: Option<TargetElement>,
        config: Option<BindingConfig>,
    },
    /// The stream was renegotiated and has a new handle
    StreamReplaced { stream: MediaStreamHandle },
    /// The stream ended
    StreamStopped { stream: StreamId },
}

/// Central registry of stream bindings
///
/// Thread-safe via `RwLock`. The lock is never held while a binding runs, so
/// event handlers see a consistent registry.
pub struct BindingRegistry {
    /// Map of stream id to its binding
    bindings: RwLock<HashMap<StreamId, Arc<StreamBinding>>>,

    /// Sink ownership shared by every binding
    ledger: Arc<SinkLedger>,

    platform: Arc<dyn SurfacePlatform>,

    /// Configuration
    config: RegistryConfig,
}

impl BindingRegistry {
    /// Create a new registry with default configuration
    pub fn new(platform: Arc<dyn SurfacePlatform>) -> Self {
        Self::with_config(platform, RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(platform: Arc<dyn SurfacePlatform>, config: RegistryConfig) -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
            ledger: Arc::new(SinkLedger::new()),
            platform,
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Sink ledger shared by this registry's bindings
    pub fn ledger(&self) -> &Arc<SinkLedger> {
        &self.ledger
    }

    /// Bind a newly started stream
    ///
    /// With a `target`, the initial sink is created there. If that fails the
    /// binding is discarded and the error returned.
    pub async fn start_stream(
        &self,
        stream: MediaStreamHandle,
        target: Option<TargetElement>,
        config: Option<BindingConfig>,
    ) -> Result<Arc<StreamBinding>, RegistryError> {
        let id = stream.id().clone();
        let binding = {
            let mut bindings = self.bindings.write().await;
            if bindings.contains_key(&id) {
                return Err(RegistryError::StreamAlreadyBound(id));
            }

            let binding = StreamBinding::new(
                stream,
                Arc::clone(&self.platform),
                Arc::clone(&self.ledger),
                config.unwrap_or_else(|| self.config.binding.clone()),
                self.config.default_audio,
            );
            bindings.insert(id.clone(), Arc::clone(&binding));
            binding
        };

        if let Some(target) = target {
            if let Err(e) = binding.create_sink(Some(target), None) {
                self.bindings.write().await.remove(&id);
                binding.teardown();
                tracing::warn!(stream = %id, error = %e, "Initial sink creation failed");
                return Err(e.into());
            }
        }

        tracing::info!(
            stream = %id,
            binding = %binding.id(),
            sinks = binding.sink_count(),
            "Stream started"
        );

        Ok(binding)
    }

    /// Swap the handle of a bound stream
    pub async fn replace_stream(&self, stream: MediaStreamHandle) -> Result<(), RegistryError> {
        let binding = self
            .get(stream.id())
            .await
            .ok_or_else(|| RegistryError::StreamNotFound(stream.id().clone()))?;

        binding.update_media_stream(stream);
        Ok(())
    }

    /// Unbind an ended stream, releasing all of its sinks
    pub async fn stop_stream(&self, id: &StreamId) -> Result<(), RegistryError> {
        let binding = self
            .bindings
            .write()
            .await
            .remove(id)
            .ok_or_else(|| RegistryError::StreamNotFound(id.clone()))?;

        binding.teardown();
        tracing::info!(stream = %id, binding = %binding.id(), "Stream stopped");
        Ok(())
    }

    /// Apply one transport notice
    pub async fn handle_notice(&self, notice: TransportNotice) -> Result<(), RegistryError> {
        match notice {
            TransportNotice::StreamStarted {
                stream,
                target,
                config,
            } => self.start_stream(stream, target, config).await.map(|_| ()),
            TransportNotice::StreamReplaced { stream } => self.replace_stream(stream).await,
            TransportNotice::StreamStopped { stream } => self.stop_stream(&stream).await,
        }
    }

    /// Binding for a stream
    pub async fn get(&self, id: &StreamId) -> Option<Arc<StreamBinding>> {
        self.bindings.read().await.get(id).cloned()
    }

    /// Check if a stream is bound
    pub async fn contains(&self, id: &StreamId) -> bool {
        self.bindings.read().await.contains_key(id)
    }

    /// Get number of bound streams
    pub async fn binding_count(&self) -> usize {
        self.bindings.read().await.len()
    }

    /// Tear down every binding
    pub async fn shutdown(&self) {
        let bindings: Vec<_> = self.bindings.write().await.drain().collect();
        for (id, binding) in bindings {
            binding.teardown();
            tracing::debug!(stream = %id, "Binding released on shutdown");
        }
    }

    /// Spawn background task applying notices from `rx`
    ///
    /// The task ends when every sender is dropped. Notices that fail are
    /// logged and skipped.
    pub fn spawn_notice_task(
        self: &Arc<Self>,
        mut rx: mpsc::Receiver<TransportNotice>,
    ) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);

        tokio::spawn(async move {
            while let Some(notice) = rx.recv().await {
                if let Err(e) = registry.handle_notice(notice).await {
                    tracing::warn!(error = %e, "Ignoring transport notice");
                }
            }
            tracing::debug!("Notice channel closed");
        })
    }
}

impl std::fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("ledger", &self.ledger)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::binding::BindingError;
    use crate::event::EventKind;
    use crate::testing::{EventLog, FakePlatform};

    fn registry() -> (Arc<FakePlatform>, BindingRegistry) {
        let platform = Arc::new(FakePlatform::new());
        platform.add_container("grid");
        let registry = BindingRegistry::new(Arc::clone(&platform) as Arc<dyn SurfacePlatform>);
        (platform, registry)
    }

    #[tokio::test]
    async fn test_start_and_stop_stream() {
        let (platform, registry) = registry();
        let stream = MediaStreamHandle::remote("s1");

        let binding = registry
            .start_stream(stream.clone(), Some("grid".into()), None)
            .await
            .unwrap();
        assert_eq!(binding.sink_count(), 1);
        assert!(registry.contains(stream.id()).await);

        // Can't bind the same stream twice
        let result = registry.start_stream(stream.clone(), None, None).await;
        assert!(matches!(
            result,
            Err(RegistryError::StreamAlreadyBound(_))
        ));

        let sink = binding.sinks()[0].id();
        assert_ok!(registry.stop_stream(stream.id()).await);
        assert_eq!(registry.binding_count().await, 0);
        assert!(!platform.surface(sink).unwrap().is_mounted());
        assert!(registry.ledger().is_empty());

        assert_err!(registry.stop_stream(stream.id()).await);
    }

    #[tokio::test]
    async fn test_lazy_default_reports_initial_sink() {
        let (platform, registry) = registry();

        let binding = registry
            .start_stream(MediaStreamHandle::remote("s1"), Some("grid".into()), None)
            .await
            .unwrap();

        // Handlers attached after the start still see the initial sink
        let log = EventLog::attach(&binding);
        let sink = binding.sinks()[0].id();
        platform.surface(sink).unwrap().simulate_ready();

        assert_eq!(
            log.kinds(),
            vec![EventKind::SinkCreated, EventKind::StreamPlaying]
        );
    }

    #[tokio::test]
    async fn test_failed_initial_sink_discards_binding() {
        let (_platform, registry) = registry();
        let stream = MediaStreamHandle::remote("s1");

        let result = registry
            .start_stream(stream.clone(), Some("nowhere".into()), None)
            .await;

        assert_eq!(
            result.unwrap_err(),
            RegistryError::Binding(BindingError::InvalidTargetElement("#nowhere".into()))
        );
        assert!(!registry.contains(stream.id()).await);
    }

    #[tokio::test]
    async fn test_replace_stream_updates_sinks() {
        let (platform, registry) = registry();
        let stream = MediaStreamHandle::remote("s1");
        let binding = registry
            .start_stream(stream.clone(), Some("grid".into()), None)
            .await
            .unwrap();

        let next = stream.renegotiated();
        assert_ok!(registry.replace_stream(next.clone()).await);

        let sink = binding.sinks()[0].id();
        assert_eq!(platform.surface(sink).unwrap().source(), Some(next));
        assert_eq!(platform.created_count(), 1);

        let missing = registry.replace_stream(MediaStreamHandle::remote("other")).await;
        assert_eq!(
            missing,
            Err(RegistryError::StreamNotFound("other".into()))
        );
    }

    #[tokio::test]
    async fn test_sink_moves_between_bindings() {
        let (platform, registry) = registry();
        let a = registry
            .start_stream(MediaStreamHandle::remote("a"), Some("grid".into()), None)
            .await
            .unwrap();
        let b = registry
            .start_stream(MediaStreamHandle::remote("b"), None, None)
            .await
            .unwrap();

        let sink = a.sinks()[0].clone();
        assert_eq!(b.add_sink(sink.clone()).code(), -1);
        assert_eq!(registry.ledger().owner_of(sink.id()), Some(b.id()));

        // Stopping A no longer touches the sink
        registry.stop_stream(&"a".into()).await.unwrap();
        let surface = platform.surface(sink.id()).unwrap();
        assert!(surface.is_mounted());
        assert_eq!(surface.source(), Some(MediaStreamHandle::remote("b")));
    }

    #[tokio::test]
    async fn test_notice_task() {
        let (platform, registry) = registry();
        let registry = Arc::new(registry);
        let (tx, rx) = mpsc::channel(8);
        let task = registry.spawn_notice_task(rx);

        let stream = MediaStreamHandle::remote("s1");
        tx.send(TransportNotice::StreamStarted {
            stream: stream.clone(),
            target: Some("grid".into()),
            config: None,
        })
        .await
        .unwrap();
        // Unknown stream: logged and skipped
        tx.send(TransportNotice::StreamStopped {
            stream: "unknown".into(),
        })
        .await
        .unwrap();
        tx.send(TransportNotice::StreamReplaced {
            stream: stream.renegotiated(),
        })
        .await
        .unwrap();
        drop(tx);

        task.await.unwrap();

        let binding = registry.get(stream.id()).await.unwrap();
        assert_eq!(binding.stream().generation(), stream.generation() + 1);
        assert_eq!(platform.created_count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown() {
        let (_platform, registry) = registry();
        registry
            .start_stream(MediaStreamHandle::remote("a"), Some("grid".into()), None)
            .await
            .unwrap();
        registry
            .start_stream(MediaStreamHandle::local("b"), Some("grid".into()), None)
            .await
            .unwrap();

        registry.shutdown().await;

        assert_eq!(registry.binding_count().await, 0);
        assert!(registry.ledger().is_empty());
    }
}
