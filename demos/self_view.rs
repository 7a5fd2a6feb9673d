//! Self-view demo - Binds a local camera and a remote peer to an in-memory platform
//!
//! Run with: cargo run --example self_view --features test-support
//!
//! This demo shows:
//! - Driving a `BindingRegistry` with `TransportNotice`s over an mpsc channel
//! - Subscribing to binding events
//! - Mirrored self-view for the local stream
//! - Moving a surface from one stream to another with `add_sink`
//! - Audio level events from a scripted level source
//!
//! Set `RUST_LOG=streamview_rs=debug` to see every dispatch.

use std::sync::Arc;
use std::time::Duration;

use streamview_rs::testing::{FakePlatform, ScriptedLevels};
use streamview_rs::{
    BindingConfig, BindingRegistry, EventKind, EventPayload, MediaStreamHandle, StreamId,
    SurfacePlatform, TransportNotice,
};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("streamview_rs=info".parse()?)
                .add_directive("self_view=info".parse()?),
        )
        .init();

    let platform = Arc::new(FakePlatform::new());
    platform.add_container("self-view");
    platform.add_container("grid");

    let registry = Arc::new(BindingRegistry::new(
        Arc::clone(&platform) as Arc<dyn SurfacePlatform>
    ));
    let (tx, rx) = mpsc::channel(16);
    let notices = registry.spawn_notice_task(rx);

    let camera = MediaStreamHandle::local("camera");
    let peer = MediaStreamHandle::remote("peer-1");

    tx.send(TransportNotice::StreamStarted {
        stream: camera.clone(),
        target: Some("self-view".into()),
        config: Some(
            BindingConfig::default()
                .lazy_sink_events(true)
                .mirror_local(true),
        ),
    })
    .await?;
    tx.send(TransportNotice::StreamStarted {
        stream: peer.clone(),
        target: Some("grid".into()),
        config: None,
    })
    .await?;

    // Let the notice task catch up
    tokio::time::sleep(Duration::from_millis(10)).await;

    let publisher = registry
        .get(camera.id())
        .await
        .ok_or("camera binding missing")?;
    let subscriber = registry
        .get(peer.id())
        .await
        .ok_or("peer binding missing")?;

    for binding in [&publisher, &subscriber] {
        let id = binding.id();
        binding.on(EventKind::StreamPlaying, move |_| {
            tracing::info!(binding = %id, "Playing");
        });
        binding.on(EventKind::SinkCreated, move |event| {
            tracing::info!(binding = %id, sink = ?event.sink_id(), "Sink created");
        });
    }
    publisher.on(EventKind::PublisherStartSpeaking, |_| {
        tracing::info!("Local participant started speaking");
    });
    publisher.on(EventKind::AudioVolumeChange, |event| {
        if let EventPayload::AudioVolumeChange { new_value, .. } = event.payload {
            tracing::debug!(level = new_value, "Volume");
        }
    });

    // First frames arrive
    for binding in [&publisher, &subscriber] {
        for sink in binding.sinks() {
            if let Some(surface) = platform.surface(sink.id()) {
                surface.simulate_ready();
            }
        }
    }

    publisher.enable_audio_events(Arc::new(ScriptedLevels::new([-80.0, -60.0, -30.0, -25.0])))?;
    tokio::time::sleep(Duration::from_millis(450)).await;
    publisher.disable_audio_events();

    // Pin the peer into the self-view slot
    let self_view = publisher.first_sink().ok_or("no self-view sink")?;
    let outcome = subscriber.add_sink(self_view);
    tracing::info!(code = outcome.code(), "Self-view surface now shows the peer");

    tx.send(TransportNotice::StreamStopped {
        stream: StreamId::from("peer-1"),
    })
    .await?;
    drop(tx);
    notices.await?;

    registry.shutdown().await;
    Ok(())
}
