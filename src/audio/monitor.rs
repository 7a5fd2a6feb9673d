//! Periodic audio level monitor
//!
//! Samples an [`AudioLevelSource`] on a tokio interval and reports every
//! sample plus speaking transitions. Option updates reach the running task
//! through a `watch` channel, so changing the interval or threshold never
//! restarts the monitor.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

use super::options::{AudioOptions, InvalidAudioOptions};

/// Level reported as the previous value before the first sample
pub const SILENCE_DB: f64 = -100.0;

/// Provider of the current audio level (the analyser itself is external)
pub trait AudioLevelSource: Send + Sync {
    /// Current level in dB
    fn level(&self) -> f64;
}

/// Output of the monitor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioSignal {
    /// One sample, reported every tick
    Volume { new_value: f64, old_value: f64 },
    /// Level rose above the threshold
    StartSpeaking,
    /// Level fell to or below the threshold
    StopSpeaking,
}

/// Handle to a running monitor task
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct AudioMonitor {
    options_tx: watch::Sender<AudioOptions>,
    task: JoinHandle<()>,
}

impl AudioMonitor {
    /// Spawn a monitor on `runtime`
    ///
    /// `emit` receives every signal; returning `false` stops the monitor.
    /// Invalid options are rejected before anything is spawned.
    pub fn spawn<F>(
        runtime: &Handle,
        options: AudioOptions,
        source: Arc<dyn AudioLevelSource>,
        emit: F,
    ) -> Result<Self, InvalidAudioOptions>
    where
        F: Fn(AudioSignal) -> bool + Send + 'static,
    {
        options.validate()?;
        let (options_tx, options_rx) = watch::channel(options);
        let task = runtime.spawn(run(options_rx, source, emit));

        tracing::debug!(
            interval_ms = options.interval.as_millis() as u64,
            threshold = options.threshold,
            "Audio monitor started"
        );

        Ok(Self { options_tx, task })
    }

    /// Options currently in effect
    pub fn options(&self) -> AudioOptions {
        *self.options_tx.borrow()
    }

    /// Apply new options to the running task
    ///
    /// Invalid options are rejected and the running options kept.
    pub fn update(&self, options: AudioOptions) -> Result<(), InvalidAudioOptions> {
        options.validate()?;
        self.options_tx.send_replace(options);
        Ok(())
    }

    /// Check if the task is still running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for AudioMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

async fn run<F>(
    mut options_rx: watch::Receiver<AudioOptions>,
    source: Arc<dyn AudioLevelSource>,
    emit: F,
) where
    F: Fn(AudioSignal) -> bool + Send + 'static,
{
    let mut options = *options_rx.borrow_and_update();
    let mut interval = ticker(options.interval);
    let mut previous = SILENCE_DB;
    let mut speaking = false;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let level = source.level();
                let old_value = std::mem::replace(&mut previous, level);

                if !emit(AudioSignal::Volume { new_value: level, old_value }) {
                    break;
                }

                let above = level > options.threshold;
                if above != speaking {
                    speaking = above;
                    let signal = if above {
                        AudioSignal::StartSpeaking
                    } else {
                        AudioSignal::StopSpeaking
                    };
                    if !emit(signal) {
                        break;
                    }
                }
            }
            changed = options_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let next = *options_rx.borrow_and_update();
                if next.interval != options.interval {
                    interval = ticker(next.interval);
                }
                options = next;

                tracing::debug!(
                    interval_ms = options.interval.as_millis() as u64,
                    threshold = options.threshold,
                    "Audio monitor options updated"
                );
            }
        }
    }

    tracing::debug!("Audio monitor stopped");
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::testing::ScriptedLevels;

    async fn next_signals(rx: &mut mpsc::UnboundedReceiver<AudioSignal>, n: usize) -> Vec<AudioSignal> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            if let Some(signal) = rx.recv().await {
                out.push(signal);
            }
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_volume_and_speaking_transitions() {
        let source = Arc::new(ScriptedLevels::new([-80.0, -30.0, -30.0, -70.0]));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let _monitor = AudioMonitor::spawn(
            &Handle::current(),
            AudioOptions::default(),
            source,
            move |signal| tx.send(signal).is_ok(),
        )
        .unwrap();

        let signals = next_signals(&mut rx, 6).await;
        assert_eq!(
            signals,
            vec![
                AudioSignal::Volume { new_value: -80.0, old_value: SILENCE_DB },
                AudioSignal::Volume { new_value: -30.0, old_value: -80.0 },
                AudioSignal::StartSpeaking,
                AudioSignal::Volume { new_value: -30.0, old_value: -30.0 },
                AudioSignal::Volume { new_value: -70.0, old_value: -30.0 },
                AudioSignal::StopSpeaking,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_update_applies_to_running_monitor() {
        let source = Arc::new(ScriptedLevels::new([-30.0]));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let monitor = AudioMonitor::spawn(
            &Handle::current(),
            AudioOptions::default(),
            source,
            move |signal| tx.send(signal).is_ok(),
        )
        .unwrap();

        let first = next_signals(&mut rx, 2).await;
        assert_eq!(first[1], AudioSignal::StartSpeaking);

        // -30 dB is no longer above the threshold
        monitor
            .update(AudioOptions::default().threshold(-20.0))
            .unwrap();
        assert_eq!(monitor.options().threshold, -20.0);

        loop {
            match rx.recv().await {
                Some(AudioSignal::StopSpeaking) => break,
                Some(AudioSignal::Volume { .. }) => continue,
                other => panic!("unexpected signal: {:?}", other),
            }
        }
        assert!(monitor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_emit_declines() {
        let source = Arc::new(ScriptedLevels::new([-60.0]));

        let monitor = AudioMonitor::spawn(
            &Handle::current(),
            AudioOptions::default(),
            source,
            |_| false,
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(!monitor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_zero_interval() {
        let source = Arc::new(ScriptedLevels::new([-60.0]));
        let zero = AudioOptions::default().interval(Duration::ZERO);

        let result = AudioMonitor::spawn(&Handle::current(), zero, source.clone(), |_| true);
        assert!(matches!(result, Err(InvalidAudioOptions::ZeroInterval)));

        let monitor =
            AudioMonitor::spawn(&Handle::current(), AudioOptions::default(), source, |_| true)
                .unwrap();
        assert_eq!(monitor.update(zero), Err(InvalidAudioOptions::ZeroInterval));
        assert_eq!(monitor.options(), AudioOptions::default());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(monitor.is_running());
    }
}
