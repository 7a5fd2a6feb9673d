//! Audio event configuration

use std::time::Duration;

use thiserror::Error;

/// Default polling interval of the audio monitor
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Default speaking threshold in dB
pub const DEFAULT_THRESHOLD_DB: f64 = -50.0;

/// Rejected audio option values
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InvalidAudioOptions {
    #[error("interval must be a positive number of milliseconds")]
    ZeroInterval,

    #[error("threshold must be a finite dB value, got {0}")]
    NonFiniteThreshold(f64),
}

/// Audio analysis settings for one binding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioOptions {
    /// How often the monitor samples the audio level
    pub interval: Duration,
    /// Level (dB) above which the publisher counts as speaking
    pub threshold: f64,
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            threshold: DEFAULT_THRESHOLD_DB,
        }
    }
}

impl AudioOptions {
    /// Set the polling interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the speaking threshold
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Check the values are usable by a monitor
    pub fn validate(&self) -> Result<(), InvalidAudioOptions> {
        if self.interval.as_millis() == 0 {
            return Err(InvalidAudioOptions::ZeroInterval);
        }
        if !self.threshold.is_finite() {
            return Err(InvalidAudioOptions::NonFiniteThreshold(self.threshold));
        }
        Ok(())
    }

    /// Merge the fields present in `update` over these options
    ///
    /// Nothing is changed when the merged result is invalid.
    pub fn merged(&self, update: AudioOptionsUpdate) -> Result<Self, InvalidAudioOptions> {
        let merged = Self {
            interval: update.interval.unwrap_or(self.interval),
            threshold: update.threshold.unwrap_or(self.threshold),
        };
        merged.validate()?;
        Ok(merged)
    }
}

/// Partial update of [`AudioOptions`]; absent fields keep their current value
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioOptionsUpdate {
    pub interval: Option<Duration>,
    pub threshold: Option<f64>,
}

impl AudioOptionsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn interval_ms(self, millis: u64) -> Self {
        self.interval(Duration::from_millis(millis))
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = AudioOptions::default();

        assert_eq!(options.interval, Duration::from_millis(100));
        assert_eq!(options.threshold, -50.0);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let base = AudioOptions::default().threshold(-45.0);
        let merged = base
            .merged(AudioOptionsUpdate::new().interval_ms(250))
            .unwrap();

        assert_eq!(merged.interval, Duration::from_millis(250));
        assert_eq!(merged.threshold, -45.0);
    }

    #[test]
    fn test_merge_rejects_zero_interval() {
        let base = AudioOptions::default();
        let result = base.merged(AudioOptionsUpdate::new().interval_ms(0));

        assert_eq!(result, Err(InvalidAudioOptions::ZeroInterval));
    }

    #[test]
    fn test_merge_rejects_nan_threshold() {
        let result = AudioOptions::default().merged(AudioOptionsUpdate::new().threshold(f64::NAN));

        assert!(matches!(
            result,
            Err(InvalidAudioOptions::NonFiniteThreshold(_))
        ));
    }
}
