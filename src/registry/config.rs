//! Registry configuration

use crate::audio::AudioOptions;
use crate::binding::BindingConfig;

/// Process-wide defaults applied to every binding the registry creates
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    /// Audio options each new binding starts with
    pub default_audio: AudioOptions,

    /// Binding config used when a start notice carries none
    pub binding: BindingConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_audio: AudioOptions::default(),
            // Handlers are usually attached after the stream starts; deferring
            // sinkCreated lets them still observe the initial sink.
            binding: BindingConfig::default().lazy_sink_events(true),
        }
    }
}

impl RegistryConfig {
    /// Set the default audio options
    pub fn default_audio(mut self, options: AudioOptions) -> Self {
        self.default_audio = options;
        self
    }

    /// Set the default binding config
    pub fn binding(mut self, config: BindingConfig) -> Self {
        self.binding = config;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();

        assert!(config.binding.lazy_sink_events);
        assert_eq!(config.default_audio, AudioOptions::default());
    }

    #[test]
    fn test_builder() {
        let audio = AudioOptions::default().interval(Duration::from_millis(250));
        let config = RegistryConfig::default()
            .default_audio(audio)
            .binding(BindingConfig::with_target("grid"));

        assert_eq!(config.default_audio.interval, Duration::from_millis(250));
        assert!(!config.binding.lazy_sink_events);
    }
}
