use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

use crate::error::ConfigError;
use crate::pipeline::domain::capture_state::CaptureTiming;
use crate::pipeline::domain::gesture::{ClassifierConfig, GesturePolicy, DEFAULT_DISTANCE_THRESHOLD};
use crate::sensing::HandSelection;
use crate::sink::{SinkConfig, SinkKind};

/// Environment variables with this prefix override file values,
/// e.g. `GESTURE_CAPTURE__POLL__INTERVAL_MS=300`.
pub const ENV_PREFIX: &str = "GESTURE_CAPTURE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Tip-to-joint distance above which a finger counts as extended.
    pub distance_threshold: f32,
    pub policy: GesturePolicy,
    pub free_threshold: Option<usize>,
    pub hold_threshold: Option<usize>,
    pub hand_selection: HandSelection,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            policy: GesturePolicy::default(),
            free_threshold: None,
            hold_threshold: None,
            hand_selection: HandSelection::default(),
        }
    }
}

impl GestureConfig {
    pub fn classifier(&self) -> ClassifierConfig {
        ClassifierConfig {
            distance_threshold: self.distance_threshold,
            policy: self.policy,
            free_threshold: self.free_threshold,
            hold_threshold: self.hold_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    /// Upper bound on one landmark estimation; 0 disables the timeout.
    pub sensing_timeout_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            sensing_timeout_ms: 2000,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn sensing_timeout(&self) -> Option<Duration> {
        (self.sensing_timeout_ms > 0).then(|| Duration::from_millis(self.sensing_timeout_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Recorded landmark script played back by the replay source.
    pub landmarks: Option<PathBuf>,
    /// Still image used as every frame; a blank canvas when unset.
    pub frame: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            landmarks: None,
            frame: None,
            width: 640,
            height: 480,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub log_level: String,
    pub gesture: GestureConfig,
    pub capture: CaptureTiming,
    pub poll: PollConfig,
    pub sink: SinkConfig,
    pub source: SourceConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            gesture: GestureConfig::default(),
            capture: CaptureTiming::default(),
            poll: PollConfig::default(),
            sink: SinkConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

impl Configuration {
    /// Hold-to-capture: upload a screenshot after an open hand is held, then closed.
    pub fn hold_to_capture() -> Self {
        Self::default()
    }

    /// Release-to-view: three open fingers arm, a quick close reads back the latest record.
    pub fn release_to_view() -> Self {
        Self {
            gesture: GestureConfig {
                policy: GesturePolicy::Release,
                ..GestureConfig::default()
            },
            capture: CaptureTiming {
                dwell: Duration::from_millis(1000),
                cooldown: Duration::from_millis(5000),
            },
            poll: PollConfig {
                interval_ms: 300,
                ..PollConfig::default()
            },
            sink: SinkConfig {
                kind: SinkKind::Latest,
                ..SinkConfig::default()
            },
            ..Self::default()
        }
    }

    /// Defaults, then `path` if given, then `GESTURE_CAPTURE__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );
        let configuration: Configuration = builder.build()?.try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn log_level(&self) -> Result<Level, ConfigError> {
        self.log_level
            .parse::<Level>()
            .map_err(|e| ConfigError::Invalid {
                field: "log_level",
                reason: e.to_string(),
            })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.log_level()?;

        let threshold = self.gesture.distance_threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "gesture.distance_threshold",
                reason: format!("must be a positive number, got {}", threshold),
            });
        }
        let counts = [
            ("gesture.free_threshold", self.gesture.free_threshold),
            ("gesture.hold_threshold", self.gesture.hold_threshold),
        ];
        for (field, count) in counts {
            if let Some(count) = count {
                if !(1..=5).contains(&count) {
                    return Err(ConfigError::Invalid {
                        field,
                        reason: format!("must be between 1 and 5 fingers, got {}", count),
                    });
                }
            }
        }

        if self.poll.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "poll.interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.sink.kind != SinkKind::Memory {
            if self.sink.base_url.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field: "sink.base_url",
                    reason: "required for HTTP sinks".to_string(),
                });
            }
            if self.sink.request_timeout_ms == 0 {
                return Err(ConfigError::Invalid {
                    field: "sink.request_timeout_ms",
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.source.frame.is_none() && (self.source.width == 0 || self.source.height == 0) {
            return Err(ConfigError::Invalid {
                field: "source",
                reason: "blank canvas needs a non-zero width and height".to_string(),
            });
        }
        Ok(())
    }
}
