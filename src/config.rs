//! Runtime configuration
//!
//! Loaded from a TOML file (usually `crossbind.toml`), every section optional:
//!
//! ```toml
//! [threads]
//! attach_policy = "thread-lifetime"   # or "scoped"
//!
//! [text]
//! policy = "strict"                    # or "lossy"
//!
//! [clock]
//! preset = "clr"                       # or "java", or explicit fields below
//! # epoch_offset_secs = 62135596800
//! # tick_nanos = 100
//!
//! [cache]
//! initial_capacity = 64
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use crate::error::ConfigError;
use crate::temporal::TickClock;
use crate::thread::AttachPolicy;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub threads: ThreadConfig,

    #[serde(default)]
    pub text: TextConfig,

    #[serde(default)]
    pub clock: ClockConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadConfig {
    #[serde(default)]
    pub attach_policy: AttachPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextConfig {
    #[serde(default)]
    pub policy: TextPolicy,
}

/// How text that cannot be decoded exactly is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextPolicy {
    /// Invalid text is a marshaling error
    #[default]
    Strict,
    /// Invalid sequences become U+FFFD; undeclared bytes widen as Latin-1
    Lossy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockPreset {
    Clr,
    Java,
}

/// Host tick clock; explicit fields override the preset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default)]
    pub preset: Option<ClockPreset>,

    #[serde(default)]
    pub epoch_offset_secs: Option<i64>,

    #[serde(default)]
    pub tick_nanos: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_capacity")]
    pub initial_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,

    #[serde(default)]
    pub spans: bool,

    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_capacity: default_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            spans: false,
            file: None,
        }
    }
}

/// Configuration installed by the last successful `init`
static RUNTIME_CONFIG: Lazy<RwLock<Option<BridgeConfig>>> = Lazy::new(|| RwLock::new(None));

/// Install `config` as the process-wide configuration
pub(crate) fn install(config: BridgeConfig) {
    *RUNTIME_CONFIG.write() = Some(config);
}

/// Process-wide configuration: whatever `init` installed, else the defaults
pub fn runtime_config() -> BridgeConfig {
    RUNTIME_CONFIG.read().clone().unwrap_or_default()
}

fn default_capacity() -> usize { 64 }
fn default_level() -> String { "info".to_string() }

impl ClockConfig {
    /// Resolve to a validated tick clock
    pub fn tick_clock(&self) -> Result<TickClock, ConfigError> {
        let base = match self.preset {
            Some(ClockPreset::Java) => TickClock::JAVA,
            Some(ClockPreset::Clr) | None => TickClock::CLR,
        };
        TickClock::new(
            self.epoch_offset_secs.unwrap_or(base.epoch_offset_secs()),
            self.tick_nanos.unwrap_or(base.tick_nanos()),
        )
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CROSSBIND_ATTACH_POLICY` and `CROSSBIND_TEXT_POLICY` overrides
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = std::env::var("CROSSBIND_ATTACH_POLICY") {
            self.threads.attach_policy = match value.to_lowercase().as_str() {
                "scoped" => AttachPolicy::Scoped,
                "thread-lifetime" | "thread_lifetime" => AttachPolicy::ThreadLifetime,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "CROSSBIND_ATTACH_POLICY: unknown policy '{other}'"
                    )))
                }
            };
        }

        if let Ok(value) = std::env::var("CROSSBIND_TEXT_POLICY") {
            self.text.policy = match value.to_lowercase().as_str() {
                "strict" => TextPolicy::Strict,
                "lossy" => TextPolicy::Lossy,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "CROSSBIND_TEXT_POLICY: unknown policy '{other}'"
                    )))
                }
            };
        }

        Ok(())
    }

    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clock.tick_clock()?;
        if crate::logging::parse_level(&self.logging.level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "logging: unknown level '{}'",
                self.logging.level
            )));
        }
        Ok(())
    }

    /// Render as TOML, e.g. to seed a config file
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.threads.attach_policy, AttachPolicy::ThreadLifetime);
        assert_eq!(config.text.policy, TextPolicy::Strict);
        assert_eq!(config.clock.tick_clock().unwrap(), TickClock::CLR);
        assert_eq!(config.cache.initial_capacity, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[threads]
attach_policy = "scoped"

[text]
policy = "lossy"

[clock]
preset = "java"

[logging]
level = "debug"
json = true
"#;

        let config = BridgeConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.threads.attach_policy, AttachPolicy::Scoped);
        assert_eq!(config.text.policy, TextPolicy::Lossy);
        assert_eq!(config.clock.tick_clock().unwrap(), TickClock::JAVA);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.cache.initial_capacity, 64);
    }

    #[test]
    fn test_explicit_clock_overrides_preset() {
        let toml = r#"
[clock]
preset = "java"
tick_nanos = 1000
"#;
        let clock = BridgeConfig::from_toml_str(toml).unwrap().clock.tick_clock().unwrap();
        assert_eq!(clock.epoch_offset_secs(), 0);
        assert_eq!(clock.tick_nanos(), 1000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_clock = "[clock]\ntick_nanos = 7\n";
        assert!(matches!(
            BridgeConfig::from_toml_str(bad_clock),
            Err(ConfigError::Invalid(_))
        ));

        let bad_level = "[logging]\nlevel = \"loud\"\n";
        assert!(matches!(
            BridgeConfig::from_toml_str(bad_level),
            Err(ConfigError::Invalid(_))
        ));

        let bad_policy = "[text]\npolicy = \"sometimes\"\n";
        assert!(matches!(
            BridgeConfig::from_toml_str(bad_policy),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\ninitial_capacity = 8").unwrap();

        let config = BridgeConfig::load(file.path()).unwrap();
        assert_eq!(config.cache.initial_capacity, 8);

        let missing = BridgeConfig::load(Path::new("/nonexistent/crossbind.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = BridgeConfig::default();
        config.clock.preset = Some(ClockPreset::Java);
        config.threads.attach_policy = AttachPolicy::Scoped;

        let rendered = config.to_toml_string().unwrap();
        assert_eq!(BridgeConfig::from_toml_str(&rendered).unwrap(), config);
    }
}
