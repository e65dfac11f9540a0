use crate::backend::{DetectionBackend, ExternalBackend, InProcessBackend};
use crate::classify::SafeEncodingSet;
use crate::manager::SessionConfig;
use crate::{Result, SessionError};
use encoding_charset::DetectorConfig;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_SAMPLE_BYTES: usize = 10 * 1024;
pub const DEFAULT_CAPACITY: usize = 256;

const MAX_TIMEOUT_MS: u64 = 600_000;
const MAX_SAMPLE_BYTES: usize = 16 * 1024 * 1024;

pub const ENV_TIMEOUT_MS: &str = "ENCODING_DETECTOR_TIMEOUT_MS";
pub const ENV_SAMPLE_BYTES: &str = "ENCODING_DETECTOR_SAMPLE_BYTES";
pub const ENV_SAFE_ENCODINGS: &str = "ENCODING_DETECTOR_SAFE_ENCODINGS";

const CONFIG_DIR_NAME: &str = "encoding-detector";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Which backend runs inference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BackendSettings {
    #[default]
    InProcess,
    /// `python3` with the `chardet` package
    PythonChardet,
    /// Any program that prints the label for the path appended to `command`
    Command { command: Vec<String> },
}

/// User-facing settings, loaded from TOML and the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub safe_encodings: SafeEncodingSet,
    pub timeout_ms: u64,
    pub sample_bytes: usize,
    pub min_confidence: f32,
    pub capacity: usize,
    pub backend: BackendSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            safe_encodings: SafeEncodingSet::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            sample_bytes: DEFAULT_SAMPLE_BYTES,
            min_confidence: DetectorConfig::default().min_confidence,
            capacity: DEFAULT_CAPACITY,
            backend: BackendSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let settings: Self = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// `$XDG_CONFIG_HOME/encoding-detector/config.toml` or the platform equivalent.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Explicit path (must exist), else the default path when present, else
    /// defaults. Environment overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut settings = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => {
                    debug!("Loading settings from {}", path.display());
                    Self::from_file(&path)?
                }
                None => Self::default(),
            },
        };
        settings.apply_env();
        settings.validate()?;
        Ok(settings)
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.timeout_ms = parse_clamped(
            lookup(ENV_TIMEOUT_MS).as_deref(),
            self.timeout_ms,
            1,
            MAX_TIMEOUT_MS,
        );
        self.sample_bytes = parse_clamped(
            lookup(ENV_SAMPLE_BYTES).as_deref(),
            self.sample_bytes,
            1,
            MAX_SAMPLE_BYTES,
        );
        if let Some(raw) = lookup(ENV_SAFE_ENCODINGS).filter(|v| !v.trim().is_empty()) {
            self.safe_encodings = SafeEncodingSet::parse_csv(&raw);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(SessionError::invalid_config("timeout_ms must be > 0"));
        }
        if self.capacity == 0 {
            return Err(SessionError::invalid_config("capacity must be > 0"));
        }
        if let BackendSettings::Command { command } = &self.backend {
            if command.first().map_or(true, |p| p.trim().is_empty()) {
                return Err(SessionError::invalid_config(
                    "backend.command must name a program",
                ));
            }
        }
        self.detector_config()
            .validate()
            .map_err(SessionError::InvalidConfig)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            min_confidence: self.min_confidence,
            max_sample_bytes: self.sample_bytes,
        }
    }

    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            deadline: self.timeout(),
            capacity: self.capacity,
            ..SessionConfig::default()
        }
    }

    pub fn build_backend(&self) -> Result<Arc<dyn DetectionBackend>> {
        Ok(match &self.backend {
            BackendSettings::InProcess => {
                Arc::new(InProcessBackend::new(self.detector_config())?)
            }
            BackendSettings::PythonChardet => {
                Arc::new(ExternalBackend::python_chardet(self.sample_bytes))
            }
            BackendSettings::Command { command } => {
                let (program, args) = command
                    .split_first()
                    .ok_or_else(|| SessionError::invalid_config("empty backend command"))?;
                Arc::new(ExternalBackend::new(program.clone(), args.to_vec()))
            }
        })
    }
}

fn parse_clamped<T>(raw: Option<&str>, default_value: T, min: T, max: T) -> T
where
    T: std::str::FromStr + Ord + Copy,
{
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default_value)
        .clamp(min, max)
}
