use serde::{Deserialize, Serialize};

/// Default number of leading bytes the engine looks at
pub const DEFAULT_MAX_SAMPLE_BYTES: usize = 10 * 1024;

/// Default minimum confidence for a language-model candidate
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.20;

/// Configuration for charset inference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Candidates scoring below this are discarded (0.0..=1.0)
    pub min_confidence: f32,

    /// Bytes beyond this prefix are ignored
    pub max_sample_bytes: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_sample_bytes: DEFAULT_MAX_SAMPLE_BYTES,
        }
    }
}

impl DetectorConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(format!(
                "min_confidence ({}) must be within 0.0..=1.0",
                self.min_confidence
            ));
        }

        if self.max_sample_bytes == 0 {
            return Err("max_sample_bytes must be > 0".to_string());
        }

        Ok(())
    }
}
