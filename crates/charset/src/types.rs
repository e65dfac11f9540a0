use serde::{Deserialize, Serialize};

/// Outcome of one inference over a byte sample.
///
/// An indeterminate result never carries a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Lowercased canonical encoding name, empty when indeterminate
    #[serde(default, skip_serializing_if = "String::is_empty")]
    label: String,

    /// Confidence in `[0, 1]`
    confidence: f32,

    /// Whether a label was inferred at all
    determined: bool,

    /// Language model that decided a single-byte result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,
}

impl DetectionResult {
    /// Create a determined result. The label is lowercased and the
    /// confidence clamped to `[0, 1]`.
    pub fn determined(label: impl Into<String>, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            label: label.into().trim().to_lowercase(),
            confidence,
            determined: true,
            language: None,
        }
    }

    /// Create a result for a sample that could not be classified
    pub fn indeterminate() -> Self {
        Self {
            label: String::new(),
            confidence: 0.0,
            determined: false,
            language: None,
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        if self.determined {
            self.language = Some(language.into());
        }
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.determined.then_some(self.label.as_str())
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn is_determined(&self) -> bool {
        self.determined
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}
