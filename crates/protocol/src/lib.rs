use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Encoding the host saves with by default.
pub const HOST_DEFAULT_ENCODING: &str = "utf-8";

/// What a status surface shows for one resource.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum RenderState {
    Detecting,
    ResolvedSafe { label: String },
    ResolvedUnsafe { label: String },
    Unknown,
    Failed { reason: String },
}

impl RenderState {
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::ResolvedSafe { label } | Self::ResolvedUnsafe { label } => Some(label),
            _ => None,
        }
    }

    /// Only a resolved, unsafe encoding offers the host's "change encoding" action.
    #[must_use]
    pub fn change_encoding_available(&self) -> bool {
        matches!(self, Self::ResolvedUnsafe { .. })
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Detecting)
    }

    /// Short status-bar text.
    #[must_use]
    pub fn status_text(&self) -> String {
        match self {
            Self::Detecting => "Detecting...".to_string(),
            Self::ResolvedSafe { label } => format!("✓ {label}"),
            Self::ResolvedUnsafe { label } => format!("⚠ {label}"),
            Self::Unknown | Self::Failed { .. } => "Encoding Unknown".to_string(),
        }
    }

    /// Longer explanation shown when the user asks for details.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Detecting => "Checking file encoding".to_string(),
            Self::ResolvedSafe { label } => format!("This file is {label} (safe)."),
            Self::ResolvedUnsafe { label } => format!(
                "This file is detected as {label}. Saving in the default encoding \
                 ({}) may corrupt special characters.",
                HOST_DEFAULT_ENCODING.to_uppercase()
            ),
            Self::Unknown => "Could not detect file encoding".to_string(),
            Self::Failed { reason } => format!("Could not detect file encoding: {reason}"),
        }
    }
}

/// Coarse detection outcome, mirrored in reports for scripting.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeKind {
    Unknown,
    Detecting,
    Resolved,
    TimedOut,
    Failed,
}

/// One line of machine-readable CLI output.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct StatusReport {
    pub schema_version: u32,
    pub path: String,
    pub outcome: OutcomeKind,
    #[serde(flatten)]
    pub render: RenderState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub change_encoding_available: bool,
}

impl StatusReport {
    pub fn new(path: impl Into<String>, outcome: OutcomeKind, render: RenderState) -> Self {
        let change_encoding_available = render.change_encoding_available();
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            path: path.into(),
            outcome,
            render,
            confidence: None,
            language: None,
            change_encoding_available,
        }
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

pub fn report_schema_json() -> Result<String> {
    let schema = schemars::schema_for!(StatusReport);
    serde_json::to_string_pretty(&schema).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn render_state_serializes_with_kebab_tag() {
        let value = serde_json::to_value(RenderState::ResolvedUnsafe {
            label: "windows-1251".to_string(),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({ "state": "resolved-unsafe", "label": "windows-1251" })
        );
        let value = serde_json::to_value(RenderState::Unknown).unwrap();
        assert_eq!(value, json!({ "state": "unknown" }));
    }

    #[test]
    fn change_encoding_only_for_unsafe() {
        let unsafe_state = RenderState::ResolvedUnsafe {
            label: "koi8-r".to_string(),
        };
        let safe_state = RenderState::ResolvedSafe {
            label: "utf-8".to_string(),
        };
        assert!(unsafe_state.change_encoding_available());
        assert!(!safe_state.change_encoding_available());
        assert!(!RenderState::Unknown.change_encoding_available());
        assert!(!RenderState::Detecting.is_terminal());
    }

    #[test]
    fn report_flattens_render_state() {
        let report = StatusReport::new(
            "/tmp/a.txt",
            OutcomeKind::Resolved,
            RenderState::ResolvedSafe {
                label: "utf-8".to_string(),
            },
        )
        .with_confidence(1.0);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            json!({
                "schema_version": 1,
                "path": "/tmp/a.txt",
                "outcome": "resolved",
                "state": "resolved-safe",
                "label": "utf-8",
                "confidence": 1.0,
                "change_encoding_available": false,
            })
        );
        let back: StatusReport = serde_json::from_value(value).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn unsafe_message_mentions_default_encoding() {
        let state = RenderState::ResolvedUnsafe {
            label: "windows-1251".to_string(),
        };
        assert!(state.message().contains("UTF-8"));
        assert_eq!(state.status_text(), "⚠ windows-1251");
    }
}
