use encoding_protocol::{serialize_json, RenderState, StatusReport};
use anyhow::Result;

/// One output line for a finished detection.
pub fn render_line(report: &StatusReport, json: bool) -> Result<String> {
    if json {
        return serialize_json(report);
    }
    Ok(format!("{}: {}", report.path, describe(report)))
}

fn describe(report: &StatusReport) -> String {
    match &report.render {
        RenderState::Detecting => "detecting".to_string(),
        RenderState::ResolvedSafe { label } => format!("{label} (safe{})", confidence(report)),
        RenderState::ResolvedUnsafe { label } => {
            format!("{label} (problematic{})", confidence(report))
        }
        RenderState::Unknown => "unknown".to_string(),
        RenderState::Failed { reason } => format!("failed: {reason}"),
    }
}

fn confidence(report: &StatusReport) -> String {
    report
        .confidence
        .map(|c| format!(", confidence {c:.2}"))
        .unwrap_or_default()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub safe: usize,
    pub problematic: usize,
    pub unknown: usize,
    pub failed: usize,
}

impl ScanSummary {
    pub fn record(&mut self, render: &RenderState) {
        match render {
            RenderState::ResolvedSafe { .. } => self.safe += 1,
            RenderState::ResolvedUnsafe { .. } => self.problematic += 1,
            RenderState::Unknown | RenderState::Detecting => self.unknown += 1,
            RenderState::Failed { .. } => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.safe + self.problematic + self.unknown + self.failed
    }
}
