use crate::bom;
use crate::config::DetectorConfig;
use crate::language::MODELS;
use crate::layout::{self, Layout};
use crate::single_byte::{self, Candidate};
use crate::types::DetectionResult;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};

const UTF8_LABEL: &str = "utf-8";
const ESCAPE_CONFIDENCE: f32 = 0.99;
const MAX_UTF8_CONFIDENCE: f32 = 0.99;

/// ISO-2022 designator sequences, checked in order.
const ISO_2022_ESCAPES: &[(&[u8], &str)] = &[
    (b"\x1b$)C", "iso-2022-kr"),
    (b"\x1b$B", "iso-2022-jp"),
    (b"\x1b$@", "iso-2022-jp"),
    (b"\x1b$(D", "iso-2022-jp"),
    (b"\x1b(J", "iso-2022-jp"),
];

/// Infer with the default configuration.
pub fn infer(sample: &[u8]) -> DetectionResult {
    Detector::default().infer(sample)
}

/// Deterministic charset inference over a byte sample.
#[derive(Debug, Clone, Default)]
pub struct Detector {
    config: DetectorConfig,
}

impl Detector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn infer(&self, sample: &[u8]) -> DetectionResult {
        let never = AtomicBool::new(false);
        self.infer_cancellable(sample, &never)
            .unwrap_or_else(DetectionResult::indeterminate)
    }

    /// Like [`Detector::infer`], but gives up with `None` once `cancelled`
    /// is set. The flag is checked between stages and between candidates.
    pub fn infer_cancellable(
        &self,
        sample: &[u8],
        cancelled: &AtomicBool,
    ) -> Option<DetectionResult> {
        let sample = &sample[..sample.len().min(self.config.max_sample_bytes)];
        if sample.is_empty() {
            return Some(DetectionResult::indeterminate());
        }

        if let Some(label) = bom::sniff(sample) {
            return Some(DetectionResult::determined(label, 1.0));
        }

        match layout::analyze(sample) {
            Layout::Binary => {
                debug!("sample of {} bytes looks binary", sample.len());
                return Some(DetectionResult::indeterminate());
            }
            Layout::Wide { label, confidence } => {
                return Some(self.accept(DetectionResult::determined(label, confidence)));
            }
            Layout::Text => {}
        }

        if sample.is_ascii() {
            return Some(detect_seven_bit(sample));
        }

        if let Some(result) = detect_utf8(sample) {
            return Some(self.accept(result));
        }

        let mut best: Option<Candidate> = None;
        for model in MODELS {
            for &code_page in model.code_pages {
                if cancelled.load(Ordering::Relaxed) {
                    return None;
                }
                let candidate = single_byte::score(sample, model, code_page);
                debug!(
                    "candidate {} ({}) scored {:.3}",
                    code_page.label(),
                    model.name,
                    candidate.confidence
                );
                if best.map_or(true, |b| candidate.confidence > b.confidence) {
                    best = Some(candidate);
                }
            }
        }

        let result = match best {
            Some(best) if best.confidence > 0.0 => {
                DetectionResult::determined(best.code_page.label(), best.confidence)
                    .with_language(best.language)
            }
            _ => DetectionResult::indeterminate(),
        };
        Some(self.accept(result))
    }

    fn accept(&self, result: DetectionResult) -> DetectionResult {
        if result.is_determined() && result.confidence() >= self.config.min_confidence {
            result
        } else {
            DetectionResult::indeterminate()
        }
    }
}

/// 7-bit input: ISO-2022 when it carries designator escapes, otherwise
/// ASCII, labelled as its UTF-8 superset.
fn detect_seven_bit(sample: &[u8]) -> DetectionResult {
    for (escape, label) in ISO_2022_ESCAPES {
        if sample.windows(escape.len()).any(|w| w == *escape) {
            return DetectionResult::determined(*label, ESCAPE_CONFIDENCE);
        }
    }
    DetectionResult::determined(UTF8_LABEL, 1.0)
}

/// Well-formed UTF-8, tolerating a multi-byte sequence cut off by the end
/// of the sample.
fn detect_utf8(sample: &[u8]) -> Option<DetectionResult> {
    let valid = match std::str::from_utf8(sample) {
        Ok(text) => text,
        Err(err) if err.error_len().is_none() => {
            std::str::from_utf8(&sample[..err.valid_up_to()]).ok()?
        }
        Err(_) => return None,
    };
    let multi_byte = valid.chars().filter(|c| !c.is_ascii()).count();
    let exponent = i32::try_from(multi_byte).unwrap_or(i32::MAX);
    let confidence = (1.0 - 0.99 * 0.5f32.powi(exponent)).min(MAX_UTF8_CONFIDENCE);
    Some(DetectionResult::determined(UTF8_LABEL, confidence))
}
