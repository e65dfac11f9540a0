//! Byte layout checks that run before any text decoding.

const MIN_WIDE_SAMPLE: usize = 8;
const ZERO_LANE: f32 = 0.9;
const ZERO_LANE_UTF16: f32 = 0.7;
const NONZERO_LANE: f32 = 0.1;
const MAX_BINARY_ZERO_RATIO: f32 = 0.01;
const MAX_CONTROL_RATIO: f32 = 0.10;
const WIDE_CONFIDENCE_SCALE: f32 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Layout {
    /// Byte-oriented text worth decoding further
    Text,
    /// NUL or control density rules out text
    Binary,
    /// UTF-16/UTF-32 without a byte order mark
    Wide { label: &'static str, confidence: f32 },
}

pub(crate) fn analyze(sample: &[u8]) -> Layout {
    let zeros = sample.iter().filter(|&&b| b == 0).count();
    if zeros > 0 && sample.len() >= MIN_WIDE_SAMPLE {
        if let Some(wide) = wide_layout(sample) {
            return wide;
        }
    }

    let len = sample.len().max(1) as f32;
    if zeros as f32 / len > MAX_BINARY_ZERO_RATIO {
        return Layout::Binary;
    }
    let controls = sample.iter().filter(|&&b| is_binary_control(b)).count();
    if controls as f32 / len > MAX_CONTROL_RATIO {
        return Layout::Binary;
    }
    Layout::Text
}

fn wide_layout(sample: &[u8]) -> Option<Layout> {
    let lanes4 = [0, 1, 2, 3].map(|lane| zero_ratio(sample, 4, lane));
    if lanes4[2] >= ZERO_LANE && lanes4[3] >= ZERO_LANE && lanes4[0] <= NONZERO_LANE {
        return Some(Layout::Wide {
            label: "utf-32le",
            confidence: WIDE_CONFIDENCE_SCALE * lanes4[2].min(lanes4[3]),
        });
    }
    if lanes4[0] >= ZERO_LANE && lanes4[1] >= ZERO_LANE && lanes4[3] <= NONZERO_LANE {
        return Some(Layout::Wide {
            label: "utf-32be",
            confidence: WIDE_CONFIDENCE_SCALE * lanes4[0].min(lanes4[1]),
        });
    }

    let even = zero_ratio(sample, 2, 0);
    let odd = zero_ratio(sample, 2, 1);
    if odd >= ZERO_LANE_UTF16 && even <= NONZERO_LANE {
        return Some(Layout::Wide {
            label: "utf-16le",
            confidence: WIDE_CONFIDENCE_SCALE * odd,
        });
    }
    if even >= ZERO_LANE_UTF16 && odd <= NONZERO_LANE {
        return Some(Layout::Wide {
            label: "utf-16be",
            confidence: WIDE_CONFIDENCE_SCALE * even,
        });
    }
    None
}

fn zero_ratio(sample: &[u8], lanes: usize, lane: usize) -> f32 {
    let (zeros, total) = sample
        .iter()
        .skip(lane)
        .step_by(lanes)
        .fold((0usize, 0usize), |(zeros, total), &b| {
            (zeros + usize::from(b == 0), total + 1)
        });
    if total == 0 {
        return 0.0;
    }
    zeros as f32 / total as f32
}

/// C0 controls that do not appear in text. TAB, LF, VT, FF, CR and ESC are allowed.
fn is_binary_control(byte: u8) -> bool {
    matches!(byte, 0x01..=0x08 | 0x0E..=0x1A | 0x1C..=0x1F | 0x7F)
}
