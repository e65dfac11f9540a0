//! # Encoding Charset
//!
//! Infers the character encoding of a leading byte sample.
//!
//! ## Pipeline
//!
//! ```text
//! Byte sample
//!     │
//!     ├──> BOM sniffing (utf-8-sig, utf-16, utf-32)       → confidence 1.0
//!     │
//!     ├──> Byte layout (NUL lanes, control density)
//!     │      ├─> utf-16 / utf-32 without BOM
//!     │      └─> binary → indeterminate
//!     │
//!     ├──> 7-bit input → iso-2022-* escapes or utf-8
//!     │
//!     ├──> UTF-8 well-formedness
//!     │
//!     └──> Single-byte language models
//!            └─> best (code page, language) above min_confidence
//! ```
//!
//! The engine never fails: a sample it cannot classify yields an
//! indeterminate [`DetectionResult`].
//!
//! ## Example
//!
//! ```rust
//! use encoding_charset::{Detector, DetectorConfig};
//!
//! let detector = Detector::new(DetectorConfig::default());
//! let result = detector.infer(b"plain ascii text");
//!
//! assert!(result.is_determined());
//! assert_eq!(result.label(), Some("utf-8"));
//! ```

mod bom;
mod codepage;
mod config;
mod detector;
mod language;
mod layout;
mod single_byte;
mod types;
mod unicode;

pub use config::DetectorConfig;
pub use detector::{infer, Detector};
pub use types::DetectionResult;
