//! # Encoding Session
//!
//! Bounded-time encoding detection for tracked resources.
//!
//! ## Pipeline
//!
//! ```text
//! activate(path) ──▶ Session (begin / generation)
//!                        │
//!                        ▼
//!               BoundedExecutor (deadline, cancel)
//!                        │
//!          ┌─────────────┴─────────────┐
//!          ▼                           ▼
//!   InProcessBackend             ExternalBackend
//!   SampleReader + infer         child process, kill on drop
//!          └─────────────┬─────────────┘
//!                        ▼
//!        Session::complete (stale generations dropped)
//!                        │
//!                        ▼
//!          StatusEvent ──▶ subscribers / StatusSink
//! ```
//!
//! All store mutations happen on one actor task. Triggers are plain channel
//! sends and never block the caller.
//!
//! ## Example
//!
//! ```no_run
//! use encoding_session::{InProcessBackend, SessionManager};
//! use encoding_charset::DetectorConfig;
//! use std::sync::Arc;
//!
//! # async fn run() -> encoding_session::Result<()> {
//! let backend = Arc::new(InProcessBackend::new(DetectorConfig::default())?);
//! let manager = SessionManager::builder(backend).start()?;
//! let outcome = manager.detect("notes.txt").await;
//! println!("{:?}", outcome.render(&manager.safe_encodings()));
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod classify;
pub mod error;
pub mod executor;
pub mod manager;
pub mod reader;
pub mod resource;
pub mod session;
pub mod settings;

pub use backend::{DetectionBackend, ExternalBackend, InProcessBackend};
pub use classify::{
    classify, SafeEncodingSet, SafeEncodingSource, SettingsFileSafeEncodings,
    SharedSafeEncodings, Verdict,
};
pub use error::{DetectionError, FailureKind, FailureReason, Result, SessionError};
pub use executor::{BoundedExecutor, ExecutionOutcome};
pub use manager::{
    LogSink, SessionConfig, SessionManager, SessionManagerBuilder, StatusEvent, StatusSink,
};
pub use reader::{ByteSample, SampleReader};
pub use resource::{ResourceId, Revision};
pub use session::{Activation, DetectionOutcome, Session, SessionSnapshot, Superseded};
pub use settings::{BackendSettings, Settings};
