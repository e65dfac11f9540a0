//! Detection backends: in-process inference or an external helper process.

use crate::error::DetectionError;
use crate::reader::SampleReader;
use crate::resource::ResourceId;
use crate::{Result, SessionError};
use async_trait::async_trait;
use encoding_charset::{DetectionResult, Detector, DetectorConfig};
use log::debug;
use std::process::{Output, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Token an external helper prints when it cannot classify the file.
pub const UNKNOWN_TOKEN: &str = "unknown";

const CHARDET_SCRIPT: &str = r#"
import sys
import chardet
try:
    with open(sys.argv[1], 'rb') as f:
        raw_data = f.read(int(sys.argv[2]))
        result = chardet.detect(raw_data)
        if result and result['encoding']:
            print(result['encoding'], result.get('confidence') or '')
        else:
            print('unknown')
except Exception as e:
    print(f'error: {e}', file=sys.stderr)
"#;

/// Produces a label for one resource. Implementations must stop work
/// promptly once `cancel` fires or the returned future is dropped.
#[async_trait]
pub trait DetectionBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn detect(
        &self,
        resource: &ResourceId,
        cancel: CancellationToken,
    ) -> std::result::Result<DetectionResult, DetectionError>;
}

/// Reads a sample and runs the inference engine on the blocking pool.
#[derive(Debug, Clone)]
pub struct InProcessBackend {
    reader: SampleReader,
    detector: Arc<Detector>,
}

impl InProcessBackend {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate().map_err(SessionError::InvalidConfig)?;
        Ok(Self {
            reader: SampleReader::new(config.max_sample_bytes),
            detector: Arc::new(Detector::new(config)),
        })
    }
}

/// Sets the shared flag when dropped so an abandoned blocking job stops.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl DetectionBackend for InProcessBackend {
    fn name(&self) -> &str {
        "in-process"
    }

    async fn detect(
        &self,
        resource: &ResourceId,
        cancel: CancellationToken,
    ) -> std::result::Result<DetectionResult, DetectionError> {
        let sample = tokio::select! {
            sample = self.reader.read(resource) => sample?,
            () = cancel.cancelled() => return Err(DetectionError::backend_failed("cancelled")),
        };
        debug!(
            "Read {} bytes from {resource} (truncated: {})",
            sample.len(),
            sample.is_truncated()
        );

        let flag = Arc::new(AtomicBool::new(false));
        let _guard = CancelOnDrop(flag.clone());
        let detector = self.detector.clone();
        let job = tokio::task::spawn_blocking(move || {
            detector.infer_cancellable(sample.bytes(), &flag)
        });

        tokio::select! {
            joined = job => match joined {
                Ok(Some(result)) => Ok(result),
                Ok(None) => Err(DetectionError::backend_failed("inference cancelled")),
                Err(err) => Err(DetectionError::backend_failed(format!("inference task failed: {err}"))),
            },
            () = cancel.cancelled() => Err(DetectionError::backend_failed("cancelled")),
        }
    }
}

/// Runs `program args... <path>` and reads the label from its stdout.
///
/// Success is exit status 0, nothing on stderr and one non-empty stdout
/// line: `<label> [confidence]`. The literal `unknown` means indeterminate.
#[derive(Debug, Clone)]
pub struct ExternalBackend {
    program: String,
    args: Vec<String>,
    trailing_args: Vec<String>,
}

impl ExternalBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            trailing_args: Vec::new(),
        }
    }

    /// `python3 -c <chardet script> <path> <sample_bytes>`
    pub fn python_chardet(sample_bytes: usize) -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["-c".to_string(), CHARDET_SCRIPT.to_string()],
            trailing_args: vec![sample_bytes.to_string()],
        }
    }
}

#[async_trait]
impl DetectionBackend for ExternalBackend {
    fn name(&self) -> &str {
        &self.program
    }

    async fn detect(
        &self,
        resource: &ResourceId,
        cancel: CancellationToken,
    ) -> std::result::Result<DetectionResult, DetectionError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(resource.path())
            .args(&self.trailing_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    DetectionError::backend_unavailable(format!("{}: {err}", self.program))
                }
                _ => DetectionError::backend_failed(format!("spawn {}: {err}", self.program)),
            })?;

        // Dropping the wait future drops the child, which kills it.
        let output = tokio::select! {
            output = child.wait_with_output() => output
                .map_err(|err| DetectionError::backend_failed(format!("wait {}: {err}", self.program)))?,
            () = cancel.cancelled() => return Err(DetectionError::backend_failed("cancelled")),
        };
        parse_output(&output)
    }
}

fn parse_output(output: &Output) -> std::result::Result<DetectionResult, DetectionError> {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.contains("ModuleNotFoundError") {
        return Err(DetectionError::backend_unavailable(stderr.to_string()));
    }
    if !output.status.success() {
        return Err(DetectionError::backend_failed(format!(
            "exit status {}: {stderr}",
            output.status
        )));
    }
    if !stderr.is_empty() {
        return Err(DetectionError::backend_failed(stderr.to_string()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty());
    let Some(line) = line else {
        return Err(DetectionError::backend_failed("no output"));
    };
    let mut parts = line.split_whitespace();
    let label = parts.next().unwrap_or_default().to_lowercase();
    if label == UNKNOWN_TOKEN {
        return Err(DetectionError::Indeterminate);
    }
    let confidence = parts
        .next()
        .and_then(|raw| raw.parse::<f32>().ok())
        .unwrap_or(1.0);
    Ok(DetectionResult::determined(label, confidence))
}
