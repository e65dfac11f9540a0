use async_trait::async_trait;
use encoding_charset::{DetectionResult, DetectorConfig};
use encoding_protocol::RenderState;
use encoding_session::{
    DetectionBackend, DetectionError, DetectionOutcome, FailureKind, FailureReason, InProcessBackend,
    ResourceId, Revision, SafeEncodingSet, SessionConfig, SessionManager, SharedSafeEncodings,
};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const WINDOWS_1251: &[u8] = include_bytes!("../../charset/tests/fixtures/russian.windows-1251.txt");

fn in_process() -> Arc<InProcessBackend> {
    Arc::new(InProcessBackend::new(DetectorConfig::default()).unwrap())
}

fn write(dir: &Path, name: &str, bytes: &[u8]) -> ResourceId {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    ResourceId::new(path)
}

/// Counts calls into the backend and answers after `delay`.
struct Counting {
    calls: AtomicUsize,
    delay: Duration,
}

impl Counting {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
        })
    }
}

#[async_trait]
impl DetectionBackend for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    async fn detect(
        &self,
        _resource: &ResourceId,
        _cancel: CancellationToken,
    ) -> Result<DetectionResult, DetectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(DetectionResult::determined("utf-8", 1.0))
    }
}

#[tokio::test]
async fn printable_ascii_resolves_safe_utf8() {
    let temp = tempfile::tempdir().unwrap();
    let sample: Vec<u8> = (0..1000).map(|i| b' ' + (i % 95) as u8).collect();
    let resource = write(temp.path(), "ascii.txt", &sample);

    let manager = SessionManager::builder(in_process()).start().unwrap();
    let outcome = manager.detect(resource.clone()).await;
    assert_eq!(outcome.result().and_then(|r| r.label()), Some("utf-8"));
    assert_eq!(
        manager.render(&resource),
        RenderState::ResolvedSafe {
            label: "utf-8".to_string()
        }
    );
}

#[tokio::test]
async fn legacy_cyrillic_resolves_unsafe_with_change_action() {
    let temp = tempfile::tempdir().unwrap();
    let resource = write(temp.path(), "letter.txt", WINDOWS_1251);

    let manager = SessionManager::builder(in_process()).start().unwrap();
    manager.detect(resource.clone()).await;
    let render = manager.render(&resource);
    assert_eq!(
        render,
        RenderState::ResolvedUnsafe {
            label: "windows-1251".to_string()
        }
    );
    assert!(render.change_encoding_available());
    assert!(manager.report(&resource).change_encoding_available);
}

#[tokio::test]
async fn safe_set_changes_apply_on_next_render() {
    let temp = tempfile::tempdir().unwrap();
    let resource = write(temp.path(), "letter.txt", WINDOWS_1251);
    let shared = Arc::new(SharedSafeEncodings::new(SafeEncodingSet::default()));

    let manager = SessionManager::builder(in_process())
        .safe_encodings(shared.clone())
        .start()
        .unwrap();
    manager.detect(resource.clone()).await;
    assert!(manager.render(&resource).change_encoding_available());

    shared.replace(SafeEncodingSet::parse_csv("utf-8, windows-1251"));
    assert_eq!(
        manager.render(&resource),
        RenderState::ResolvedSafe {
            label: "windows-1251".to_string()
        }
    );
}

#[tokio::test]
async fn rapid_triggers_run_one_detection() {
    let backend = Counting::new(Duration::from_millis(50));
    let manager = SessionManager::builder(backend.clone()).start().unwrap();
    let mut events = manager.subscribe();
    let resource = ResourceId::new("/virtual/rapid.txt");

    manager.activate(resource.clone());
    manager.activate(resource.clone());
    manager.activate(resource.clone());
    let outcome = manager.wait_for_terminal(&resource).await;

    assert!(matches!(outcome, DetectionOutcome::Resolved(_)));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event.render);
    }
    assert_eq!(
        seen,
        vec![
            RenderState::Detecting,
            RenderState::ResolvedSafe {
                label: "utf-8".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn unchanged_revision_reuses_result() {
    let temp = tempfile::tempdir().unwrap();
    let resource = write(temp.path(), "notes.txt", b"plain text\n");
    let revision = Revision::of(resource.path()).await.unwrap();
    let backend = Counting::new(Duration::ZERO);
    let manager = SessionManager::builder(backend.clone()).start().unwrap();

    manager.activate_with_revision(resource.clone(), revision);
    manager.wait_for_terminal(&resource).await;
    manager.activate_with_revision(resource.clone(), revision);
    manager.wait_for_terminal(&resource).await;
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

    // A plain trigger may mean the content changed.
    manager.activate(resource.clone());
    manager.wait_for_terminal(&resource).await;
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn missing_file_fails_without_retry() {
    let temp = tempfile::tempdir().unwrap();
    let resource = ResourceId::new(temp.path().join("gone.txt"));
    let manager = SessionManager::builder(in_process()).start().unwrap();

    let outcome = manager.detect(resource.clone()).await;
    match outcome {
        DetectionOutcome::Failed(reason) => assert_eq!(reason.kind, FailureKind::SampleUnavailable),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(matches!(manager.render(&resource), RenderState::Failed { .. }));
    assert!(!manager.render(&resource).change_encoding_available());
}

#[tokio::test]
async fn binary_content_renders_unknown() {
    let temp = tempfile::tempdir().unwrap();
    let bytes: Vec<u8> = (0..4096u32).map(|i| if i % 3 == 0 { 0 } else { (i * 7) as u8 }).collect();
    let resource = write(temp.path(), "blob.bin", &bytes);
    let manager = SessionManager::builder(in_process()).start().unwrap();

    let outcome = manager.detect(resource.clone()).await;
    assert!(matches!(outcome, DetectionOutcome::Failed(ref r) if r.kind == FailureKind::Indeterminate));
    assert_eq!(manager.render(&resource), RenderState::Unknown);
}

#[tokio::test]
async fn deactivate_drops_entry_and_cancels() {
    let backend = Counting::new(Duration::from_secs(30));
    let manager = SessionManager::builder(backend)
        .config(SessionConfig {
            deadline: Duration::from_secs(60),
            ..SessionConfig::default()
        })
        .start()
        .unwrap();
    let resource = ResourceId::new("/virtual/closed.txt");
    let mut events = manager.subscribe();

    manager.activate(resource.clone());
    let waiting = {
        let manager = manager.clone();
        let resource = resource.clone();
        tokio::spawn(async move { manager.wait_for_terminal(&resource).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    manager.deactivate(resource.clone());

    let cancelled = DetectionOutcome::Failed(FailureReason::cancelled());
    assert_eq!(waiting.await.unwrap(), cancelled);
    assert_eq!(manager.outcome(&resource), None);

    let first = events.recv().await.unwrap();
    assert_eq!(first.render, RenderState::Detecting);
    let last = events.recv().await.unwrap();
    assert!(last.is_terminal());
    assert_eq!(last.generation, first.generation);
    assert_eq!(last.outcome, cancelled);
    assert_eq!(last.render, RenderState::Unknown);
}

#[tokio::test]
async fn deactivate_after_resolution_emits_nothing() {
    let manager = SessionManager::builder(Counting::new(Duration::ZERO))
        .start()
        .unwrap();
    let resource = ResourceId::new("/virtual/done.txt");
    manager.detect(resource.clone()).await;

    let mut events = manager.subscribe();
    manager.deactivate(resource.clone());
    assert_eq!(
        manager.wait_for_terminal(&resource).await,
        DetectionOutcome::Unknown
    );
    assert!(events.try_recv().is_err());
}
