use crate::backend::DetectionBackend;
use crate::classify::{SafeEncodingSet, SafeEncodingSource};
use crate::error::{DetectionError, FailureKind, FailureReason};
use crate::executor::{BoundedExecutor, ExecutionOutcome};
use crate::resource::{ResourceId, Revision};
use crate::session::{Activation, DetectionOutcome, Session, SessionSnapshot};
use crate::settings::{DEFAULT_CAPACITY, DEFAULT_TIMEOUT_MS};
use crate::{Result, SessionError};
use encoding_charset::DetectionResult;
use encoding_protocol::{RenderState, StatusReport};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Wall-clock limit for one detection
    pub deadline: Duration,
    pub capacity: usize,
    /// How often the actor looks for detections that never reported back
    pub sweep_interval: Duration,
    /// Extra time past `deadline` before the sweep forces `TimedOut`
    pub grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            capacity: DEFAULT_CAPACITY,
            sweep_interval: Duration::from_secs(1),
            grace: Duration::from_secs(1),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.deadline.is_zero() {
            return Err(SessionError::invalid_config("deadline must be > 0"));
        }
        if self.capacity == 0 {
            return Err(SessionError::invalid_config("capacity must be > 0"));
        }
        if self.sweep_interval.is_zero() {
            return Err(SessionError::invalid_config("sweep_interval must be > 0"));
        }
        Ok(())
    }
}

/// One state transition, as delivered to subscribers and sinks.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEvent {
    pub resource: ResourceId,
    pub generation: u64,
    pub outcome: DetectionOutcome,
    pub render: RenderState,
}

impl StatusEvent {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_terminal()
    }

    #[must_use]
    pub fn report(&self) -> StatusReport {
        build_report(&self.resource, &self.outcome, self.render.clone())
    }
}

pub(crate) fn build_report(
    resource: &ResourceId,
    outcome: &DetectionOutcome,
    render: RenderState,
) -> StatusReport {
    let report = StatusReport::new(resource.to_string(), outcome.kind(), render);
    match outcome.result() {
        Some(result) => report
            .with_confidence(result.confidence())
            .with_language(result.language().map(str::to_string)),
        None => report,
    }
}

/// Receives every emitted transition, on the manager's task.
pub trait StatusSink: Send + Sync {
    fn on_status_changed(&self, event: &StatusEvent);
}

/// Writes transitions to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn on_status_changed(&self, event: &StatusEvent) {
        match &event.render {
            RenderState::Detecting => debug!("{}: detecting", event.resource),
            RenderState::ResolvedSafe { label } => info!("{}: {label} (safe)", event.resource),
            RenderState::ResolvedUnsafe { label } => {
                info!("{}: {label} (problematic)", event.resource);
            }
            RenderState::Unknown => info!("{}: unknown", event.resource),
            RenderState::Failed { reason } => warn!("{}: failed: {reason}", event.resource),
        }
    }
}

enum Command {
    Activate {
        resource: ResourceId,
        revision: Option<Revision>,
        force: bool,
    },
    Deactivate {
        resource: ResourceId,
    },
    Wait {
        resource: ResourceId,
        reply: oneshot::Sender<DetectionOutcome>,
    },
    Shutdown {
        reply: Option<oneshot::Sender<()>>,
    },
}

struct Completion {
    resource: ResourceId,
    generation: u64,
    outcome: ExecutionOutcome,
}

pub struct SessionManagerBuilder {
    backend: Arc<dyn DetectionBackend>,
    config: SessionConfig,
    safe: Arc<dyn SafeEncodingSource>,
    sink: Option<Arc<dyn StatusSink>>,
}

impl SessionManagerBuilder {
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn safe_encodings(mut self, source: Arc<dyn SafeEncodingSource>) -> Self {
        self.safe = source;
        self
    }

    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Spawns the actor on the current tokio runtime.
    pub fn start(self) -> Result<SessionManager> {
        self.config.validate()?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(SessionSnapshot::new()));

        let actor = Actor {
            session: Session::new(self.config.capacity),
            tokens: HashMap::new(),
            waiters: HashMap::new(),
            backend: self.backend,
            executor: BoundedExecutor::new(self.config.deadline),
            config: self.config,
            safe: self.safe.clone(),
            sink: self.sink,
            event_tx: event_tx.clone(),
            snapshot_tx,
            unavailable_logged: false,
        };
        tokio::spawn(actor.run(command_rx));

        Ok(SessionManager {
            inner: Arc::new(SessionManagerInner {
                command_tx,
                event_tx,
                snapshot_rx,
                safe: self.safe,
                config: self.config,
            }),
        })
    }
}

/// Sequences detections per resource. Cheap to clone; the last clone to
/// drop shuts the actor down.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionManagerInner>,
}

struct SessionManagerInner {
    command_tx: mpsc::UnboundedSender<Command>,
    event_tx: broadcast::Sender<StatusEvent>,
    snapshot_rx: watch::Receiver<Arc<SessionSnapshot>>,
    safe: Arc<dyn SafeEncodingSource>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn builder(backend: Arc<dyn DetectionBackend>) -> SessionManagerBuilder {
        SessionManagerBuilder {
            backend,
            config: SessionConfig::default(),
            safe: Arc::new(SafeEncodingSet::default()),
            sink: None,
        }
    }

    /// Trigger event. Never blocks; repeated calls while a detection is in
    /// flight for the same resource are no-ops.
    pub fn activate(&self, resource: impl Into<ResourceId>) {
        self.send(Command::Activate {
            resource: resource.into(),
            revision: None,
            force: false,
        });
    }

    /// Like [`SessionManager::activate`], but a resolved entry with the
    /// same revision is reused instead of detected again.
    pub fn activate_with_revision(&self, resource: impl Into<ResourceId>, revision: Revision) {
        self.send(Command::Activate {
            resource: resource.into(),
            revision: Some(revision),
            force: false,
        });
    }

    /// Forces a new detection, cancelling any in-flight one.
    pub fn refresh(&self, resource: impl Into<ResourceId>) {
        self.send(Command::Activate {
            resource: resource.into(),
            revision: None,
            force: true,
        });
    }

    /// The resource is no longer tracked: cancel its work and drop its entry.
    /// A detection still in flight ends with a `cancelled` failure event.
    pub fn deactivate(&self, resource: impl Into<ResourceId>) {
        self.send(Command::Deactivate {
            resource: resource.into(),
        });
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.inner.event_tx.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.inner.snapshot_rx.borrow().clone()
    }

    #[must_use]
    pub fn snapshot_stream(&self) -> watch::Receiver<Arc<SessionSnapshot>> {
        self.inner.snapshot_rx.clone()
    }

    #[must_use]
    pub fn outcome(&self, resource: &ResourceId) -> Option<DetectionOutcome> {
        self.inner.snapshot_rx.borrow().get(resource).cloned()
    }

    /// Current allow-list, read from the source on every call.
    #[must_use]
    pub fn safe_encodings(&self) -> SafeEncodingSet {
        self.inner.safe.safe_encodings()
    }

    /// Classifies the current outcome against the current allow-list.
    #[must_use]
    pub fn render(&self, resource: &ResourceId) -> RenderState {
        self.outcome(resource)
            .map_or(RenderState::Unknown, |outcome| {
                outcome.render(&self.safe_encodings())
            })
    }

    #[must_use]
    pub fn report(&self, resource: &ResourceId) -> StatusReport {
        let outcome = self.outcome(resource).unwrap_or(DetectionOutcome::Unknown);
        self.report_for(resource, &outcome)
    }

    /// Report for an outcome the caller already holds, e.g. one returned by
    /// [`SessionManager::wait_for_terminal`] after the entry was evicted.
    #[must_use]
    pub fn report_for(&self, resource: &ResourceId, outcome: &DetectionOutcome) -> StatusReport {
        build_report(resource, outcome, outcome.render(&self.safe_encodings()))
    }

    #[must_use]
    pub fn config(&self) -> SessionConfig {
        self.inner.config
    }

    /// Resolves once the resource reaches a terminal outcome. Untracked
    /// resources resolve to `Unknown` immediately.
    pub async fn wait_for_terminal(&self, resource: &ResourceId) -> DetectionOutcome {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Wait {
            resource: resource.clone(),
            reply,
        });
        rx.await.unwrap_or(DetectionOutcome::Unknown)
    }

    /// Activate and wait.
    pub async fn detect(&self, resource: impl Into<ResourceId>) -> DetectionOutcome {
        let resource = resource.into();
        self.activate(resource.clone());
        self.wait_for_terminal(&resource).await
    }

    /// Cancels all in-flight work and clears the store.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown { reply: Some(reply) });
        let _ = rx.await;
    }

    fn send(&self, command: Command) {
        if self.inner.command_tx.send(command).is_err() {
            debug!("Session manager already stopped");
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            let _ = self.inner.command_tx.send(Command::Shutdown { reply: None });
        }
    }
}

struct Actor {
    session: Session,
    tokens: HashMap<u64, CancellationToken>,
    waiters: HashMap<ResourceId, Vec<oneshot::Sender<DetectionOutcome>>>,
    backend: Arc<dyn DetectionBackend>,
    executor: BoundedExecutor,
    config: SessionConfig,
    safe: Arc<dyn SafeEncodingSource>,
    sink: Option<Arc<dyn StatusSink>>,
    event_tx: broadcast::Sender<StatusEvent>,
    snapshot_tx: watch::Sender<Arc<SessionSnapshot>>,
    unavailable_logged: bool,
}

impl Actor {
    async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<Command>) {
        let (completion_tx, mut completion_rx) = mpsc::unbounded_channel::<Completion>();
        let mut sweep = time::interval(self.config.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = command_rx.recv() => {
                    let Some(command) = command else { break };
                    match command {
                        Command::Activate { resource, revision, force } => {
                            self.activate(resource, revision, force, &completion_tx);
                        }
                        Command::Deactivate { resource } => self.deactivate(&resource),
                        Command::Wait { resource, reply } => self.wait(resource, reply),
                        Command::Shutdown { reply } => {
                            self.clear();
                            if let Some(reply) = reply {
                                let _ = reply.send(());
                            }
                            break;
                        }
                    }
                }
                Some(completion) = completion_rx.recv() => self.complete(completion),
                _ = sweep.tick() => self.sweep(),
            }
        }
        self.clear();
        debug!("Session manager stopped");
    }

    fn activate(
        &mut self,
        resource: ResourceId,
        revision: Option<Revision>,
        force: bool,
        completion_tx: &mpsc::UnboundedSender<Completion>,
    ) {
        let now = Instant::now();
        let generation = if force {
            let superseded = self.session.supersede(&resource, revision, now);
            if let Some(old) = superseded.cancelled {
                debug!("{resource}: generation {old} superseded");
                self.cancel(old);
            }
            superseded.generation
        } else {
            match self.session.begin(&resource, revision, now) {
                Activation::Started { generation } => generation,
                Activation::InFlight { generation } => {
                    debug!("{resource}: detection {generation} already in flight");
                    return;
                }
                Activation::Cached(result) => {
                    debug!("{resource}: cached {:?}", result.label());
                    // Re-announce so a host switching back can render it.
                    if let Some(generation) = self.session.generation(&resource) {
                        self.emit(&resource, generation, DetectionOutcome::Resolved(result));
                    }
                    return;
                }
            }
        };

        self.publish_snapshot();
        self.emit(
            &resource,
            generation,
            DetectionOutcome::Detecting {
                generation,
                started_at: now,
            },
        );
        self.spawn_detection(resource, generation, completion_tx.clone());
    }

    fn spawn_detection(
        &mut self,
        resource: ResourceId,
        generation: u64,
        completion_tx: mpsc::UnboundedSender<Completion>,
    ) {
        let token = CancellationToken::new();
        self.tokens.insert(generation, token.clone());
        let backend = self.backend.clone();
        let executor = self.executor;
        debug!(
            "{resource}: starting {} detection (generation {generation})",
            backend.name()
        );
        tokio::spawn(async move {
            let outcome = executor.run(backend.as_ref(), &resource, token).await;
            let _ = completion_tx.send(Completion {
                resource,
                generation,
                outcome,
            });
        });
    }

    fn complete(&mut self, completion: Completion) {
        let Completion {
            resource,
            generation,
            outcome,
        } = completion;
        self.tokens.remove(&generation);
        let Some(result) = outcome.into_result(self.executor.deadline()) else {
            debug!("{resource}: generation {generation} cancelled");
            return;
        };
        self.apply(&resource, generation, result);
    }

    fn apply(
        &mut self,
        resource: &ResourceId,
        generation: u64,
        result: std::result::Result<DetectionResult, DetectionError>,
    ) {
        let Some(outcome) = self.session.complete(resource, generation, result) else {
            return;
        };
        if let DetectionOutcome::Failed(reason) = &outcome {
            if reason.kind == FailureKind::BackendUnavailable {
                if self.unavailable_logged {
                    debug!("{resource}: {reason}");
                } else {
                    error!("Detection backend unavailable: {reason}");
                    self.unavailable_logged = true;
                }
            }
        }
        self.publish_snapshot();
        self.emit(resource, generation, outcome.clone());
        if let Some(waiters) = self.waiters.remove(resource) {
            for waiter in waiters {
                let _ = waiter.send(outcome.clone());
            }
        }
    }

    fn deactivate(&mut self, resource: &ResourceId) {
        let cancelled = self.session.forget(resource).map(|generation| {
            debug!("{resource}: deactivated, cancelling generation {generation}");
            self.cancel(generation);
            generation
        });
        self.publish_snapshot();

        // Listeners already saw `detecting`; close that generation out.
        let outcome = match cancelled {
            Some(generation) => {
                let outcome = DetectionOutcome::Failed(FailureReason::cancelled());
                self.emit(resource, generation, outcome.clone());
                outcome
            }
            None => DetectionOutcome::Unknown,
        };
        if let Some(waiters) = self.waiters.remove(resource) {
            for waiter in waiters {
                let _ = waiter.send(outcome.clone());
            }
        }
    }

    fn wait(&mut self, resource: ResourceId, reply: oneshot::Sender<DetectionOutcome>) {
        match self.session.get(&resource) {
            Some(DetectionOutcome::Detecting { .. }) => {
                self.waiters.entry(resource).or_default().push(reply);
            }
            Some(outcome) => {
                let _ = reply.send(outcome.clone());
            }
            None => {
                let _ = reply.send(DetectionOutcome::Unknown);
            }
        }
    }

    // Safety net for detections whose task never reported back.
    fn sweep(&mut self) {
        let limit = self.config.deadline + self.config.grace;
        for (resource, generation) in self.session.overdue(Instant::now(), limit) {
            warn!("{resource}: generation {generation} overdue, forcing timeout");
            self.cancel(generation);
            self.apply(
                &resource,
                generation,
                Err(DetectionError::DetectionTimeout(self.config.deadline)),
            );
        }
    }

    fn clear(&mut self) {
        for generation in self.session.clear() {
            self.cancel(generation);
        }
        for (_, token) in self.tokens.drain() {
            token.cancel();
        }
        self.waiters.clear();
        self.publish_snapshot();
    }

    fn cancel(&mut self, generation: u64) {
        if let Some(token) = self.tokens.remove(&generation) {
            token.cancel();
        }
    }

    fn emit(&self, resource: &ResourceId, generation: u64, outcome: DetectionOutcome) {
        let render = outcome.render(&self.safe.safe_encodings());
        let event = StatusEvent {
            resource: resource.clone(),
            generation,
            outcome,
            render,
        };
        if let Some(sink) = &self.sink {
            sink.on_status_changed(&event);
        }
        let _ = self.event_tx.send(event);
    }

    fn publish_snapshot(&self) {
        let _ = self.snapshot_tx.send(Arc::new(self.session.snapshot()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Counting {
        calls: AtomicUsize,
        delay: Duration,
        label: &'static str,
    }

    #[async_trait]
    impl DetectionBackend for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn detect(
            &self,
            _resource: &ResourceId,
            cancel: CancellationToken,
        ) -> std::result::Result<DetectionResult, DetectionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::select! {
                () = time::sleep(self.delay) => Ok(DetectionResult::determined(self.label, 0.9)),
                () = cancel.cancelled() => Err(DetectionError::backend_failed("cancelled")),
            }
        }
    }

    #[derive(Default)]
    struct Recording(Mutex<Vec<StatusEvent>>);

    impl StatusSink for Recording {
        fn on_status_changed(&self, event: &StatusEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    fn counting(delay: Duration, label: &'static str) -> Arc<Counting> {
        Arc::new(Counting {
            calls: AtomicUsize::new(0),
            delay,
            label,
        })
    }

    #[test]
    fn config_validation() {
        assert!(SessionConfig::default().validate().is_ok());
        let config = SessionConfig {
            deadline: Duration::ZERO,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn emits_detecting_then_one_terminal_event() {
        let backend = counting(Duration::from_millis(10), "utf-8");
        let sink = Arc::new(Recording::default());
        let manager = SessionManager::builder(backend)
            .sink(sink.clone())
            .start()
            .unwrap();
        let resource = ResourceId::new("/virtual/a.txt");
        let outcome = manager.detect(resource.clone()).await;
        assert!(matches!(outcome, DetectionOutcome::Resolved(_)));

        let events = sink.0.lock().unwrap().clone();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].render, RenderState::Detecting);
        assert_eq!(
            events[1].render,
            RenderState::ResolvedSafe {
                label: "utf-8".to_string()
            }
        );
        assert_eq!(events[0].generation, events[1].generation);
        assert_eq!(events[1].report().confidence, Some(0.9));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_discards_superseded_completion() {
        let backend = counting(Duration::from_millis(100), "koi8-r");
        let manager = SessionManager::builder(backend.clone()).start().unwrap();
        let mut events = manager.subscribe();
        let resource = ResourceId::new("/virtual/b.txt");

        manager.activate(resource.clone());
        manager.refresh(resource.clone());
        let outcome = manager.wait_for_terminal(&resource).await;
        assert!(matches!(outcome, DetectionOutcome::Resolved(_)));
        assert!(backend.calls.load(Ordering::SeqCst) >= 1);

        let mut terminal = Vec::new();
        while let Ok(event) = events.try_recv() {
            if event.is_terminal() {
                terminal.push(event.generation);
            }
        }
        // Only the newer generation lands.
        assert_eq!(terminal.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_times_out_backend_that_ignores_cancellation() {
        struct Deaf;

        #[async_trait]
        impl DetectionBackend for Deaf {
            fn name(&self) -> &str {
                "deaf"
            }

            async fn detect(
                &self,
                _resource: &ResourceId,
                _cancel: CancellationToken,
            ) -> std::result::Result<DetectionResult, DetectionError> {
                time::sleep(Duration::from_secs(3600)).await;
                Ok(DetectionResult::determined("utf-8", 1.0))
            }
        }

        let manager = SessionManager::builder(Arc::new(Deaf))
            .config(SessionConfig {
                deadline: Duration::from_secs(2),
                ..SessionConfig::default()
            })
            .start()
            .unwrap();
        let resource = ResourceId::new("/virtual/c.txt");
        assert_eq!(manager.detect(resource.clone()).await, DetectionOutcome::TimedOut);
        assert_eq!(manager.render(&resource), RenderState::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn cached_activation_reannounces_result() {
        let backend = counting(Duration::from_millis(10), "utf-8");
        let sink = Arc::new(Recording::default());
        let manager = SessionManager::builder(backend.clone())
            .sink(sink.clone())
            .start()
            .unwrap();
        let resource = ResourceId::new("/virtual/e.txt");
        let revision = Revision {
            len: 12,
            modified_ms: Some(1_700_000_000_000),
        };

        manager.activate_with_revision(resource.clone(), revision);
        manager.wait_for_terminal(&resource).await;
        manager.activate_with_revision(resource.clone(), revision);
        manager.wait_for_terminal(&resource).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        let renders: Vec<RenderState> = sink
            .0
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.render.clone())
            .collect();
        let safe = RenderState::ResolvedSafe {
            label: "utf-8".to_string(),
        };
        assert_eq!(renders, vec![RenderState::Detecting, safe.clone(), safe]);
    }

    #[tokio::test(start_paused = true)]
    async fn deactivate_closes_in_flight_generation() {
        let backend = counting(Duration::from_secs(30), "utf-8");
        let sink = Arc::new(Recording::default());
        let manager = SessionManager::builder(backend)
            .sink(sink.clone())
            .config(SessionConfig {
                deadline: Duration::from_secs(60),
                ..SessionConfig::default()
            })
            .start()
            .unwrap();
        let resource = ResourceId::new("/virtual/f.txt");

        manager.activate(resource.clone());
        time::sleep(Duration::from_millis(50)).await;
        manager.deactivate(resource.clone());
        time::sleep(Duration::from_secs(5)).await;

        let events = sink.0.lock().unwrap().clone();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].render, RenderState::Detecting);
        assert_eq!(
            events[1].outcome,
            DetectionOutcome::Failed(FailureReason::cancelled())
        );
        assert_eq!(events[1].render, RenderState::Unknown);
        assert_eq!(events[0].generation, events[1].generation);
        assert_eq!(manager.outcome(&resource), None);
    }

    #[tokio::test]
    async fn untracked_resource_waits_to_unknown() {
        let manager = SessionManager::builder(counting(Duration::ZERO, "utf-8"))
            .start()
            .unwrap();
        let outcome = manager
            .wait_for_terminal(&ResourceId::new("/virtual/none"))
            .await;
        assert_eq!(outcome, DetectionOutcome::Unknown);
        assert_eq!(
            manager.render(&ResourceId::new("/virtual/none")),
            RenderState::Unknown
        );
    }

    #[tokio::test]
    async fn shutdown_clears_store() {
        let manager = SessionManager::builder(counting(Duration::ZERO, "utf-8"))
            .start()
            .unwrap();
        manager.detect("/virtual/d.txt").await;
        assert_eq!(manager.snapshot().len(), 1);
        manager.shutdown().await;
        assert!(manager.snapshot().is_empty());
        assert_eq!(
            manager.detect("/virtual/d.txt").await,
            DetectionOutcome::Unknown
        );
    }
}
