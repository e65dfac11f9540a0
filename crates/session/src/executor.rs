use crate::backend::DetectionBackend;
use crate::error::DetectionError;
use crate::resource::ResourceId;
use encoding_charset::DetectionResult;
use log::{debug, warn};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How one bounded detection run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Completed(DetectionResult),
    Failed(DetectionError),
    /// Deadline elapsed; the backend was cancelled
    TimedOut,
    /// The caller cancelled before the backend finished
    Cancelled,
}

/// Runs a backend with a hard wall-clock deadline.
#[derive(Debug, Clone, Copy)]
pub struct BoundedExecutor {
    deadline: Duration,
}

impl BoundedExecutor {
    #[must_use]
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Races the backend against the deadline and `cancel`.
    ///
    /// On timeout or cancellation the backend future is dropped after the
    /// token fires, so child processes and blocking jobs are torn down
    /// before this returns.
    pub async fn run(
        &self,
        backend: &dyn DetectionBackend,
        resource: &ResourceId,
        cancel: CancellationToken,
    ) -> ExecutionOutcome {
        let mut work = backend.detect(resource, cancel.child_token());

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => ExecutionOutcome::Cancelled,
            result = &mut work => match result {
                Ok(result) => ExecutionOutcome::Completed(result),
                Err(err) => ExecutionOutcome::Failed(err),
            },
            () = tokio::time::sleep(self.deadline) => {
                warn!(
                    "{} detection for {resource} exceeded {:?}",
                    backend.name(),
                    self.deadline
                );
                cancel.cancel();
                ExecutionOutcome::TimedOut
            }
        };
        drop(work);
        debug!("{resource}: {outcome:?}");
        outcome
    }
}

impl ExecutionOutcome {
    /// Collapses the run into the result shape the session store applies.
    pub fn into_result(self, deadline: Duration) -> Option<Result<DetectionResult, DetectionError>> {
        match self {
            Self::Completed(result) if result.is_determined() => Some(Ok(result)),
            Self::Completed(_) => Some(Err(DetectionError::Indeterminate)),
            Self::Failed(err) => Some(Err(err)),
            Self::TimedOut => Some(Err(DetectionError::DetectionTimeout(deadline))),
            Self::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct Stalling {
        dropped: Arc<AtomicBool>,
    }

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl DetectionBackend for Stalling {
        fn name(&self) -> &str {
            "stalling"
        }

        async fn detect(
            &self,
            _resource: &ResourceId,
            _cancel: CancellationToken,
        ) -> Result<DetectionResult, DetectionError> {
            let _guard = SetOnDrop(self.dropped.clone());
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    struct Fixed(Result<DetectionResult, DetectionError>);

    #[async_trait]
    impl DetectionBackend for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn detect(
            &self,
            _resource: &ResourceId,
            _cancel: CancellationToken,
        ) -> Result<DetectionResult, DetectionError> {
            self.0.clone()
        }
    }

    fn resource() -> ResourceId {
        ResourceId::new("/virtual/a.txt")
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_backend_times_out_and_is_dropped() {
        let dropped = Arc::new(AtomicBool::new(false));
        let backend = Stalling {
            dropped: dropped.clone(),
        };
        let executor = BoundedExecutor::new(Duration::from_secs(5));
        let token = CancellationToken::new();
        let outcome = executor.run(&backend, &resource(), token.clone()).await;
        assert_eq!(outcome, ExecutionOutcome::TimedOut);
        assert!(token.is_cancelled());
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancelled_token_wins() {
        let backend = Stalling {
            dropped: Arc::new(AtomicBool::new(false)),
        };
        let executor = BoundedExecutor::new(Duration::from_secs(60));
        let token = CancellationToken::new();
        token.cancel();
        let outcome = executor.run(&backend, &resource(), token).await;
        assert_eq!(outcome, ExecutionOutcome::Cancelled);
    }

    #[tokio::test]
    async fn completed_and_failed_results_pass_through() {
        let executor = BoundedExecutor::new(Duration::from_secs(1));
        let ok = Fixed(Ok(DetectionResult::determined("utf-8", 1.0)));
        let outcome = executor
            .run(&ok, &resource(), CancellationToken::new())
            .await;
        assert_eq!(
            outcome,
            ExecutionOutcome::Completed(DetectionResult::determined("utf-8", 1.0))
        );

        let failed = Fixed(Err(DetectionError::backend_failed("boom")));
        let outcome = executor
            .run(&failed, &resource(), CancellationToken::new())
            .await;
        assert_eq!(
            outcome,
            ExecutionOutcome::Failed(DetectionError::backend_failed("boom"))
        );
    }

    #[test]
    fn undetermined_completion_becomes_indeterminate() {
        let deadline = Duration::from_secs(5);
        assert_eq!(
            ExecutionOutcome::Completed(DetectionResult::indeterminate()).into_result(deadline),
            Some(Err(DetectionError::Indeterminate))
        );
        assert_eq!(
            ExecutionOutcome::TimedOut.into_result(deadline),
            Some(Err(DetectionError::DetectionTimeout(deadline)))
        );
        assert_eq!(ExecutionOutcome::Cancelled.into_result(deadline), None);
    }
}
