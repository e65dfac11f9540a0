//! Per-resource detection state, owned by a single writer.

use crate::classify::{classify, SafeEncodingSet, Verdict};
use crate::error::{DetectionError, FailureKind, FailureReason};
use crate::resource::{ResourceId, Revision};
use encoding_charset::DetectionResult;
use encoding_protocol::{OutcomeKind, RenderState};
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::Instant;

/// Cache value for one resource.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome {
    /// Never attempted
    Unknown,
    Detecting {
        generation: u64,
        started_at: Instant,
    },
    Resolved(DetectionResult),
    TimedOut,
    Failed(FailureReason),
}

impl DetectionOutcome {
    /// Terminal outcome for a finished detection.
    pub fn from_result(result: Result<DetectionResult, DetectionError>) -> Self {
        match result {
            Ok(result) if result.is_determined() => Self::Resolved(result),
            Ok(_) | Err(DetectionError::Indeterminate) => {
                Self::Failed(FailureReason::indeterminate())
            }
            Err(DetectionError::DetectionTimeout(_)) => Self::TimedOut,
            Err(err) => {
                let kind = match &err {
                    DetectionError::SampleUnavailable { .. } => FailureKind::SampleUnavailable,
                    DetectionError::BackendUnavailable(_) => FailureKind::BackendUnavailable,
                    _ => FailureKind::BackendFailed,
                };
                Self::Failed(FailureReason {
                    kind,
                    message: err.to_string(),
                })
            }
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved(_) | Self::TimedOut | Self::Failed(_))
    }

    #[must_use]
    pub fn is_detecting(&self) -> bool {
        matches!(self, Self::Detecting { .. })
    }

    #[must_use]
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Unknown => OutcomeKind::Unknown,
            Self::Detecting { .. } => OutcomeKind::Detecting,
            Self::Resolved(_) => OutcomeKind::Resolved,
            Self::TimedOut => OutcomeKind::TimedOut,
            Self::Failed(_) => OutcomeKind::Failed,
        }
    }

    #[must_use]
    pub fn result(&self) -> Option<&DetectionResult> {
        match self {
            Self::Resolved(result) => Some(result),
            _ => None,
        }
    }

    /// Classifies a resolved label against `safe`. Timeouts, cancellations
    /// and indeterminate results read as unknown; other failures keep their reason.
    #[must_use]
    pub fn render(&self, safe: &SafeEncodingSet) -> RenderState {
        match self {
            Self::Unknown | Self::TimedOut => RenderState::Unknown,
            Self::Detecting { .. } => RenderState::Detecting,
            Self::Resolved(result) => match result.label() {
                Some(label) => match classify(label, safe) {
                    Verdict::Safe => RenderState::ResolvedSafe {
                        label: label.to_string(),
                    },
                    Verdict::Problematic => RenderState::ResolvedUnsafe {
                        label: label.to_string(),
                    },
                },
                None => RenderState::Unknown,
            },
            Self::Failed(reason)
                if matches!(
                    reason.kind,
                    FailureKind::Indeterminate | FailureKind::Cancelled
                ) =>
            {
                RenderState::Unknown
            }
            Self::Failed(reason) => RenderState::Failed {
                reason: reason.message.clone(),
            },
        }
    }
}

/// What a trigger did to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// A new detection must run under this generation
    Started { generation: u64 },
    /// A detection is already running; nothing to do
    InFlight { generation: u64 },
    /// Resolved for the same revision; no detection needed
    Cached(DetectionResult),
}

/// Result of a forced re-detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superseded {
    pub generation: u64,
    /// The in-flight generation that must now be cancelled
    pub cancelled: Option<u64>,
}

#[derive(Debug, Clone)]
struct Entry {
    outcome: DetectionOutcome,
    generation: u64,
    revision: Option<Revision>,
    touched: u64,
}

pub type SessionSnapshot = BTreeMap<ResourceId, DetectionOutcome>;

/// ResourceId -> DetectionOutcome with at most one `Detecting` entry per
/// resource. Generations are unique across the whole store.
#[derive(Debug)]
pub struct Session {
    entries: HashMap<ResourceId, Entry>,
    next_generation: u64,
    clock: u64,
    capacity: usize,
}

impl Session {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            next_generation: 1,
            clock: 0,
            capacity: capacity.max(1),
        }
    }

    /// Trigger event for `resource`.
    pub fn begin(
        &mut self,
        resource: &ResourceId,
        revision: Option<Revision>,
        now: Instant,
    ) -> Activation {
        let tick = self.tick();
        if let Some(entry) = self.entries.get_mut(resource) {
            entry.touched = tick;
            match &entry.outcome {
                DetectionOutcome::Detecting { generation, .. } => {
                    return Activation::InFlight {
                        generation: *generation,
                    };
                }
                DetectionOutcome::Resolved(result)
                    if revision.is_some() && entry.revision == revision =>
                {
                    return Activation::Cached(result.clone());
                }
                _ => {}
            }
        }
        let generation = self.start(resource, revision, now, tick);
        Activation::Started { generation }
    }

    /// Starts a new generation even if one is already in flight.
    pub fn supersede(
        &mut self,
        resource: &ResourceId,
        revision: Option<Revision>,
        now: Instant,
    ) -> Superseded {
        let cancelled = self.in_flight_generation(resource);
        let tick = self.tick();
        let generation = self.start(resource, revision, now, tick);
        Superseded {
            generation,
            cancelled,
        }
    }

    /// Applies a completion. Returns the new terminal outcome, or `None`
    /// when the generation is stale and the completion was discarded.
    pub fn complete(
        &mut self,
        resource: &ResourceId,
        generation: u64,
        result: Result<DetectionResult, DetectionError>,
    ) -> Option<DetectionOutcome> {
        let tick = self.tick();
        let entry = self.entries.get_mut(resource)?;
        if entry.generation != generation || !entry.outcome.is_detecting() {
            debug!("Discarding stale completion for {resource} (generation {generation})");
            return None;
        }
        entry.outcome = DetectionOutcome::from_result(result);
        entry.touched = tick;
        let outcome = entry.outcome.clone();
        self.evict();
        Some(outcome)
    }

    /// Drops the entry. Returns the in-flight generation to cancel, if any.
    pub fn forget(&mut self, resource: &ResourceId) -> Option<u64> {
        let entry = self.entries.remove(resource)?;
        match entry.outcome {
            DetectionOutcome::Detecting { generation, .. } => Some(generation),
            _ => None,
        }
    }

    /// In-flight detections that started at least `limit` before `now`.
    pub fn overdue(&self, now: Instant, limit: Duration) -> Vec<(ResourceId, u64)> {
        let mut out: Vec<(ResourceId, u64)> = self
            .entries
            .iter()
            .filter_map(|(resource, entry)| match entry.outcome {
                DetectionOutcome::Detecting {
                    generation,
                    started_at,
                } if now.saturating_duration_since(started_at) >= limit => {
                    Some((resource.clone(), generation))
                }
                _ => None,
            })
            .collect();
        out.sort();
        out
    }

    pub fn get(&self, resource: &ResourceId) -> Option<&DetectionOutcome> {
        self.entries.get(resource).map(|entry| &entry.outcome)
    }

    pub fn generation(&self, resource: &ResourceId) -> Option<u64> {
        self.entries.get(resource).map(|entry| entry.generation)
    }

    pub fn in_flight_generation(&self, resource: &ResourceId) -> Option<u64> {
        match self.get(resource)? {
            DetectionOutcome::Detecting { generation, .. } => Some(*generation),
            _ => None,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.outcome.is_detecting())
            .count()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.entries
            .iter()
            .map(|(resource, entry)| (resource.clone(), entry.outcome.clone()))
            .collect()
    }

    /// Empties the store and returns the generations that were in flight.
    pub fn clear(&mut self) -> Vec<u64> {
        self.entries
            .drain()
            .filter_map(|(_, entry)| match entry.outcome {
                DetectionOutcome::Detecting { generation, .. } => Some(generation),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn start(
        &mut self,
        resource: &ResourceId,
        revision: Option<Revision>,
        now: Instant,
        tick: u64,
    ) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.entries.insert(
            resource.clone(),
            Entry {
                outcome: DetectionOutcome::Detecting {
                    generation,
                    started_at: now,
                },
                generation,
                revision,
                touched: tick,
            },
        );
        self.evict();
        generation
    }

    // Least recently touched terminal entries go first.
    fn evict(&mut self) {
        while self.entries.len() > self.capacity {
            let victim = self
                .entries
                .iter()
                .filter(|(_, entry)| !entry.outcome.is_detecting())
                .min_by_key(|(_, entry)| entry.touched)
                .map(|(resource, _)| resource.clone());
            let Some(victim) = victim else {
                break;
            };
            debug!("Evicting {victim}");
            self.entries.remove(&victim);
        }
    }
}
