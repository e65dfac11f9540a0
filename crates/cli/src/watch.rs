use crate::print_stdout;
use crate::report::render_line;
use crate::scan::resource_for;
use anyhow::{Context, Result};
use encoding_session::{DetectionOutcome, ResourceId, Revision, SessionManager};
use log::{debug, info, warn};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, mpsc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Modified,
    Removed,
}

/// Maps a filesystem event to the tracked resources it touches.
pub fn changes_for(event: &Event, tracked: &HashMap<PathBuf, ResourceId>) -> Vec<(ResourceId, Change)> {
    let change = match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => Change::Modified,
        EventKind::Remove(_) => Change::Removed,
        _ => return Vec::new(),
    };
    let mut seen = HashSet::new();
    event
        .paths
        .iter()
        .filter_map(|path| tracked.get(path))
        .filter(|resource| seen.insert((*resource).clone()))
        .map(|resource| (resource.clone(), change))
        .collect()
}

/// Detects `paths`, then re-detects on change until Ctrl-C.
pub async fn run_watch(manager: &SessionManager, paths: &[PathBuf], json: bool) -> Result<()> {
    let tracked: HashMap<PathBuf, ResourceId> = paths
        .iter()
        .map(|path| {
            let resource = resource_for(path);
            (resource.path().to_path_buf(), resource)
        })
        .collect();

    let (event_tx, mut event_rx) = mpsc::channel(256);
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = event_tx.blocking_send(res);
        },
        NotifyConfig::default(),
    )
    .context("Failed to start file watcher")?;
    for dir in watch_dirs(tracked.keys()) {
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
    }

    let mut status_rx = manager.subscribe();
    for resource in tracked.values() {
        trigger(manager, resource).await;
    }
    info!("Watching {} file(s); press Ctrl-C to stop", tracked.len());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            Some(event) = event_rx.recv() => match event {
                Ok(event) => {
                    for (resource, change) in changes_for(&event, &tracked) {
                        match change {
                            Change::Modified => trigger(manager, &resource).await,
                            Change::Removed => {
                                debug!("{resource} removed");
                                manager.deactivate(resource);
                            }
                        }
                    }
                }
                Err(err) => warn!("Watch error: {err}"),
            },
            status = status_rx.recv() => match status {
                Ok(event) if event.is_terminal() => {
                    print_stdout(&render_line(&event.report(), json)?)?;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Dropped {skipped} status events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}

async fn trigger(manager: &SessionManager, resource: &ResourceId) {
    match Revision::of(resource.path()).await {
        Ok(revision) => {
            if matches!(manager.outcome(resource), Some(DetectionOutcome::Detecting { .. })) {
                manager.refresh(resource.clone());
            } else {
                manager.activate_with_revision(resource.clone(), revision);
            }
        }
        Err(err) => {
            debug!("No revision for {resource}: {err}");
            manager.activate(resource.clone());
        }
    }
}

fn watch_dirs<'a>(paths: impl Iterator<Item = &'a PathBuf>) -> HashSet<PathBuf> {
    paths
        .map(|path| {
            path.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        })
        .collect()
}
