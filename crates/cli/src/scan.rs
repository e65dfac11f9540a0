use encoding_session::{DetectionOutcome, ResourceId, SessionManager};
use ignore::WalkBuilder;
use log::{debug, warn};
use std::path::{Path, PathBuf};

const MAX_DETECT_CONCURRENCY: usize = 16;

/// Regular files under `root`, `.gitignore` aware, sorted.
pub fn collect_files(root: &Path, include_hidden: bool) -> Vec<PathBuf> {
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(!include_hidden)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false);

    let mut files = Vec::new();
    for result in builder.build() {
        match result {
            Ok(entry) => {
                if entry.file_type().is_some_and(|ft| ft.is_file()) {
                    files.push(entry.into_path());
                }
            }
            Err(err) => warn!("Skipping unreadable entry: {err}"),
        }
    }
    files.sort();
    debug!("Found {} files under {}", files.len(), root.display());
    files
}

/// Canonical id when the path exists; otherwise the path as given, so the
/// failure surfaces as a `Failed` outcome instead of an error.
pub fn resource_for(path: &Path) -> ResourceId {
    ResourceId::canonical(path).unwrap_or_else(|_| ResourceId::new(path))
}

pub fn detect_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_DETECT_CONCURRENCY)
}

/// Detects `resources` a window at a time, calling `on_done` in input order.
pub async fn detect_all<F>(
    manager: &SessionManager,
    resources: &[ResourceId],
    mut on_done: F,
) -> anyhow::Result<()>
where
    F: FnMut(&ResourceId, &DetectionOutcome) -> anyhow::Result<()>,
{
    let window = detect_concurrency().min(manager.config().capacity).max(1);
    for chunk in resources.chunks(window) {
        for resource in chunk {
            manager.activate(resource.clone());
        }
        for resource in chunk {
            let outcome = manager.wait_for_terminal(resource).await;
            on_done(resource, &outcome)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn walk_respects_gitignore_and_hidden() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::write(root.join(".gitignore"), "build/\n").unwrap();
        fs::create_dir_all(root.join("build")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("build/out.txt"), "x").unwrap();
        fs::write(root.join("src/a.txt"), "x").unwrap();
        fs::write(root.join(".secret"), "x").unwrap();

        let files = collect_files(root, false);
        assert_eq!(files, vec![root.join("src/a.txt")]);

        let with_hidden = collect_files(root, true);
        assert!(with_hidden.contains(&root.join(".secret")));
        assert!(!with_hidden.contains(&root.join("build/out.txt")));
    }

    #[test]
    fn missing_path_keeps_given_id() {
        let id = resource_for(Path::new("/definitely/not/here.txt"));
        assert_eq!(id.path(), Path::new("/definitely/not/here.txt"));
    }
}
