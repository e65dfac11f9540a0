use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Identity of a tracked resource: its canonical file path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(PathBuf);

impl ResourceId {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Resolve symlinks and relative components so one file maps to one id.
    pub fn canonical(path: impl AsRef<Path>) -> std::io::Result<Self> {
        std::fs::canonicalize(path).map(Self)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<PathBuf> for ResourceId {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&Path> for ResourceId {
    fn from(path: &Path) -> Self {
        Self(path.to_path_buf())
    }
}

impl From<&str> for ResourceId {
    fn from(path: &str) -> Self {
        Self(PathBuf::from(path))
    }
}

/// Observable file state. Equal revisions mean detection need not re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision {
    pub len: u64,
    pub modified_ms: Option<u64>,
}

impl Revision {
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        let modified_ms = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .and_then(|d| u64::try_from(d.as_millis()).ok());
        Self {
            len: meta.len(),
            modified_ms,
        }
    }

    pub async fn of(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let meta = tokio::fs::metadata(path).await?;
        Ok(Self::from_metadata(&meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_resolves_relative_components() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("a.txt");
        std::fs::write(&file, "x").unwrap();
        let dotted = temp.path().join(".").join("a.txt");
        assert_eq!(
            ResourceId::canonical(&dotted).unwrap(),
            ResourceId::canonical(&file).unwrap()
        );
    }

    #[tokio::test]
    async fn revision_tracks_length() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("a.txt");
        std::fs::write(&file, "one").unwrap();
        let first = Revision::of(&file).await.unwrap();
        std::fs::write(&file, "three").unwrap();
        let second = Revision::of(&file).await.unwrap();
        assert_eq!(first.len, 3);
        assert_ne!(first, second);
    }
}
