use crate::error::DetectionError;
use crate::resource::ResourceId;
use tokio::io::AsyncReadExt;

/// Leading bytes of a resource, read once for one detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteSample {
    bytes: Vec<u8>,
    truncated: bool,
}

impl ByteSample {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The resource had more bytes than the sample cap.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Reads at most `max_bytes` from the start of a file. Never loads the
/// whole resource and never retries.
#[derive(Debug, Clone, Copy)]
pub struct SampleReader {
    max_bytes: usize,
}

impl SampleReader {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes: max_bytes.max(1),
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub async fn read(&self, resource: &ResourceId) -> Result<ByteSample, DetectionError> {
        let path = resource.path();
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|err| DetectionError::sample_unavailable(path, err))?;
        let meta = file
            .metadata()
            .await
            .map_err(|err| DetectionError::sample_unavailable(path, err))?;
        if meta.is_dir() {
            return Err(DetectionError::sample_unavailable(path, "is a directory"));
        }

        // One extra byte tells whether the file continues past the cap.
        let limit = u64::try_from(self.max_bytes).unwrap_or(u64::MAX).saturating_add(1);
        let mut bytes = Vec::with_capacity(self.max_bytes.min(64 * 1024) + 1);
        file.take(limit)
            .read_to_end(&mut bytes)
            .await
            .map_err(|err| DetectionError::sample_unavailable(path, err))?;

        let truncated = bytes.len() > self.max_bytes;
        bytes.truncate(self.max_bytes);
        Ok(ByteSample { bytes, truncated })
    }
}
