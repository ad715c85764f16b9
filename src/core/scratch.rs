//! Temp resource manager.
//!
//! Allocates collision-free artifact paths under a scratch directory and
//! guarantees their removal on every exit path via `Drop`. Paths embed a
//! millisecond timestamp plus a random short identifier so two concurrent
//! requests never collide even under coarse clocks.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

/// Role of a temp artifact within one pipeline invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Raw audio as received from the client.
    Input,
    /// Trimmed, transcription-ready re-encode.
    Output,
}

impl ArtifactKind {
    fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::Input => "input",
            ArtifactKind::Output => "trimmed",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Input => "caf",
            ArtifactKind::Output => "mp3",
        }
    }
}

/// Per-request scratch area. Owned by exactly one pipeline invocation; all
/// allocated paths are removed when the area is dropped or `release_all` is
/// called, tolerating files that were never created.
#[derive(Debug)]
pub struct ScratchArea {
    dir: PathBuf,
    allocated: Vec<PathBuf>,
}

impl ScratchArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            allocated: Vec::with_capacity(2),
        }
    }

    /// Reserve a unique path for an artifact. The file itself is not created.
    pub fn allocate(&mut self, kind: ArtifactKind) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let unique = short_id();
        let path = self.dir.join(format!(
            "{}-{}-{}.{}",
            kind.prefix(),
            millis,
            unique,
            kind.extension()
        ));
        self.allocated.push(path.clone());
        path
    }

    /// Remove every allocated path. Missing files are not an error.
    pub fn release_all(&mut self) {
        for path in self.allocated.drain(..) {
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed temp artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::error!(path = %path.display(), "failed to remove temp artifact: {e}");
                }
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for ScratchArea {
    fn drop(&mut self) {
        self.release_all();
    }
}

fn short_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..12].to_string()
}
