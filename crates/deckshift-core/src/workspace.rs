//! Temporary Workspace Manager.
//!
//! Every request gets its own `(input, output)` path pair under a shared
//! scratch root. The pair shares one base token made of the current unix
//! time in milliseconds and a random UUID, so concurrent requests never write
//! to the same path. Uniqueness of these names is the only concurrency-safety
//! mechanism; there are no locks.
//!
//! A [`Workspace`] deletes both of its files when dropped. Deletion is
//! best-effort: a missing file (never produced, or already consumed) or any
//! other removal error is logged at `debug` and swallowed.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::error::WorkspaceError;
use crate::naming::{ACCEPTED_EXTENSION, ARTIFACT_EXTENSION};

/// Prefix of every generated base name.
const TOKEN_PREFIX: &str = "deckshift";

/// The scratch root under which workspaces are allocated.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure the scratch root exists and hand out a fresh workspace.
    ///
    /// Creating the root is idempotent; an existing directory is not an error.
    pub async fn allocate(&self) -> Result<Workspace, WorkspaceError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| WorkspaceError::CreateRoot {
                path: self.root.clone(),
                source,
            })?;

        let token = format!(
            "{TOKEN_PREFIX}-{}-{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        let base = self.root.join(&token);
        let workspace = Workspace {
            input_path: base.with_extension(ACCEPTED_EXTENSION),
            output_path: base.with_extension(ARTIFACT_EXTENSION),
            token,
        };
        debug!(token = %workspace.token, "workspace allocated");
        Ok(workspace)
    }
}

/// An exclusively owned `(input, output)` path pair.
///
/// Neither file exists at allocation time. Both are removed when the value is
/// dropped, on every exit path of the owning request.
#[derive(Debug)]
pub struct Workspace {
    token: String,
    input_path: PathBuf,
    output_path: PathBuf,
}

impl Workspace {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Write the uploaded payload to the staged input path.
    pub async fn stage(&self, payload: &[u8]) -> Result<(), WorkspaceError> {
        tokio::fs::write(&self.input_path, payload)
            .await
            .map_err(|source| WorkspaceError::Stage {
                path: self.input_path.clone(),
                source,
            })
    }

    /// Release the workspace now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        for path in [&self.input_path, &self.output_path] {
            if let Err(e) = std::fs::remove_file(path) {
                debug!(path = %path.display(), error = %e, "workspace file not removed");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn allocate_creates_missing_root_with_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join(".tmp").join("convert");
        let scratch = ScratchDir::new(&root);

        let ws = scratch.allocate().await.unwrap();
        assert!(root.is_dir());
        assert_eq!(ws.input_path().parent(), Some(root.as_path()));

        // A second call against an existing root is fine.
        scratch.allocate().await.unwrap();
    }

    #[tokio::test]
    async fn paths_share_the_token_and_differ_by_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = ScratchDir::new(tmp.path()).allocate().await.unwrap();

        assert_eq!(ws.input_path().file_stem(), ws.output_path().file_stem());
        assert!(ws.token().starts_with("deckshift-"));
        assert_eq!(ws.input_path().extension().unwrap(), "pdf");
        assert_eq!(ws.output_path().extension().unwrap(), "pptx");
        assert!(!ws.input_path().exists());
        assert!(!ws.output_path().exists());
    }

    #[tokio::test]
    async fn drop_removes_both_files() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = ScratchDir::new(tmp.path()).allocate().await.unwrap();
        ws.stage(b"%PDF-1.4").await.unwrap();
        std::fs::write(ws.output_path(), b"pptx").unwrap();

        let (input, output) = (ws.input_path().to_owned(), ws.output_path().to_owned());
        ws.release();

        assert!(!input.exists());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn drop_without_any_files_is_silent() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = ScratchDir::new(tmp.path()).allocate().await.unwrap();
        drop(ws);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn concurrent_allocations_never_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path());

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let scratch = scratch.clone();
                tokio::spawn(async move {
                    let ws = scratch.allocate().await.unwrap();
                    let paths = (ws.input_path().to_owned(), ws.output_path().to_owned());
                    // Keep the workspace alive until the paths are collected.
                    (paths, ws)
                })
            })
            .collect();

        let mut seen = HashSet::new();
        let mut alive = Vec::new();
        for h in handles {
            let ((input, output), ws) = h.await.unwrap();
            assert!(seen.insert(input), "duplicate input path");
            assert!(seen.insert(output), "duplicate output path");
            alive.push(ws);
        }
        assert_eq!(seen.len(), 100);
    }

    #[tokio::test]
    async fn create_root_failure_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let err = ScratchDir::new(blocker.join("sub")).allocate().await.unwrap_err();
        assert!(matches!(err, WorkspaceError::CreateRoot { .. }));
    }
}
