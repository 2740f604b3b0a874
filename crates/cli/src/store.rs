//! Directory-backed job store.
//!
//! Each request is written as `<job-id>.json`. The file is first written
//! under a scratch name and then linked into place without clobbering, so an
//! existing identity is reported as `AlreadyExists` and a half-written record
//! is never visible under its final name.
//!
//! The write runs as one blocking task. Dropping the `create` future (a
//! cancelled context, a timeout) does not stop that task, and the scratch file
//! is removed by [`NamedTempFile`]'s drop whether or not it was persisted.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;
use trigger::{Context, JobRequest, JobStore, StoreError};

/// Envelope written for every stored request.
#[derive(Debug, Serialize)]
struct StoredJob<'a> {
    stored_at: DateTime<Utc>,
    request: &'a JobRequest,
}

/// [`JobStore`] keeping one JSON file per request under `root`.
///
/// `root` is created on first write.
#[derive(Debug, Clone)]
pub struct DirectoryJobStore {
    root: PathBuf,
}

impl DirectoryJobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, request: &JobRequest) -> PathBuf {
        self.root.join(format!("{}.json", request.id))
    }
}

fn io_error(err: std::io::Error) -> StoreError {
    match err.kind() {
        ErrorKind::PermissionDenied => StoreError::Forbidden {
            message: err.to_string(),
        },
        _ => StoreError::Unavailable {
            message: err.to_string(),
            retry_after: None,
        },
    }
}

#[async_trait]
impl JobStore for DirectoryJobStore {
    async fn create(&self, _ctx: &Context, request: &JobRequest) -> Result<(), StoreError> {
        let target = self.record_path(request);
        let body = serde_json::to_vec_pretty(&StoredJob {
            stored_at: Utc::now(),
            request,
        })
        .map_err(|e| StoreError::Invalid {
            message: e.to_string(),
        })?;

        let root = self.root.clone();
        let path = target.clone();
        let written = tokio::task::spawn_blocking(move || write_record(&root, &path, &body))
            .await
            .map_err(|e| StoreError::Unavailable {
                message: format!("store write task failed: {e}"),
                retry_after: None,
            })?;

        match written {
            Ok(()) => {
                debug!(job_id = %request.id, path = %target.display(), "Stored job request");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists { id: request.id })
            }
            Err(err) => Err(io_error(err)),
        }
    }
}

/// Writes `body` to a scratch file in `root` and links it to `target`.
///
/// Fails with `ErrorKind::AlreadyExists` when `target` is already present.
fn write_record(root: &Path, target: &Path, body: &[u8]) -> std::io::Result<()> {
    if target.try_exists()? {
        return Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("{} already exists", target.display()),
        ));
    }

    std::fs::create_dir_all(root)?;
    let mut scratch: NamedTempFile = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(root)?;
    scratch.write_all(body)?;
    scratch.as_file().sync_all()?;
    scratch.persist_noclobber(target).map_err(|e| e.error)?;
    Ok(())
}
