//! Source connection collaborator
//!
//! Fetches repository snapshots and accepts the trigger registrations that
//! pipeline filters are compiled into.

use async_trait::async_trait;
use monorail_core::domain::artifact::FileMap;
use monorail_core::domain::identity::ConnectionHandle;
use monorail_core::domain::trigger::TriggerFilter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::debug;

use super::{CollaboratorError, Result};

/// What to fetch from the connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRequest {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

/// Trigger registration sent to the connection when a pipeline is defined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRegistration {
    pub pipeline_name: String,
    pub path_filters: Vec<String>,
    pub branch_filters: Vec<String>,
}

impl TriggerRegistration {
    pub fn from_filter(pipeline_name: impl Into<String>, filter: &TriggerFilter) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            path_filters: filter.included_path_prefixes.iter().cloned().collect(),
            branch_filters: filter.included_branches.iter().cloned().collect(),
        }
    }
}

/// Collaborator trait for the version-control source connection
#[async_trait]
pub trait SourceConnection: Send + Sync {
    /// Fetches the branch head of a repository
    async fn fetch(
        &self,
        connection: &ConnectionHandle,
        request: &SourceRequest,
    ) -> Result<FileMap>;

    /// Registers the path and branch filters of a pipeline
    async fn register_trigger(
        &self,
        connection: &ConnectionHandle,
        registration: TriggerRegistration,
    ) -> Result<()>;
}

/// In-memory implementation of SourceConnection
///
/// Serves snapshots pushed with [`MemorySourceConnection::push`], keyed by
/// `<owner>/<repo>@<branch>`. Only the connection it was created for is known.
pub struct MemorySourceConnection {
    connection: ConnectionHandle,
    snapshots: RwLock<HashMap<String, FileMap>>,
    registrations: RwLock<Vec<TriggerRegistration>>,
}

impl MemorySourceConnection {
    pub fn new(connection: ConnectionHandle) -> Self {
        Self {
            connection,
            snapshots: RwLock::new(HashMap::new()),
            registrations: RwLock::new(Vec::new()),
        }
    }

    /// Sets the branch head of `repository` (`<owner>/<repo>`)
    pub async fn push(&self, repository: &str, branch: &str, files: FileMap) {
        debug!("Pushing {} files to {}@{}", files.len(), repository, branch);
        self.snapshots
            .write()
            .await
            .insert(snapshot_key(repository, branch), files);
    }

    pub async fn registrations(&self) -> Vec<TriggerRegistration> {
        self.registrations.read().await.clone()
    }

    fn check_connection(&self, connection: &ConnectionHandle) -> Result<()> {
        if *connection != self.connection {
            return Err(CollaboratorError::NotFound(format!(
                "source connection '{}'",
                connection.reference
            )));
        }
        Ok(())
    }
}

fn snapshot_key(repository: &str, branch: &str) -> String {
    format!("{}@{}", repository, branch)
}

#[async_trait]
impl SourceConnection for MemorySourceConnection {
    async fn fetch(
        &self,
        connection: &ConnectionHandle,
        request: &SourceRequest,
    ) -> Result<FileMap> {
        self.check_connection(connection)?;

        let key = snapshot_key(&format!("{}/{}", request.owner, request.repo), &request.branch);
        self.snapshots
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(format!("repository snapshot '{}'", key)))
    }

    async fn register_trigger(
        &self,
        connection: &ConnectionHandle,
        registration: TriggerRegistration,
    ) -> Result<()> {
        self.check_connection(connection)?;
        self.registrations.write().await.push(registration);
        Ok(())
    }
}

/// Reads a working tree into a file map
///
/// Paths are relative to `root` with `/` separators. `.git` directories are
/// skipped and file contents are kept as raw bytes.
pub async fn snapshot_from_dir(root: &Path) -> std::io::Result<FileMap> {
    let mut files = FileMap::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;

            if file_type.is_dir() {
                if entry.file_name() != ".git" {
                    pending.push(path);
                }
                continue;
            }

            if !file_type.is_file() {
                continue;
            }

            let contents = tokio::fs::read(&path).await?;
            let relative = path
                .strip_prefix(root)
                .map_err(|e| std::io::Error::other(e.to_string()))?
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.insert(relative, contents);
        }
    }

    Ok(files)
}
