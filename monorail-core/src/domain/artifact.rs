//! Artifact domain types
//!
//! Artifacts are immutable blobs handed from one stage to the next through the
//! shared artifact location. Their contents are a map of repository-relative
//! file paths to raw file bytes.

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Files carried by an artifact, keyed by relative path
pub type FileMap = BTreeMap<String, Vec<u8>>;

/// Handle to a resolved, pre-existing artifact location
///
/// One location is shared read/write by every pipeline; each pipeline writes
/// under its own project prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactLocationHandle {
    pub name: String,
}

impl ArtifactLocationHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Resource identifier of the location root
    pub fn namespace(&self) -> String {
        format!("artifact:{}", self.name)
    }

    /// Resource pattern covering every object in the location
    pub fn namespace_pattern(&self) -> String {
        format!("{}/*", self.namespace())
    }

    /// Resource identifier of a single object
    pub fn object_resource(&self, key: &str) -> String {
        format!("{}/{}", self.namespace(), key)
    }
}

/// Named slot of the artifact handoff chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactSlot {
    /// Produced by Source, consumed by Build
    SourceOutput,
    /// Produced by Build, consumed by Deploy-plan
    BuildOutput,
}

impl ArtifactSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactSlot::SourceOutput => "sourceOutput",
            ArtifactSlot::BuildOutput => "buildOutput",
        }
    }
}

impl std::fmt::Display for ArtifactSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An artifact fully materialized in the artifact location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub slot: ArtifactSlot,
    pub location: String,
    pub key: String,
    pub size_bytes: u64,
}

impl Artifact {
    /// Object key of a run's artifact: `<project>/<run-id>/<slot>`
    pub fn object_key(project_name: &str, run_id: Uuid, slot: ArtifactSlot) -> String {
        format!("{}/{}/{}", project_name, run_id, slot)
    }
}

/// Serializes a file map into artifact bytes
///
/// The artifact is a JSON object of path to base64 contents, so binary files
/// survive the handoff unchanged.
pub fn encode_files(files: &FileMap) -> Result<Vec<u8>, serde_json::Error> {
    let encoded: BTreeMap<&str, String> = files
        .iter()
        .map(|(path, contents)| (path.as_str(), general_purpose::STANDARD.encode(contents)))
        .collect();
    serde_json::to_vec(&encoded)
}

/// Deserializes artifact bytes into a file map
pub fn decode_files(bytes: &[u8]) -> Result<FileMap, serde_json::Error> {
    let encoded: BTreeMap<String, String> = serde_json::from_slice(bytes)?;

    encoded
        .into_iter()
        .map(|(path, contents)| {
            general_purpose::STANDARD
                .decode(&contents)
                .map_err(|err| {
                    <serde_json::Error as serde::de::Error>::custom(format!(
                        "contents of '{}' are not base64: {}",
                        path, err
                    ))
                })
                .map(|decoded| (path, decoded))
        })
        .collect()
}
