//! Identity and connection handles

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Execution identity a pipeline run acts as
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityHandle {
    pub id: Uuid,
    pub name: String,
}

/// Reference to a source connection
///
/// The reference doubles as the resource identifier grants are scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionHandle {
    pub reference: String,
}

impl ConnectionHandle {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }
}
