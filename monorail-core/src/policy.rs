//! Permission policy builder
//!
//! Derives the grants a pipeline's execution identity needs. There are exactly
//! four categories:
//!
//! 1. Source connection: every connection action, on that one connection.
//! 2. Artifact read/list: the artifact location root and its objects.
//! 3. Identity lifecycle: wildcard across resources.
//! 4. Compute function lifecycle: wildcard within the project's function namespace.
//!
//! Categories 3 and 4 are broadened because the deploy provisions identities
//! and functions it cannot name in advance. They are flagged `broadened` so an
//! audit lists them. The function scope narrows to the exact function once the
//! deploy reports it (see [`ResourceScope`]).

use crate::domain::artifact::ArtifactLocationHandle;
use crate::domain::identity::ConnectionHandle;
use crate::domain::permission::{GrantCategory, PermissionGrant, ResourceScope};
use crate::domain::spec::PipelineSpec;

pub const SOURCE_CONNECTION_ACTIONS: &[&str] = &["source-connection:*"];

pub const ARTIFACT_READ_ACTIONS: &[&str] = &["artifact:Get*", "artifact:List*"];

pub const IDENTITY_LIFECYCLE_ACTIONS: &[&str] = &[
    "identity:Get",
    "identity:Create",
    "identity:Tag",
    "identity:AttachPolicy",
    "identity:Pass",
];

pub const FUNCTION_LIFECYCLE_ACTIONS: &[&str] = &[
    "function:Get",
    "function:GetUrlConfig",
    "function:Create",
    "function:CreateUrlConfig",
    "function:AddPermission",
    "function:Tag",
];

/// Action checked before fetching source
pub const USE_CONNECTION_ACTION: &str = "source-connection:UseConnection";
/// Action checked before reading a stage's input artifact
pub const READ_ARTIFACT_ACTION: &str = "artifact:GetObject";
/// Action checked before planning a change set
pub const PASS_IDENTITY_ACTION: &str = "identity:Pass";
/// Action checked before executing a change set
pub const CREATE_FUNCTION_ACTION: &str = "function:Create";

/// Function namespace of a project, the unresolved compute-function scope
pub fn function_namespace(project_name: &str) -> String {
    format!("function:{}/*", project_name)
}

/// Identity resource a project's deploy passes along
pub fn identity_resource(project_name: &str) -> String {
    format!("identity:{}", project_name)
}

/// Builds the grants of a freshly defined pipeline
pub fn build(
    spec: &PipelineSpec,
    artifact_location: &ArtifactLocationHandle,
    connection: &ConnectionHandle,
) -> Vec<PermissionGrant> {
    let scope = ResourceScope::new(function_namespace(&spec.project_name));
    build_with_scope(artifact_location, connection, &scope)
}

/// Builds the grants with the compute-function category drawn from `function_scope`
pub fn build_with_scope(
    artifact_location: &ArtifactLocationHandle,
    connection: &ConnectionHandle,
    function_scope: &ResourceScope,
) -> Vec<PermissionGrant> {
    vec![
        PermissionGrant::allow(
            GrantCategory::SourceConnection,
            SOURCE_CONNECTION_ACTIONS.iter().copied(),
            [connection.reference.clone()],
        ),
        PermissionGrant::allow(
            GrantCategory::ArtifactRead,
            ARTIFACT_READ_ACTIONS.iter().copied(),
            [
                artifact_location.namespace(),
                artifact_location.namespace_pattern(),
            ],
        ),
        PermissionGrant::allow(
            GrantCategory::IdentityLifecycle,
            IDENTITY_LIFECYCLE_ACTIONS.iter().copied(),
            ["*"],
        )
        .broadened(),
        PermissionGrant::allow(
            GrantCategory::FunctionLifecycle,
            FUNCTION_LIFECYCLE_ACTIONS.iter().copied(),
            [function_scope.current()],
        )
        .broadened(),
    ]
}

/// Grants an audit must call out as deliberate broadenings
pub fn broadened_grants(grants: &[PermissionGrant]) -> Vec<&PermissionGrant> {
    grants.iter().filter(|g| g.broadened).collect()
}
