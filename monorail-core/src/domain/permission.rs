//! Permission grant domain types
//!
//! Grants are `(actions, resources, effect)` tuples attached to a pipeline's
//! execution identity. Action and resource patterns ending in `*` match by
//! prefix; any other pattern matches only the identical string.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::error::{PipelineError, Result};

/// Effect of a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// The four grant categories a pipeline identity holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrantCategory {
    /// Use of the specific source connection
    SourceConnection,
    /// Read/list of the shared artifact location
    ArtifactRead,
    /// Creation and wiring of identities provisioned by the deploy
    IdentityLifecycle,
    /// Creation and configuration of the deployed compute function
    FunctionLifecycle,
}

impl std::fmt::Display for GrantCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrantCategory::SourceConnection => write!(f, "SourceConnection"),
            GrantCategory::ArtifactRead => write!(f, "ArtifactRead"),
            GrantCategory::IdentityLifecycle => write!(f, "IdentityLifecycle"),
            GrantCategory::FunctionLifecycle => write!(f, "FunctionLifecycle"),
        }
    }
}

/// A single permission grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub category: GrantCategory,
    pub actions: BTreeSet<String>,
    pub resources: BTreeSet<String>,
    pub effect: Effect,

    /// Wildcarded beyond a single named resource; reported by audits
    #[serde(default)]
    pub broadened: bool,
}

impl PermissionGrant {
    pub fn allow<A, R>(category: GrantCategory, actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            category,
            actions: actions.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().map(Into::into).collect(),
            effect: Effect::Allow,
            broadened: false,
        }
    }

    pub fn deny<A, R>(category: GrantCategory, actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            effect: Effect::Deny,
            ..Self::allow(category, actions, resources)
        }
    }

    /// Marks the grant as a deliberate broadening
    pub fn broadened(mut self) -> Self {
        self.broadened = true;
        self
    }

    /// Whether this grant covers `action` on `resource`, regardless of effect
    pub fn covers(&self, action: &str, resource: &str) -> bool {
        self.actions.iter().any(|p| pattern_matches(p, action))
            && self.resources.iter().any(|p| pattern_matches(p, resource))
    }
}

/// Matches a value against a grant pattern
pub fn pattern_matches(pattern: &str, value: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => value.starts_with(prefix),
        None => pattern == value,
    }
}

/// Evaluates a grant set: an explicit deny wins over any allow
pub fn is_allowed(grants: &[PermissionGrant], action: &str, resource: &str) -> bool {
    let mut allowed = false;
    for grant in grants.iter().filter(|g| g.covers(action, resource)) {
        match grant.effect {
            Effect::Deny => return false,
            Effect::Allow => allowed = true,
        }
    }
    allowed
}

/// Resource scope resolved lazily at first use
///
/// Starts as a wildcard `fallback` pattern because the target resource is
/// only named at runtime. The first resolved identifier is cached and used
/// for the rest of the owner's lifetime.
#[derive(Debug)]
pub struct ResourceScope {
    fallback: String,
    resolved: OnceLock<String>,
}

impl ResourceScope {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
            resolved: OnceLock::new(),
        }
    }

    /// The narrowest resource identifier known so far
    pub fn current(&self) -> &str {
        self.resolved.get().map(String::as_str).unwrap_or(&self.fallback)
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Narrows the scope to `resource`
    ///
    /// The identifier must fall inside the fallback pattern. Once resolved the
    /// cached identifier is kept; later calls return it unchanged.
    pub fn resolve(&self, resource: &str) -> Result<&str> {
        if !pattern_matches(&self.fallback, resource) {
            return Err(PipelineError::Configuration(format!(
                "resource '{}' is outside scope '{}'",
                resource, self.fallback
            )));
        }

        Ok(self.resolved.get_or_init(|| resource.to_string()).as_str())
    }
}
