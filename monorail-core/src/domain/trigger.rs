//! Trigger domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::spec::project_dir;

/// An incoming change notification from the source connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub branch: String,
    pub changed_paths: Vec<String>,
}

impl ChangeEvent {
    pub fn new<I, S>(branch: impl Into<String>, changed_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            branch: branch.into(),
            changed_paths: changed_paths.into_iter().map(Into::into).collect(),
        }
    }
}

/// Predicate deciding whether a change event starts a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerFilter {
    pub included_path_prefixes: BTreeSet<String>,
    pub included_branches: BTreeSet<String>,
}

impl TriggerFilter {
    /// Filter of a project pipeline: `projects/<project>/*` on a single branch
    pub fn for_project(project_name: &str, branch: &str) -> Self {
        Self {
            included_path_prefixes: BTreeSet::from([format!("{}/*", project_dir(project_name))]),
            included_branches: BTreeSet::from([branch.to_string()]),
        }
    }
}

/// Outcome of evaluating a change event against a filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum TriggerDecision {
    /// The pipeline fires; lists the changed paths that matched
    Fire { matched_paths: Vec<String> },
    /// The pipeline does not fire. Not an error.
    Mismatch { reason: MismatchReason },
}

impl TriggerDecision {
    pub fn fires(&self) -> bool {
        matches!(self, TriggerDecision::Fire { .. })
    }
}

/// Why a change event did not fire a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchReason {
    BranchExcluded,
    NoChangedPaths,
    NoPathMatched,
}

impl std::fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MismatchReason::BranchExcluded => write!(f, "branch not included"),
            MismatchReason::NoChangedPaths => write!(f, "no changed paths"),
            MismatchReason::NoPathMatched => write!(f, "no changed path matched"),
        }
    }
}
