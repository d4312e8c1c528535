//! Deploy plan/apply collaborator
//!
//! Two-phase deploy: `plan` stages a change set against a stack, `apply`
//! executes it. A new plan under the same name replaces the pending one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{CollaboratorError, Result};

/// Result of executing a change set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub stack_name: String,
    pub change_set_id: String,
    /// Resource identifier of the deployed compute function, when the
    /// template provisions one
    pub function_id: Option<String>,
}

/// Collaborator trait for the deploy service
#[async_trait]
pub trait DeployService: Send + Sync {
    /// Creates or replaces change set `change_set_name` on `stack_name`
    ///
    /// Returns the new change set id.
    async fn plan(
        &self,
        stack_name: &str,
        change_set_name: &str,
        template: &str,
    ) -> Result<String>;

    /// Executes the pending change set `change_set_name` on `stack_name`
    async fn apply(&self, stack_name: &str, change_set_name: &str) -> Result<ApplyOutcome>;
}

#[derive(Debug, Clone)]
struct PendingChangeSet {
    id: String,
    template: String,
}

/// A stack as last applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedStack {
    pub template: String,
    pub change_set_id: String,
    pub function_id: String,
}

/// In-memory implementation of DeployService
///
/// Holds at most one pending change set per stack and name. Applying consumes
/// it, so a change set is executed exactly once.
#[derive(Default)]
pub struct MemoryDeployService {
    pending: RwLock<HashMap<(String, String), PendingChangeSet>>,
    stacks: RwLock<HashMap<String, DeployedStack>>,
    plan_calls: AtomicUsize,
    apply_calls: AtomicUsize,
}

impl MemoryDeployService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the pending change set, if one is planned and not yet applied
    pub async fn pending_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
    ) -> Option<String> {
        self.pending
            .read()
            .await
            .get(&(stack_name.to_string(), change_set_name.to_string()))
            .map(|pending| pending.id.clone())
    }

    /// Number of pending change sets across all stacks
    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }

    pub async fn stack(&self, stack_name: &str) -> Option<DeployedStack> {
        self.stacks.read().await.get(stack_name).cloned()
    }

    pub fn plan_calls(&self) -> usize {
        self.plan_calls.load(Ordering::SeqCst)
    }

    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeployService for MemoryDeployService {
    async fn plan(
        &self,
        stack_name: &str,
        change_set_name: &str,
        template: &str,
    ) -> Result<String> {
        self.plan_calls.fetch_add(1, Ordering::SeqCst);

        if template.trim().is_empty() {
            return Err(CollaboratorError::Configuration(format!(
                "template for stack '{}' is empty",
                stack_name
            )));
        }

        let id = Uuid::new_v4().to_string();
        let replaced = self.pending.write().await.insert(
            (stack_name.to_string(), change_set_name.to_string()),
            PendingChangeSet {
                id: id.clone(),
                template: template.to_string(),
            },
        );

        if let Some(previous) = replaced {
            debug!(
                "Change set {} on {} replaced {}",
                change_set_name, stack_name, previous.id
            );
        }

        Ok(id)
    }

    async fn apply(&self, stack_name: &str, change_set_name: &str) -> Result<ApplyOutcome> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);

        let pending = self
            .pending
            .write()
            .await
            .remove(&(stack_name.to_string(), change_set_name.to_string()))
            .ok_or_else(|| {
                CollaboratorError::NotFound(format!(
                    "change set '{}' on stack '{}'",
                    change_set_name, stack_name
                ))
            })?;

        let function_id = format!("function:{}/{}-handler", stack_name, stack_name);
        self.stacks.write().await.insert(
            stack_name.to_string(),
            DeployedStack {
                template: pending.template,
                change_set_id: pending.id.clone(),
                function_id: function_id.clone(),
            },
        );

        Ok(ApplyOutcome {
            stack_name: stack_name.to_string(),
            change_set_id: pending.id,
            function_id: Some(function_id),
        })
    }
}
