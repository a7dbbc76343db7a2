//! In-memory billing store.
//!
//! Stores transactions, grants, and the plan catalog in process memory.
//! Useful for tests and single-process development deployments; the
//! Postgres adapter covers everything else.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{Plan, PlanGrant, Transaction};
use crate::domain::foundation::{DomainError, ErrorCode, GrantId, PlanId, UserId};
use crate::ports::{BillingStore, GrantEffect, TransitionUpdate};

/// All billing state behind one lock so `apply_transition` stays atomic.
#[derive(Debug, Default)]
struct StoreState {
    /// Transactions keyed by gateway payment reference.
    transactions: HashMap<String, Transaction>,
    grants: HashMap<GrantId, PlanGrant>,
    plans: HashMap<PlanId, Plan>,
}

/// In-memory implementation of the BillingStore port.
///
/// Mirrors the Postgres adapter's semantics: unique payment references,
/// all-or-nothing transitions, at most one active grant per user.
#[derive(Debug, Clone)]
pub struct MemoryBillingStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryBillingStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
        }
    }

    /// Create a store seeded with a plan catalog.
    pub async fn with_plans(plans: Vec<Plan>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.write().await;
            for plan in plans {
                state.plans.insert(plan.id, plan);
            }
        }
        store
    }

    /// Insert or replace a catalog entry.
    pub async fn insert_plan(&self, plan: Plan) {
        self.state.write().await.plans.insert(plan.id, plan);
    }

    /// Clear all stored data (useful for tests)
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.transactions.clear();
        state.grants.clear();
        state.plans.clear();
    }

    /// Get the number of stored transactions
    pub async fn transaction_count(&self) -> usize {
        self.state.read().await.transactions.len()
    }

    /// Get the number of stored grants
    pub async fn grant_count(&self) -> usize {
        self.state.read().await.grants.len()
    }

    /// Fetch a grant by ID regardless of active flag (for assertions).
    pub async fn grant(&self, grant_id: &GrantId) -> Option<PlanGrant> {
        self.state.read().await.grants.get(grant_id).cloned()
    }
}

impl Default for MemoryBillingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BillingStore for MemoryBillingStore {
    async fn find_transaction(
        &self,
        external_id: &str,
    ) -> Result<Option<Transaction>, DomainError> {
        let state = self.state.read().await;
        Ok(state.transactions.get(external_id).cloned())
    }

    async fn save_transaction(&self, transaction: &Transaction) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if state.transactions.contains_key(&transaction.external_id) {
            return Err(DomainError::new(
                ErrorCode::DuplicateExternalId,
                format!(
                    "Payment reference already exists: {}",
                    transaction.external_id
                ),
            ));
        }
        state
            .transactions
            .insert(transaction.external_id.clone(), transaction.clone());
        Ok(())
    }

    async fn current_grant(&self, user_id: &UserId) -> Result<Option<PlanGrant>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .grants
            .values()
            .filter(|g| g.active && g.user_id == *user_id)
            .max_by_key(|g| g.starts_at)
            .cloned())
    }

    async fn save_grant(&self, grant: &PlanGrant) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        state.grants.insert(grant.id, grant.clone());
        Ok(())
    }

    async fn apply_transition(&self, update: TransitionUpdate) -> Result<(), DomainError> {
        let mut state = self.state.write().await;

        let stored = state
            .transactions
            .get_mut(&update.transaction.external_id)
            .filter(|t| t.id == update.transaction.id)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::TransactionNotFound,
                    format!("Transaction not found: {}", update.transaction.id),
                )
            })?;
        *stored = update.transaction.clone();

        match update.effect {
            GrantEffect::None => {}
            GrantEffect::Activate { grant, supersedes } => {
                if let Some(superseded_id) = supersedes {
                    if let Some(old) = state.grants.get_mut(&superseded_id) {
                        old.active = false;
                    }
                }
                state.grants.insert(grant.id, grant);
            }
            GrantEffect::Deactivate { grant_id } => {
                if let Some(grant) = state.grants.get_mut(&grant_id) {
                    grant.active = false;
                }
            }
        }

        Ok(())
    }

    async fn find_plan(&self, plan_id: &PlanId) -> Result<Option<Plan>, DomainError> {
        let state = self.state.read().await;
        Ok(state.plans.get(plan_id).cloned())
    }
}
