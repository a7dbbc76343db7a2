//! RecordUsageHandler - Command handler for charging sent emails to the current grant.

use std::sync::Arc;

use tracing::debug;

use crate::domain::billing::BillingError;
use crate::domain::foundation::UserId;
use crate::ports::BillingStore;

/// Command to record sent emails against a user's current grant.
#[derive(Debug, Clone)]
pub struct RecordUsageCommand {
    pub user_id: UserId,
    pub emails: u32,
}

/// Result of successful usage recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordUsageResult {
    /// Total emails charged to the grant after this recording.
    pub emails_sent: i64,
}

/// Handler for recording email usage.
///
/// Usage accrues on the grant itself so that a superseding purchase starts
/// with a fresh counter.
pub struct RecordUsageHandler {
    store: Arc<dyn BillingStore>,
}

impl RecordUsageHandler {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: RecordUsageCommand) -> Result<RecordUsageResult, BillingError> {
        let Some(mut grant) = self.store.current_grant(&cmd.user_id).await? else {
            return Err(BillingError::NoActiveGrant(cmd.user_id));
        };

        grant.record_emails(cmd.emails);
        self.store.save_grant(&grant).await?;

        debug!(
            user_id = %cmd.user_id,
            emails = cmd.emails,
            total = grant.emails_sent,
            "Recorded email usage"
        );
        Ok(RecordUsageResult {
            emails_sent: grant.emails_sent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{Plan, PlanGrant, Transaction};
    use crate::domain::foundation::{
        DomainError, ErrorCode, GrantId, PlanId, Timestamp, TransactionId,
    };
    use crate::ports::TransitionUpdate;
    use async_trait::async_trait;
    use std::sync::Mutex;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementation
    // ════════════════════════════════════════════════════════════════════════════

    struct MockBillingStore {
        grants: Mutex<Vec<PlanGrant>>,
        fail_save: bool,
    }

    impl MockBillingStore {
        fn new() -> Self {
            Self {
                grants: Mutex::new(Vec::new()),
                fail_save: false,
            }
        }

        fn with_grant(grant: PlanGrant) -> Self {
            Self {
                grants: Mutex::new(vec![grant]),
                fail_save: false,
            }
        }

        fn failing(grant: PlanGrant) -> Self {
            let mut store = Self::with_grant(grant);
            store.fail_save = true;
            store
        }

        fn grant(&self, id: GrantId) -> Option<PlanGrant> {
            self.grants.lock().unwrap().iter().find(|g| g.id == id).cloned()
        }
    }

    #[async_trait]
    impl BillingStore for MockBillingStore {
        async fn find_transaction(
            &self,
            _external_id: &str,
        ) -> Result<Option<Transaction>, DomainError> {
            Ok(None)
        }

        async fn save_transaction(&self, _transaction: &Transaction) -> Result<(), DomainError> {
            Ok(())
        }

        async fn current_grant(&self, user_id: &UserId) -> Result<Option<PlanGrant>, DomainError> {
            Ok(self
                .grants
                .lock()
                .unwrap()
                .iter()
                .find(|g| g.active && g.user_id == *user_id)
                .cloned())
        }

        async fn save_grant(&self, grant: &PlanGrant) -> Result<(), DomainError> {
            if self.fail_save {
                return Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    "Simulated save failure",
                ));
            }
            let mut grants = self.grants.lock().unwrap();
            match grants.iter_mut().find(|g| g.id == grant.id) {
                Some(existing) => *existing = grant.clone(),
                None => grants.push(grant.clone()),
            }
            Ok(())
        }

        async fn apply_transition(&self, _update: TransitionUpdate) -> Result<(), DomainError> {
            Ok(())
        }

        async fn find_plan(&self, _plan_id: &PlanId) -> Result<Option<Plan>, DomainError> {
            Ok(None)
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn test_user() -> UserId {
        UserId::new("user-123").unwrap()
    }

    fn active_grant() -> PlanGrant {
        PlanGrant::activate(
            GrantId::new(),
            test_user(),
            PlanId::new(),
            TransactionId::new(),
            Timestamp::now(),
            30,
        )
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn adds_emails_to_current_grant() {
        let grant = active_grant();
        let grant_id = grant.id;
        let store = Arc::new(MockBillingStore::with_grant(grant));
        let handler = RecordUsageHandler::new(store.clone());

        let result = handler
            .handle(RecordUsageCommand {
                user_id: test_user(),
                emails: 250,
            })
            .await
            .unwrap();

        assert_eq!(result.emails_sent, 250);
        assert_eq!(store.grant(grant_id).unwrap().emails_sent, 250);
    }

    #[tokio::test]
    async fn usage_accumulates_across_recordings() {
        let store = Arc::new(MockBillingStore::with_grant(active_grant()));
        let handler = RecordUsageHandler::new(store);

        handler
            .handle(RecordUsageCommand {
                user_id: test_user(),
                emails: 150,
            })
            .await
            .unwrap();
        let result = handler
            .handle(RecordUsageCommand {
                user_id: test_user(),
                emails: 250,
            })
            .await
            .unwrap();

        assert_eq!(result.emails_sent, 400);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Failure Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn missing_grant_is_rejected() {
        let store = Arc::new(MockBillingStore::new());
        let handler = RecordUsageHandler::new(store);

        let result = handler
            .handle(RecordUsageCommand {
                user_id: test_user(),
                emails: 10,
            })
            .await;

        assert!(matches!(result, Err(BillingError::NoActiveGrant(_))));
    }

    #[tokio::test]
    async fn save_failure_propagates() {
        let store = Arc::new(MockBillingStore::failing(active_grant()));
        let handler = RecordUsageHandler::new(store);

        let result = handler
            .handle(RecordUsageCommand {
                user_id: test_user(),
                emails: 10,
            })
            .await;

        assert!(result.unwrap_err().is_retryable());
    }
}
