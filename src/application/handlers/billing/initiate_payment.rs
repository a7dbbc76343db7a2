//! InitiatePaymentHandler - Command handler for starting a plan purchase.

use std::sync::Arc;

use tracing::info;

use crate::domain::billing::{BillingError, Transaction};
use crate::domain::foundation::{PlanId, TransactionId, UserId};
use crate::ports::{BillingStore, Clock};

/// Command to initiate payment for a plan.
#[derive(Debug, Clone)]
pub struct InitiatePaymentCommand {
    pub user_id: UserId,
    pub plan_id: PlanId,
}

/// Result of successful payment initiation.
#[derive(Debug, Clone)]
pub struct InitiatePaymentResult {
    pub transaction: Transaction,
}

/// Handler for initiating a plan purchase.
///
/// Creates a pending transaction priced from the plan catalog. The gateway
/// later reports the result through a notification carrying the transaction's
/// payment reference.
pub struct InitiatePaymentHandler {
    store: Arc<dyn BillingStore>,
    clock: Arc<dyn Clock>,
}

impl InitiatePaymentHandler {
    pub fn new(store: Arc<dyn BillingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn handle(
        &self,
        cmd: InitiatePaymentCommand,
    ) -> Result<InitiatePaymentResult, BillingError> {
        // 1. Price the purchase from the plan catalog
        let plan = self
            .store
            .find_plan(&cmd.plan_id)
            .await?
            .ok_or(BillingError::PlanNotFound(cmd.plan_id))?;

        // 2. Create the pending transaction with a fresh payment reference
        let transaction_id = TransactionId::new();
        let external_id = format!("pay_{}", transaction_id.as_uuid().simple());
        let transaction = Transaction::initiate(
            transaction_id,
            &external_id,
            cmd.user_id,
            cmd.plan_id,
            plan.price.clone(),
            self.clock.now(),
        )?;

        // 3. Persist it so the gateway notification can find it later
        self.store.save_transaction(&transaction).await?;

        info!(
            external_id = %transaction.external_id,
            plan = %plan.name,
            amount = %transaction.amount,
            "Initiated payment"
        );
        Ok(InitiatePaymentResult { transaction })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{Money, Plan, PlanGrant, PlanType, TransactionStatus};
    use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
    use crate::ports::{BillingStore, SystemClock, TransitionUpdate};
    use async_trait::async_trait;
    use std::sync::Mutex;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementation
    // ════════════════════════════════════════════════════════════════════════════

    struct MockBillingStore {
        plans: Vec<Plan>,
        saved_transactions: Mutex<Vec<Transaction>>,
        fail_save: bool,
    }

    impl MockBillingStore {
        fn with_plan(plan: Plan) -> Self {
            Self {
                plans: vec![plan],
                saved_transactions: Mutex::new(Vec::new()),
                fail_save: false,
            }
        }

        fn empty() -> Self {
            Self {
                plans: Vec::new(),
                saved_transactions: Mutex::new(Vec::new()),
                fail_save: false,
            }
        }

        fn failing(plan: Plan) -> Self {
            let mut store = Self::with_plan(plan);
            store.fail_save = true;
            store
        }

        fn saved_transactions(&self) -> Vec<Transaction> {
            self.saved_transactions.lock().unwrap().clone()
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

        async fn save_transaction(&self, transaction: &Transaction) -> Result<(), DomainError> {
            if self.fail_save {
                return Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    "Simulated save failure",
                ));
            }
            self.saved_transactions
                .lock()
                .unwrap()
                .push(transaction.clone());
            Ok(())
        }

        async fn current_grant(&self, _user_id: &UserId) -> Result<Option<PlanGrant>, DomainError> {
            Ok(None)
        }

        async fn save_grant(&self, _grant: &PlanGrant) -> Result<(), DomainError> {
            Ok(())
        }

        async fn apply_transition(&self, _update: TransitionUpdate) -> Result<(), DomainError> {
            Ok(())
        }

        async fn find_plan(&self, plan_id: &PlanId) -> Result<Option<Plan>, DomainError> {
            Ok(self.plans.iter().find(|p| p.id == *plan_id).cloned())
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn test_user() -> UserId {
        UserId::new("user-123").unwrap()
    }

    fn letters_plan() -> Plan {
        Plan::new(
            PlanId::new(),
            "Letters 1000",
            PlanType::Letters,
            1000,
            500,
            Money::parse("500.00", "RUB").unwrap(),
        )
        .unwrap()
    }

    fn handler(store: Arc<MockBillingStore>) -> InitiatePaymentHandler {
        InitiatePaymentHandler::new(store, Arc::new(SystemClock))
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn creates_pending_transaction_priced_from_plan() {
        let plan = letters_plan();
        let store = Arc::new(MockBillingStore::with_plan(plan.clone()));
        let handler = handler(store.clone());

        let result = handler
            .handle(InitiatePaymentCommand {
                user_id: test_user(),
                plan_id: plan.id,
            })
            .await
            .unwrap();

        assert_eq!(result.transaction.status, TransactionStatus::Pending);
        assert_eq!(result.transaction.amount, plan.price);
        assert!(result.transaction.external_id.starts_with("pay_"));
        assert_eq!(store.saved_transactions().len(), 1);
    }

    #[tokio::test]
    async fn payment_references_are_unique_per_initiation() {
        let plan = letters_plan();
        let store = Arc::new(MockBillingStore::with_plan(plan.clone()));
        let handler = handler(store);

        let first = handler
            .handle(InitiatePaymentCommand {
                user_id: test_user(),
                plan_id: plan.id,
            })
            .await
            .unwrap();
        let second = handler
            .handle(InitiatePaymentCommand {
                user_id: test_user(),
                plan_id: plan.id,
            })
            .await
            .unwrap();

        assert_ne!(
            first.transaction.external_id,
            second.transaction.external_id
        );
    }

    #[tokio::test]
    async fn transaction_created_at_comes_from_clock() {
        let plan = letters_plan();
        let store = Arc::new(MockBillingStore::with_plan(plan.clone()));
        let handler = handler(store);

        let before = Timestamp::now();
        let result = handler
            .handle(InitiatePaymentCommand {
                user_id: test_user(),
                plan_id: plan.id,
            })
            .await
            .unwrap();

        assert!(!result.transaction.created_at.is_before(&before));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Failure Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unknown_plan_is_rejected() {
        let store = Arc::new(MockBillingStore::empty());
        let handler = handler(store.clone());

        let result = handler
            .handle(InitiatePaymentCommand {
                user_id: test_user(),
                plan_id: PlanId::new(),
            })
            .await;

        assert!(matches!(result, Err(BillingError::PlanNotFound(_))));
        assert!(store.saved_transactions().is_empty());
    }

    #[tokio::test]
    async fn save_failure_propagates() {
        let plan = letters_plan();
        let store = Arc::new(MockBillingStore::failing(plan.clone()));
        let handler = handler(store);

        let result = handler
            .handle(InitiatePaymentCommand {
                user_id: test_user(),
                plan_id: plan.id,
            })
            .await;

        let err = result.unwrap_err();
        assert!(err.is_retryable());
    }
}
