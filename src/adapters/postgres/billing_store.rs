//! PostgreSQL implementation of BillingStore.
//!
//! Provides persistent storage for Transaction and PlanGrant aggregates
//! using PostgreSQL.

use crate::domain::billing::{CurrencyCode, Money, Plan, PlanGrant, PlanType, Transaction, TransactionStatus};
use crate::domain::foundation::{DomainError, ErrorCode, GrantId, PlanId, Timestamp, TransactionId, UserId};
use crate::ports::{BillingStore, GrantEffect, TransitionUpdate};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the BillingStore port.
///
/// Uses sqlx for type-safe database operations with connection pooling.
/// `apply_transition` wraps the status update and its grant effect in one
/// database transaction so redeliveries never observe a partial write.
pub struct PostgresBillingStore {
    pool: PgPool,
}

impl PostgresBillingStore {
    /// Creates a new PostgresBillingStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment transaction.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    external_id: String,
    user_id: String,
    plan_id: Uuid,
    amount: BigDecimal,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let status = parse_status(&row.status)?;
        let amount = row_money(row.amount, &row.currency)?;

        Ok(Transaction {
            id: TransactionId::from_uuid(row.id),
            external_id: row.external_id,
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            plan_id: PlanId::from_uuid(row.plan_id),
            amount,
            status,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Database row representation of a plan grant.
#[derive(Debug, sqlx::FromRow)]
struct PlanGrantRow {
    id: Uuid,
    user_id: String,
    plan_id: Uuid,
    transaction_id: Uuid,
    starts_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    active: bool,
    emails_sent: i64,
}

impl TryFrom<PlanGrantRow> for PlanGrant {
    type Error = DomainError;

    fn try_from(row: PlanGrantRow) -> Result<Self, Self::Error> {
        Ok(PlanGrant {
            id: GrantId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            plan_id: PlanId::from_uuid(row.plan_id),
            transaction_id: TransactionId::from_uuid(row.transaction_id),
            starts_at: Timestamp::from_datetime(row.starts_at),
            expires_at: Timestamp::from_datetime(row.expires_at),
            active: row.active,
            emails_sent: row.emails_sent,
        })
    }
}

/// Database row representation of a plan catalog entry.
#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: Uuid,
    name: String,
    plan_type: String,
    emails_included: i64,
    subscriber_limit: i64,
    price_amount: BigDecimal,
    price_currency: String,
}

impl TryFrom<PlanRow> for Plan {
    type Error = DomainError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        let plan_type = PlanType::parse(&row.plan_type).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid plan_type: {}", e))
        })?;
        let price = row_money(row.price_amount, &row.price_currency)?;

        Plan::new(
            PlanId::from_uuid(row.id),
            row.name,
            plan_type,
            row.emails_included,
            row.subscriber_limit,
            price,
        )
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Invalid plan row: {}", e)))
    }
}

fn parse_status(s: &str) -> Result<TransactionStatus, DomainError> {
    TransactionStatus::parse(s)
        .map_err(|_| DomainError::new(ErrorCode::DatabaseError, format!("Invalid status value: {}", s)))
}

fn row_money(amount: BigDecimal, currency: &str) -> Result<Money, DomainError> {
    let currency = CurrencyCode::new(currency).map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Invalid currency: {}", e))
    })?;
    Money::new(amount, currency)
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Invalid amount: {}", e)))
}

const SELECT_TRANSACTION: &str = r#"
    SELECT id, external_id, user_id, plan_id, amount, currency, status, created_at, updated_at
    FROM transactions
    WHERE external_id = $1
"#;

const SELECT_CURRENT_GRANT: &str = r#"
    SELECT id, user_id, plan_id, transaction_id, starts_at, expires_at, active, emails_sent
    FROM plan_grants
    WHERE user_id = $1 AND active
    ORDER BY starts_at DESC
    LIMIT 1
"#;

#[async_trait]
impl BillingStore for PostgresBillingStore {
    async fn find_transaction(&self, external_id: &str) -> Result<Option<Transaction>, DomainError> {
        let row: Option<TransactionRow> = sqlx::query_as(SELECT_TRANSACTION)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Failed to find transaction: {}", e))
            })?;

        row.map(Transaction::try_from).transpose()
    }

    async fn save_transaction(&self, transaction: &Transaction) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, external_id, user_id, plan_id, amount, currency, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(&transaction.external_id)
        .bind(transaction.user_id.as_str())
        .bind(transaction.plan_id.as_uuid())
        .bind(transaction.amount.amount())
        .bind(transaction.amount.currency().as_str())
        .bind(transaction.status.as_str())
        .bind(transaction.created_at.as_datetime())
        .bind(transaction.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("transactions_external_id_key") {
                    return DomainError::new(
                        ErrorCode::DuplicateExternalId,
                        format!("Payment reference already exists: {}", transaction.external_id),
                    );
                }
            }
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to save transaction: {}", e))
        })?;

        Ok(())
    }

    async fn current_grant(&self, user_id: &UserId) -> Result<Option<PlanGrant>, DomainError> {
        let row: Option<PlanGrantRow> = sqlx::query_as(SELECT_CURRENT_GRANT)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Failed to find grant: {}", e))
            })?;

        row.map(PlanGrant::try_from).transpose()
    }

    async fn save_grant(&self, grant: &PlanGrant) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO plan_grants (
                id, user_id, plan_id, transaction_id, starts_at, expires_at, active, emails_sent
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                expires_at = EXCLUDED.expires_at,
                active = EXCLUDED.active,
                emails_sent = EXCLUDED.emails_sent
            "#,
        )
        .bind(grant.id.as_uuid())
        .bind(grant.user_id.as_str())
        .bind(grant.plan_id.as_uuid())
        .bind(grant.transaction_id.as_uuid())
        .bind(grant.starts_at.as_datetime())
        .bind(grant.expires_at.as_datetime())
        .bind(grant.active)
        .bind(grant.emails_sent)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to save grant: {}", e))
        })?;

        Ok(())
    }

    async fn apply_transition(&self, update: TransitionUpdate) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to start transaction: {}", e))
        })?;

        let result = sqlx::query(
            r#"
            UPDATE transactions SET
                status = $2,
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(update.transaction.id.as_uuid())
        .bind(update.transaction.status.as_str())
        .bind(update.transaction.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to update transaction: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::TransactionNotFound,
                format!("Transaction not found: {}", update.transaction.id),
            ));
        }

        match update.effect {
            GrantEffect::None => {}
            GrantEffect::Activate { grant, supersedes } => {
                if let Some(superseded_id) = supersedes {
                    sqlx::query("UPDATE plan_grants SET active = FALSE WHERE id = $1")
                        .bind(superseded_id.as_uuid())
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| {
                            DomainError::new(
                                ErrorCode::DatabaseError,
                                format!("Failed to supersede grant: {}", e),
                            )
                        })?;
                }

                sqlx::query(
                    r#"
                    INSERT INTO plan_grants (
                        id, user_id, plan_id, transaction_id, starts_at, expires_at, active, emails_sent
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    "#,
                )
                .bind(grant.id.as_uuid())
                .bind(grant.user_id.as_str())
                .bind(grant.plan_id.as_uuid())
                .bind(grant.transaction_id.as_uuid())
                .bind(grant.starts_at.as_datetime())
                .bind(grant.expires_at.as_datetime())
                .bind(grant.active)
                .bind(grant.emails_sent)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    DomainError::new(ErrorCode::DatabaseError, format!("Failed to insert grant: {}", e))
                })?;
            }
            GrantEffect::Deactivate { grant_id } => {
                sqlx::query("UPDATE plan_grants SET active = FALSE WHERE id = $1")
                    .bind(grant_id.as_uuid())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        DomainError::new(
                            ErrorCode::DatabaseError,
                            format!("Failed to deactivate grant: {}", e),
                        )
                    })?;
            }
        }

        tx.commit().await.map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to commit transaction: {}", e))
        })?;

        Ok(())
    }

    async fn find_plan(&self, plan_id: &PlanId) -> Result<Option<Plan>, DomainError> {
        let row: Option<PlanRow> = sqlx::query_as(
            r#"
            SELECT id, name, plan_type, emails_included, subscriber_limit, price_amount, price_currency
            FROM plans
            WHERE id = $1
            "#,
        )
        .bind(plan_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find plan: {}", e))
        })?;

        row.map(Plan::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_status_accepts_all_lifecycle_values() {
        assert_eq!(parse_status("pending").unwrap(), TransactionStatus::Pending);
        assert_eq!(parse_status("completed").unwrap(), TransactionStatus::Completed);
        assert_eq!(parse_status("failed").unwrap(), TransactionStatus::Failed);
        assert_eq!(parse_status("refunded").unwrap(), TransactionStatus::Refunded);
    }

    #[test]
    fn parse_status_rejects_invalid_values() {
        assert!(parse_status("invalid").is_err());
        assert!(parse_status("").is_err());
    }

    #[test]
    fn status_round_trips_through_storage_strings() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Completed,
            TransactionStatus::Failed,
            TransactionStatus::Refunded,
        ] {
            assert_eq!(parse_status(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn row_money_builds_typed_amounts() {
        let amount = BigDecimal::from(500);
        let money = row_money(amount, "RUB").unwrap();
        assert_eq!(money.currency().as_str(), "RUB");
    }

    #[test]
    fn row_money_rejects_bad_currency() {
        assert!(row_money(BigDecimal::from(1), "rubles").is_err());
    }

    #[test]
    fn transaction_row_round_trips() {
        let row = TransactionRow {
            id: Uuid::new_v4(),
            external_id: "pay_1".to_string(),
            user_id: "user-123".to_string(),
            plan_id: Uuid::new_v4(),
            amount: BigDecimal::from(500),
            currency: "RUB".to_string(),
            status: "pending".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let transaction = Transaction::try_from(row).unwrap();
        assert_eq!(transaction.external_id, "pay_1");
        assert_eq!(transaction.status, TransactionStatus::Pending);
    }

    #[test]
    fn transaction_row_rejects_unknown_status() {
        let row = TransactionRow {
            id: Uuid::new_v4(),
            external_id: "pay_1".to_string(),
            user_id: "user-123".to_string(),
            plan_id: Uuid::new_v4(),
            amount: BigDecimal::from(500),
            currency: "RUB".to_string(),
            status: "charged".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(Transaction::try_from(row).is_err());
    }

    #[test]
    fn grant_row_round_trips() {
        let row = PlanGrantRow {
            id: Uuid::new_v4(),
            user_id: "user-123".to_string(),
            plan_id: Uuid::new_v4(),
            transaction_id: Uuid::new_v4(),
            starts_at: Utc::now(),
            expires_at: Utc::now(),
            active: true,
            emails_sent: 42,
        };

        let grant = PlanGrant::try_from(row).unwrap();
        assert!(grant.active);
        assert_eq!(grant.emails_sent, 42);
    }

    #[test]
    fn plan_row_round_trips() {
        let row = PlanRow {
            id: Uuid::new_v4(),
            name: "Letters 1000".to_string(),
            plan_type: "letters".to_string(),
            emails_included: 1000,
            subscriber_limit: 500,
            price_amount: BigDecimal::from(500),
            price_currency: "RUB".to_string(),
        };

        let plan = Plan::try_from(row).unwrap();
        assert_eq!(plan.plan_type, PlanType::Letters);
        assert_eq!(plan.emails_included, 1000);
    }
}
