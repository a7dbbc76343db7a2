//! GetPlanInfoHandler - Query handler for a user's current plan standing.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::billing::{BillingError, PlanType};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{BillingStore, Clock};

/// Query for a user's current plan standing.
#[derive(Debug, Clone)]
pub struct GetPlanInfoQuery {
    pub user_id: UserId,
}

/// Plan standing for UI display.
#[derive(Debug, Clone, Serialize)]
pub struct PlanInfoView {
    pub plan_name: String,
    pub plan_type: PlanType,
    pub emails_remaining: i64,
    pub subscriber_limit: i64,
    pub unmetered_sending: bool,
    pub expires_at: Timestamp,
    pub is_expired: bool,
}

/// Result of successful plan info query.
pub type GetPlanInfoResult = Option<PlanInfoView>;

/// Handler for retrieving a user's plan standing.
///
/// Joins the current grant with its plan catalog entry, or returns `None`
/// if the user has never purchased a plan.
pub struct GetPlanInfoHandler {
    store: Arc<dyn BillingStore>,
    clock: Arc<dyn Clock>,
}

impl GetPlanInfoHandler {
    pub fn new(store: Arc<dyn BillingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn handle(&self, query: GetPlanInfoQuery) -> Result<GetPlanInfoResult, BillingError> {
        let Some(grant) = self.store.current_grant(&query.user_id).await? else {
            return Ok(None);
        };

        let plan = self
            .store
            .find_plan(&grant.plan_id)
            .await?
            .ok_or(BillingError::PlanNotFound(grant.plan_id))?;

        let now = self.clock.now();
        Ok(Some(PlanInfoView {
            plan_name: plan.name.clone(),
            plan_type: plan.plan_type,
            emails_remaining: plan.emails_remaining(grant.emails_sent),
            subscriber_limit: plan.subscriber_limit,
            unmetered_sending: plan.unmetered_sending(),
            expires_at: grant.expires_at,
            is_expired: grant.is_expired(&now),
        }))
    }
}
