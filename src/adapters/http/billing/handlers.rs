//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.
//!
//! The gateway callback is the odd one out: its body is the raw form-field map
//! the gateway posted (signature included) and its success response is the
//! plain-text acknowledgment body, because the gateway string-matches the
//! response to decide whether to redeliver.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Form, Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::handlers::billing::{
    GetPlanInfoQuery, InitiatePaymentCommand, InitiatePaymentHandler, NotificationOutcome,
    ProcessNotificationCommand, ProcessNotificationHandler, RecordUsageCommand,
    RecordUsageHandler, TransactionLocks,
};
use crate::application::handlers::billing::GetPlanInfoHandler;
use crate::domain::billing::{BillingError, NotificationVerifier, Reconciler};
use crate::domain::foundation::{PlanId, UserId};
use crate::ports::{BillingStore, Clock, EventPublisher};

use super::dto::{
    ErrorResponse, InitiatePaymentRequest, InitiatePaymentResponse, PlanInfoResponse,
    RecordUsageRequest, RecordUsageResponse, GATEWAY_ACK,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all billing dependencies.
#[derive(Clone)]
pub struct BillingAppState {
    pub store: Arc<dyn BillingStore>,
    pub clock: Arc<dyn Clock>,
    pub event_publisher: Arc<dyn EventPublisher>,
    verifier: NotificationVerifier,
    locks: Arc<TransactionLocks>,
    entitlement_window_days: u32,
}

impl BillingAppState {
    pub fn new(
        store: Arc<dyn BillingStore>,
        clock: Arc<dyn Clock>,
        event_publisher: Arc<dyn EventPublisher>,
        gateway_secret: impl Into<String>,
        entitlement_window_days: u32,
    ) -> Self {
        Self {
            store,
            clock,
            event_publisher,
            verifier: NotificationVerifier::new(gateway_secret),
            // One registry for the process lifetime, so concurrent callback
            // deliveries for the same payment serialize against each other
            locks: Arc::new(TransactionLocks::new()),
            entitlement_window_days,
        }
    }

    pub fn process_notification_handler(&self) -> ProcessNotificationHandler {
        ProcessNotificationHandler::new(
            self.verifier.clone(),
            Reconciler::new(
                self.store.clone(),
                self.clock.clone(),
                self.entitlement_window_days,
            ),
            self.locks.clone(),
            self.event_publisher.clone(),
        )
    }

    pub fn initiate_payment_handler(&self) -> InitiatePaymentHandler {
        InitiatePaymentHandler::new(self.store.clone(), self.clock.clone())
    }

    pub fn get_plan_info_handler(&self) -> GetPlanInfoHandler {
        GetPlanInfoHandler::new(self.store.clone(), self.clock.clone())
    }

    pub fn record_usage_handler(&self) -> RecordUsageHandler {
        RecordUsageHandler::new(self.store.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated user context extracted from request.
///
/// The fronting proxy authenticates the session and forwards the user
/// identity in the `X-User-Id` header.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("UNAUTHENTICATED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user_id = parts
                .headers
                .get("X-User-Id")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| UserId::new(s).ok())
                .ok_or(AuthenticationRequired)?;

            Ok(AuthenticatedUser { user_id })
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Gateway Callback
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/billing/gateway/callback - Payment result notification
///
/// Status mapping follows the gateway's redelivery contract: 200 with the
/// acknowledgment body marks the event delivered; 4xx rejects it without
/// redelivery; 503 asks the gateway to retry later.
pub async fn gateway_callback(
    State(state): State<BillingAppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let handler = state.process_notification_handler();

    match handler.handle(ProcessNotificationCommand { fields }).await {
        Ok(outcome) => notification_response(outcome),
        Err(err) => notification_error_response(err),
    }
}

fn notification_response(outcome: NotificationOutcome) -> Response {
    match outcome {
        NotificationOutcome::Applied { .. } | NotificationOutcome::AlreadyProcessed => {
            (StatusCode::OK, GATEWAY_ACK).into_response()
        }
        NotificationOutcome::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(
                "UNAUTHORIZED",
                "Signature verification failed",
            )),
        )
            .into_response(),
        NotificationOutcome::UnknownTransaction => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                "UNKNOWN_TRANSACTION",
                "No transaction matches the reported payment reference",
            )),
        )
            .into_response(),
        NotificationOutcome::AmountMismatch => (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new(
                "AMOUNT_MISMATCH",
                "Reported amount does not match the stored charge",
            )),
        )
            .into_response(),
        NotificationOutcome::InvalidTransition => (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new(
                "INVALID_TRANSITION",
                "Reported status is not reachable from the current one",
            )),
        )
            .into_response(),
    }
}

fn notification_error_response(err: BillingError) -> Response {
    if err.is_retryable() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new(
                "PROCESSING_UNAVAILABLE",
                "Notification could not be persisted; retry delivery",
            )),
        )
            .into_response()
    } else {
        // Signed but malformed payload; redelivering the same bytes
        // cannot succeed
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("MALFORMED_NOTIFICATION", err.message())),
        )
            .into_response()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Plan & Usage Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/billing/payments - Start a plan purchase
pub async fn initiate_payment(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let plan_id: PlanId = request
        .plan_id
        .parse()
        .map_err(|_| BillingApiError::BadRequest("Invalid plan ID format".to_string()))?;

    let handler = state.initiate_payment_handler();
    let cmd = InitiatePaymentCommand {
        user_id: user.user_id,
        plan_id,
    };

    let result = handler.handle(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(InitiatePaymentResponse::from(result)),
    ))
}

/// GET /api/billing/plan - Current plan standing
pub async fn get_plan_info(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.get_plan_info_handler();
    let query = GetPlanInfoQuery {
        user_id: user.user_id,
    };

    let view = handler.handle(query).await?;

    Ok((
        StatusCode::OK,
        Json(PlanInfoResponse {
            plan: view.map(Into::into),
        }),
    ))
}

/// POST /api/billing/usage - Charge sent emails to the current grant
pub async fn record_usage(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<RecordUsageRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.record_usage_handler();
    let cmd = RecordUsageCommand {
        user_id: user.user_id,
        emails: request.emails,
    };

    let result = handler.handle(cmd).await?;

    Ok((StatusCode::OK, Json(RecordUsageResponse::from(result))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub enum BillingApiError {
    BadRequest(String),
    PaymentRequired(String),
    NotFound(String),
    Conflict(String),
    ServiceUnavailable(String),
}

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        let message = err.message();
        match err {
            BillingError::PlanNotFound(_) => BillingApiError::NotFound(message),
            BillingError::NoActiveGrant(_) => BillingApiError::PaymentRequired(message),
            BillingError::DuplicateExternalId(_) | BillingError::InvalidState { .. } => {
                BillingApiError::Conflict(message)
            }
            BillingError::ValidationFailed { .. } => BillingApiError::BadRequest(message),
            BillingError::Infrastructure(_) => {
                BillingApiError::ServiceUnavailable("Temporary storage failure".to_string())
            }
        }
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            BillingApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::new("BAD_REQUEST", msg))
            }
            BillingApiError::PaymentRequired(msg) => (
                StatusCode::PAYMENT_REQUIRED,
                ErrorResponse::new("NO_ACTIVE_PLAN", msg),
            ),
            BillingApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorResponse::new("NOT_FOUND", msg))
            }
            BillingApiError::Conflict(msg) => {
                (StatusCode::CONFLICT, ErrorResponse::new("CONFLICT", msg))
            }
            BillingApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::new("SERVICE_UNAVAILABLE", msg),
            ),
        };

        (status, Json(error)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::TransactionStatus;
    use crate::domain::foundation::PlanId;

    // ════════════════════════════════════════════════════════════════════════════
    // Notification Status Mapping Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn applied_outcome_maps_to_200() {
        let response = notification_response(NotificationOutcome::Applied {
            new_status: TransactionStatus::Completed,
        });
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn already_processed_outcome_maps_to_200() {
        let response = notification_response(NotificationOutcome::AlreadyProcessed);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn unauthorized_outcome_maps_to_401() {
        let response = notification_response(NotificationOutcome::Unauthorized);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn unknown_transaction_outcome_maps_to_404() {
        let response = notification_response(NotificationOutcome::UnknownTransaction);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn amount_mismatch_outcome_maps_to_409() {
        let response = notification_response(NotificationOutcome::AmountMismatch);
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn invalid_transition_outcome_maps_to_409() {
        let response = notification_response(NotificationOutcome::InvalidTransition);
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn retryable_error_maps_to_503() {
        let response =
            notification_error_response(BillingError::infrastructure("connection lost"));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn validation_error_maps_to_400() {
        let response =
            notification_error_response(BillingError::validation("amount", "not a decimal"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // API Error Mapping Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn plan_not_found_maps_to_404() {
        let api_err = BillingApiError::from(BillingError::plan_not_found(PlanId::new()));
        let response = api_err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn no_active_grant_maps_to_402() {
        let user_id = UserId::new("user-1").unwrap();
        let api_err = BillingApiError::from(BillingError::no_active_grant(user_id));
        let response = api_err.into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn invalid_state_maps_to_409() {
        let api_err = BillingApiError::from(BillingError::invalid_state("failed", "refund"));
        let response = api_err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn infrastructure_error_maps_to_503() {
        let api_err = BillingApiError::from(BillingError::infrastructure("pool exhausted"));
        let response = api_err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // AuthenticatedUser Extractor Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn authenticated_user_extracted_from_header() {
        use axum::extract::FromRequestParts;
        use axum::http::Request;

        let request: Request<()> = Request::builder()
            .uri("/test")
            .header("X-User-Id", "user-42")
            .body(())
            .unwrap();
        let (mut parts, _body) = request.into_parts();

        let result = AuthenticatedUser::from_request_parts(&mut parts, &()).await;

        let user = result.unwrap_or_else(|_| panic!("extraction should succeed"));
        assert_eq!(user.user_id.to_string(), "user-42");
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        use axum::extract::FromRequestParts;
        use axum::http::Request;

        let request: Request<()> = Request::builder().uri("/test").body(()).unwrap();
        let (mut parts, _body) = request.into_parts();

        let result = AuthenticatedUser::from_request_parts(&mut parts, &()).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn blank_user_id_is_rejected() {
        use axum::extract::FromRequestParts;
        use axum::http::Request;

        let request: Request<()> = Request::builder()
            .uri("/test")
            .header("X-User-Id", "")
            .body(())
            .unwrap();
        let (mut parts, _body) = request.into_parts();

        let result = AuthenticatedUser::from_request_parts(&mut parts, &()).await;

        assert!(result.is_err());
    }
}
