//! Claim, cancel, and alternatives handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::jwt::Claims,
    domain::CancelReason,
    engine::{self, ClaimInput, EngineError},
    error::{get_db_conn, ApiError, ApiResult},
    helpers::tenant_ctx,
    models::{JobPost, JobSlot},
    telemetry::metrics::{record_cancel, record_claim_attempt, ClaimOutcome as ClaimMetric},
    AppState,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClaimRequest {
    pub slot_id: Uuid,
    pub company_id: Uuid,
    /// Caller-supplied idempotency key; retries with the same key return
    /// the original result.
    #[validate(length(min = 1, max = 128, message = "requestId must be 1-128 characters"))]
    pub request_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClaimResponse {
    pub slot: SlotView,
    pub claim: ClaimView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SlotView {
    pub id: Uuid,
    #[schema(example = "claimed")]
    pub status: String,
    pub work_date: NaiveDate,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClaimView {
    pub id: Uuid,
    pub company_id: Uuid,
    pub user_id: Option<Uuid>,
    pub claimed_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CancelRequest {
    pub slot_id: Uuid,
    #[schema(example = "weather")]
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelResponse {
    pub slot: CancelledSlotView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelledSlotView {
    pub id: Uuid,
    #[schema(example = "cancelled")]
    pub status: String,
    pub canceled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlternativesParams {
    pub slot_id: Uuid,
    pub days: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AlternativesResponse {
    pub alternatives: Vec<AlternativeView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AlternativeView {
    pub slot_id: Uuid,
    pub work_date: NaiveDate,
    pub job_post: JobPostView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobPostView {
    pub id: Uuid,
    pub title: String,
    pub trade: String,
}

#[utoipa::path(
    post,
    path = "/claims",
    tag = "Claims",
    request_body = ClaimRequest,
    responses(
        (status = 200, description = "Slot claimed (or idempotent replay)", body = ClaimResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Slot not found", body = ApiError),
        (status = 409, description = "Slot already claimed", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_claim(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ClaimRequest>,
) -> ApiResult<Json<ClaimResponse>> {
    if let Err(e) = payload.validate() {
        record_claim_attempt(ClaimMetric::Invalid);
        return Err(ApiError::bad_request(
            "VALIDATION",
            format!("Validation error: {}", e),
        ));
    }

    let ctx = tenant_ctx(&claims)?;
    let mut conn = get_db_conn(&state.db_pool)?;

    let input = ClaimInput {
        slot_id: payload.slot_id,
        company_id: payload.company_id,
        request_id: payload.request_id,
    };

    match engine::claim_slot(&mut conn, &ctx, &input) {
        Ok(outcome) => {
            record_claim_attempt(if outcome.replayed {
                ClaimMetric::Replayed
            } else {
                ClaimMetric::Won
            });

            Ok(Json(ClaimResponse {
                slot: SlotView {
                    id: outcome.slot.id,
                    status: outcome.slot.status,
                    work_date: outcome.slot.work_date,
                },
                claim: ClaimView {
                    id: outcome.claim.id,
                    company_id: outcome.claim.company_id,
                    user_id: outcome.claim.user_id,
                    claimed_at: outcome.claim.claimed_at,
                },
            }))
        }
        Err(err) => {
            record_claim_attempt(match err {
                EngineError::AlreadyClaimed => ClaimMetric::Conflict,
                EngineError::NotFound => ClaimMetric::NotFound,
                EngineError::Validation(_) | EngineError::RequestIdConflict => ClaimMetric::Invalid,
                _ => ClaimMetric::Error,
            });
            Err(engine_error_response(err))
        }
    }
}

#[utoipa::path(
    post,
    path = "/cancel-claim",
    tag = "Claims",
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Claim cancelled", body = CancelResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Slot not found", body = ApiError),
        (status = 409, description = "Slot is not in a cancellable state", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn cancel_claim(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CancelRequest>,
) -> ApiResult<Json<CancelResponse>> {
    let reason = CancelReason::parse(&payload.reason).ok_or_else(|| {
        ApiError::bad_request(
            "VALIDATION",
            "reason must be one of no_show, weather, client_change, material_delay, other",
        )
    })?;

    let ctx = tenant_ctx(&claims)?;
    let mut conn = get_db_conn(&state.db_pool)?;

    let outcome = engine::cancel_slot(&mut conn, &ctx, payload.slot_id, reason)
        .map_err(engine_error_response)?;

    record_cancel(reason.as_str());

    Ok(Json(CancelResponse {
        slot: CancelledSlotView {
            id: outcome.slot.id,
            status: outcome.slot.status,
            canceled_at: outcome.slot.cancelled_at,
            cancel_reason: outcome.slot.cancel_reason,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/alternatives",
    tag = "Claims",
    params(
        ("slotId" = Uuid, Query, description = "Origin slot"),
        ("days" = Option<i64>, Query, description = "Window in calendar days (1-30, default 3)")
    ),
    responses(
        (status = 200, description = "Up to three nearby available slots", body = AlternativesResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Slot not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_alternatives(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<AlternativesParams>,
) -> ApiResult<Json<AlternativesResponse>> {
    let ctx = tenant_ctx(&claims)?;
    let mut conn = get_db_conn(&state.db_pool)?;

    let days = params.days.unwrap_or(engine::DEFAULT_WINDOW_DAYS);

    let rows = engine::find_alternatives(&mut conn, &ctx, params.slot_id, days)
        .map_err(engine_error_response)?;

    Ok(Json(AlternativesResponse {
        alternatives: rows.into_iter().map(alternative_view).collect(),
    }))
}

fn alternative_view((slot, post): (JobSlot, JobPost)) -> AlternativeView {
    AlternativeView {
        slot_id: slot.id,
        work_date: slot.work_date,
        job_post: JobPostView {
            id: post.id,
            title: post.title,
            trade: post.trade,
        },
    }
}

/// Maps the engine's closed error sum to the wire shape. Internal failures
/// are logged and masked.
pub fn engine_error_response(err: EngineError) -> (StatusCode, Json<ApiError>) {
    let message = match &err {
        EngineError::Internal(detail) => {
            error!(error = %detail, "Engine internal error");
            "Internal server error".to_string()
        }
        EngineError::Database(e) => {
            error!(error = %e, "Database error in claim engine");
            "Internal server error".to_string()
        }
        other => other.to_string(),
    };

    (err.http_status(), Json(ApiError::new(err.code(), message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_response_masks_internals() {
        let (status, body) = engine_error_response(EngineError::Database(
            diesel::result::Error::BrokenTransactionManager,
        ));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "INTERNAL");
        assert_eq!(body.message, "Internal server error");
    }

    #[test]
    fn test_engine_error_response_conflict() {
        let (status, body) = engine_error_response(EngineError::AlreadyClaimed);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, "ALREADY_CLAIMED");
    }

    #[test]
    fn test_claim_request_rejects_unknown_fields() {
        let raw = r#"{"slotId":"550e8400-e29b-41d4-a716-446655440000",
                      "companyId":"550e8400-e29b-41d4-a716-446655440302",
                      "requestId":"r-1",
                      "price":100}"#;
        assert!(serde_json::from_str::<ClaimRequest>(raw).is_err());
    }

    #[test]
    fn test_claim_request_camel_case() {
        let raw = r#"{"slotId":"550e8400-e29b-41d4-a716-446655440000",
                      "companyId":"550e8400-e29b-41d4-a716-446655440302",
                      "requestId":"r-1"}"#;
        let req: ClaimRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.request_id, "r-1");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_claim_request_validates_request_id_length() {
        let req = ClaimRequest {
            slot_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            request_id: "".to_string(),
        };
        assert!(req.validate().is_err());

        let req = ClaimRequest {
            slot_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            request_id: "r".repeat(129),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_cancel_response_field_names() {
        let view = CancelResponse {
            slot: CancelledSlotView {
                id: Uuid::new_v4(),
                status: "cancelled".to_string(),
                canceled_at: Some(Utc::now()),
                cancel_reason: Some("weather".to_string()),
            },
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["slot"].get("canceled_at").is_some());
        assert_eq!(json["slot"]["cancel_reason"], "weather");
    }
}
