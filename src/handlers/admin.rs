//! Operator views over the outbox and the audit trail.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    audit::AuditRecorder,
    auth::jwt::Claims,
    domain::OutboxStatus,
    error::{get_db_conn, ApiError, ApiResult},
    events::outbox::OutboxService,
    helpers::{require_admin, tenant_ctx},
    models::{AuditLog, OutboxEvent},
    pagination::{PaginationMeta, PaginationParams},
    tenancy::with_tenant,
    AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct OutboxListParams {
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    crate::pagination::DEFAULT_PER_PAGE
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OutboxListResponse {
    pub data: Vec<OutboxEvent>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequeueResponse {
    pub event: OutboxEvent,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditListResponse {
    pub data: Vec<AuditLog>,
    pub pagination: PaginationMeta,
}

#[utoipa::path(
    get,
    path = "/admin/outbox",
    tag = "Admin",
    responses(
        (status = 200, description = "Outbox events, newest first", body = OutboxListResponse),
        (status = 400, description = "Invalid status filter", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_outbox(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<OutboxListParams>,
) -> ApiResult<Json<OutboxListResponse>> {
    require_admin(&claims)?;

    let status = match &params.status {
        None => None,
        Some(s) => Some(OutboxStatus::parse(s).ok_or_else(|| {
            ApiError::bad_request("VALIDATION", "status must be pending, sent, or failed")
        })?),
    };

    let pagination = PaginationParams {
        page: params.page,
        per_page: params.per_page,
    };
    let (limit, offset) = pagination.limit_offset();

    let mut conn = get_db_conn(&state.db_pool)?;

    let total_count =
        OutboxService::count(&mut conn, status).map_err(|_| ApiError::db_error())?;
    let data =
        OutboxService::list(&mut conn, status, limit, offset).map_err(|_| ApiError::db_error())?;

    Ok(Json(OutboxListResponse {
        data,
        pagination: pagination.into_metadata(total_count),
    }))
}

#[utoipa::path(
    post,
    path = "/admin/outbox/{id}/requeue",
    tag = "Admin",
    params(("id" = i64, Path, description = "Outbox event id")),
    responses(
        (status = 200, description = "Event requeued for delivery", body = RequeueResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 409, description = "Event is not parked", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn requeue_outbox_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> ApiResult<Json<RequeueResponse>> {
    require_admin(&claims)?;
    let ctx = tenant_ctx(&claims)?;

    let mut conn = get_db_conn(&state.db_pool)?;

    let requeued = with_tenant::<_, diesel::result::Error, _>(&mut conn, ctx.tenant_id, |conn| {
        let requeued = OutboxService::requeue(conn, id)?;

        if let Some(event) = &requeued {
            AuditRecorder::append(
                conn,
                &ctx,
                "outbox_requeue",
                "outbox_events",
                &event.id.to_string(),
                json!({
                    "event_id": event.event_id,
                    "event_name": event.event_name,
                }),
            )?;
        }

        Ok(requeued)
    })
    .map_err(|e| {
        tracing::error!(error = %e, "Outbox requeue failed");
        ApiError::db_error()
    })?;

    match requeued {
        Some(event) => {
            info!(outbox_id = event.id, event_id = %event.event_id, "Outbox event requeued");
            Ok(Json(RequeueResponse { event }))
        }
        None => Err(ApiError::conflict(
            "EVENT_NOT_PARKED",
            "Only parked (failed) events can be requeued",
        )),
    }
}

#[utoipa::path(
    get,
    path = "/admin/audit",
    tag = "Admin",
    params(PaginationParams),
    responses(
        (status = 200, description = "Audit entries for the caller's tenant, newest first", body = AuditListResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_audit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<AuditListResponse>> {
    require_admin(&claims)?;
    let ctx = tenant_ctx(&claims)?;

    let (limit, offset) = pagination.limit_offset();
    let mut conn = get_db_conn(&state.db_pool)?;

    let result = with_tenant::<_, diesel::result::Error, _>(&mut conn, ctx.tenant_id, |conn| {
        let total = AuditRecorder::count_for_tenant(conn, ctx.tenant_id)?;
        let data = AuditRecorder::list_for_tenant(conn, ctx.tenant_id, limit, offset)?;
        Ok((total, data))
    })
    .map_err(|e| {
        tracing::error!(error = %e, "Audit listing failed");
        ApiError::db_error()
    })?;

    let (total_count, data) = result;

    Ok(Json(AuditListResponse {
        data,
        pagination: pagination.into_metadata(total_count),
    }))
}
