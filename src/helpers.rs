//! Shared helper functions for handlers.

use axum::{http::StatusCode, Json};
use uuid::Uuid;

use crate::auth::jwt::Claims;
use crate::error::ApiError;
use crate::tenancy::TenantContext;

/// Builds the explicit tenant carrier from verified token claims.
pub fn tenant_ctx(claims: &Claims) -> Result<TenantContext, (StatusCode, Json<ApiError>)> {
    let tenant_id = Uuid::parse_str(&claims.tenant_id)
        .map_err(|_| ApiError::unauthorized("INVALID_TOKEN", "Invalid tenant in token"))?;

    let mut ctx = TenantContext::new(tenant_id);
    if let Ok(user_id) = Uuid::parse_str(&claims.sub) {
        ctx = ctx.with_user(user_id);
    }
    if let Some(role) = &claims.role {
        ctx = ctx.with_role(role.clone());
    }
    Ok(ctx)
}

pub fn require_admin(claims: &Claims) -> Result<(), (StatusCode, Json<ApiError>)> {
    match claims.role.as_deref() {
        Some("admin") => Ok(()),
        _ => Err(ApiError::forbidden(
            "ADMIN_REQUIRED",
            "This operation requires the admin role",
        )),
    }
}
