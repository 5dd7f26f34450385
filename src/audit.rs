//! Append-only audit trail.

use diesel::prelude::*;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::models::{AuditLog, NewAuditLog};
use crate::schema::audit_logs;
use crate::tenancy::TenantContext;

#[derive(Debug, Clone)]
pub struct AuditRecorder;

impl AuditRecorder {
    /// Inserts one audit row inside the caller's transaction. If the
    /// surrounding transaction aborts, the entry is discarded with the
    /// state change it describes.
    #[instrument(skip(conn, payload), fields(action = %action, target_id = %target_id))]
    pub fn append(
        conn: &mut PgConnection,
        ctx: &TenantContext,
        action: &str,
        target_table: &str,
        target_id: &str,
        payload: serde_json::Value,
    ) -> Result<AuditLog, diesel::result::Error> {
        let row = NewAuditLog {
            tenant_id: ctx.tenant_id,
            actor_user: ctx.user_id,
            actor_role: ctx.role.clone(),
            action: action.to_string(),
            target_table: target_table.to_string(),
            target_id: target_id.to_string(),
            payload,
        };

        let entry = diesel::insert_into(audit_logs::table)
            .values(&row)
            .returning(AuditLog::as_returning())
            .get_result(conn)?;

        debug!(audit_id = entry.id, "Audit entry recorded");
        Ok(entry)
    }

    pub fn list_for_tenant(
        conn: &mut PgConnection,
        tenant_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditLog>, diesel::result::Error> {
        audit_logs::table
            .filter(audit_logs::tenant_id.eq(tenant_id))
            .order(audit_logs::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(AuditLog::as_select())
            .load(conn)
    }

    pub fn count_for_tenant(
        conn: &mut PgConnection,
        tenant_id: Uuid,
    ) -> Result<i64, diesel::result::Error> {
        audit_logs::table
            .filter(audit_logs::tenant_id.eq(tenant_id))
            .count()
            .get_result(conn)
    }
}
