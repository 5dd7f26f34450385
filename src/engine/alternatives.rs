//! Nearby-slot suggestions for callers who lost a claim race.

use chrono::Duration;
use diesel::prelude::*;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::SlotStatus;
use crate::models::{JobPost, JobSlot};
use crate::schema::{job_posts, job_slots};
use crate::tenancy::{with_tenant, TenantContext};

use super::error::EngineError;

pub const MAX_ALTERNATIVES: i64 = 3;
pub const DEFAULT_WINDOW_DAYS: i64 = 3;
pub const MIN_WINDOW_DAYS: i64 = 1;
pub const MAX_WINDOW_DAYS: i64 = 30;

/// Returns up to three available slots of the same project and trade within
/// `days` calendar days of the origin slot, nearest date first. Read-only;
/// holds no locks.
#[instrument(skip(conn, ctx), fields(tenant_id = %ctx.tenant_id, slot_id = %slot_id, days))]
pub fn find_alternatives(
    conn: &mut PgConnection,
    ctx: &TenantContext,
    slot_id: Uuid,
    days: i64,
) -> Result<Vec<(JobSlot, JobPost)>, EngineError> {
    if !(MIN_WINDOW_DAYS..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(EngineError::Validation(format!(
            "days must be between {} and {}",
            MIN_WINDOW_DAYS, MAX_WINDOW_DAYS
        )));
    }

    with_tenant(conn, ctx.tenant_id, |conn| {
        let origin: Option<(JobSlot, JobPost)> = job_slots::table
            .inner_join(job_posts::table)
            .filter(job_slots::id.eq(slot_id))
            .filter(job_slots::tenant_id.eq(ctx.tenant_id))
            .select((JobSlot::as_select(), JobPost::as_select()))
            .first(conn)
            .optional()?;

        let (origin_slot, origin_post) = origin.ok_or(EngineError::NotFound)?;

        let from = origin_slot.work_date - Duration::days(days);
        let to = origin_slot.work_date + Duration::days(days);

        let rows = job_slots::table
            .inner_join(job_posts::table)
            .filter(job_slots::tenant_id.eq(ctx.tenant_id))
            .filter(job_posts::project_id.eq(origin_post.project_id))
            .filter(job_posts::trade.eq(&origin_post.trade))
            .filter(job_slots::status.eq(SlotStatus::Available.as_str()))
            .filter(job_slots::id.ne(slot_id))
            .filter(job_slots::work_date.between(from, to))
            .order((job_slots::work_date.asc(), job_slots::created_at.desc()))
            .limit(MAX_ALTERNATIVES)
            .select((JobSlot::as_select(), JobPost::as_select()))
            .load(conn)?;

        Ok(rows)
    })
}
