//! FCFS claim and cancel over the slot state machine.
//!
//! The conditional UPDATE in [`claim_slot`] is the single serialization
//! point: under concurrent claims on one slot, the storage engine lets
//! exactly one update observe `status = 'available'`. Everything after it
//! commits with the slot transition or not at all.

use chrono::Utc;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::audit::AuditRecorder;
use crate::domain::{CancelReason, SlotStatus};
use crate::events::outbox::OutboxService;
use crate::events::types::{CancelRef, ClaimEventData, ClaimRef, EventName, JobPostRef, SlotRef};
use crate::models::{Claim, JobPost, JobSlot, NewClaim, Project};
use crate::schema::{claims, job_posts, job_slots, projects, tenants};
use crate::tenancy::{with_tenant, TenantContext};

use super::error::EngineError;

#[derive(Debug, Clone)]
pub struct ClaimInput {
    pub slot_id: Uuid,
    pub company_id: Uuid,
    pub request_id: String,
}

#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    pub slot: JobSlot,
    pub claim: Claim,
    /// True when the outcome was served from an earlier request with the
    /// same idempotency key; no new rows were written.
    pub replayed: bool,
}

#[derive(Debug, Clone)]
pub struct CancelOutcome {
    pub slot: JobSlot,
}

/// Claims a slot first-come-first-served. Retries with the same
/// `request_id` return the original result; losers of a race get
/// `AlreadyClaimed`.
#[instrument(skip(conn, ctx), fields(tenant_id = %ctx.tenant_id, slot_id = %input.slot_id))]
pub fn claim_slot(
    conn: &mut PgConnection,
    ctx: &TenantContext,
    input: &ClaimInput,
) -> Result<ClaimOutcome, EngineError> {
    match with_tenant(conn, ctx.tenant_id, |conn| claim_in_txn(conn, ctx, input)) {
        Err(EngineError::RequestIdConflict) => {
            // A sibling carrying the same key committed while we raced it.
            // Its transaction won; surface the stored result. If nothing is
            // visible in this tenant, the key collided across tenants and
            // the conflict stands.
            with_tenant(conn, ctx.tenant_id, |conn| {
                find_by_request_id(conn, ctx.tenant_id, &input.request_id)?
                    .ok_or(EngineError::RequestIdConflict)
            })
        }
        other => other,
    }
}

fn claim_in_txn(
    conn: &mut PgConnection,
    ctx: &TenantContext,
    input: &ClaimInput,
) -> Result<ClaimOutcome, EngineError> {
    // Idempotency probe: a retried request must see its first result, not
    // a conflict against its own earlier success.
    if let Some(existing) = find_by_request_id(conn, ctx.tenant_id, &input.request_id)? {
        info!(request_id = %input.request_id, claim_id = %existing.claim.id, "Idempotent replay");
        return Ok(existing);
    }

    let now = Utc::now();

    // FCFS compare-and-set. The status predicate makes concurrent winners
    // impossible: at most one update sees 'available'.
    let updated: Option<JobSlot> = diesel::update(
        job_slots::table
            .filter(job_slots::id.eq(input.slot_id))
            .filter(job_slots::tenant_id.eq(ctx.tenant_id))
            .filter(job_slots::status.eq(SlotStatus::Available.as_str())),
    )
    .set((
        job_slots::status.eq(SlotStatus::Claimed.as_str()),
        job_slots::claimed_by_company.eq(input.company_id),
        job_slots::claimed_by_user.eq(ctx.user_id),
        job_slots::claimed_at.eq(now),
        job_slots::updated_at.eq(now),
    ))
    .returning(JobSlot::as_returning())
    .get_result(conn)
    .optional()?;

    let slot = match updated {
        Some(slot) => slot,
        None => {
            let exists: Option<String> = job_slots::table
                .filter(job_slots::id.eq(input.slot_id))
                .filter(job_slots::tenant_id.eq(ctx.tenant_id))
                .select(job_slots::status)
                .first(conn)
                .optional()?;

            return Err(match exists {
                None => EngineError::NotFound,
                Some(_) => EngineError::AlreadyClaimed,
            });
        }
    };

    let claim: Claim = diesel::insert_into(claims::table)
        .values(&NewClaim {
            tenant_id: ctx.tenant_id,
            slot_id: slot.id,
            company_id: input.company_id,
            user_id: ctx.user_id,
            request_id: input.request_id.clone(),
            claimed_at: now,
        })
        .returning(Claim::as_returning())
        .get_result(conn)
        .map_err(map_claim_insert_error)?;

    let (post, project) = load_post_and_project(conn, ctx.tenant_id, slot.job_post_id)?;
    let target = integration_target(conn, ctx.tenant_id)?;

    OutboxService::enqueue(
        conn,
        EventName::ClaimConfirmed,
        &target,
        slot.id,
        ClaimEventData {
            dw_project_id: project.dw_project_id,
            job_post: JobPostRef {
                id: post.id,
                work_date: slot.work_date,
            },
            slot: SlotRef {
                slot_id: slot.id,
                status: SlotStatus::Claimed.as_str().to_string(),
            },
            claim: ClaimRef {
                claim_id: claim.id,
                company_id: claim.company_id,
                user_id: claim.user_id,
                claimed_at: claim.claimed_at,
            },
            cancel: None,
            tenant_id: ctx.tenant_id,
        },
    )?;

    AuditRecorder::append(
        conn,
        ctx,
        "claim",
        "job_slots",
        &slot.id.to_string(),
        json!({
            "previous_status": SlotStatus::Available.as_str(),
            "new_status": SlotStatus::Claimed.as_str(),
            "company": input.company_id,
            "request_id": input.request_id,
        }),
    )?;

    info!(slot_id = %slot.id, claim_id = %claim.id, company_id = %input.company_id, "Slot claimed");

    Ok(ClaimOutcome {
        slot,
        claim,
        replayed: false,
    })
}

/// Cancels a claimed slot. The claim row is retained and the slot is not
/// re-opened.
#[instrument(skip(conn, ctx), fields(tenant_id = %ctx.tenant_id, slot_id = %slot_id))]
pub fn cancel_slot(
    conn: &mut PgConnection,
    ctx: &TenantContext,
    slot_id: Uuid,
    reason: CancelReason,
) -> Result<CancelOutcome, EngineError> {
    with_tenant(conn, ctx.tenant_id, |conn| {
        cancel_in_txn(conn, ctx, slot_id, reason)
    })
}

fn cancel_in_txn(
    conn: &mut PgConnection,
    ctx: &TenantContext,
    slot_id: Uuid,
    reason: CancelReason,
) -> Result<CancelOutcome, EngineError> {
    let current: Option<JobSlot> = job_slots::table
        .filter(job_slots::id.eq(slot_id))
        .filter(job_slots::tenant_id.eq(ctx.tenant_id))
        .select(JobSlot::as_select())
        .first(conn)
        .optional()?;

    let current = current.ok_or(EngineError::NotFound)?;

    match SlotStatus::parse(&current.status) {
        Some(SlotStatus::Claimed) => {}
        Some(SlotStatus::Available) => return Err(EngineError::SlotNotClaimed),
        Some(SlotStatus::Cancelled) => return Err(EngineError::AlreadyCancelled),
        Some(SlotStatus::Completed) => return Err(EngineError::AlreadyCompleted),
        None => {
            return Err(EngineError::Internal(format!(
                "slot {} carries unknown status",
                current.id
            )))
        }
    }

    let now = Utc::now();

    let updated: Option<JobSlot> = diesel::update(
        job_slots::table
            .filter(job_slots::id.eq(slot_id))
            .filter(job_slots::tenant_id.eq(ctx.tenant_id))
            .filter(job_slots::status.eq(SlotStatus::Claimed.as_str())),
    )
    .set((
        job_slots::status.eq(SlotStatus::Cancelled.as_str()),
        job_slots::cancelled_at.eq(now),
        job_slots::cancel_reason.eq(reason.as_str()),
        job_slots::updated_at.eq(now),
    ))
    .returning(JobSlot::as_returning())
    .get_result(conn)
    .optional()?;

    // Zero rows means another cancel got between our read and the update.
    let slot = updated.ok_or(EngineError::CancelFailed)?;

    let claim: Claim = claims::table
        .filter(claims::slot_id.eq(slot.id))
        .filter(claims::tenant_id.eq(ctx.tenant_id))
        .select(Claim::as_select())
        .first(conn)?;

    let (post, project) = load_post_and_project(conn, ctx.tenant_id, slot.job_post_id)?;
    let target = integration_target(conn, ctx.tenant_id)?;

    OutboxService::enqueue(
        conn,
        EventName::ClaimCancelled,
        &target,
        slot.id,
        ClaimEventData {
            dw_project_id: project.dw_project_id,
            job_post: JobPostRef {
                id: post.id,
                work_date: slot.work_date,
            },
            slot: SlotRef {
                slot_id: slot.id,
                status: SlotStatus::Cancelled.as_str().to_string(),
            },
            claim: ClaimRef {
                claim_id: claim.id,
                company_id: claim.company_id,
                user_id: claim.user_id,
                claimed_at: claim.claimed_at,
            },
            cancel: Some(CancelRef {
                cancel_reason: reason.as_str().to_string(),
                cancelled_at: now,
            }),
            tenant_id: ctx.tenant_id,
        },
    )?;

    AuditRecorder::append(
        conn,
        ctx,
        "cancel",
        "job_slots",
        &slot.id.to_string(),
        json!({
            "previous_status": SlotStatus::Claimed.as_str(),
            "new_status": SlotStatus::Cancelled.as_str(),
            "reason": reason.as_str(),
        }),
    )?;

    info!(slot_id = %slot.id, reason = %reason, "Claim cancelled");

    Ok(CancelOutcome { slot })
}

fn find_by_request_id(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    request_id: &str,
) -> Result<Option<ClaimOutcome>, EngineError> {
    let found: Option<(Claim, JobSlot)> = claims::table
        .inner_join(job_slots::table)
        .filter(claims::request_id.eq(request_id))
        .filter(claims::tenant_id.eq(tenant_id))
        .select((Claim::as_select(), JobSlot::as_select()))
        .first(conn)
        .optional()?;

    Ok(found.map(|(claim, slot)| ClaimOutcome {
        slot,
        claim,
        replayed: true,
    }))
}

fn load_post_and_project(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    job_post_id: Uuid,
) -> Result<(JobPost, Project), EngineError> {
    let pair = job_posts::table
        .inner_join(projects::table)
        .filter(job_posts::id.eq(job_post_id))
        .filter(job_posts::tenant_id.eq(tenant_id))
        .select((JobPost::as_select(), Project::as_select()))
        .first(conn)?;
    Ok(pair)
}

fn integration_target(conn: &mut PgConnection, tenant_id: Uuid) -> Result<String, EngineError> {
    let mode: String = tenants::table
        .find(tenant_id)
        .select(tenants::integration_mode)
        .first(conn)?;
    Ok(mode)
}

fn map_claim_insert_error(e: diesel::result::Error) -> EngineError {
    if let diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info) = e {
        return match info.constraint_name() {
            Some("claims_request_id_key") => EngineError::RequestIdConflict,
            // Unique slot_id: a claim row already exists although the CAS
            // succeeded. Storage-level backstop for I4.
            Some("claims_slot_id_key") => EngineError::AlreadyClaimed,
            _ => EngineError::Database(e),
        };
    }
    EngineError::Database(e)
}
