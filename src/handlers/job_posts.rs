//! Project and job-post provisioning.
//!
//! Publishing a job post creates its dated slots in the `available` state;
//! from then on the claim engine owns their lifecycle.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::AuditRecorder,
    auth::jwt::Claims,
    domain::SlotStatus,
    error::{get_db_conn, ApiError, ApiResult},
    helpers::tenant_ctx,
    models::{JobPost, JobSlot, NewJobPost, NewJobSlot, NewProject, Project},
    schema::{job_posts, job_slots, projects},
    tenancy::with_tenant,
    AppState,
};

pub const MAX_SLOTS_PER_DATE: i32 = 100;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: String,
    pub address: Option<String>,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub dw_project_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectResponse {
    pub project: Project,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateJobPostRequest {
    pub project_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 128, message = "trade must be 1-128 characters"))]
    pub trade: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    #[validate(range(min = 0, message = "pricePerSlot must not be negative"))]
    pub price_per_slot: i32,
    #[validate(length(min = 1, message = "at least one slot date is required"))]
    pub slots: Vec<SlotSpec>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SlotSpec {
    pub work_date: NaiveDate,
    /// Number of parallel slots for this date; defaults to 1.
    pub slot_count: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobPostResponse {
    pub job_post: JobPost,
    pub slots: Vec<JobSlot>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SlotListResponse {
    pub slots: Vec<JobSlot>,
}

#[utoipa::path(
    post,
    path = "/projects",
    tag = "Provisioning",
    request_body = CreateProjectRequest,
    responses(
        (status = 200, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_project(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateProjectRequest>,
) -> ApiResult<Json<ProjectResponse>> {
    if let Err(e) = payload.validate() {
        return Err(ApiError::bad_request(
            "VALIDATION",
            format!("Validation error: {}", e),
        ));
    }
    if payload.ends_on < payload.starts_on {
        return Err(ApiError::bad_request(
            "VALIDATION",
            "endsOn must not precede startsOn",
        ));
    }

    let ctx = tenant_ctx(&claims)?;
    let mut conn = get_db_conn(&state.db_pool)?;

    let project = with_tenant::<_, diesel::result::Error, _>(&mut conn, ctx.tenant_id, |conn| {
        let project: Project = diesel::insert_into(projects::table)
            .values(&NewProject {
                tenant_id: ctx.tenant_id,
                name: payload.name.clone(),
                address: payload.address.clone(),
                starts_on: payload.starts_on,
                ends_on: payload.ends_on,
                dw_project_id: payload.dw_project_id.clone(),
            })
            .returning(Project::as_returning())
            .get_result(conn)?;

        AuditRecorder::append(
            conn,
            &ctx,
            "project_create",
            "projects",
            &project.id.to_string(),
            json!({ "name": project.name }),
        )?;

        Ok(project)
    })
    .map_err(|e| {
        tracing::error!(error = %e, "Project creation failed");
        ApiError::db_error()
    })?;

    info!(project_id = %project.id, tenant_id = %ctx.tenant_id, "Project created");

    Ok(Json(ProjectResponse { project }))
}

#[utoipa::path(
    post,
    path = "/job-posts",
    tag = "Provisioning",
    request_body = CreateJobPostRequest,
    responses(
        (status = 200, description = "Job post published with its slots", body = JobPostResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Project not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_job_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateJobPostRequest>,
) -> ApiResult<Json<JobPostResponse>> {
    if let Err(e) = payload.validate() {
        return Err(ApiError::bad_request(
            "VALIDATION",
            format!("Validation error: {}", e),
        ));
    }
    for spec in &payload.slots {
        let count = spec.slot_count.unwrap_or(1);
        if !(1..=MAX_SLOTS_PER_DATE).contains(&count) {
            return Err(ApiError::bad_request(
                "VALIDATION",
                format!("slotCount must be between 1 and {}", MAX_SLOTS_PER_DATE),
            ));
        }
    }

    let ctx = tenant_ctx(&claims)?;
    let mut conn = get_db_conn(&state.db_pool)?;

    enum PublishError {
        ProjectMissing,
        Db(diesel::result::Error),
    }

    impl From<diesel::result::Error> for PublishError {
        fn from(e: diesel::result::Error) -> Self {
            PublishError::Db(e)
        }
    }

    let result = with_tenant::<_, PublishError, _>(&mut conn, ctx.tenant_id, |conn| {
        let project_exists: Option<Uuid> = projects::table
            .filter(projects::id.eq(payload.project_id))
            .filter(projects::tenant_id.eq(ctx.tenant_id))
            .select(projects::id)
            .first(conn)
            .optional()?;

        if project_exists.is_none() {
            return Err(PublishError::ProjectMissing);
        }

        let post: JobPost = diesel::insert_into(job_posts::table)
            .values(&NewJobPost {
                tenant_id: ctx.tenant_id,
                project_id: payload.project_id,
                title: payload.title.clone(),
                trade: payload.trade.clone(),
                starts_on: payload.starts_on,
                ends_on: payload.ends_on,
                price_per_slot: payload.price_per_slot,
                published: true,
            })
            .returning(JobPost::as_returning())
            .get_result(conn)?;

        let mut new_slots = Vec::new();
        for spec in &payload.slots {
            for slot_no in 1..=spec.slot_count.unwrap_or(1) {
                new_slots.push(NewJobSlot {
                    tenant_id: ctx.tenant_id,
                    job_post_id: post.id,
                    work_date: spec.work_date,
                    slot_no,
                    status: SlotStatus::Available.as_str().to_string(),
                });
            }
        }

        let slots: Vec<JobSlot> = diesel::insert_into(job_slots::table)
            .values(&new_slots)
            .returning(JobSlot::as_returning())
            .get_results(conn)?;

        AuditRecorder::append(
            conn,
            &ctx,
            "job_post_publish",
            "job_posts",
            &post.id.to_string(),
            json!({
                "title": post.title,
                "trade": post.trade,
                "slot_count": slots.len(),
            }),
        )?;

        Ok((post, slots))
    });

    let (post, slots) = result.map_err(|e| match e {
        PublishError::ProjectMissing => {
            ApiError::not_found("NOT_FOUND", "Project not found")
        }
        PublishError::Db(e) => {
            tracing::error!(error = %e, "Job post publication failed");
            ApiError::db_error()
        }
    })?;

    info!(
        job_post_id = %post.id,
        slot_count = slots.len(),
        trade = %post.trade,
        "Job post published"
    );

    Ok(Json(JobPostResponse {
        job_post: post,
        slots,
    }))
}

#[utoipa::path(
    get,
    path = "/job-posts/{id}/slots",
    tag = "Provisioning",
    params(("id" = Uuid, Path, description = "Job post id")),
    responses(
        (status = 200, description = "Slots of the job post", body = SlotListResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Job post not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_job_post_slots(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SlotListResponse>> {
    let ctx = tenant_ctx(&claims)?;
    let mut conn = get_db_conn(&state.db_pool)?;

    let slots = with_tenant::<_, diesel::result::Error, _>(&mut conn, ctx.tenant_id, |conn| {
        let post: Option<Uuid> = job_posts::table
            .filter(job_posts::id.eq(id))
            .filter(job_posts::tenant_id.eq(ctx.tenant_id))
            .select(job_posts::id)
            .first(conn)
            .optional()?;

        match post {
            None => Ok(None),
            Some(post_id) => {
                let slots: Vec<JobSlot> = job_slots::table
                    .filter(job_slots::job_post_id.eq(post_id))
                    .filter(job_slots::tenant_id.eq(ctx.tenant_id))
                    .order((job_slots::work_date.asc(), job_slots::slot_no.asc()))
                    .select(JobSlot::as_select())
                    .load(conn)?;
                Ok(Some(slots))
            }
        }
    })
    .map_err(|e| {
        tracing::error!(error = %e, "Slot listing failed");
        ApiError::db_error()
    })?;

    match slots {
        Some(slots) => Ok(Json(SlotListResponse { slots })),
        None => Err(ApiError::not_found("NOT_FOUND", "Job post not found")),
    }
}
