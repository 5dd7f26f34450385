use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Queryable, Selectable, Serialize, Clone)]
#[diesel(table_name = crate::schema::tenants)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub integration_mode: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::tenants)]
pub struct NewTenant {
    pub name: String,
    pub integration_mode: String,
}

#[derive(Debug, Queryable, Selectable, Serialize, Clone, ToSchema)]
#[diesel(table_name = crate::schema::projects)]
pub struct Project {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[schema(example = "駅前再開発ビル")]
    pub name: String,
    pub address: Option<String>,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub dw_project_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::projects)]
pub struct NewProject {
    pub tenant_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub dw_project_id: Option<String>,
}

#[derive(Debug, Queryable, Selectable, Serialize, Clone, ToSchema)]
#[diesel(table_name = crate::schema::job_posts)]
pub struct JobPost {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    #[schema(example = "5階内装仕上げ工事")]
    pub title: String,
    #[schema(example = "interior")]
    pub trade: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub price_per_slot: i32,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::job_posts)]
pub struct NewJobPost {
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub trade: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub price_per_slot: i32,
    pub published: bool,
}

#[derive(Debug, Queryable, Selectable, Serialize, Clone, ToSchema)]
#[diesel(table_name = crate::schema::job_slots)]
pub struct JobSlot {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub job_post_id: Uuid,
    pub work_date: NaiveDate,
    pub slot_no: i32,
    #[schema(example = "available")]
    pub status: String,
    pub claimed_by_company: Option<Uuid>,
    pub claimed_by_user: Option<Uuid>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::job_slots)]
pub struct NewJobSlot {
    pub tenant_id: Uuid,
    pub job_post_id: Uuid,
    pub work_date: NaiveDate,
    pub slot_no: i32,
    pub status: String,
}

#[derive(Debug, Queryable, Selectable, Serialize, Clone, ToSchema)]
#[diesel(table_name = crate::schema::claims)]
pub struct Claim {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub slot_id: Uuid,
    pub company_id: Uuid,
    pub user_id: Option<Uuid>,
    pub request_id: String,
    pub claimed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::claims)]
pub struct NewClaim {
    pub tenant_id: Uuid,
    pub slot_id: Uuid,
    pub company_id: Uuid,
    pub user_id: Option<Uuid>,
    pub request_id: String,
    pub claimed_at: DateTime<Utc>,
}

#[derive(Debug, Queryable, Selectable, Serialize, Clone, ToSchema)]
#[diesel(table_name = crate::schema::outbox_events)]
pub struct OutboxEvent {
    pub id: i64,
    pub event_id: String,
    #[schema(example = "claim.confirmed")]
    pub event_name: String,
    pub payload: serde_json::Value,
    pub target: String,
    #[schema(example = "pending")]
    pub status: String,
    pub retry_count: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::outbox_events)]
pub struct NewOutboxEvent {
    pub event_id: String,
    pub event_name: String,
    pub payload: serde_json::Value,
    pub target: String,
    pub status: String,
    pub next_attempt_at: DateTime<Utc>,
}

#[derive(Debug, Queryable, Selectable, Serialize, Clone, ToSchema)]
#[diesel(table_name = crate::schema::audit_logs)]
pub struct AuditLog {
    pub id: i64,
    pub tenant_id: Uuid,
    pub actor_user: Option<Uuid>,
    pub actor_role: Option<String>,
    #[schema(example = "claim")]
    pub action: String,
    pub target_table: String,
    pub target_id: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::audit_logs)]
pub struct NewAuditLog {
    pub tenant_id: Uuid,
    pub actor_user: Option<Uuid>,
    pub actor_role: Option<String>,
    pub action: String,
    pub target_table: String,
    pub target_id: String,
    pub payload: serde_json::Value,
}
