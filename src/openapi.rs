//! OpenAPI documentation configuration.

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::pagination::PaginationMeta;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FCFS Booking API",
        version = "1.0.0",
        description = "First-come-first-served brokering of construction job slots.\n\n\
        ## Model\n\
        A general contractor publishes job posts with dated slots; subcontractors race\n\
        to claim them. At most one claim per slot succeeds, losers receive a conflict\n\
        and can fetch nearby alternatives. Confirmed and cancelled claims are announced\n\
        to the integration target through a signed webhook, at least once.\n\n\
        ## Authentication\n\
        All endpoints except health and metrics require a JWT bearer token whose\n\
        claims carry the tenant identity: `Authorization: Bearer <token>`.\n\n\
        ## Idempotency\n\
        `POST /claims` takes a caller-supplied `requestId`; retries with the same id\n\
        return the original result.",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "/", description = "Current server")
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Claims", description = "FCFS claim, cancellation, and alternatives"),
        (name = "Provisioning", description = "Projects, job posts, and slots"),
        (name = "Admin", description = "Operator views over the outbox and audit trail")
    ),
    paths(
        crate::handlers::health::health_check,
        crate::handlers::health::ready_check,
        crate::handlers::health::live_check,

        crate::handlers::claims::create_claim,
        crate::handlers::claims::cancel_claim,
        crate::handlers::claims::list_alternatives,

        crate::handlers::job_posts::create_project,
        crate::handlers::job_posts::create_job_post,
        crate::handlers::job_posts::list_job_post_slots,

        crate::handlers::admin::list_outbox,
        crate::handlers::admin::requeue_outbox_event,
        crate::handlers::admin::list_audit,
    ),
    components(
        schemas(
            crate::error::ApiError,
            PaginationMeta,

            crate::handlers::claims::ClaimRequest,
            crate::handlers::claims::ClaimResponse,
            crate::handlers::claims::SlotView,
            crate::handlers::claims::ClaimView,
            crate::handlers::claims::CancelRequest,
            crate::handlers::claims::CancelResponse,
            crate::handlers::claims::CancelledSlotView,
            crate::handlers::claims::AlternativesResponse,
            crate::handlers::claims::AlternativeView,
            crate::handlers::claims::JobPostView,

            crate::models::Project,
            crate::models::JobPost,
            crate::models::JobSlot,
            crate::models::Claim,
            crate::models::OutboxEvent,
            crate::models::AuditLog,

            crate::handlers::job_posts::CreateProjectRequest,
            crate::handlers::job_posts::ProjectResponse,
            crate::handlers::job_posts::CreateJobPostRequest,
            crate::handlers::job_posts::SlotSpec,
            crate::handlers::job_posts::JobPostResponse,
            crate::handlers::job_posts::SlotListResponse,

            crate::handlers::admin::OutboxListResponse,
            crate::handlers::admin::RequeueResponse,
            crate::handlers::admin::AuditListResponse,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "JWT access token issued by the identity provider.\n\
                            Include in requests as: `Authorization: Bearer <token>`",
                        ))
                        .build(),
                ),
            );
        }

        openapi.security = Some(vec![]);
    }
}

pub fn swagger_router() -> Router {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "FCFS Booking API");
        assert_eq!(spec.info.version, "1.0.0");
    }

    #[test]
    fn test_openapi_has_security_scheme() {
        let spec = ApiDoc::openapi();
        let components = spec.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn test_openapi_has_tags() {
        let spec = ApiDoc::openapi();
        let tags = spec.tags.unwrap();
        assert!(tags.iter().any(|t| t.name == "Claims"));
        assert!(tags.iter().any(|t| t.name == "Admin"));
    }
}
