//! Request metrics middleware.

use axum::{extract::Request, middleware::Next, response::Response};

use crate::telemetry::metrics::record_request_latency;

/// Collapses request paths into a bounded label set. Raw paths carry slot
/// and job-post ids and would blow up the metric cardinality.
fn route_label(path: &str) -> &'static str {
    match path {
        "/claims" => "claims",
        "/cancel-claim" => "cancel_claim",
        "/alternatives" => "alternatives",
        "/projects" => "projects",
        "/job-posts" => "job_posts",
        "/admin/audit" => "admin_audit",
        "/metrics" => "metrics",
        p if p.starts_with("/job-posts/") => "job_post_slots",
        p if p.starts_with("/admin/outbox") => "admin_outbox",
        p if p == "/health" || p.starts_with("/health/") => "health",
        p if p.starts_with("/swagger-ui") || p.starts_with("/api-docs") => "docs",
        _ => "other",
    }
}

pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = route_label(request.uri().path());
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    record_request_latency(&method, route, response.status().as_u16(), start.elapsed());

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_label_core_endpoints() {
        assert_eq!(route_label("/claims"), "claims");
        assert_eq!(route_label("/cancel-claim"), "cancel_claim");
        assert_eq!(route_label("/alternatives"), "alternatives");
    }

    #[test]
    fn test_route_label_collapses_ids() {
        assert_eq!(
            route_label("/job-posts/550e8400-e29b-41d4-a716-446655440000/slots"),
            "job_post_slots"
        );
        assert_eq!(route_label("/admin/outbox/42/requeue"), "admin_outbox");
        assert_eq!(route_label("/admin/outbox"), "admin_outbox");
    }

    #[test]
    fn test_route_label_infrastructure() {
        assert_eq!(route_label("/health"), "health");
        assert_eq!(route_label("/health/ready"), "health");
        assert_eq!(route_label("/swagger-ui/index.html"), "docs");
        assert_eq!(route_label("/no-such-route"), "other");
    }
}
