//! Integration tests for the FCFS claim engine.

mod common;

use common::*;
use reqwest::StatusCode;
use serde_json::{json, Value};
use serial_test::serial;
use uuid::Uuid;

#[tokio::test]
#[serial]
async fn test_single_claim_succeeds() {
    let app = TestApp::spawn().await;
    let tenant = app.create_tenant("dandori");
    let token = app.token(tenant, None);
    let seeded = app.seed_interior_post(&token).await;

    let slot = &seeded.slots[0];
    let company = Uuid::new_v4();

    let response = app
        .post(
            "/claims",
            &token,
            json!({"slotId": slot.id, "companyId": company, "requestId": rid()}),
        )
        .await;
    assert_status!(response, StatusCode::OK.as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["slot"]["status"], "claimed");
    assert_eq!(body["slot"]["work_date"], "2024-11-05");
    assert_eq!(body["claim"]["company_id"], company.to_string());

    let stored = app.get_slot(slot.id).expect("slot exists");
    assert_eq!(stored.status, "claimed");
    assert_eq!(stored.claimed_by_company, Some(company));
    assert!(stored.claimed_at.is_some());
}

#[tokio::test]
#[serial]
async fn test_second_claim_conflicts() {
    let app = TestApp::spawn().await;
    let tenant = app.create_tenant("dandori");
    let token = app.token(tenant, None);
    let seeded = app.seed_interior_post(&token).await;
    let slot = &seeded.slots[0];

    let first = app
        .post(
            "/claims",
            &token,
            json!({"slotId": slot.id, "companyId": Uuid::new_v4(), "requestId": rid()}),
        )
        .await;
    assert_status!(first, StatusCode::OK.as_u16());

    let second = app
        .post(
            "/claims",
            &token,
            json!({"slotId": slot.id, "companyId": Uuid::new_v4(), "requestId": rid()}),
        )
        .await;
    assert_status!(second, StatusCode::CONFLICT.as_u16());

    let body: Value = second.json().await.unwrap();
    assert_eq!(body["code"], "ALREADY_CLAIMED");
    assert!(body["message"].is_string());
}

#[tokio::test]
#[serial]
async fn test_idempotent_replay_returns_original_result() {
    let app = TestApp::spawn().await;
    let tenant = app.create_tenant("dandori");
    let token = app.token(tenant, None);
    let seeded = app.seed_interior_post(&token).await;
    let slot = &seeded.slots[0];
    let company = Uuid::new_v4();

    let payload = json!({"slotId": slot.id, "companyId": company, "requestId": rid()});

    let first = app.post("/claims", &token, payload.clone()).await;
    assert_status!(first, StatusCode::OK.as_u16());
    let first_body: Value = first.json().await.unwrap();

    let outbox_before = app.count_outbox_events("claim.confirmed");
    let audit_before = app.count_audit_entries(tenant, "claim");

    let replay = app.post("/claims", &token, payload).await;
    assert_status!(replay, StatusCode::OK.as_u16());
    let replay_body: Value = replay.json().await.unwrap();

    assert_eq!(first_body["claim"]["id"], replay_body["claim"]["id"]);
    assert_eq!(first_body["slot"]["id"], replay_body["slot"]["id"]);

    // A replay writes nothing.
    assert_eq!(app.count_outbox_events("claim.confirmed"), outbox_before);
    assert_eq!(app.count_audit_entries(tenant, "claim"), audit_before);
    assert_eq!(app.claim_count_for_slot(slot.id), 1);
}

#[tokio::test]
#[serial]
async fn test_ten_way_race_has_one_winner() {
    let app = TestApp::spawn().await;
    let tenant = app.create_tenant("dandori");
    let token = app.token(tenant, None);
    let seeded = app.seed_interior_post(&token).await;
    let slot = seeded.slots[1].clone();

    let outbox_before = app.count_outbox_events("claim.confirmed");

    let mut handles = Vec::new();
    for i in 0..10 {
        let client = app.client.clone();
        let url = format!("{}/claims", app.base_url);
        let token = token.to_string();
        let slot_id = slot.id;

        handles.push(tokio::spawn(async move {
            client
                .post(&url)
                .bearer_auth(&token)
                .json(&json!({
                    "slotId": slot_id,
                    "companyId": Uuid::new_v4(),
                    "requestId": format!("race-{}-{}", i, Uuid::new_v4())
                }))
                .send()
                .await
                .expect("request failed")
                .status()
                .as_u16()
        }));
    }

    let mut won = 0;
    let mut conflicted = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            200 => won += 1,
            409 => conflicted += 1,
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(won, 1, "exactly one concurrent claim must win");
    assert_eq!(conflicted, 9);

    let stored = app.get_slot(slot.id).expect("slot exists");
    assert_eq!(stored.status, "claimed");
    assert!(stored.claimed_by_company.is_some());

    assert_eq!(app.claim_count_for_slot(slot.id), 1);
    assert_eq!(
        app.count_outbox_events("claim.confirmed"),
        outbox_before + 1
    );
}

#[tokio::test]
#[serial]
async fn test_claim_side_effects_are_atomic() {
    let app = TestApp::spawn().await;
    let tenant = app.create_tenant("dandori");
    let token = app.token(tenant, None);
    let seeded = app.seed_interior_post(&token).await;
    let slot = &seeded.slots[0];

    let outbox_before = app.count_outbox_events("claim.confirmed");
    let audit_before = app.count_audit_entries(tenant, "claim");

    let response = app
        .post(
            "/claims",
            &token,
            json!({"slotId": slot.id, "companyId": Uuid::new_v4(), "requestId": rid()}),
        )
        .await;
    assert_status!(response, StatusCode::OK.as_u16());

    // Exactly one claim row, one outbox row, one audit row.
    assert_eq!(app.claim_count_for_slot(slot.id), 1);
    assert_eq!(
        app.count_outbox_events("claim.confirmed"),
        outbox_before + 1
    );
    assert_eq!(app.count_audit_entries(tenant, "claim"), audit_before + 1);

    // A losing claim writes none of the three.
    let loser = app
        .post(
            "/claims",
            &token,
            json!({"slotId": slot.id, "companyId": Uuid::new_v4(), "requestId": rid()}),
        )
        .await;
    assert_status!(loser, StatusCode::CONFLICT.as_u16());

    assert_eq!(app.claim_count_for_slot(slot.id), 1);
    assert_eq!(
        app.count_outbox_events("claim.confirmed"),
        outbox_before + 1
    );
    assert_eq!(app.count_audit_entries(tenant, "claim"), audit_before + 1);
}

#[tokio::test]
#[serial]
async fn test_claim_confirmed_event_payload() {
    let app = TestApp::spawn().await;
    let tenant = app.create_tenant("dandori");
    let token = app.token(tenant, None);
    let seeded = app.seed_interior_post(&token).await;
    let slot = &seeded.slots[0];
    let company = Uuid::new_v4();

    let response = app
        .post(
            "/claims",
            &token,
            json!({"slotId": slot.id, "companyId": company, "requestId": rid()}),
        )
        .await;
    assert_status!(response, StatusCode::OK.as_u16());

    let event = app
        .latest_outbox_event("claim.confirmed")
        .expect("outbox event exists");
    assert_eq!(event.status, "pending");
    assert_eq!(event.retry_count, 0);
    assert_eq!(event.target, "dandori");

    let payload = event.payload;
    assert_eq!(payload["event"], "claim.confirmed");
    assert_eq!(payload["version"], "1.0");
    assert_eq!(payload["producer"], "fcfs-booking");
    assert_eq!(payload["id"], event.event_id);
    assert_eq!(payload["data"]["tenant_id"], tenant.to_string());
    assert_eq!(payload["data"]["dw_project_id"], "DW-1042");
    assert_eq!(payload["data"]["slot"]["slot_id"], slot.id.to_string());
    assert_eq!(payload["data"]["slot"]["status"], "claimed");
    assert_eq!(payload["data"]["job_post"]["work_date"], "2024-11-05");
    assert_eq!(
        payload["data"]["claim"]["company_id"],
        company.to_string()
    );
}

#[tokio::test]
#[serial]
async fn test_cancel_lifecycle() {
    let app = TestApp::spawn().await;
    let tenant = app.create_tenant("dandori");
    let token = app.token(tenant, None);
    let seeded = app.seed_interior_post(&token).await;
    let claimed_slot = &seeded.slots[0];
    let open_slot = &seeded.slots[2];

    let response = app
        .post(
            "/claims",
            &token,
            json!({"slotId": claimed_slot.id, "companyId": Uuid::new_v4(), "requestId": rid()}),
        )
        .await;
    assert_status!(response, StatusCode::OK.as_u16());

    let cancelled_before = app.count_outbox_events("claim.cancelled");

    let response = app
        .post(
            "/cancel-claim",
            &token,
            json!({"slotId": claimed_slot.id, "reason": "weather"}),
        )
        .await;
    assert_status!(response, StatusCode::OK.as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["slot"]["status"], "cancelled");
    assert_eq!(body["slot"]["cancel_reason"], "weather");
    assert!(body["slot"]["canceled_at"].is_string());

    // History is preserved: the claim row outlives the cancellation and
    // the slot does not re-open.
    assert_eq!(app.claim_count_for_slot(claimed_slot.id), 1);
    let stored = app.get_slot(claimed_slot.id).expect("slot exists");
    assert_eq!(stored.status, "cancelled");

    assert_eq!(
        app.count_outbox_events("claim.cancelled"),
        cancelled_before + 1
    );
    let event = app.latest_outbox_event("claim.cancelled").unwrap();
    assert_eq!(event.payload["data"]["slot"]["status"], "cancelled");
    assert_eq!(
        event.payload["data"]["cancel"]["cancel_reason"],
        "weather"
    );

    // Cancelling again conflicts.
    let response = app
        .post(
            "/cancel-claim",
            &token,
            json!({"slotId": claimed_slot.id, "reason": "weather"}),
        )
        .await;
    assert_status!(response, StatusCode::CONFLICT.as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "ALREADY_CANCELLED");

    // Cancelling a slot that was never claimed conflicts differently.
    let response = app
        .post(
            "/cancel-claim",
            &token,
            json!({"slotId": open_slot.id, "reason": "no_show"}),
        )
        .await;
    assert_status!(response, StatusCode::CONFLICT.as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "SLOT_NOT_CLAIMED");
}

#[tokio::test]
#[serial]
async fn test_cancel_rejects_unknown_reason() {
    let app = TestApp::spawn().await;
    let tenant = app.create_tenant("dandori");
    let token = app.token(tenant, None);
    let seeded = app.seed_interior_post(&token).await;

    let response = app
        .post(
            "/cancel-claim",
            &token,
            json!({"slotId": seeded.slots[0].id, "reason": "rain"}),
        )
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST.as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION");
}

#[tokio::test]
#[serial]
async fn test_claim_validation_errors() {
    let app = TestApp::spawn().await;
    let tenant = app.create_tenant("dandori");
    let token = app.token(tenant, None);
    let seeded = app.seed_interior_post(&token).await;

    let response = app
        .post(
            "/claims",
            &token,
            json!({"slotId": seeded.slots[0].id, "companyId": Uuid::new_v4(), "requestId": ""}),
        )
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST.as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION");
}

#[tokio::test]
#[serial]
async fn test_claim_unknown_slot_is_not_found() {
    let app = TestApp::spawn().await;
    let tenant = app.create_tenant("dandori");
    let token = app.token(tenant, None);

    let response = app
        .post(
            "/claims",
            &token,
            json!({"slotId": Uuid::new_v4(), "companyId": Uuid::new_v4(), "requestId": rid()}),
        )
        .await;
    assert_status!(response, StatusCode::NOT_FOUND.as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
#[serial]
async fn test_random_walk_never_breaks_slot_invariants() {
    use rand::seq::SliceRandom;
    use rand::Rng;

    let app = TestApp::spawn().await;
    let tenant = app.create_tenant("dandori");
    let token = app.token(tenant, None);
    let seeded = app
        .seed_post(
            &token,
            "足場組立工事",
            "scaffolding",
            &[("2024-11-05", 2), ("2024-11-06", 2), ("2024-11-07", 1)],
        )
        .await;

    let reasons = ["no_show", "weather", "client_change", "material_delay", "other"];
    let mut rng = rand::thread_rng();

    for _ in 0..40 {
        let slot = seeded.slots.choose(&mut rng).unwrap();

        if rng.gen_bool(0.6) {
            app.post(
                "/claims",
                &token,
                json!({"slotId": slot.id, "companyId": Uuid::new_v4(), "requestId": rid()}),
            )
            .await;
        } else {
            app.post(
                "/cancel-claim",
                &token,
                json!({"slotId": slot.id, "reason": reasons.choose(&mut rng).unwrap()}),
            )
            .await;
        }

        // Whatever the walk did, every slot satisfies the state machine.
        for slot in &seeded.slots {
            let stored = app.get_slot(slot.id).expect("slot exists");
            match stored.status.as_str() {
                "available" => {
                    assert!(stored.claimed_by_company.is_none());
                    assert!(stored.claimed_at.is_none());
                }
                "claimed" => {
                    assert!(stored.claimed_by_company.is_some());
                    assert!(stored.claimed_at.is_some());
                }
                "cancelled" => {
                    assert!(stored.cancelled_at.is_some());
                    let reason = stored.cancel_reason.as_deref().expect("reason stamped");
                    assert!(reasons.contains(&reason));
                }
                other => panic!("slot left the state machine: {}", other),
            }
        }
    }
}

#[tokio::test]
#[serial]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::spawn().await;

    let response = app
        .post_public(
            "/claims",
            json!({"slotId": Uuid::new_v4(), "companyId": Uuid::new_v4(), "requestId": rid()}),
        )
        .await;
    assert_status!(response, StatusCode::UNAUTHORIZED.as_u16());
}
