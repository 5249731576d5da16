//! Route-level tests against in-memory services.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use bounty_platform::{
    api::{create_router, AppState},
    config::Config,
    fallback::sample_bounties,
    sync::sign_webhook_body,
    types::Profile,
};
use common::*;
use serde_json::{json, Map};

#[tokio::test]
async fn health_reports_integrations() {
    let app = test_app();
    let (status, body) = get(&app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["integrations"]["airtable"], true);
    assert_eq!(body["integrations"]["privy"], true);
}

#[tokio::test]
async fn bounties_fall_back_without_store() {
    let router = create_router(AppState::new(Config::default()));
    let (status, body) = get(&router, "/api/bounties").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "fallback");
    assert!(body["warning"].as_str().unwrap().contains("not configured"));
    assert_eq!(body["count"], sample_bounties().len());
}

#[tokio::test]
async fn bounties_fall_back_when_store_fails() {
    let app = test_app();
    app.store.set_unavailable(true);

    let (status, body) = get(&app.router, "/api/bounties").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "fallback");
    assert!(body["warning"].is_string());
}

#[tokio::test]
async fn bounties_filter_by_status_and_category() {
    let app = test_app();

    let (_, body) = get(&app.router, "/api/bounties?status=In%20Review").await;
    assert_eq!(body["source"], "airtable");
    assert_eq!(body["count"], 1);
    assert_eq!(body["bounties"][0]["status"], "in-progress");

    let (_, body) = get(&app.router, "/api/bounties?category=design&status=all").await;
    assert_eq!(body["count"], 2);

    let (_, body) = get(&app.router, "/api/bounties?category=dev").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["bounties"][0]["category"], "Development");

    let (_, body) = get(&app.router, "/api/bounties?category=BRAND").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["bounties"][0]["id"], "sample-1");

    let (_, body) = get(&app.router, "/api/bounties?status=done").await;
    assert_eq!(body["bounties"][0]["id"], "sample-4");
}

#[tokio::test]
async fn bounty_by_id() {
    let app = test_app();

    let (status, body) = get(&app.router, "/api/bounties/sample-2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bounty"]["title"], "Build a Bounty Leaderboard Widget");

    let (status, body) = get(&app.router, "/api/bounties/recMissing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("recMissing"));
}

#[tokio::test]
async fn search_ranks_and_records_analytics() {
    let app = test_app();

    let (status, body) = get(&app.router, "/api/search?q=logo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["id"], "sample-1");
    assert_eq!(body["results"][0]["contentType"], "bounty");

    let (_, body) = get(&app.router, "/api/search?q=amara&type=winners").await;
    assert!(body["total"].as_u64().unwrap() >= 1);
    assert!(body["results"]
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["contentType"] == "winner"));

    get(&app.router, "/api/search?q=quantum%20basketweaving").await;

    let request = Request::get("/api/analytics")
        .header("x-admin-key", ADMIN_KEY)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalSearches"], 3);
    assert_eq!(body["zeroResultQueries"][0]["query"], "quantum basketweaving");
}

#[tokio::test]
async fn search_requires_query() {
    let app = test_app();

    let (status, body) = get(&app.router, "/api/search?q=%20%20").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"]["field"], "q");

    let (status, _) = get(&app.router, "/api/search?q=logo&type=planets").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn malformed_query_string_gets_json_error() {
    let app = test_app();

    let (status, body) = get(&app.router, "/api/search?q=logo&limit=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to deserialize query string"));
    assert!(body["timestamp"].is_i64());
}

#[tokio::test]
async fn analytics_requires_admin_key() {
    let app = test_app();
    let (status, _) = get(&app.router, "/api/analytics").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn community_endpoints() {
    let app = test_app();

    let (_, winners) = get(&app.router, "/api/winners").await;
    assert_eq!(winners["count"], 4);

    let (_, activities) = get(&app.router, "/api/activities").await;
    assert_eq!(activities["count"], 3);

    let (_, board) = get(&app.router, "/api/leaderboard").await;
    assert_eq!(board["leaderboard"][0]["name"], "Amara Okafor");
    assert_eq!(board["leaderboard"][0]["totalReward"], 750.0);
    assert_eq!(board["leaderboard"][0]["wins"], 2);
}

#[tokio::test]
async fn sync_with_webhook_signature() {
    let app = test_app();
    let payload = br#"{"event":"bounty.updated"}"#;

    let unsigned = Request::post("/api/sync").body(Body::from(&payload[..])).unwrap();
    let (status, _) = send(&app.router, unsigned).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let signature = sign_webhook_body(WEBHOOK_SECRET, payload).unwrap();
    let signed = Request::post("/api/sync")
        .header("x-webhook-signature", signature)
        .body(Body::from(&payload[..]))
        .unwrap();
    let (status, body) = send(&app.router, signed).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["added"].as_array().unwrap().len(), sample_bounties().len());

    let mut bounties = sample_bounties();
    bounties[2].title.push_str(" (2nd edition)");
    bounties.pop();
    app.store.set_bounties(bounties).await;

    let admin = Request::post("/api/sync")
        .header("x-admin-key", ADMIN_KEY)
        .body(Body::empty())
        .unwrap();
    let (_, body) = send(&app.router, admin).await;
    assert_eq!(body["added"], json!([]));
    assert_eq!(body["changed"], json!(["sample-3"]));
    assert_eq!(body["removed"], json!(["sample-5"]));
    assert_eq!(body["total"], 4);
}

#[tokio::test]
async fn profile_read_and_metadata_merge() {
    let app = test_app();
    let mut metadata = Map::new();
    metadata.insert("university".into(), json!("MIT"));
    metadata.insert("bio".into(), json!("hello"));
    app.identity
        .insert(Profile {
            user_id: "did:privy:ada".into(),
            wallet_address: Some("0xabc".into()),
            custom_metadata: metadata,
        })
        .await;

    let (status, body) = get(&app.router, "/api/profile/did:privy:ada").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["walletAddress"], "0xabc");

    let patch = json!({
        "userId": "did:privy:ada",
        "metadata": {"graduationYear": 2026, "bio": null}
    });
    let (status, body) = send(&app.router, json_request("PATCH", "/api/profile", &patch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["customMetadata"],
        json!({"university": "MIT", "graduationYear": 2026})
    );

    let (status, _) = get(&app.router, "/api/profile/did:privy:nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn profile_rejects_nested_metadata() {
    let app = test_app();
    let patch = json!({"userId": "did:privy:ada", "metadata": {"socials": {"x": "@ada"}}});
    let (status, _) = send(&app.router, json_request("PATCH", "/api/profile", &patch)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn malformed_json_body_gets_json_error() {
    let app = test_app();
    let request = Request::patch("/api/profile")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to parse the request body as JSON"));

    let request = Request::patch("/api/profile")
        .body(Body::from(r#"{"userId": "did:privy:ada"}"#))
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn upload_signature_uses_configured_host() {
    let app = test_app();
    let request = json_request(
        "POST",
        "/api/cloudinary/signature",
        &json!({"params": {"timestamp": 1315060510, "public_id": "sample_image"}}),
    );
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["params"]["timestamp"], "1315060510");
    assert_eq!(body["signature"].as_str().unwrap().len(), 40);

    let router = create_router(AppState::new(Config::default()));
    let (status, _) = send(
        &router,
        json_request("POST", "/api/cloudinary/signature", &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn debug_endpoints_require_admin_key_when_configured() {
    let app = test_app();
    let (status, _) = get(&app.router, "/api/debug/config").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::get("/api/debug/airtable")
        .header("x-admin-key", ADMIN_KEY)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected"], true);
    assert_eq!(body["fields"], json!(["Status", "Title"]));

    let open = create_router(AppState::new(Config::default()));
    let (status, body) = get(&open, "/api/debug/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["variables"].as_array().unwrap().len(), 11);
}
