//! HTTP API tests against the full router with in-memory stores.
//!
//! Run with: `cargo test --test api_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use hackops::aggregates::BaggageEnvironment;
use hackops::app::BaggageService;
use hackops::runtime::EffectRunner;
use hackops::server::{build_router, AppState, Features};
use hackops::stats::records::ApplicationRecord;
use hackops::stats::{StatsReporter, TtlCache};
use hackops::stores::{InMemoryBaggageStore, InMemoryStatsSource};
use hackops::types::{Room, RoomId};
use hackops_core::environment::Clock;
use hackops_testing::{test_clock, RecordingNotifier};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: Router,
    source: InMemoryStatsSource,
}

fn test_app(features: Features) -> TestApp {
    let clock: Arc<dyn Clock> = Arc::new(test_clock());
    let store = InMemoryBaggageStore::with_rooms([Room::new("E01", 2, 2)]);
    let source = InMemoryStatsSource::new();

    let baggage = Arc::new(BaggageService::new(
        Arc::new(store.clone()),
        BaggageEnvironment::new(Arc::clone(&clock), Arc::new(RecordingNotifier::new())),
        EffectRunner::new(),
        vec![RoomId::new("E01")],
    ));
    let stats = Arc::new(StatsReporter::new(
        Arc::new(source.clone()),
        Arc::new(store),
        Arc::clone(&clock),
        5,
    ));
    let cache = Arc::new(TtlCache::new(chrono::Duration::zero(), clock));

    TestApp {
        router: build_router(AppState::new(baggage, stats, cache), features),
        source,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_as(&self, user: Uuid, uri: &str, body: &Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header("X-User-Id", user.to_string())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }
}

fn bag_body(owner: Uuid) -> Value {
    json!({ "owner": owner, "type": "Suitcase", "color": "R" })
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = test_app(Features::default());

    let (status, _) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);

    let (status, report) = app.get("/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "ok");
    assert_eq!(report["components"][0]["component"], "database");
    assert_eq!(report["components"][0]["healthy"], true);
}

#[tokio::test]
async fn test_check_in_returns_created_bag() {
    let app = test_app(Features::default());
    let volunteer = Uuid::new_v4();
    let owner = Uuid::new_v4();

    let (status, body) = app.post_as(volunteer, "/api/bags", &bag_body(owner)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["owner"], owner.to_string());
    assert_eq!(body["custodian_in"], volunteer.to_string());
    assert_eq!(body["status"], "active");
    assert_eq!(body["position_label"], "E01-A0");
    assert_eq!(body["checked_out"], false);
}

#[tokio::test]
async fn test_check_in_requires_acting_user() {
    let app = test_app(Features::default());
    let request = Request::post("/api/bags")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(bag_body(Uuid::new_v4()).to_string()))
        .unwrap();

    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_taken_manual_position_is_a_conflict() {
    let app = test_app(Features::default());
    let volunteer = Uuid::new_v4();
    let mut body = bag_body(Uuid::new_v4());
    body["position"] = json!({ "room": "E01", "row": 1, "col": 1 });

    let (status, _) = app.post_as(volunteer, "/api/bags", &body).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, error) = app.post_as(volunteer, "/api/bags", &body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["code"], "POSITION_TAKEN");
}

#[tokio::test]
async fn test_invalid_metadata_is_unprocessable() {
    let app = test_app(Features::default());
    let body = json!({ "owner": Uuid::new_v4(), "type": "Suitcase", "color": "" });

    let (status, error) = app.post_as(Uuid::new_v4(), "/api/bags", &body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_second_check_out_is_a_conflict() {
    let app = test_app(Features::default());
    let volunteer = Uuid::new_v4();
    let (_, bag) = app.post_as(volunteer, "/api/bags", &bag_body(Uuid::new_v4())).await;
    let checkout = format!("/api/bags/{}/checkout", bag["id"]);

    let (status, body) = app.post_as(volunteer, &checkout, &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "removed");
    assert_eq!(body["custodian_out"], volunteer.to_string());

    let (status, error) = app.post_as(Uuid::new_v4(), &checkout, &json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["code"], "ALREADY_REMOVED");
}

#[tokio::test]
async fn test_unknown_bag_is_not_found() {
    let app = test_app(Features::default());

    let (status, _) = app.get("/api/bags/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_active_list_filters_by_owner() {
    let app = test_app(Features::default());
    let volunteer = Uuid::new_v4();
    let owner = Uuid::new_v4();
    app.post_as(volunteer, "/api/bags", &bag_body(owner)).await;
    app.post_as(volunteer, "/api/bags", &bag_body(Uuid::new_v4())).await;

    let (status, all) = app.get("/api/bags").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, mine) = app.get(&format!("/api/bags?owner={owner}")).await;
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["owner"], owner.to_string());
}

#[tokio::test]
async fn test_room_upsert_and_map() {
    let app = test_app(Features::default());
    let request = Request::put("/api/rooms/E02")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "rows": 3, "cols": 4 }).to_string()))
        .unwrap();

    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);

    let (_, rooms) = app.get("/api/rooms").await;
    assert_eq!(rooms.as_array().unwrap().len(), 2);

    app.post_as(Uuid::new_v4(), "/api/bags", &bag_body(Uuid::new_v4())).await;
    let (status, map) = app.get("/api/bags/map").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(map["rooms"][0]["bags"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_oversized_room_is_rejected() {
    let app = test_app(Features::default());
    let request = Request::put("/api/rooms/E09")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "rows": 100_000, "cols": 100_000 }).to_string()))
        .unwrap();

    let (status, error) = app.send(request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["code"], "VALIDATION_ERROR");

    let (_, rooms) = app.get("/api/rooms").await;
    assert_eq!(rooms.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_statistics_endpoints() {
    let app = test_app(Features::default());
    for status in ["A", "A", "P"] {
        app.source
            .add_application(ApplicationRecord::with_status(status, test_clock().now()))
            .await;
    }

    let (status, apps) = app.get("/api/stats/apps").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(apps["app_count"], 3);
    assert!(apps["update_time"].is_string());

    for endpoint in ["/api/stats/reimb", "/api/stats/workshops", "/api/stats/baggage"] {
        let (status, _) = app.get(endpoint).await;
        assert_eq!(status, StatusCode::OK, "{endpoint}");
    }
}

#[tokio::test]
async fn test_disabled_features_are_not_mounted() {
    let app = test_app(Features {
        baggage: false,
        reimbursement_stats: false,
    });

    let (status, _) = app.get("/api/stats/reimb").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/bags").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/stats/apps").await;
    assert_eq!(status, StatusCode::OK);
}
