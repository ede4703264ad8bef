use std::sync::Arc;

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use meter_api::metrics::ServerMetrics;
use meter_api::shutdown::ShutdownCoordinator;
use meter_api::{AppState, Config, Stores};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use telemetry::metrics::Telemetry;

const ADMIN_NAME: &str = "root";
const ADMIN_PASSWORD: &str = "root-secret";

async fn setup_server() -> TestServer {
    let config = Config::from_vars([
        ("API_SERVICE_PORT".to_string(), "0".to_string()),
        ("STORAGE_BACKEND".to_string(), "memory".to_string()),
        ("BCRYPT_COST".to_string(), "4".to_string()),
        ("ADMIN_USERNAME".to_string(), ADMIN_NAME.to_string()),
        ("ADMIN_PASSWORD".to_string(), ADMIN_PASSWORD.to_string()),
    ])
    .unwrap();

    let metrics = ServerMetrics::new_with_random_prefix().unwrap();
    let telemetry = Telemetry::new(Some(metrics));
    let shutdown = Arc::new(ShutdownCoordinator::new(vec![], None));

    let state = AppState::new(config, Stores::in_memory(), telemetry, shutdown);
    meter_api::bootstrap::ensure_admin(&state.config, &state.users)
        .await
        .unwrap();

    TestServer::new(meter_api::app(state)).unwrap()
}

async fn register(server: &TestServer, name: &str, password: &str) -> Value {
    let response = server
        .post("/register")
        .json(&json!({ "name": name, "password": password }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()
}

/// Logs in and returns the `Cookie` header value carrying the session.
async fn login(server: &TestServer, name: &str, password: &str) -> HeaderValue {
    let response = server
        .post("/login")
        .form(&[("user_name", name), ("password", password)])
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let set_cookie = response.header(header::SET_COOKIE);
    let set_cookie = set_cookie.to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));

    let pair = set_cookie.split(';').next().unwrap();
    HeaderValue::from_str(pair).unwrap()
}

/// Value of `request_errors` for one handler and error code, 0 when absent.
fn request_errors(metrics: &str, handler: &str, code: &str) -> u64 {
    let handler = format!("handler=\"{handler}\"");
    let code = format!("error_code=\"{code}\"");

    metrics
        .lines()
        .filter(|line| line.contains("request_errors{"))
        .find(|line| line.contains(&handler) && line.contains(&code))
        .and_then(|line| line.rsplit(' ').next())
        .map_or(0, |value| value.parse().unwrap())
}

async fn submit(
    server: &TestServer,
    session: &HeaderValue,
    body: Value,
) -> axum_test::TestResponse {
    server
        .post("/meter-readings/submit")
        .add_header(header::COOKIE, session.clone())
        .json(&body)
        .await
}

#[tokio::test]
async fn register_returns_the_user_without_password() {
    let server = setup_server().await;

    let user = register(&server, "alice", "pw").await;

    assert_eq!(user["name"], "alice");
    assert_eq!(user["role"], "USER");
    assert!(user["id"].as_i64().is_some());
    assert!(user.get("password").is_none());
}

#[tokio::test]
async fn register_rejects_blank_credentials_and_duplicates() {
    let server = setup_server().await;

    let response = server
        .post("/register")
        .json(&json!({ "name": "  ", "password": "pw" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    register(&server, "bob", "pw").await;
    let response = server
        .post("/register")
        .json(&json!({ "name": "bob", "password": "other" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let body = response.json::<Value>();
    assert_eq!(body["message"], "User already exists");
    assert_eq!(body["details"][0]["code"], "user_already_exists");
    assert!(body["requestId"].as_str().is_some());
}

#[tokio::test]
async fn register_rejects_malformed_json() {
    let server = setup_server().await;

    let response = server
        .post("/register")
        .text("{not json")
        .content_type("application/json")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_requires_a_form_body() {
    let server = setup_server().await;
    register(&server, "carol", "right").await;

    let response = server
        .post("/login")
        .json(&json!({ "user_name": "carol", "password": "right" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["details"][0]["code"], "invalid_form");
    assert!(body["requestId"].as_str().is_some());
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let server = setup_server().await;
    register(&server, "carol", "right").await;

    let response = server
        .post("/login")
        .form(&[("user_name", "carol"), ("password", "wrong")])
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn readings_require_a_session() {
    let server = setup_server().await;

    for path in [
        "/meter-readings/current",
        "/meter-readings/history",
        "/meter-readings/totals",
        "/meter-readings/month/1",
    ] {
        let response = server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED, "{path}");
    }

    let response = server
        .get("/meter-readings/current")
        .add_header(
            header::COOKIE,
            HeaderValue::from_static("SESSION=00000000-0000-0000-0000-000000000000"),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn submitted_readings_show_up_in_current_history_and_totals() {
    let server = setup_server().await;
    let user = register(&server, "dave", "pw").await;
    let session = login(&server, "dave", "pw").await;

    let response = server
        .get("/meter-readings/current")
        .add_header(header::COOKIE, session.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!([]));

    let first = submit(
        &server,
        &session,
        json!({
            "numberMeter": "GAS-1",
            "detailsList": [{ "type": "gas", "value": 10.5 }]
        }),
    )
    .await;
    assert_eq!(first.status_code(), StatusCode::CREATED);
    let first = first.json::<Value>();
    assert_eq!(first["numberMeter"], "GAS-1");
    assert_eq!(first["user"]["id"], user["id"]);
    assert_eq!(first["detailsList"][0]["type"], "gas");
    assert_eq!(first["detailsList"][0]["meterReadingId"], first["id"]);

    let second = submit(
        &server,
        &session,
        json!({
            "numberMeter": "GAS-1",
            "detailsList": [
                { "type": "gas", "value": 2.0 },
                { "type": "water", "value": 3.0 }
            ]
        }),
    )
    .await
    .json::<Value>();

    let current = server
        .get("/meter-readings/current")
        .add_header(header::COOKIE, session.clone())
        .await
        .json::<Value>();
    assert_eq!(current.as_array().unwrap().len(), 1);
    assert_eq!(current[0]["id"], second["id"]);

    let history = server
        .get("/meter-readings/history")
        .add_header(header::COOKIE, session.clone())
        .await
        .json::<Value>();
    assert_eq!(history.as_array().unwrap().len(), 2);

    let totals = server
        .get("/meter-readings/totals")
        .add_header(header::COOKIE, session.clone())
        .await
        .json::<Value>();
    assert_eq!(
        totals,
        json!([
            { "type": "gas", "total": 12.5 },
            { "type": "water", "total": 3.0 }
        ])
    );
}

#[tokio::test]
async fn invalid_readings_are_rejected() {
    let server = setup_server().await;
    register(&server, "erin", "pw").await;
    let session = login(&server, "erin", "pw").await;

    for body in [
        json!({ "numberMeter": "GAS 1", "detailsList": [{ "type": "gas", "value": 1.0 }] }),
        json!({ "numberMeter": "", "detailsList": [{ "type": "gas", "value": 1.0 }] }),
        json!({ "numberMeter": "GAS-1", "detailsList": [] }),
        json!({ "numberMeter": "GAS-1", "detailsList": [{ "type": "", "value": 1.0 }] }),
        json!({ "numberMeter": "GAS-1", "detailsList": [{ "type": "gas", "value": -1.0 }] }),
        json!({ "detailsList": [{ "type": "gas", "value": 1.0 }] }),
    ] {
        let response = submit(&server, &session, body.clone()).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{body}");
    }

    let history = server
        .get("/meter-readings/history")
        .add_header(header::COOKIE, session)
        .await
        .json::<Value>();
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn month_filter_validates_the_month() {
    let server = setup_server().await;
    register(&server, "frank", "pw").await;
    let session = login(&server, "frank", "pw").await;

    submit(
        &server,
        &session,
        json!({ "numberMeter": "E-7", "detailsList": [{ "type": "power", "value": 1.0 }] }),
    )
    .await;

    for month in ["0", "13", "march"] {
        let response = server
            .get(&format!("/meter-readings/month/{month}"))
            .add_header(header::COOKIE, session.clone())
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{month}");
    }

    let this_month = chrono::Utc::now().format("%m").to_string();
    let this_month: u32 = this_month.parse().unwrap();
    let other_month = this_month % 12 + 1;

    let hits = server
        .get(&format!("/meter-readings/month/{this_month}"))
        .add_header(header::COOKIE, session.clone())
        .await
        .json::<Value>();
    assert_eq!(hits.as_array().unwrap().len(), 1);

    let misses = server
        .get(&format!("/meter-readings/month/{other_month}"))
        .add_header(header::COOKIE, session)
        .await
        .json::<Value>();
    assert_eq!(misses, json!([]));
}

#[tokio::test]
async fn all_history_is_for_admins_only() {
    let server = setup_server().await;
    register(&server, "gina", "pw").await;
    let user_session = login(&server, "gina", "pw").await;

    submit(
        &server,
        &user_session,
        json!({ "numberMeter": "W-1", "detailsList": [{ "type": "water", "value": 4.0 }] }),
    )
    .await;

    let response = server
        .get("/meter-readings/history/all")
        .add_header(header::COOKIE, user_session)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(
        response.json::<Value>()["message"],
        "Invalid or unauthorized user"
    );

    let admin_session = login(&server, ADMIN_NAME, ADMIN_PASSWORD).await;
    let all = server
        .get("/meter-readings/history/all")
        .add_header(header::COOKIE, admin_session)
        .await;
    assert_eq!(all.status_code(), StatusCode::OK);

    let all = all.json::<Value>();
    assert_eq!(all.as_array().unwrap().len(), 1);
    assert_eq!(all[0]["user"]["name"], "gina");
}

#[tokio::test]
async fn audit_log_records_requests_for_admins() {
    let server = setup_server().await;
    register(&server, "hank", "pw").await;
    let user_session = login(&server, "hank", "pw").await;

    server.get("/users/all?page=2").await;

    let response = server
        .get("/audit")
        .add_header(header::COOKIE, user_session)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let admin_session = login(&server, ADMIN_NAME, ADMIN_PASSWORD).await;
    let entries = server
        .get("/audit")
        .add_header(header::COOKIE, admin_session)
        .await
        .json::<Value>();
    let entries = entries.as_array().unwrap();

    // Newest first: the audit request itself leads.
    let newest = entries[0]["message"].as_str().unwrap();
    assert!(newest.contains("Method Name: /audit"), "{newest}");

    let listing = entries
        .iter()
        .filter_map(|e| e["message"].as_str())
        .find(|m| m.contains("Method Name: /users/all"))
        .unwrap();
    assert!(listing.contains("Signature: GET /users/all"));
    assert!(listing.contains("Arguments: [page=2]"));

    let registration = entries
        .iter()
        .filter_map(|e| e["message"].as_str())
        .find(|m| m.contains("Method Name: /register"))
        .unwrap();
    assert!(registration.ends_with("Arguments: []"));
    assert!(!registration.contains("pw"));
}

#[tokio::test]
async fn users_can_be_looked_up_publicly() {
    let server = setup_server().await;
    let user = register(&server, "ivy", "pw").await;
    let id = user["id"].as_i64().unwrap();

    let found = server.get(&format!("/users/{id}")).await;
    assert_eq!(found.status_code(), StatusCode::OK);
    assert_eq!(found.json::<Value>(), user);

    let all = server.get("/users/all").await.json::<Value>();
    let names: Vec<&str> = all
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|u| u["name"].as_str())
        .collect();
    assert_eq!(names, vec![ADMIN_NAME, "ivy"]);

    let missing = server.get("/users/9999").await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

    let invalid = server.get("/users/abc").await;
    assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let server = setup_server().await;
    register(&server, "jack", "pw").await;
    let session = login(&server, "jack", "pw").await;

    let response = server
        .post("/logout")
        .add_header(header::COOKIE, session.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    let expired = response.header(header::SET_COOKIE);
    assert!(expired.to_str().unwrap().contains("Max-Age=0"));

    let response = server
        .get("/meter-readings/current")
        .add_header(header::COOKIE, session)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn operational_endpoints_respond() {
    let server = setup_server().await;

    let health = server.get("/health").await;
    assert_eq!(health.status_code(), StatusCode::OK);
    assert_eq!(health.json::<Value>()["status"], "healthy");

    let version = server.get("/version").await;
    assert_eq!(version.status_code(), StatusCode::OK);

    register(&server, "kate", "pw").await;
    server.get("/users/0").await;

    let metrics = server.get("/metrics").await;
    assert_eq!(metrics.status_code(), StatusCode::OK);
    let text = metrics.text();
    assert!(text.contains("users_registered 1"), "{text}");
    assert!(text.contains("user_not_found"));

    let docs = server.get("/api-docs/openapi.json").await;
    assert_eq!(docs.status_code(), StatusCode::OK);
    assert!(docs.json::<Value>()["paths"]["/meter-readings/submit"].is_object());
}

#[tokio::test]
async fn rejected_requests_are_counted_per_handler() {
    let server = setup_server().await;
    register(&server, "lena", "pw").await;
    let session = login(&server, "lena", "pw").await;

    let before = server.get("/metrics").await.text();
    assert_eq!(
        request_errors(&before, "meter_readings_month", "invalid_month"),
        0
    );

    server
        .get("/meter-readings/month/march")
        .add_header(header::COOKIE, session)
        .await;
    server.get("/meter-readings/current").await;
    server.get("/users/abc").await;
    server
        .post("/register")
        .text("{not json")
        .content_type("application/json")
        .await;

    let after = server.get("/metrics").await.text();
    assert_eq!(
        request_errors(&after, "meter_readings_month", "invalid_month"),
        1,
        "{after}"
    );
    assert_eq!(request_errors(&after, "authenticate", "unauthenticated"), 1);
    assert_eq!(request_errors(&after, "users_get", "invalid_path"), 1);
    assert_eq!(request_errors(&after, "users_register", "invalid_json"), 1);
}

#[tokio::test]
async fn responses_carry_a_request_id_and_unknown_routes_are_404() {
    let server = setup_server().await;

    let response = server.get("/nope").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert!(response.maybe_header("x-request-id").is_some());

    let response = server.get("/meter-readings/current").await;
    let request_id = response.header("x-request-id");
    let body = response.json::<Value>();
    assert_eq!(body["requestId"], request_id.to_str().unwrap());
}
