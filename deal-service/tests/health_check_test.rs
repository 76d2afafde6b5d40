//! Health endpoint integration test.

mod common;

use common::TestApp;

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn health_check_reports_healthy() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["postgres"], "up");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn protected_routes_reject_missing_token() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let response = client
        .get(format!("{}/spacs", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 401);

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "Unauthorized");
}
