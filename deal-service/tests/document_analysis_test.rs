//! Document upload, download and persisted-analysis-cache integration tests.

mod common;

use common::TestApp;
use deal_service::models::Role;
use std::sync::atomic::Ordering;
use uuid::Uuid;

async fn upload_doc(app: &TestApp, token: &str, org: Uuid, content: &str) -> Uuid {
    let form = reqwest::multipart::Form::new()
        .text("organizationId", org.to_string())
        .part(
            "file",
            reqwest::multipart::Part::text(content.to_string())
                .file_name("merger-agreement.txt")
                .mime_str("text/plain")
                .unwrap(),
        );

    let response = app
        .client()
        .post(format!("{}/documents", app.address))
        .bearer_auth(token)
        .multipart(form)
        .send()
        .await
        .expect("Failed to upload");
    assert_eq!(response.status(), 201);

    let body: serde_json::Value = response.json().await.unwrap();
    body["documentId"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn upload_then_download_round_trips() {
    let app = TestApp::spawn().await;
    let user = Uuid::new_v4();
    let org = app.seed_organization("docs").await;
    app.seed_membership(org, user, Role::Member).await;
    let token = app.token_for(user);

    let doc = upload_doc(&app, &token, org, "the definitive agreement text").await;

    let response = app
        .client()
        .get(format!("{}/documents/{}/download", app.address, doc))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/plain"
    );
    assert_eq!(response.text().await.unwrap(), "the definitive agreement text");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn analysis_is_cached_per_document_until_invalidated() {
    let app = TestApp::spawn().await;
    let user = Uuid::new_v4();
    let org = app.seed_organization("analysis").await;
    app.seed_membership(org, user, Role::Member).await;
    let token = app.token_for(user);

    let doc = upload_doc(&app, &token, org, "risk factors: everything").await;
    let client = app.client();

    // First analysis invokes the provider.
    let body: serde_json::Value = client
        .post(format!("{}/documents/{}/analysis", app.address, doc))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["cached"], false);
    assert_eq!(app.scoring.review_calls.load(Ordering::SeqCst), 1);

    // Second analysis is served from the persisted row.
    let body: serde_json::Value = client
        .post(format!("{}/documents/{}/analysis", app.address, doc))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["cached"], true);
    assert_eq!(app.scoring.review_calls.load(Ordering::SeqCst), 1);

    // Updating the document invalidates the cached analysis.
    let response = client
        .put(format!("{}/documents/{}", app.address, doc))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "name": "merger-agreement-v2.txt" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = client
        .post(format!("{}/documents/{}/analysis", app.address, doc))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["cached"], false);
    assert_eq!(app.scoring.review_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn deleting_a_document_requires_admin_and_drops_its_analysis() {
    let app = TestApp::spawn().await;
    let member = Uuid::new_v4();
    let admin = Uuid::new_v4();
    let org = app.seed_organization("doc-delete").await;
    app.seed_membership(org, member, Role::Member).await;
    app.seed_membership(org, admin, Role::Admin).await;
    let member_token = app.token_for(member);

    let doc = upload_doc(&app, &member_token, org, "to be deleted").await;

    // Analyze so a persisted row exists.
    app.client()
        .post(format!("{}/documents/{}/analysis", app.address, doc))
        .bearer_auth(&member_token)
        .send()
        .await
        .unwrap();

    let response = app
        .client()
        .delete(format!("{}/documents/{}", app.address, doc))
        .bearer_auth(&member_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = app
        .client()
        .delete(format!("{}/documents/{}", app.address, doc))
        .bearer_auth(app.token_for(admin))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let remaining: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM document_analyses WHERE document_id = $1")
            .bind(doc)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(remaining, 0);
}
