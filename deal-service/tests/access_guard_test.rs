//! Access-guard integration tests: membership gating and role elevation.

mod common;

use common::TestApp;
use deal_service::models::Role;
use uuid::Uuid;

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn principal_without_membership_is_denied_everywhere() {
    let app = TestApp::spawn().await;
    let insider = Uuid::new_v4();
    let outsider = Uuid::new_v4();

    let org = app.seed_organization("walled-garden").await;
    app.seed_membership(org, insider, Role::Member).await;
    let spac = app.seed_spac(org, "Apex Acquisition Corp", "APEX").await;

    // The outsider holds an owner role in a different organization.
    let other_org = app.seed_organization("elsewhere").await;
    app.seed_membership(other_org, outsider, Role::Owner).await;

    let client = app.client();
    let token = app.token_for(outsider);

    // List scoped to the walled garden.
    let response = client
        .get(format!("{}/spacs?organizationId={}", app.address, org))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Access denied");

    // Detail of an entity inside the walled garden.
    let response = client
        .get(format!("{}/spacs/{}", app.address, spac))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // Mutation inside the walled garden.
    let response = client
        .post(format!("{}/spacs", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "organizationId": org,
            "name": "Intruder Corp",
            "ticker": "INTR"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // Organization detail.
    let response = client
        .get(format!("{}/organizations/{}", app.address, org))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn member_cannot_delete_but_admin_can() {
    let app = TestApp::spawn().await;
    let member = Uuid::new_v4();
    let admin = Uuid::new_v4();

    let org = app.seed_organization("roles").await;
    app.seed_membership(org, member, Role::Member).await;
    app.seed_membership(org, admin, Role::Admin).await;
    let spac = app.seed_spac(org, "Apex Acquisition Corp", "APEX").await;

    let client = app.client();

    let response = client
        .delete(format!("{}/spacs/{}", app.address, spac))
        .bearer_auth(app.token_for(member))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = client
        .delete(format!("{}/spacs/{}", app.address, spac))
        .bearer_auth(app.token_for(admin))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    // Soft-deleted rows read as absent afterwards.
    let response = client
        .get(format!("{}/spacs/{}", app.address, spac))
        .bearer_auth(app.token_for(member))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn membership_is_rechecked_per_request() {
    let app = TestApp::spawn().await;
    let user = Uuid::new_v4();
    let org = app.seed_organization("revocable").await;
    app.seed_membership(org, user, Role::Member).await;

    let client = app.client();
    let token = app.token_for(user);

    let response = client
        .get(format!("{}/spacs?organizationId={}", app.address, org))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Revoke the membership between requests; the same token must now fail.
    sqlx::query("DELETE FROM memberships WHERE organization_id = $1 AND user_id = $2")
        .bind(org)
        .bind(user)
        .execute(&app.pool)
        .await
        .unwrap();

    let response = client
        .get(format!("{}/spacs?organizationId={}", app.address, org))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn member_listing_requires_admin() {
    let app = TestApp::spawn().await;
    let member = Uuid::new_v4();
    let admin = Uuid::new_v4();

    let org = app.seed_organization("member-list").await;
    app.seed_membership(org, member, Role::Member).await;
    app.seed_membership(org, admin, Role::Admin).await;

    let client = app.client();

    let response = client
        .get(format!("{}/organizations/{}/members", app.address, org))
        .bearer_auth(app.token_for(member))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = client
        .get(format!("{}/organizations/{}/members", app.address, org))
        .bearer_auth(app.token_for(admin))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["total"], 2);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn organization_creator_becomes_owner() {
    let app = TestApp::spawn().await;
    let founder = Uuid::new_v4();

    let slug = format!("harbor-point-{}", Uuid::new_v4().simple());
    let response = app
        .client()
        .post(format!("{}/organizations", app.address))
        .bearer_auth(app.token_for(founder))
        .json(&serde_json::json!({
            "name": "Harbor Point Capital",
            "slug": slug
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let body: serde_json::Value = response.json().await.unwrap();
    let org: Uuid = body["organizationId"].as_str().unwrap().parse().unwrap();

    let role: String = sqlx::query_scalar(
        "SELECT role_code FROM memberships WHERE organization_id = $1 AND user_id = $2",
    )
    .bind(org)
    .bind(founder)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(role, "owner");
}
