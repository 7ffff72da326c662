//! Role enforcement and user administration.

mod common;

use axum::http::StatusCode;
use common::*;
use folio_core::models::{Status, UserType};
use folio_core::store::UserStore;
use serde_json::json;

fn status_request(id: &str, status: &str, token: &str) -> axum::http::Request<axum::body::Body> {
    request(
        "PATCH",
        &format!("/admin/users/{id}/status"),
        Some(json!({ "status": status })),
        Some(token),
    )
}

#[tokio::test]
async fn regular_admin_is_forbidden_from_admin_routes() {
    let app = TestApp::new();
    app.seed("reggie", UserType::RegularAdmin).await;
    let target = app.seed("target", UserType::RegularAdmin).await;
    let tokens = app.login("reggie").await;

    let id = app.state.cipher.encrypt_numeric_id(target.id).unwrap();
    let (status, body) = app
        .send(status_request(&id, "suspended", access_token(&tokens)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body.unwrap()["error"], "forbidden");

    let user = app.store.find_user(target.id).await.unwrap().unwrap();
    assert_eq!(user.status, Status::Active);
}

#[tokio::test]
async fn super_admin_suspends_and_reactivates() {
    let app = TestApp::new();
    app.seed("root", UserType::SuperAdmin).await;
    let target = app.seed("target", UserType::RegularAdmin).await;
    let admin = app.login("root").await;
    let victim = app.login("target").await;

    let id = app.state.cipher.encrypt_numeric_id(target.id).unwrap();
    let (status, body) = app
        .send(status_request(&id, "suspended", access_token(&admin)))
        .await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["status"], "suspended");
    assert_eq!(body["id"], id.as_str());

    // Access and refresh both stop working.
    let (status, _) = app.send(get("/users/me", access_token(&victim))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let credential = app.store.find_credential(target.id).await.unwrap().unwrap();
    assert!(credential.refresh_token_hash.is_none());

    let (status, _) = app
        .send(status_request(&id, "active", access_token(&admin)))
        .await;
    assert_eq!(status, StatusCode::OK);
    app.login("target").await;
}

#[tokio::test]
async fn malformed_identifiers_are_bad_requests() {
    let app = TestApp::new();
    app.seed("root", UserType::SuperAdmin).await;
    let admin = app.login("root").await;

    for id in ["not-base64!", "AAAA", "c29tZXRoaW5nIGVsc2U"] {
        let (status, body) = app
            .send(status_request(id, "suspended", access_token(&admin)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{id}");
        assert_eq!(body.unwrap()["message"], "Invalid identifier");
    }
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let app = TestApp::new();
    app.seed("root", UserType::SuperAdmin).await;
    let admin = app.login("root").await;

    let id = app.state.cipher.encrypt_numeric_id(9_999).unwrap();
    let (status, _) = app
        .send(status_request(&id, "deleted", access_token(&admin)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_cannot_deactivate_self() {
    let app = TestApp::new();
    let root = app.seed("root", UserType::SuperAdmin).await;
    let admin = app.login("root").await;

    let id = app.state.cipher.encrypt_numeric_id(root.id).unwrap();
    let (status, _) = app
        .send(status_request(&id, "deleted", access_token(&admin)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn super_admin_creates_users() {
    let app = TestApp::new();
    app.seed("root", UserType::SuperAdmin).await;
    let admin = app.login("root").await;

    let body = json!({
        "name": "New Person",
        "username": "newbie",
        "password": PASSWORD,
        "email": "newbie@example.com",
        "userType": "RegexUser",
    });
    let (status, created) = app
        .send(post_json("/admin/users", body.clone(), Some(access_token(&admin))))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let created = created.unwrap();
    assert_eq!(created["role"], "RegexUser");
    assert_eq!(created["verified"], false);

    app.login("newbie").await;

    let (status, _) = app
        .send(post_json("/admin/users", body, Some(access_token(&admin))))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn regular_admin_cannot_create_users() {
    let app = TestApp::new();
    app.seed("reggie", UserType::RegularAdmin).await;
    let tokens = app.login("reggie").await;

    let body = json!({
        "name": "Sneaky",
        "username": "sneaky",
        "password": PASSWORD,
        "userType": "SupAdmin",
    });
    let (status, _) = app
        .send(post_json("/admin/users", body, Some(access_token(&tokens))))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(app.store.find_user_by_username("sneaky").await.unwrap().is_none());
}

#[tokio::test]
async fn unmatched_paths_are_not_found_without_a_token() {
    let app = TestApp::new();
    for uri in ["/no/such/route", "/admin/nothing", "/users/someone-else"] {
        let (status, _) = app.send(request("GET", uri, None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
}
