//! Login and bearer-authenticated password change

use crate::db::models::Role;
use crate::tests::common::{self, seed_user, test_app};
use actix_web::http::{header, StatusCode};
use actix_web::test;
use pretty_assertions::assert_eq;

const PASSWORD: &str = "VeryStrongP@ssw0rd123!";

#[actix_web::test]
async fn test_login_returns_token_and_no_cookie() {
    let harness = common::harness().await;
    let user = seed_user(&harness.state, "login@example.com", PASSWORD, Role::User).await;
    let app = test_app!(&harness);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_form([("username", "login@example.com"), ("password", PASSWORD)])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["tokenType"], "Bearer");
    assert!(!body["accessToken"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["id"], user.object_id.to_string());

    // The minted jti is recorded on the account.
    let stored = crate::db::stores::UserAuthStore::find_by_id(
        harness.state.repo.as_ref(),
        user.object_id,
    )
    .await
    .unwrap()
    .unwrap();
    assert!(stored.access_token_id.is_some());
}

#[actix_web::test]
async fn test_unknown_user_and_wrong_password_are_indistinguishable() {
    let harness = common::harness().await;
    seed_user(&harness.state, "known@example.com", PASSWORD, Role::User).await;
    let app = test_app!(&harness);

    let mut bodies = Vec::new();
    for (username, password) in [
        ("known@example.com", "WrongPassword123!"),
        ("ghost@example.com", "WrongPassword123!"),
    ] {
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_form([("username", username), ("password", password)])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        bodies.push(test::read_body(resp).await);
    }
    assert_eq!(bodies[0], bodies[1]);
}

#[actix_web::test]
async fn test_password_change_requires_bearer() {
    let harness = common::harness().await;
    seed_user(&harness.state, "change@example.com", PASSWORD, Role::User).await;
    let app = test_app!(&harness);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_form([("username", "change@example.com"), ("password", PASSWORD)])
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = test::read_body_json(resp).await;
    let token = body["accessToken"].as_str().unwrap().to_string();

    let new_password = "EvenStrongerP@ss99!x";
    let change_form = [
        ("currentPassword", PASSWORD),
        ("newPassword", new_password),
        ("confirmPassword", new_password),
    ];

    // No header: 401.
    let req = test::TestRequest::put()
        .uri("/auth/password/change")
        .set_form(change_form)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Wrong scheme: 401.
    let req = test::TestRequest::put()
        .uri("/auth/password/change")
        .insert_header((header::AUTHORIZATION, format!("Token {}", token)))
        .set_form(change_form)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Bearer: 200.
    let req = test::TestRequest::put()
        .uri("/auth/password/change")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .set_form(change_form)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // The new password logs in; the old one does not.
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_form([("username", "change@example.com"), ("password", new_password)])
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::OK
    );
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_form([("username", "change@example.com"), ("password", PASSWORD)])
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_web::test]
async fn test_password_change_rejects_bad_input() {
    let harness = common::harness().await;
    seed_user(&harness.state, "strict@example.com", PASSWORD, Role::User).await;
    let app = test_app!(&harness);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_form([("username", "strict@example.com"), ("password", PASSWORD)])
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = test::read_body_json(resp).await;
    let token = body["accessToken"].as_str().unwrap().to_string();
    let bearer = (header::AUTHORIZATION, format!("Bearer {}", token));

    // Mismatched confirmation.
    let req = test::TestRequest::put()
        .uri("/auth/password/change")
        .insert_header(bearer.clone())
        .set_form([
            ("currentPassword", PASSWORD),
            ("newPassword", "EvenStrongerP@ss99!x"),
            ("confirmPassword", "SomethingElse99!x"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Wrong current password.
    let req = test::TestRequest::put()
        .uri("/auth/password/change")
        .insert_header(bearer.clone())
        .set_form([
            ("currentPassword", "NotTheCurrent1!"),
            ("newPassword", "EvenStrongerP@ss99!x"),
            ("confirmPassword", "EvenStrongerP@ss99!x"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Weak replacement.
    let req = test::TestRequest::put()
        .uri("/auth/password/change")
        .insert_header(bearer)
        .set_form([
            ("currentPassword", PASSWORD),
            ("newPassword", "password"),
            ("confirmPassword", "password"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
