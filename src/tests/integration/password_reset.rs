//! Password forget/reset round-trip and enumeration safety

use crate::db::models::Role;
use crate::tests::common::{self, last_emailed_reset_secret, seed_user, test_app};
use actix_web::http::StatusCode;
use actix_web::test;
use pretty_assertions::assert_eq;

const PASSWORD: &str = "VeryStrongP@ssw0rd123!";
const NEW_PASSWORD: &str = "BrandNewP@ssw0rd456!";

#[actix_web::test]
async fn test_reset_round_trip() {
    let harness = common::harness().await;
    seed_user(&harness.state, "reset@example.com", PASSWORD, Role::User).await;
    let app = test_app!(&harness);

    let req = test::TestRequest::post()
        .uri("/auth/password/forget")
        .set_form([("email", "reset@example.com")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Only the hash is stored; the plaintext secret lives in the email.
    let secret = last_emailed_reset_secret(&harness.email);
    assert_eq!(secret.len(), 48);
    let hashed = crate::domain::auth::service::hash_reset_secret(&secret);
    let stored = crate::db::stores::ResetTokenStore::find_live_by_hash(
        harness.state.repo.as_ref(),
        &hashed,
        crate::db::models::now_unix(),
    )
    .await
    .unwrap()
    .expect("reset row exists");
    assert_eq!(stored.email, "reset@example.com");

    // The page renders.
    let req = test::TestRequest::get()
        .uri(&format!("/auth/password/reset/{}", secret))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Submit the new password.
    let req = test::TestRequest::post()
        .uri(&format!("/auth/password/reset/{}", secret))
        .set_form([
            ("newPassword", NEW_PASSWORD),
            ("confirmPassword", NEW_PASSWORD),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Password reset successfully");

    // Single use.
    let req = test::TestRequest::post()
        .uri(&format!("/auth/password/reset/{}", secret))
        .set_form([
            ("newPassword", NEW_PASSWORD),
            ("confirmPassword", NEW_PASSWORD),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // The new password works.
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_form([("username", "reset@example.com"), ("password", NEW_PASSWORD)])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_forget_is_enumeration_safe() {
    let harness = common::harness().await;
    seed_user(&harness.state, "exists@example.com", PASSWORD, Role::User).await;
    let app = test_app!(&harness);

    let mut bodies = Vec::new();
    for email in ["exists@example.com", "ghost@example.com"] {
        let req = test::TestRequest::post()
            .uri("/auth/password/forget")
            .set_form([("email", email)])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        bodies.push(test::read_body(resp).await);
    }
    assert_eq!(bodies[0], bodies[1]);

    // Only the real account got an email.
    assert_eq!(harness.email.messages().len(), 1);
}

#[actix_web::test]
async fn test_two_forgets_one_reset() {
    let harness = common::harness().await;
    seed_user(&harness.state, "twice@example.com", PASSWORD, Role::User).await;
    let app = test_app!(&harness);

    let mut secrets = Vec::new();
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/auth/password/forget")
            .set_form([("email", "twice@example.com")])
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        secrets.push(last_emailed_reset_secret(&harness.email));
    }
    assert_ne!(secrets[0], secrets[1]);

    // The first token completes the reset.
    let req = test::TestRequest::post()
        .uri(&format!("/auth/password/reset/{}", secrets[0]))
        .set_form([
            ("newPassword", NEW_PASSWORD),
            ("confirmPassword", NEW_PASSWORD),
        ])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // The sibling token is consumed with it.
    let req = test::TestRequest::post()
        .uri(&format!("/auth/password/reset/{}", secrets[1]))
        .set_form([
            ("newPassword", "YetAnotherP@ss789!"),
            ("confirmPassword", "YetAnotherP@ss789!"),
        ])
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[actix_web::test]
async fn test_garbage_token_rejected() {
    let harness = common::harness().await;
    let app = test_app!(&harness);

    let req = test::TestRequest::post()
        .uri(&format!("/auth/password/reset/{}", "f".repeat(48)))
        .set_form([
            ("newPassword", NEW_PASSWORD),
            ("confirmPassword", NEW_PASSWORD),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[actix_web::test]
async fn test_forget_page_renders() {
    let harness = common::harness().await;
    let app = test_app!(&harness);

    let req = test::TestRequest::get()
        .uri("/auth/password/forget")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("<form"));
}
