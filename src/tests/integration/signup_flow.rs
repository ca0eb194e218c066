//! Signup end-to-end: form post, code verification, account creation

use crate::db::models::now_unix;
use crate::db::stores::{ProfileStore, UserAuthStore, VerificationStore};
use crate::tests::common::{self, last_emailed_code, test_app};
use actix_web::http::StatusCode;
use actix_web::test;
use pretty_assertions::assert_eq;
use uuid::Uuid;

#[actix_web::test]
async fn test_happy_signup() {
    let harness = common::harness().await;
    let app = test_app!(&harness);

    let req = test::TestRequest::post()
        .uri("/auth/signup")
        .set_form([
            ("fullName", "John Doe"),
            ("email", "john@example.com"),
            ("newPassword", "VeryStrongP@ssw0rd123!"),
            ("responseType", "spa"),
            ("verifyType", "email"),
            ("g-recaptcha-response", "test-token"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    let verification_id: Uuid = body["verificationId"]
        .as_str()
        .expect("verificationId present")
        .parse()
        .expect("verificationId is a UUID");
    let expires_at = body["expiresAt"].as_i64().unwrap();
    let now = now_unix();
    assert!((now + 870..=now + 930).contains(&expires_at));

    // The stored record carries a bcrypt hash and is not yet consumed.
    let record = VerificationStore::find_by_id(harness.state.repo.as_ref(), verification_id)
        .await
        .unwrap()
        .expect("record persisted");
    assert!(record.hashed_password.starts_with("$2"));
    assert!(!record.used);
    assert_eq!(record.code, last_emailed_code(&harness.email));

    let req = test::TestRequest::post()
        .uri("/auth/signup/verify")
        .set_form([
            ("code", record.code.as_str()),
            ("verificationId", &verification_id.to_string()),
            ("responseType", "spa"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(!body["accessToken"].as_str().unwrap().is_empty());
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["user"]["username"], "john@example.com");

    let record = VerificationStore::find_by_id(harness.state.repo.as_ref(), verification_id)
        .await
        .unwrap()
        .unwrap();
    assert!(record.used);
    assert!(record.is_verified);

    let user = UserAuthStore::find_by_username(harness.state.repo.as_ref(), "john@example.com")
        .await
        .unwrap()
        .expect("account created");
    let profile = ProfileStore::find_by_id(harness.state.repo.as_ref(), user.object_id)
        .await
        .unwrap()
        .expect("profile created");
    assert_eq!(user.object_id, profile.object_id);
    assert_eq!(profile.full_name, "John Doe");
}

#[actix_web::test]
async fn test_missing_fields_name_the_field() {
    let harness = common::harness().await;
    let app = test_app!(&harness);

    let req = test::TestRequest::post()
        .uri("/auth/signup")
        .set_form([("fullName", "John Doe"), ("email", "john@example.com")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "MISSING_REQUIRED_FIELD");
    assert_eq!(body["details"]["field"], "newPassword");
}

#[actix_web::test]
async fn test_wrong_code_bumps_counter_then_correct_code_succeeds() {
    let harness = common::harness().await;
    let app = test_app!(&harness);

    let req = test::TestRequest::post()
        .uri("/auth/signup")
        .set_form([
            ("fullName", "Jane Doe"),
            ("email", "jane@example.com"),
            ("newPassword", "VeryStrongP@ssw0rd123!"),
            ("g-recaptcha-response", "test-token"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = test::read_body_json(resp).await;
    let verification_id: Uuid = body["verificationId"].as_str().unwrap().parse().unwrap();

    for expected_counter in 1..=3 {
        let req = test::TestRequest::post()
            .uri("/auth/signup/verify")
            .set_form([
                ("code", "000000"),
                ("verificationId", &verification_id.to_string()),
            ])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "VALIDATION_FAILED");

        let record =
            VerificationStore::find_by_id(harness.state.repo.as_ref(), verification_id)
                .await
                .unwrap()
                .unwrap();
        assert_eq!(record.counter, expected_counter);
    }

    let record = VerificationStore::find_by_id(harness.state.repo.as_ref(), verification_id)
        .await
        .unwrap()
        .unwrap();
    let req = test::TestRequest::post()
        .uri("/auth/signup/verify")
        .set_form([
            ("code", record.code.as_str()),
            ("verificationId", &verification_id.to_string()),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_sixth_attempt_returns_429() {
    let harness = common::harness().await;
    let app = test_app!(&harness);

    let req = test::TestRequest::post()
        .uri("/auth/signup")
        .set_form([
            ("fullName", "Jane Doe"),
            ("email", "limited@example.com"),
            ("newPassword", "VeryStrongP@ssw0rd123!"),
            ("g-recaptcha-response", "test-token"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = test::read_body_json(resp).await;
    let verification_id = body["verificationId"].as_str().unwrap().to_string();

    for _ in 0..5 {
        let req = test::TestRequest::post()
            .uri("/auth/signup/verify")
            .set_form([("code", "000000"), ("verificationId", verification_id.as_str())])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    let req = test::TestRequest::post()
        .uri("/auth/signup/verify")
        .set_form([("code", "000000"), ("verificationId", verification_id.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key("retry-after"));
}

#[actix_web::test]
async fn test_used_verification_creates_no_second_account() {
    let harness = common::harness().await;
    let app = test_app!(&harness);

    let req = test::TestRequest::post()
        .uri("/auth/signup")
        .set_form([
            ("fullName", "Once Only"),
            ("email", "once@example.com"),
            ("newPassword", "VeryStrongP@ssw0rd123!"),
            ("g-recaptcha-response", "test-token"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = test::read_body_json(resp).await;
    let verification_id: Uuid = body["verificationId"].as_str().unwrap().parse().unwrap();
    let record = VerificationStore::find_by_id(harness.state.repo.as_ref(), verification_id)
        .await
        .unwrap()
        .unwrap();

    for expected in [StatusCode::OK, StatusCode::BAD_REQUEST] {
        let req = test::TestRequest::post()
            .uri("/auth/signup/verify")
            .set_form([
                ("code", record.code.as_str()),
                ("verificationId", &verification_id.to_string()),
            ])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), expected);
    }
}

#[actix_web::test]
async fn test_verify_link_redirects() {
    let harness = common::harness().await;
    let app = test_app!(&harness);

    let req = test::TestRequest::post()
        .uri("/auth/signup")
        .set_form([
            ("fullName", "Link User"),
            ("email", "link@example.com"),
            ("newPassword", "VeryStrongP@ssw0rd123!"),
            ("g-recaptcha-response", "test-token"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = test::read_body_json(resp).await;
    let verification_id: Uuid = body["verificationId"].as_str().unwrap().parse().unwrap();
    let record = VerificationStore::find_by_id(harness.state.repo.as_ref(), verification_id)
        .await
        .unwrap()
        .unwrap();

    let req = test::TestRequest::get()
        .uri(&format!(
            "/auth/verify?verificationId={}&code={}",
            verification_id, record.code
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let location = resp.headers().get("location").unwrap().to_str().unwrap();
    assert!(location.ends_with("/login?verified=true"));

    // The link is single-use like the code.
    let req = test::TestRequest::get()
        .uri(&format!(
            "/auth/verify?verificationId={}&code={}",
            verification_id, record.code
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let location = resp.headers().get("location").unwrap().to_str().unwrap();
    assert!(location.ends_with("/login?verified=false"));
}

#[actix_web::test]
async fn test_resend_issues_a_fresh_code() {
    let harness = common::harness().await;
    let app = test_app!(&harness);

    let req = test::TestRequest::post()
        .uri("/auth/signup")
        .set_form([
            ("fullName", "Resend User"),
            ("email", "resend@example.com"),
            ("newPassword", "VeryStrongP@ssw0rd123!"),
            ("g-recaptcha-response", "test-token"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = test::read_body_json(resp).await;
    let verification_id = body["verificationId"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/auth/signup/resend")
        .set_form([("verificationId", verification_id.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(harness.email.messages().len(), 2);
}
