//! HMAC-authenticated admin surface, including the canonical-string and
//! freshness boundary scenarios

use crate::db::models::{now_unix, Role};
use crate::domain::auth::hmac::{sign, CanonicalRequest};
use crate::tests::common::{self, seed_user, test_app, TestHarness};
use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use pretty_assertions::assert_eq;
use uuid::Uuid;

fn signed_request(
    harness: &TestHarness,
    path: &str,
    body: &[u8],
    uid: Uuid,
    timestamp: i64,
) -> TestRequest {
    let canonical = CanonicalRequest {
        method: "POST",
        path,
        raw_query: "",
        body,
        uid: &uid.to_string(),
        timestamp,
    };
    let signature = sign(harness.state.config.hmac_secret.as_bytes(), &canonical);
    let mut req = TestRequest::post()
        .uri(path)
        .insert_header(("HMAC-Authenticate", signature))
        .insert_header(("Timestamp", timestamp.to_string()))
        .insert_header(("UID", uid.to_string()));
    if !body.is_empty() {
        req = req
            .insert_header(("Content-Type", "application/json"))
            .set_payload(body.to_vec());
    }
    req
}

#[actix_web::test]
async fn test_admin_check_reports_role() {
    let harness = common::harness().await;
    let admin = seed_user(&harness.state, "root@example.com", "AdminP@ssw0rd123!", Role::Admin).await;
    let user = seed_user(&harness.state, "pleb@example.com", "UserP@ssw0rd123!", Role::User).await;
    let app = test_app!(&harness);

    for (uid, expected) in [(admin.object_id, true), (user.object_id, false)] {
        let req = signed_request(&harness, "/auth/admin/check", b"", uid, now_unix())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["admin"], expected);
    }
}

#[actix_web::test]
async fn test_freshness_boundaries() {
    let harness = common::harness().await;
    let admin = seed_user(&harness.state, "root@example.com", "AdminP@ssw0rd123!", Role::Admin).await;
    let app = test_app!(&harness);
    let now = now_unix();

    // Exactly 300 s old: accepted.
    let req =
        signed_request(&harness, "/auth/admin/check", b"", admin.object_id, now - 300)
            .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // 301 s old: rejected.
    let req =
        signed_request(&harness, "/auth/admin/check", b"", admin.object_id, now - 301)
            .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    // 60 s in the future: accepted.
    let req =
        signed_request(&harness, "/auth/admin/check", b"", admin.object_id, now + 60)
            .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // 61 s in the future: rejected.
    let req =
        signed_request(&harness, "/auth/admin/check", b"", admin.object_id, now + 61)
            .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_web::test]
async fn test_missing_or_tampered_auth_rejected() {
    let harness = common::harness().await;
    let admin = seed_user(&harness.state, "root@example.com", "AdminP@ssw0rd123!", Role::Admin).await;
    let app = test_app!(&harness);

    // No headers at all.
    let req = TestRequest::post().uri("/auth/admin/check").to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    // Non-integer timestamp.
    let req = TestRequest::post()
        .uri("/auth/admin/check")
        .insert_header(("HMAC-Authenticate", "c2lnbmF0dXJl"))
        .insert_header(("Timestamp", "yesterday"))
        .insert_header(("UID", admin.object_id.to_string()))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    // Signature over a different body.
    let req = signed_request(
        &harness,
        "/auth/admin/signup",
        br#"{"username":"x@example.com"}"#,
        admin.object_id,
        now_unix(),
    );
    let req = req.set_payload(br#"{"username":"y@example.com"}"#.to_vec()).to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_web::test]
async fn test_admin_signup_and_login() {
    let harness = common::harness().await;
    let caller = Uuid::new_v4();
    let app = test_app!(&harness);

    let body = serde_json::json!({
        "username": "second-admin@example.com",
        "email": "second-admin@example.com",
        "password": "AdminP@ssw0rd123!",
        "role": "admin"
    })
    .to_string();
    let req = signed_request(
        &harness,
        "/auth/admin/signup",
        body.as_bytes(),
        caller,
        now_unix(),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(created["role"], "admin");
    assert_eq!(created["emailVerified"], true);

    // Duplicate admin signup conflicts.
    let req = signed_request(
        &harness,
        "/auth/admin/signup",
        body.as_bytes(),
        caller,
        now_unix(),
    )
    .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::CONFLICT
    );

    // The new admin can log in through the HMAC surface.
    let login_body = serde_json::json!({
        "email": "second-admin@example.com",
        "password": "AdminP@ssw0rd123!"
    })
    .to_string();
    let req = signed_request(
        &harness,
        "/auth/admin/login",
        login_body.as_bytes(),
        caller,
        now_unix(),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(!body["accessToken"].as_str().unwrap().is_empty());
}

#[actix_web::test]
async fn test_admin_login_rejects_non_admin() {
    let harness = common::harness().await;
    seed_user(&harness.state, "pleb@example.com", "UserP@ssw0rd123!", Role::User).await;
    let app = test_app!(&harness);

    let body = serde_json::json!({
        "email": "pleb@example.com",
        "password": "UserP@ssw0rd123!"
    })
    .to_string();
    let req = signed_request(
        &harness,
        "/auth/admin/login",
        body.as_bytes(),
        Uuid::new_v4(),
        now_unix(),
    )
    .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );
}

#[actix_web::test]
async fn test_replay_cache_rejects_reused_signatures() {
    use crate::api::middleware::{AuthenticatedUser, HmacAuth};
    use crate::collaborators::{Cache, MemoryCache};
    use actix_web::{web, App, HttpResponse};

    let harness = common::harness().await;
    let admin = seed_user(&harness.state, "root@example.com", "AdminP@ssw0rd123!", Role::Admin).await;
    let cache: std::sync::Arc<dyn Cache> = std::sync::Arc::new(MemoryCache::new());

    let app = test::init_service(
        App::new().service(
            web::resource("/auth/admin/check")
                .wrap(
                    HmacAuth::new(harness.state.config.hmac_secret.as_bytes().to_vec())
                        .with_replay_cache(cache),
                )
                .route(web::post().to(|_auth: AuthenticatedUser| async {
                    HttpResponse::Ok().finish()
                })),
        ),
    )
    .await;

    let timestamp = now_unix();
    let first = signed_request(&harness, "/auth/admin/check", b"", admin.object_id, timestamp)
        .to_request();
    assert_eq!(test::call_service(&app, first).await.status(), StatusCode::OK);

    // The byte-identical request is inside the freshness window but the
    // replay set has seen its signature.
    let replayed =
        signed_request(&harness, "/auth/admin/check", b"", admin.object_id, timestamp)
            .to_request();
    assert_eq!(
        test::call_service(&app, replayed).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_web::test]
async fn test_jwks_is_public() {
    let harness = common::harness().await;
    let app = test_app!(&harness);

    let req = TestRequest::get()
        .uri("/auth/.well-known/jwks.json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let keys = body["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0]["kty"], "EC");
    assert_eq!(keys[0]["crv"], "P-256");
    assert_eq!(keys[0]["alg"], "ES256");
}
