//! Shared test fixtures and helpers

use crate::collaborators::{
    EmailSender, LoggingSmsSender, RecordingEmailSender, StaticCaptchaVerifier,
    StoreProfileCreator,
};
use crate::config::Config;
use crate::db::models::{Role, UserAuth, UserProfile};
use crate::db::repository::MemoryRepository;
use crate::db::stores::{ensure_indexes, ProfileStore, UserAuthStore};
use crate::domain::auth::password;
use crate::server::AppState;
use std::sync::Arc;
use uuid::Uuid;

pub fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .try_init();
}

/// Builds the actix test service over a harness's state with the full
/// route table.
macro_rules! test_app {
    ($harness:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($harness.state.clone()))
                .configure(|cfg| crate::api::routes::configure(cfg, &$harness.state)),
        )
        .await
    };
}
pub(crate) use test_app;

/// Config assembled from defaults only: development environment,
/// ephemeral keys, default windows and budgets.
pub fn test_config() -> Config {
    envy::from_iter::<_, Config>(std::iter::empty::<(String, String)>())
        .expect("defaults deserialize")
}

/// Application state over a fresh in-memory store with a recording email
/// transport, plus the transport handle for pulling codes and links back
/// out.
pub struct TestHarness {
    pub state: AppState,
    pub email: Arc<RecordingEmailSender>,
}

pub async fn harness() -> TestHarness {
    harness_with_config(test_config()).await
}

pub async fn harness_with_config(config: Config) -> TestHarness {
    setup();
    let email = Arc::new(RecordingEmailSender::new());
    let state = AppState::build_with(
        config,
        Arc::new(MemoryRepository::new()),
        Arc::new(StaticCaptchaVerifier::accepting()),
        Arc::clone(&email) as Arc<dyn EmailSender>,
        Arc::new(LoggingSmsSender),
        Arc::new(StoreProfileCreator),
    )
    .expect("state builds");
    ensure_indexes(state.repo.as_ref()).await.expect("indexes");
    TestHarness { state, email }
}

/// Inserts a verified account + bootstrap profile directly into the
/// store, skipping the signup flow.
pub async fn seed_user(
    state: &AppState,
    email: &str,
    password_plaintext: &str,
    role: Role,
) -> UserAuth {
    let hash = password::hash_password(password_plaintext, 4)
        .await
        .expect("hash");
    let mut user = UserAuth::new(Uuid::new_v4(), email, hash, role);
    user.email_verified = true;
    UserAuthStore::insert(state.repo.as_ref(), &user)
        .await
        .expect("user insert");
    let profile = UserProfile::bootstrap(user.object_id, "Seeded User", email);
    ProfileStore::insert(state.repo.as_ref(), &profile)
        .await
        .expect("profile insert");
    user
}

/// Pulls the six-digit code out of the most recent verification email.
pub fn last_emailed_code(email: &RecordingEmailSender) -> String {
    let message = email.last().expect("an email was sent");
    let start = message.body_html.find("<strong>").expect("code present") + "<strong>".len();
    let code = &message.body_html[start..start + 6];
    assert!(code.chars().all(|c| c.is_ascii_digit()));
    code.to_string()
}

/// Pulls the 48-char reset secret out of the most recent reset email.
pub fn last_emailed_reset_secret(email: &RecordingEmailSender) -> String {
    let message = email.last().expect("an email was sent");
    let marker = "/auth/password/reset/";
    let start = message
        .body_html
        .find(marker)
        .expect("reset link present")
        + marker.len();
    message.body_html[start..start + 48].to_string()
}

