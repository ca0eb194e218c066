use crate::error::Result;
use async_trait::async_trait;

/// Challenge-response verification for unauthenticated endpoints.
///
/// Transport errors surface as `Err`; a soft-fail from the provider is the
/// `Ok(false)` arm. Clients cannot tell the two apart.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: &str, remote_ip: &str) -> Result<bool>;
}

/// Verifier that returns a configured outcome. The development default
/// accepts everything; tests flip it to exercise the rejection path.
pub struct StaticCaptchaVerifier {
    ok: bool,
}

impl StaticCaptchaVerifier {
    pub fn new(ok: bool) -> Self {
        Self { ok }
    }

    pub fn accepting() -> Self {
        Self::new(true)
    }

    pub fn rejecting() -> Self {
        Self::new(false)
    }
}

#[async_trait]
impl CaptchaVerifier for StaticCaptchaVerifier {
    async fn verify(&self, _token: &str, _remote_ip: &str) -> Result<bool> {
        Ok(self.ok)
    }
}
