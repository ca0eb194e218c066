use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// SMS transport seam for phone verification targets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<()>;
}

// TODO: wire a real SMS provider; phone verification currently completes
// only through codes read out of this log.
pub struct LoggingSmsSender;

#[async_trait]
impl SmsSender for LoggingSmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<()> {
        info!(to = %to, body = %body, "SMS send (logging transport)");
        Ok(())
    }
}
