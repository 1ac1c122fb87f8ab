use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::store::StoreError;

/// Bounded retry for transient storage failures. Anything else is returned
/// on the first attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(25),
        }
    }
}

impl RetryPolicy {
    pub async fn run<T, F, Fut>(&self, op: &'static str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Err(err) if err.is_transient() && attempt < attempts => {
                    warn!(op, attempt, error = %err, "Transient storage failure, retrying");
                    actix_web::rt::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
                Err(StoreError::Transient(msg)) => {
                    return Err(StoreError::Storage(format!(
                        "{op} gave up after {attempt} attempts: {msg}"
                    )));
                }
                other => return other,
            }
        }
    }
}
