//! Startup orchestration.
//!
//! # Responsibilities
//! - Connect the broker client, retrying per policy
//! - Report every failed attempt on the module log
//!
//! # Design Decisions
//! - Idempotent: an already connected client is left alone
//! - Unbounded retry unless the policy bounds it
//! - Backoff between attempts comes from the resilience subsystem

use thiserror::Error;

use crate::broker::{BrokerClient, BrokerError};
use crate::observability::{metrics, FanoutLogger};
use crate::resilience::RetryPolicy;

/// Errors that stop setup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("broker connect gave up after {attempts} attempt(s): {last}")]
    ConnectExhausted { attempts: u32, last: BrokerError },
}

/// Connect `broker`, retrying per `policy`.
///
/// Returns the number of attempts made (0 if already connected).
pub async fn connect_with_retry(
    broker: &dyn BrokerClient,
    policy: &RetryPolicy,
    logger: &FanoutLogger,
) -> Result<u32, StartupError> {
    if broker.is_connected() {
        return Ok(0);
    }

    let mut attempt = 0;
    loop {
        attempt += 1;
        match broker.connect().await {
            Ok(()) => {
                metrics::record_connect_attempt(true);
                tracing::info!(attempt, "Broker connected");
                return Ok(attempt);
            }
            Err(e) => {
                metrics::record_connect_attempt(false);
                logger.error(format!("broker connect attempt {} failed: {}", attempt, e));

                if !policy.allows(attempt + 1) {
                    return Err(StartupError::ConnectExhausted { attempts: attempt, last: e });
                }

                let delay = policy.delay_after(attempt);
                tracing::info!(attempt, delay = ?delay, "Retrying broker connect");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
