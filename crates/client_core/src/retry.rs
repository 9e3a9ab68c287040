use std::{future::Future, time::Duration};

use shared::domain::Arity;
use tracing::debug;

use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// `min(base * 2^attempt, cap)` between attempts.
    Exponential {
        retries: u32,
        base: Duration,
        cap: Duration,
    },
    Fixed {
        retries: u32,
        delay: Duration,
    },
}

impl RetryPolicy {
    pub const fn none() -> Self {
        RetryPolicy::Fixed {
            retries: 0,
            delay: Duration::ZERO,
        }
    }

    pub fn for_arity(arity: Arity) -> Self {
        match arity {
            Arity::Single => RetryPolicy::Exponential {
                retries: 2,
                base: Duration::from_secs(1),
                cap: Duration::from_secs(10),
            },
            Arity::Batch => RetryPolicy::Fixed {
                retries: 1,
                delay: Duration::from_secs(2),
            },
        }
    }

    pub fn retries(&self) -> u32 {
        match self {
            RetryPolicy::Exponential { retries, .. } | RetryPolicy::Fixed { retries, .. } => {
                *retries
            }
        }
    }

    /// Delay before retry number `attempt` (0-based), or `None` once exhausted.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.retries() {
            return None;
        }
        match self {
            RetryPolicy::Exponential { base, cap, .. } => {
                let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
                Some(base.saturating_mul(factor).min(*cap))
            }
            RetryPolicy::Fixed { delay, .. } => Some(*delay),
        }
    }

    /// Runs `op` until it succeeds, fails with a non-transient error, or the
    /// retry budget is spent.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => match self.delay_for(attempt) {
                    Some(delay) => {
                        debug!(attempt = attempt + 1, ?delay, error = %err, "retrying prediction request");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(err),
                },
                Err(err) => return Err(err),
            }
        }
    }
}
