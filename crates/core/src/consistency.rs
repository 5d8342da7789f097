//! Read-your-own-write visibility guard
//!
//! Object stores are eventually consistent: a listing or HEAD issued
//! right after a successful write may not see the object yet. This module
//! wraps exactly one idempotent lookup with a bounded, fixed-backoff
//! retry to paper over that window.
//!
//! This must not be used to mask genuine absence. Callers invoke it only
//! when confirming visibility of a write they just performed; plain
//! existence probes on unknown objects use a single lookup with no retry.

use std::time::Duration;

use crate::config::ConsistencyConfig;
use crate::error::{Error, Result};

/// Retry `lookup` until it yields a value or the attempt budget runs out
///
/// The success path is zero-overhead: a value on the first call returns
/// immediately with no sleep and no logging. When retries were needed, a
/// single warning is emitted at the end (final success or final failure)
/// carrying the number of attempts taken; repeated need for retries here
/// indicates backend staleness worth tracking, but per-attempt logging
/// would only produce spam.
///
/// `what` names the object being awaited, for the warning event.
pub async fn wait_until_visible<T, F, Fut>(
    config: &ConsistencyConfig,
    what: &str,
    mut lookup: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Option<T>>>,
{
    let backoff = Duration::from_millis(config.backoff_ms);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match lookup().await? {
            Some(value) => {
                if attempt > 1 {
                    tracing::warn!(
                        target = what,
                        attempts = attempt,
                        "object became visible only after retries"
                    );
                }
                return Ok(value);
            }
            None => {
                if attempt >= config.max_attempts {
                    tracing::warn!(
                        target = what,
                        attempts = attempt,
                        "object did not become visible"
                    );
                    return Err(Error::NotFound(what.to_string()));
                }
                tokio::time::sleep(backoff).await;
            }
        }
    }
}
