// Copyright (c) 2025 - Cowboy AI, Inc.
//! Broker readiness wait
//!
//! Probes the broker every `poll_interval` until a probe succeeds. The
//! overall timeout is a hard cut-off: a probe still in flight at the
//! deadline is abandoned, and no probe starts after it.

use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::client::BrokerApi;
use crate::config::ReadinessSettings;
use crate::errors::TimeoutError;

/// Wait until `broker` answers its readiness probe
pub async fn wait_until_ready<B>(broker: &B, settings: &ReadinessSettings) -> Result<(), TimeoutError>
where
    B: BrokerApi + ?Sized,
{
    let started = Instant::now();
    let deadline = started + settings.timeout;
    let mut attempts = 0u32;

    info!(
        "Waiting up to {:?} for broker '{}' to become ready",
        settings.timeout,
        broker.name()
    );

    let last_error = loop {
        attempts += 1;
        let failure = match timeout_at(deadline, broker.probe()).await {
            Ok(Ok(())) => {
                info!(
                    "Broker '{}' ready after {} probe(s) in {:?}",
                    broker.name(),
                    attempts,
                    started.elapsed()
                );
                return Ok(());
            }
            Ok(Err(err)) => {
                debug!("Readiness probe {} failed: {}", attempts, err);
                err.to_string()
            }
            Err(_) => break Some("probe still pending at deadline".to_string()),
        };

        let next_probe = Instant::now() + settings.poll_interval;
        if next_probe >= deadline {
            sleep_until(deadline).await;
            break Some(failure);
        }
        sleep_until(next_probe).await;
    };

    let err = TimeoutError {
        timeout: settings.timeout,
        elapsed: started.elapsed(),
        attempts,
        last_error,
    };
    warn!("{}", err);
    Err(err)
}
