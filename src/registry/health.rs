//! Background health sampler
//!
//! Wakes on a fixed interval, probes every registered domain and refreshes
//! the registry's health bookkeeping. The task holds only a weak reference
//! to the registry state, so it never keeps a dropped registry alive, and it
//! exits promptly once the shutdown flag flips.

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::RegistryInner;

pub(super) fn spawn_health_sampler(
    inner: Weak<RegistryInner>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick completes immediately; registration already seeded metrics
        ticker.tick().await;

        info!(
            interval_secs = interval.as_secs_f64(),
            "Domain health sampler started"
        );

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            if *shutdown.borrow() {
                break;
            }

            let Some(inner) = inner.upgrade() else {
                debug!("Registry dropped, stopping health sampler");
                break;
            };
            inner.sample_health().await;
        }

        info!("Domain health sampler stopped");
    })
}
