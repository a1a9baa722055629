//! Scheduled expiry of stale pending transactions.
//!
//! Bank transfers that never arrive leave transactions stuck in `Pending`.
//! The sweeper runs on a fixed cadence and flips every pending transaction
//! older than the configured cutoff to `Expired` in one atomic batch. A
//! failed run changes nothing and the next run retries the same rows.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::time::MissedTickBehavior;

use kurspay_store::{Result, Store};

use crate::state::AppState;

/// Run one sweep: expire all pending transactions older than the cutoff.
///
/// Returns the number of transactions expired.
///
/// # Errors
///
/// Returns an error if the store operation fails; nothing is expired in that
/// case.
pub fn run_sweep(state: &AppState) -> Result<u64> {
    let now = Utc::now();
    let cutoff = now - Duration::days(state.config.pending_expiry_days);
    state.store.expire_stale_transactions(cutoff, now)
}

/// Spawn the background sweep loop.
///
/// The first tick fires immediately, so stale rows left over from downtime
/// are reclaimed at startup.
pub fn spawn(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let period = std::time::Duration::from_secs(state.config.sweep_interval_hours * 3600);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match run_sweep(&state) {
                Ok(0) => tracing::debug!("Expiry sweep found nothing to do"),
                Ok(count) => tracing::info!(expired = count, "Expiry sweep completed"),
                Err(e) => tracing::error!(error = %e, "Expiry sweep failed"),
            }
        }
    })
}
