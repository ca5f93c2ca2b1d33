//! Periodic enforcement of verification deadlines.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::SharedVerificationManager;

/// Shutdown signal; `true` stops the loop before its next sweep
pub type ShutdownReceiver = watch::Receiver<bool>;

/// Sweep the pending store every `interval` until shutdown is signalled.
///
/// The first sweep runs immediately. Shutdown is only observed between
/// sweeps; a sweep that has started runs to completion.
pub async fn run_reconciliation_loop(
    manager: SharedVerificationManager,
    interval: Duration,
    mut shutdown: ShutdownReceiver,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Auto-kick check running every {}s", interval.as_secs());

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        }

        let report = manager.sweep().await;
        if report.expired > 0 {
            info!(
                "Sweep finished: {} expired, {} kicked, {} already verified, {} departed, {} failed, {} deferred",
                report.expired,
                report.kicked,
                report.already_verified,
                report.departed,
                report.failed,
                report.deferred
            );
        } else {
            debug!("Sweep finished: nothing expired ({} pending)", manager.store().len());
        }
    }

    info!("Auto-kick check stopped");
}
