use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::registry::FutureRegistry;
use crate::{log_debug, log_info};

/// Sweep `registry` every `every`, forever.
///
/// The first sweep happens one full interval after start. Runs until the
/// enclosing future is dropped.
pub(super) async fn reap(registry: &FutureRegistry, every: Duration, max_age: Option<Duration>) {
    // ---
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let stats = registry.sweep(max_age);
        if stats.expired > 0 {
            log_info!(
                "reaper evicted {} pending request(s) older than {:?}",
                stats.expired,
                max_age
            );
        }
        log_debug!(
            "reaper swept {} resolved, {} expired, {} live",
            stats.resolved,
            stats.expired,
            registry.len()
        );
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::MessageId;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_reaper_expires_on_cadence() {
        // ---
        let registry = Arc::new(FutureRegistry::new());
        let rx = registry.register(MessageId::from("lost")).unwrap();

        let reaper = {
            let registry = registry.clone();
            tokio::spawn(async move {
                reap(&registry, Duration::from_secs(10), Some(Duration::from_secs(15))).await
            })
        };

        // First tick at 10s: entry is 10s old, below the 15s ceiling
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(registry.len(), 1);

        // Second tick at 20s evicts it
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(registry.is_empty());
        assert!(rx.await.is_err());

        reaper.abort();
    }
}
