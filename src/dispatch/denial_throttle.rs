//! Per-sender cooldown for "access denied" replies.
//!
//! Off unless `UNAUTHORIZED_COOLDOWN_SECS` is set. While a sender is in
//! cooldown their attempts are still refused, only the reply is skipped.

use moka::future::Cache;
use moka::notification::RemovalCause;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// What to do with a refused attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Send the rejection message; the cooldown has started
    Notify,
    /// Sender is in cooldown; refuse without replying
    Silence,
}

/// Cooldown tracker keyed by sender id
///
/// Each entry counts the replies skipped for that sender and lives for
/// one cooldown period from the reply that created it.
#[derive(Clone)]
pub struct DenialThrottle {
    senders: Cache<i64, Arc<AtomicU64>>,
    cooldown: Duration,
    silenced_total: Arc<AtomicU64>,
}

impl DenialThrottle {
    /// Track up to `max_senders` senders, each for `cooldown`.
    ///
    /// ```
    /// use home_guard_bot::dispatch::DenialThrottle;
    /// use std::time::Duration;
    ///
    /// let throttle = DenialThrottle::new(Duration::from_secs(600), 10_000);
    /// assert_eq!(throttle.cooldown().as_secs(), 600);
    /// ```
    #[must_use]
    pub fn new(cooldown: Duration, max_senders: u64) -> Self {
        let senders = Cache::builder()
            .max_capacity(max_senders)
            .time_to_live(cooldown)
            .eviction_listener(|sender_id: Arc<i64>, silenced: Arc<AtomicU64>, cause| {
                let silenced = silenced.load(Ordering::Relaxed);
                if matches!(cause, RemovalCause::Expired) && silenced > 0 {
                    debug!(
                        "Cooldown over for user {}, {} rejections were not sent",
                        sender_id, silenced
                    );
                }
            })
            .build();

        Self {
            senders,
            cooldown,
            silenced_total: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Decide whether `sender_id` gets a rejection message for this attempt.
    ///
    /// The first attempt opens a cooldown and returns [`Denial::Notify`];
    /// concurrent attempts from the same sender race on one cache entry, so
    /// exactly one of them is notified.
    pub async fn check(&self, sender_id: i64, sender_name: &str) -> Denial {
        let entry = self
            .senders
            .entry(sender_id)
            .or_insert_with(async { Arc::new(AtomicU64::new(0)) })
            .await;
        if entry.is_fresh() {
            return Denial::Notify;
        }

        entry.value().fetch_add(1, Ordering::Relaxed);
        let total = self.silenced_total.fetch_add(1, Ordering::Relaxed) + 1;
        // One line per hundred, a flood must not flood the log too
        if total.is_multiple_of(100) {
            debug!(
                "⛔️ {} rejections silenced so far (latest: user {} - {})",
                total, sender_id, sender_name
            );
        }
        Denial::Silence
    }

    /// Drop the cooldown for `sender_id`, e.g. when the rejection could
    /// not be delivered.
    pub async fn forget(&self, sender_id: i64) {
        self.senders.invalidate(&sender_id).await;
    }

    /// Replies skipped for `sender_id` in the current cooldown
    pub async fn silenced_for(&self, sender_id: i64) -> u64 {
        self.senders
            .get(&sender_id)
            .await
            .map_or(0, |count| count.load(Ordering::Relaxed))
    }

    /// Replies skipped since startup
    #[must_use]
    pub fn silenced_total(&self) -> u64 {
        self.silenced_total.load(Ordering::Relaxed)
    }

    /// Senders currently in cooldown (approximate until pending tasks run)
    #[must_use]
    pub fn tracked_senders(&self) -> u64 {
        self.senders.entry_count()
    }

    /// Configured cooldown
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }
}
