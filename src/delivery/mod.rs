//! Per-code redelivery scheduler
//!
//! A shortened URL pushed to its client is watched until the client
//! acknowledges it. Every code moves through an explicit state machine:
//!
//! ```text
//! Unsent -> Pending(n) -> Acknowledged
//!                      -> Exhausted        (n reached MAX_RETRIES)
//! ```
//!
//! While `Pending(n)`, the engine re-invokes the push callback once per
//! interval as long as the store still reports the mapping
//! unacknowledged. Exhaustion is terminal and only logged; the original
//! HTTP caller answered long ago and there is no other channel to tell.
//! Delivery is at-least-once; the client's acknowledgment handler is
//! expected to be idempotent.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::storage::UrlStore;

pub const RETRY_INTERVAL: Duration = Duration::from_secs(5);
pub const MAX_RETRIES: u32 = 5;

/// Re-sends the payload for a short code. Invoked once per retry tick.
pub type PushFn = Arc<dyn Fn(String) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Unsent,
    Pending(u32),
    Acknowledged,
    Exhausted,
}

struct PendingDelivery {
    state: DeliveryState,
    handle: JoinHandle<()>,
}

pub struct RetryEngine {
    store: Arc<UrlStore>,
    pending: DashMap<String, PendingDelivery>,
    interval: Duration,
    max_retries: u32,
}

impl RetryEngine {
    pub fn new(store: Arc<UrlStore>, interval: Duration, max_retries: u32) -> Self {
        RetryEngine {
            store,
            pending: DashMap::new(),
            interval,
            max_retries,
        }
    }

    /// Starts watching a code for acknowledgment, re-sending through
    /// `push` at the configured cadence. At most one watch exists per
    /// code; a second call while one is pending is a no-op.
    pub fn watch(self: &Arc<Self>, code: &str, push: PushFn) {
        let slot = match self.pending.entry(code.to_string()) {
            Entry::Occupied(_) => {
                debug!("Delivery already pending for short code {}, not duplicating", code);
                return;
            }
            Entry::Vacant(slot) => slot,
        };

        let engine = Arc::clone(self);
        let task_code = code.to_string();
        let handle = tokio::spawn(async move {
            engine.run_retries(task_code, push).await;
        });

        slot.insert(PendingDelivery {
            state: DeliveryState::Pending(0),
            handle,
        });
    }

    /// Cancels the pending delivery for a code, if any. Safe to call for
    /// codes that were never watched, already acknowledged, or already
    /// exhausted.
    pub fn cancel(&self, code: &str) {
        if let Some((_, pending)) = self.pending.remove(code) {
            pending.handle.abort();
            debug!("Canceled pending delivery for short code {}", code);
        }
    }

    /// Current state of a code. Pending deliveries are destroyed on
    /// acknowledgment or exhaustion, so a code with no live watch reads
    /// as `Unsent`.
    pub fn state(&self, code: &str) -> DeliveryState {
        self.pending
            .get(code)
            .map(|pending| pending.state)
            .unwrap_or(DeliveryState::Unsent)
    }

    async fn run_retries(self: Arc<Self>, code: String, push: PushFn) {
        let mut attempt = 0u32;
        loop {
            tokio::time::sleep(self.interval).await;

            match self.store.get(&code) {
                Some(mapping) if !mapping.acknowledged => {}
                // Acknowledged in the interim, or the mapping expired
                // out from under us. Either way, stop.
                _ => {
                    self.finish(&code, DeliveryState::Acknowledged);
                    return;
                }
            }

            attempt += 1;
            info!("Retrying delivery for short code: {}, attempt: {}", code, attempt);
            push(code.clone()).await;
            self.set_state(&code, DeliveryState::Pending(attempt));

            if attempt >= self.max_retries {
                warn!("Max retries reached for short code: {}", code);
                self.finish(&code, DeliveryState::Exhausted);
                return;
            }
        }
    }

    fn set_state(&self, code: &str, state: DeliveryState) {
        if let Some(mut pending) = self.pending.get_mut(code) {
            pending.state = state;
        }
    }

    fn finish(&self, code: &str, state: DeliveryState) {
        debug!("Delivery for short code {} finished as {:?}", code, state);
        self.pending.remove(code);
    }
}
