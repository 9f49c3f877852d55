use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::protocol::Message;
use crate::sync::lock_ignore_poison;
use crate::{MessageId, Result, RpcError};

/// One pending request.
///
/// The slot is a oneshot channel: it holds exactly one message and sending
/// into it never waits, even if the caller stopped listening.
struct PendingFuture {
    slot: Option<oneshot::Sender<Message>>,
    resolved: bool,
    created_at: Instant,
}

/// What a sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Entries removed because a response had been delivered.
    pub resolved: usize,
    /// Unresolved entries removed because they outlived the age ceiling.
    pub expired: usize,
}

/// Tracks outbound requests waiting for a response, keyed by message id.
///
/// Insertion comes from any number of callers, resolution from the inbound
/// loop, removal only from [`sweep`](Self::sweep). Every operation holds the
/// lock for a single map access.
#[derive(Default)]
pub struct FutureRegistry {
    // ---
    futures: Mutex<HashMap<MessageId, PendingFuture>>,
}

impl FutureRegistry {
    // ---

    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending request.
    ///
    /// Returns a receiver that yields the response once it arrives. Growth is
    /// unbounded; the reaper's age ceiling is the only limit.
    pub fn register(&self, id: MessageId) -> Result<oneshot::Receiver<Message>> {
        // ---
        let (tx, rx) = oneshot::channel();
        let mut futures = lock_ignore_poison(&self.futures);

        if futures.contains_key(&id) {
            return Err(RpcError::DuplicateId(id.to_string()));
        }

        futures.insert(
            id,
            PendingFuture {
                slot: Some(tx),
                resolved: false,
                created_at: Instant::now(),
            },
        );
        Ok(rx)
    }

    /// Deliver `message` to the live, unresolved request with id `id`.
    ///
    /// Returns true if a match was found. A second response for the same id
    /// finds the entry already resolved and is dropped.
    pub fn resolve(&self, id: &MessageId, message: Message) -> bool {
        // ---
        let mut futures = lock_ignore_poison(&self.futures);

        match futures.get_mut(id) {
            Some(pending) if !pending.resolved => {
                pending.resolved = true;
                if let Some(tx) = pending.slot.take() {
                    // Receiver gone means the caller timed out or cancelled;
                    // the response is dropped with the slot.
                    let _ = tx.send(message);
                }
                true
            }
            _ => false,
        }
    }

    /// Remove all resolved entries, plus unresolved entries older than
    /// `max_age` when one is given.
    ///
    /// Dropping an expired entry closes its slot, so a caller still waiting
    /// on it wakes with an error.
    pub fn sweep(&self, max_age: Option<Duration>) -> SweepStats {
        // ---
        let now = Instant::now();
        let mut stats = SweepStats::default();
        let mut futures = lock_ignore_poison(&self.futures);

        futures.retain(|_, pending| {
            if pending.resolved {
                stats.resolved += 1;
                return false;
            }
            match max_age {
                Some(max) if now.duration_since(pending.created_at) >= max => {
                    stats.expired += 1;
                    false
                }
                _ => true,
            }
        });

        stats
    }

    /// Whether the registry holds an entry for `id`, resolved or not.
    pub fn contains(&self, id: &MessageId) -> bool {
        lock_ignore_poison(&self.futures).contains_key(id)
    }

    /// `Some(resolved)` for a live entry, `None` if there is none.
    pub fn is_resolved(&self, id: &MessageId) -> Option<bool> {
        lock_ignore_poison(&self.futures)
            .get(id)
            .map(|pending| pending.resolved)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        lock_ignore_poison(&self.futures).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries still waiting for a response
    pub fn unresolved(&self) -> usize {
        lock_ignore_poison(&self.futures)
            .values()
            .filter(|pending| !pending.resolved)
            .count()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::{IdGenerator, Identity, Request};
    use bytes::Bytes;

    fn response_for(id: &MessageId, body: &'static [u8]) -> Message {
        // ---
        let ids = IdGenerator::new(Identity::new("svc-a", "1"));
        let mut req = Message::request(&ids, Request::new("svc-b", Bytes::new()));
        req.id = id.clone();
        req.reply(&Identity::new("svc-b", "2"), Ok(Bytes::from_static(body)))
    }

    #[test]
    fn test_register_and_resolve() {
        // ---
        let registry = FutureRegistry::new();
        let id = MessageId::from("x");

        let rx = registry.register(id.clone()).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.is_resolved(&id), Some(false));

        assert!(registry.resolve(&id, response_for(&id, b"one")));

        // Stays until swept
        assert_eq!(registry.is_resolved(&id), Some(true));
        assert_eq!(registry.unresolved(), 0);

        let received = rx.blocking_recv().unwrap();
        assert_eq!(received.payload, Bytes::from_static(b"one"));
    }

    #[test]
    fn test_second_response_is_noop() {
        // ---
        let registry = FutureRegistry::new();
        let id = MessageId::from("x");
        let rx = registry.register(id.clone()).unwrap();

        assert!(registry.resolve(&id, response_for(&id, b"first")));
        assert!(!registry.resolve(&id, response_for(&id, b"second")));

        assert_eq!(rx.blocking_recv().unwrap().payload, Bytes::from_static(b"first"));
    }

    #[test]
    fn test_resolve_unknown_id() {
        // ---
        let registry = FutureRegistry::new();
        let id = MessageId::from("ghost");
        assert!(!registry.resolve(&id, response_for(&id, b"x")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_resolve_after_receiver_dropped_does_not_block() {
        // ---
        let registry = FutureRegistry::new();
        let id = MessageId::from("abandoned");
        drop(registry.register(id.clone()).unwrap());

        assert!(registry.resolve(&id, response_for(&id, b"late")));
        assert_eq!(registry.is_resolved(&id), Some(true));
    }

    #[test]
    fn test_duplicate_live_id_rejected() {
        // ---
        let registry = FutureRegistry::new();
        let id = MessageId::from("dup");
        let _rx = registry.register(id.clone()).unwrap();

        assert!(matches!(
            registry.register(id),
            Err(RpcError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_sweep_removes_only_resolved() {
        // ---
        let registry = FutureRegistry::new();
        let done = MessageId::from("done");
        let waiting = MessageId::from("waiting");

        let _rx1 = registry.register(done.clone()).unwrap();
        let _rx2 = registry.register(waiting.clone()).unwrap();
        registry.resolve(&done, response_for(&done, b"ok"));

        let stats = registry.sweep(None);
        assert_eq!(stats, SweepStats { resolved: 1, expired: 0 });
        assert!(!registry.contains(&done));
        assert_eq!(registry.is_resolved(&waiting), Some(false));

        // Id is free again once swept
        assert!(registry.register(done).is_ok());
    }

    #[test]
    fn test_sweep_age_ceiling_expires_waiters() {
        // ---
        let registry = FutureRegistry::new();
        let id = MessageId::from("lost");
        let rx = registry.register(id.clone()).unwrap();

        // Young entries survive a generous ceiling
        let stats = registry.sweep(Some(Duration::from_secs(3600)));
        assert_eq!(stats.expired, 0);
        assert!(registry.contains(&id));

        let stats = registry.sweep(Some(Duration::ZERO));
        assert_eq!(stats, SweepStats { resolved: 0, expired: 1 });
        assert!(registry.is_empty());

        // Slot closed: waiter sees an error, not a hang
        assert!(rx.blocking_recv().is_err());
    }
}
