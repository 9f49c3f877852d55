use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identifier carried in the `id` field of every wire message.
///
/// Responses are matched to their originating request by exact equality of
/// this value. Ids are opaque to the transport layer.
///
/// # Format
///
/// Generated ids follow `{service}:{instance}_{kind}_{unix_seconds}_{counter}`,
/// e.g. `orders:1_m_1718000000_42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Arc<str>);

impl MessageId {
    // ---

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        // ---
        &self.0
    }
}

impl fmt::Display for MessageId {
    // ---

    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        f.write_str(&self.0)
    }
}

impl From<String> for MessageId {
    // ---

    fn from(s: String) -> Self {
        // ---
        Self(s.into())
    }
}

impl From<&str> for MessageId {
    // ---

    fn from(s: &str) -> Self {
        // ---
        Self(s.into())
    }
}

/// Which kind of identifier a generator call produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// Message id used for correlation (`m`).
    Message,
    /// Secondary hint carried for tracing (`r`).
    CorrelationHint,
}

impl IdKind {
    fn tag(self) -> char {
        match self {
            IdKind::Message => 'm',
            IdKind::CorrelationHint => 'r',
        }
    }
}

/// The addressable identity of this process: a service name plus the
/// instance number unique within that service.
///
/// Fixed once at startup and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub service_name: Arc<str>,
    pub instance: Arc<str>,
}

impl Identity {
    pub fn new(service_name: impl Into<Arc<str>>, instance: impl Into<Arc<str>>) -> Self {
        Self {
            service_name: service_name.into(),
            instance: instance.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service_name, self.instance)
    }
}

/// Generates process-unique message ids for one [`Identity`].
///
/// Uniqueness comes from the monotonically increasing counter; the unix
/// timestamp only makes ids human-sortable. Collisions are possible only on
/// counter wraparound.
#[derive(Debug)]
pub struct IdGenerator {
    identity: Identity,
    counter: AtomicU64,
}

impl IdGenerator {
    // ---

    pub fn new(identity: Identity) -> Self {
        // ---
        Self {
            identity,
            counter: AtomicU64::new(0),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Generate the next id of the given kind.
    pub fn next(&self, kind: IdKind) -> MessageId {
        // ---
        let n = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        MessageId::from(format!(
            "{}:{}_{}_{}_{}",
            self.identity.service_name,
            self.identity.instance,
            kind.tag(),
            secs,
            n
        ))
    }

    /// Generate a fresh `(id, correlation_hint)` pair for a new request.
    pub fn next_pair(&self) -> (MessageId, MessageId) {
        (
            self.next(IdKind::Message),
            self.next(IdKind::CorrelationHint),
        )
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::collections::HashSet;

    fn generator() -> IdGenerator {
        IdGenerator::new(Identity::new("svc-a", "1"))
    }

    #[test]
    fn test_generate_unique() {
        // ---
        let ids = generator();
        let id1 = ids.next(IdKind::Message);
        let id2 = ids.next(IdKind::Message);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_format() {
        // ---
        let ids = generator();
        let id = ids.next(IdKind::Message).to_string();
        assert!(id.starts_with("svc-a:1_m_"), "unexpected id {id}");
        assert!(id.ends_with("_1"), "counter should start at 1: {id}");

        let hint = ids.next(IdKind::CorrelationHint).to_string();
        assert!(hint.starts_with("svc-a:1_r_"), "unexpected hint {hint}");
        assert!(hint.ends_with("_2"));
    }

    #[test]
    fn test_pair_is_distinct() {
        // ---
        let (id, hint) = generator().next_pair();
        assert_ne!(id, hint);
    }

    #[test]
    fn test_unique_across_threads() {
        // ---
        let ids = Arc::new(generator());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = ids.clone();
                std::thread::spawn(move || {
                    (0..250)
                        .map(|_| ids.next(IdKind::Message))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(seen.insert(id), "duplicate id generated");
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn test_serde_transparent() {
        // ---
        let id = MessageId::from("a:1_m_0_7");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"a:1_m_0_7\"");
        let back: MessageId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
