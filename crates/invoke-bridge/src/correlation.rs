//! Correlation id generation.
//!
//! Ids look like `req_<unix millis>_<random hex>_<seq>`. The time and random
//! parts come from an [`IdSource`] so tests can pin them; the per-generator
//! sequence keeps ids distinct even when both collide within one millisecond.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::bridge::protocol::CorrelationId;

/// Time and randomness feeding correlation ids.
pub trait IdSource: Send + Sync {
    fn now_millis(&self) -> u64;
    fn random(&self) -> u64;
}

/// Wall clock plus UUID v4 randomness.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemIdSource;

impl IdSource for SystemIdSource {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn random(&self) -> u64 {
        uuid::Uuid::new_v4().as_u128() as u64
    }
}

pub struct CorrelationIdGenerator {
    source: Arc<dyn IdSource>,
    seq: AtomicU64,
}

impl CorrelationIdGenerator {
    pub fn new(source: Arc<dyn IdSource>) -> Self {
        Self {
            source,
            seq: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> CorrelationId {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        CorrelationId::new(format!(
            "req_{}_{:x}_{}",
            self.source.now_millis(),
            self.source.random(),
            seq
        ))
    }
}

impl Default for CorrelationIdGenerator {
    fn default() -> Self {
        Self::new(Arc::new(SystemIdSource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Frozen clock, random values cycling through a tiny range.
    struct CollidingSource {
        counter: AtomicU64,
    }

    impl IdSource for CollidingSource {
        fn now_millis(&self) -> u64 {
            1_700_000_000_000
        }

        fn random(&self) -> u64 {
            self.counter.fetch_add(1, Ordering::Relaxed) % 7
        }
    }

    #[test]
    fn ids_have_request_prefix_and_time() {
        let id = CorrelationIdGenerator::new(Arc::new(CollidingSource {
            counter: AtomicU64::new(0),
        }))
        .next_id();
        assert_eq!(id.as_str(), "req_1700000000000_0_0");
    }

    #[test]
    fn ids_unique_with_colliding_time_and_random() {
        let ids = CorrelationIdGenerator::new(Arc::new(CollidingSource {
            counter: AtomicU64::new(0),
        }));

        let seen: HashSet<_> = (0..5_000).map(|_| ids.next_id()).collect();
        assert_eq!(seen.len(), 5_000);
    }

    #[test]
    fn ids_unique_across_threads() {
        let ids = Arc::new(CorrelationIdGenerator::default());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..250).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate correlation id");
            }
        }
        assert_eq!(seen.len(), 2_000);
    }

    #[test]
    fn system_source_reports_current_time() {
        let millis = SystemIdSource.now_millis();
        // 2020-01-01 in unix millis
        assert!(millis > 1_577_836_800_000);
    }
}
