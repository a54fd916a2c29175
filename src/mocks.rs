//! In-memory [`TicketStore`] for unit tests.
//!
//! Mirrors the transition semantics of the Redis implementation: each
//! operation takes the class lock for its whole duration, which stands in
//! for the store's no-interleaving guarantee. Test-only knobs simulate the
//! races that are hard to hit deterministically against a live store.

use crate::error::{ReservationError, Result};
use crate::store::TicketStore;
use crate::types::{ClassCounts, ClassId, ReservedTicket, TicketId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Per-class container state, the in-memory mirror of the five Redis keys.
#[derive(Default)]
struct ClassState {
    pool: HashMap<TicketId, serde_json::Value>,
    available: HashSet<TicketId>,
    reserved: HashSet<TicketId>,
    sold: HashSet<TicketId>,
    /// Lease entries ordered by (expiry, id), matching zset range order.
    reserved_exp: BTreeMap<(u64, TicketId), ()>,
}

/// In-memory ticket store.
#[derive(Default)]
pub struct InMemoryTicketStore {
    classes: Mutex<HashMap<ClassId, ClassState>>,
    /// Added to every `available_count` answer, to make the advisory
    /// pre-check lie the way a stale read would.
    inflate_available: AtomicU64,
    /// When set, `confirm` first returns the ids to `available`, as if a
    /// sweeper reclaim had beaten the confirm to them.
    reclaim_before_confirm: AtomicBool,
}

impl InMemoryTicketStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ClassId, ClassState>> {
        self.classes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs()
    }

    /// Seeds tickets into a class: pool entry plus `available` membership.
    pub fn seed(&self, class: ClassId, tickets: Vec<(TicketId, serde_json::Value)>) {
        let mut classes = self.lock();
        let state = classes.entry(class).or_default();
        for (id, payload) in tickets {
            state.pool.insert(id.clone(), payload);
            state.available.insert(id);
        }
    }

    /// Current set cardinalities for assertions.
    #[must_use]
    pub fn counts(&self, class: ClassId) -> ClassCounts {
        let classes = self.lock();
        classes.get(&class).map_or_else(ClassCounts::default, |s| ClassCounts {
            available: s.available.len() as u64,
            reserved: s.reserved.len() as u64,
            sold: s.sold.len() as u64,
        })
    }

    /// Number of live lease entries for assertions.
    #[must_use]
    pub fn lease_count(&self, class: ClassId) -> usize {
        let classes = self.lock();
        classes.get(&class).map_or(0, |s| s.reserved_exp.len())
    }

    /// Makes `available_count` over-report by `extra`, simulating the window
    /// where the advisory pre-check passes but the reserve underfills.
    pub fn inflate_available(&self, extra: u64) {
        self.inflate_available.store(extra, Ordering::SeqCst);
    }

    /// Makes the next `confirm` calls find their ids already reclaimed.
    pub fn reclaim_before_confirm(&self, enabled: bool) {
        self.reclaim_before_confirm.store(enabled, Ordering::SeqCst);
    }
}

impl TicketStore for InMemoryTicketStore {
    async fn reserve_n(
        &self,
        class: ClassId,
        n: usize,
        lease_seconds: u64,
    ) -> Result<Vec<ReservedTicket>> {
        if n == 0 {
            return Err(ReservationError::InvalidRequest(
                "must reserve at least one ticket".to_string(),
            ));
        }
        if lease_seconds == 0 {
            return Err(ReservationError::InvalidRequest(
                "lease must be at least one second".to_string(),
            ));
        }

        let expiry = Self::now_secs() + lease_seconds;
        let mut classes = self.lock();
        let state = classes.entry(class).or_default();

        let mut reserved = Vec::new();
        for _ in 0..n {
            let Some(id) = state.available.iter().next().cloned() else {
                break;
            };
            state.available.remove(&id);
            state.reserved.insert(id.clone());
            state.reserved_exp.insert((expiry, id.clone()), ());
            reserved.push(ReservedTicket {
                payload: state.pool.get(&id).cloned(),
                id,
            });
        }
        Ok(reserved)
    }

    async fn confirm(&self, class: ClassId, ids: &[TicketId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut classes = self.lock();
        let state = classes.entry(class).or_default();

        if self.reclaim_before_confirm.load(Ordering::SeqCst) {
            for id in ids {
                if state.reserved.remove(id) {
                    state.available.insert(id.clone());
                }
            }
            state
                .reserved_exp
                .retain(|(_, id), ()| !ids.contains(id));
        }

        for id in ids {
            if state.reserved.remove(id) {
                state.sold.insert(id.clone());
            }
        }
        state
            .reserved_exp
            .retain(|(_, id), ()| !ids.contains(id));
        Ok(ids.len())
    }

    async fn rollback(&self, class: ClassId, ids: &[TicketId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut classes = self.lock();
        let state = classes.entry(class).or_default();
        for id in ids {
            if state.reserved.remove(id) {
                state.available.insert(id.clone());
            }
        }
        state
            .reserved_exp
            .retain(|(_, id), ()| !ids.contains(id));
        Ok(ids.len())
    }

    async fn reclaim_expired(&self, class: ClassId, limit: usize) -> Result<Vec<TicketId>> {
        if limit == 0 {
            return Err(ReservationError::InvalidRequest(
                "reclaim limit must be at least 1".to_string(),
            ));
        }

        let now = Self::now_secs();
        let mut classes = self.lock();
        let state = classes.entry(class).or_default();

        let expired: Vec<(u64, TicketId)> = state
            .reserved_exp
            .keys()
            .take_while(|(expiry, _)| *expiry <= now)
            .take(limit)
            .cloned()
            .collect();

        let mut reclaimed = Vec::with_capacity(expired.len());
        for key in expired {
            state.reserved_exp.remove(&key);
            let (_, id) = key;
            if state.reserved.remove(&id) {
                state.available.insert(id.clone());
            }
            reclaimed.push(id);
        }
        Ok(reclaimed)
    }

    async fn available_count(&self, class: ClassId) -> Result<u64> {
        let real = {
            let classes = self.lock();
            classes.get(&class).map_or(0, |s| s.available.len() as u64)
        };
        Ok(real + self.inflate_available.load(Ordering::SeqCst))
    }

    async fn sold_count(&self, class: ClassId, ids: &[TicketId]) -> Result<usize> {
        let classes = self.lock();
        let Some(state) = classes.get(&class) else {
            return Ok(0);
        };
        Ok(ids.iter().filter(|id| state.sold.contains(*id)).count())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded(class: ClassId, n: usize) -> InMemoryTicketStore {
        let store = InMemoryTicketStore::new();
        store.seed(
            class,
            (0..n)
                .map(|i| (TicketId::new(i.to_string()), json!({"ticket_id": i})))
                .collect(),
        );
        store
    }

    #[tokio::test]
    async fn reserve_moves_ids_out_of_available() {
        let class = ClassId::new(1);
        let store = seeded(class, 5);

        let reserved = store.reserve_n(class, 3, 30).await.unwrap();
        assert_eq!(reserved.len(), 3);
        let counts = store.counts(class);
        assert_eq!(counts.available, 2);
        assert_eq!(counts.reserved, 3);
        assert_eq!(store.lease_count(class), 3);
    }

    #[tokio::test]
    async fn rollback_restores_available() {
        let class = ClassId::new(2);
        let store = seeded(class, 4);

        let reserved = store.reserve_n(class, 4, 30).await.unwrap();
        let ids: Vec<TicketId> = reserved.into_iter().map(|t| t.id).collect();
        store.rollback(class, &ids).await.unwrap();

        let counts = store.counts(class);
        assert_eq!(counts.available, 4);
        assert_eq!(counts.reserved, 0);
        assert_eq!(store.lease_count(class), 0);
    }

    #[tokio::test]
    async fn reclaim_only_touches_expired_leases() {
        let class = ClassId::new(3);
        let store = seeded(class, 2);

        store.reserve_n(class, 2, 600).await.unwrap();
        let reclaimed = store.reclaim_expired(class, 10).await.unwrap();
        assert!(reclaimed.is_empty());
        assert_eq!(store.counts(class).reserved, 2);
    }
}
