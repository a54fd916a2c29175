//! Reservation API over the transition scripts.
//!
//! # Architecture
//!
//! For every class the store holds five containers (see `keys`):
//!
//! - `pool` (hash): `ticket_id -> payload`, written at seeding, never mutated
//!   afterwards
//! - `available`, `reserved`, `sold` (sets): the lifecycle position of each id
//! - `reserved_exp` (sorted set): lease expiry per reserved id
//!
//! Every pooled id is in exactly one of the three lifecycle sets, and
//! `reserved_exp` mirrors `reserved`'s membership. The only way those facts
//! stay true under concurrency is that all transitions go through the atomic
//! scripts in `scripts`; this module is the sole caller.

use crate::error::{ReservationError, Result};
use crate::keys::ClassKeys;
use crate::scripts::TransitionScripts;
use crate::types::{ClassCounts, ClassId, ReservedTicket, TicketId};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Typed facade over the atomic ticket transitions.
///
/// The seam between the purchase coordinator and the storage engine:
/// production code uses [`RedisTicketStore`], unit tests use the in-memory
/// mirror in `crate::mocks`.
pub trait TicketStore: Send + Sync {
    /// Reserves up to `n` tickets under a lease of `lease_seconds`.
    ///
    /// Returns between 0 and `n` tickets; handing out fewer than requested is
    /// a legal outcome and the caller decides what to do with the underfill.
    /// On return every handed-out id is in `reserved` with a live lease.
    ///
    /// # Errors
    ///
    /// [`ReservationError::InvalidRequest`] when `n` or `lease_seconds` is
    /// zero; [`ReservationError::StoreUnavailable`] on store failure.
    async fn reserve_n(
        &self,
        class: ClassId,
        n: usize,
        lease_seconds: u64,
    ) -> Result<Vec<ReservedTicket>>;

    /// Moves each id from `reserved` to `sold` and drops its lease.
    ///
    /// Ids not currently reserved are silently ignored. Returns the number of
    /// ids acknowledged, which is the argument count, not the number moved;
    /// [`TicketStore::sold_count`] is the authoritative success signal.
    /// An empty id list is a no-op returning 0.
    ///
    /// # Errors
    ///
    /// [`ReservationError::StoreUnavailable`] on store failure.
    async fn confirm(&self, class: ClassId, ids: &[TicketId]) -> Result<usize>;

    /// Moves each id from `reserved` back to `available` and drops its lease.
    ///
    /// Same no-op semantics as [`TicketStore::confirm`] for unknown ids and
    /// empty lists.
    ///
    /// # Errors
    ///
    /// [`ReservationError::StoreUnavailable`] on store failure.
    async fn rollback(&self, class: ClassId, ids: &[TicketId]) -> Result<usize>;

    /// Returns up to `limit` expired leases to `available`, oldest first, and
    /// reports the reclaimed ids.
    ///
    /// # Errors
    ///
    /// [`ReservationError::InvalidRequest`] when `limit` is zero;
    /// [`ReservationError::StoreUnavailable`] on store failure.
    async fn reclaim_expired(&self, class: ClassId, limit: usize) -> Result<Vec<TicketId>>;

    /// Cardinality of `available` for the class. Advisory: the value may be
    /// stale by the time the caller acts on it.
    ///
    /// # Errors
    ///
    /// [`ReservationError::StoreUnavailable`] on store failure.
    async fn available_count(&self, class: ClassId) -> Result<u64>;

    /// How many of the given ids are currently in `sold`.
    ///
    /// # Errors
    ///
    /// [`ReservationError::StoreUnavailable`] on store failure.
    async fn sold_count(&self, class: ClassId, ids: &[TicketId]) -> Result<usize>;
}

/// Redis-backed [`TicketStore`].
///
/// Holds one [`ConnectionManager`] created at startup and cloned per
/// operation, plus the registered transition scripts. Cloning the store is
/// cheap and every clone shares the same underlying connection.
#[derive(Clone)]
pub struct RedisTicketStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
    /// SHA-cached transition scripts.
    scripts: Arc<TransitionScripts>,
}

impl RedisTicketStore {
    /// Connects to the store and registers the transition scripts.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::StoreUnavailable`] if the connection or
    /// script registration fails.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            ReservationError::StoreUnavailable(format!("failed to create Redis client: {e}"))
        })?;

        let mut conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            ReservationError::StoreUnavailable(format!(
                "failed to create Redis connection manager: {e}"
            ))
        })?;

        let scripts = TransitionScripts::new();
        scripts.register(&mut conn_manager).await?;

        Ok(Self {
            conn_manager,
            scripts: Arc::new(scripts),
        })
    }

    /// Current wall-clock time as epoch seconds, the unit of lease expiries.
    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs()
    }

    /// Pings the store.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::StoreUnavailable`] if the store does not
    /// answer.
    pub async fn ping(&self) -> Result<String> {
        let mut conn = self.conn_manager.clone();
        redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| ReservationError::StoreUnavailable(format!("ping failed: {e}")))
    }

    /// Seeds tickets into a class: `pool[ticket_id] = <ticket as JSON>` and
    /// the id added to `available`, all in one pipeline.
    ///
    /// Trusted admin/dev operation. Seeding does not check the id's current
    /// lifecycle position; re-seeding an id that is reserved or sold would
    /// put it back into `available`.
    ///
    /// # Errors
    ///
    /// [`ReservationError::InvalidRequest`] when a ticket has no `ticket_id`
    /// field; [`ReservationError::StoreUnavailable`] on store failure.
    pub async fn preload(&self, class: ClassId, tickets: &[serde_json::Value]) -> Result<usize> {
        let keys = ClassKeys::for_class(class);
        let mut pipe = redis::pipe();

        for ticket in tickets {
            let id = ticket
                .get("ticket_id")
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .ok_or_else(|| {
                    ReservationError::InvalidRequest(
                        "every ticket needs a ticket_id field".to_string(),
                    )
                })?;

            pipe.hset(&keys.pool, &id, ticket.to_string())
                .ignore()
                .sadd(&keys.available, &id)
                .ignore();
        }

        let mut conn = self.conn_manager.clone();
        let _: () = pipe.query_async(&mut conn).await.map_err(|e| {
            ReservationError::StoreUnavailable(format!("failed to preload tickets: {e}"))
        })?;

        tracing::info!(class = %class, loaded = tickets.len(), "preloaded tickets");
        Ok(tickets.len())
    }

    /// Cardinalities of the three lifecycle sets, read in one pipeline.
    ///
    /// # Errors
    ///
    /// [`ReservationError::StoreUnavailable`] on store failure.
    pub async fn counts(&self, class: ClassId) -> Result<ClassCounts> {
        let keys = ClassKeys::for_class(class);
        let mut conn = self.conn_manager.clone();

        let (available, reserved, sold): (u64, u64, u64) = redis::pipe()
            .scard(&keys.available)
            .scard(&keys.reserved)
            .scard(&keys.sold)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                ReservationError::StoreUnavailable(format!("failed to read counts: {e}"))
            })?;

        Ok(ClassCounts {
            available,
            reserved,
            sold,
        })
    }

    /// Number of live lease entries for the class.
    ///
    /// Mirrors `reserved`'s cardinality whenever the membership invariant
    /// holds; exposed so operators and tests can verify exactly that.
    ///
    /// # Errors
    ///
    /// [`ReservationError::StoreUnavailable`] on store failure.
    pub async fn lease_count(&self, class: ClassId) -> Result<u64> {
        let keys = ClassKeys::for_class(class);
        let mut conn = self.conn_manager.clone();
        conn.zcard(&keys.reserved_exp).await.map_err(|e| {
            ReservationError::StoreUnavailable(format!("failed to read lease count: {e}"))
        })
    }
}

impl TicketStore for RedisTicketStore {
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

        let keys = ClassKeys::for_class(class);
        let expiry_ts = Self::now_secs() + lease_seconds;
        let mut conn = self.conn_manager.clone();

        let raw: Vec<String> = self
            .scripts
            .reserve_n
            .key(&keys.available)
            .key(&keys.reserved)
            .key(&keys.pool)
            .key(&keys.reserved_exp)
            .arg(n)
            .arg(expiry_ts)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                ReservationError::StoreUnavailable(format!("reserve_n script failed: {e}"))
            })?;

        let mut reserved = Vec::with_capacity(raw.len() / 2);
        for pair in raw.chunks_exact(2) {
            let payload = if pair[1].is_empty() {
                None
            } else {
                Some(
                    serde_json::from_str(&pair[1])
                        .map_err(|_| ReservationError::CorruptPayload(pair[0].clone()))?,
                )
            };
            reserved.push(ReservedTicket {
                id: TicketId::new(pair[0].clone()),
                payload,
            });
        }

        tracing::debug!(
            class = %class,
            requested = n,
            reserved = reserved.len(),
            expiry_ts,
            "reserved tickets"
        );
        Ok(reserved)
    }

    async fn confirm(&self, class: ClassId, ids: &[TicketId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let keys = ClassKeys::for_class(class);
        let mut conn = self.conn_manager.clone();

        let mut invocation = self.scripts.confirm.prepare_invoke();
        invocation
            .key(&keys.reserved)
            .key(&keys.sold)
            .key(&keys.reserved_exp);
        for id in ids {
            invocation.arg(id.as_str());
        }

        let acked: usize = invocation.invoke_async(&mut conn).await.map_err(|e| {
            ReservationError::StoreUnavailable(format!("confirm script failed: {e}"))
        })?;

        tracing::debug!(class = %class, acked, "confirmed tickets");
        Ok(acked)
    }

    async fn rollback(&self, class: ClassId, ids: &[TicketId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let keys = ClassKeys::for_class(class);
        let mut conn = self.conn_manager.clone();

        let mut invocation = self.scripts.rollback.prepare_invoke();
        invocation
            .key(&keys.reserved)
            .key(&keys.available)
            .key(&keys.reserved_exp);
        for id in ids {
            invocation.arg(id.as_str());
        }

        let acked: usize = invocation.invoke_async(&mut conn).await.map_err(|e| {
            ReservationError::StoreUnavailable(format!("rollback script failed: {e}"))
        })?;

        tracing::debug!(class = %class, acked, "rolled back tickets");
        Ok(acked)
    }

    async fn reclaim_expired(&self, class: ClassId, limit: usize) -> Result<Vec<TicketId>> {
        if limit == 0 {
            return Err(ReservationError::InvalidRequest(
                "reclaim limit must be at least 1".to_string(),
            ));
        }

        let keys = ClassKeys::for_class(class);
        let now_ts = Self::now_secs();
        let mut conn = self.conn_manager.clone();

        let raw: Vec<String> = self
            .scripts
            .reclaim_expired
            .key(&keys.reserved)
            .key(&keys.available)
            .key(&keys.reserved_exp)
            .arg(now_ts)
            .arg(limit)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                ReservationError::StoreUnavailable(format!("reclaim_expired script failed: {e}"))
            })?;

        Ok(raw.into_iter().map(TicketId::new).collect())
    }

    async fn available_count(&self, class: ClassId) -> Result<u64> {
        let keys = ClassKeys::for_class(class);
        let mut conn = self.conn_manager.clone();
        conn.scard(&keys.available).await.map_err(|e| {
            ReservationError::StoreUnavailable(format!("failed to read available count: {e}"))
        })
    }

    async fn sold_count(&self, class: ClassId, ids: &[TicketId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let keys = ClassKeys::for_class(class);
        let mut conn = self.conn_manager.clone();
        let members: Vec<&str> = ids.iter().map(TicketId::as_str).collect();

        let flags: Vec<bool> = conn.smismember(&keys.sold, members).await.map_err(|e| {
            ReservationError::StoreUnavailable(format!("failed to check sold membership: {e}"))
        })?;

        Ok(flags.into_iter().filter(|sold| *sold).count())
    }
}
