//! Atomic transition scripts.
//!
//! Every lifecycle transition is a Lua script the store executes without
//! interleaving any other command, so concurrent buyers can never observe a
//! ticket in two containers at once, or in none. The scripts are the only
//! code that mutates the per-class containers.
//!
//! Scripts are content-addressed: registration returns a SHA and invocations
//! dispatch by it. If the store evicts a script (`NOSCRIPT`), the invocation
//! re-registers it and retries once.

use crate::error::{ReservationError, Result};
use redis::Script;
use redis::aio::ConnectionManager;

/// Pops up to `n` arbitrary ids from `available`, leases each until
/// `expiry_ts`, and returns a flat `[id, payload, id, payload, ...]` list.
///
/// KEYS: available, reserved, pool, `reserved_exp`. ARGV: n, `expiry_ts`.
const RESERVE_N: &str = r"
local n = tonumber(ARGV[1])
local expiry = tonumber(ARGV[2])
local out = {}
for i = 1, n do
  local id = redis.call('SPOP', KEYS[1])
  if not id then
    break
  end
  redis.call('SADD', KEYS[2], id)
  redis.call('ZADD', KEYS[4], expiry, id)
  local payload = redis.call('HGET', KEYS[3], id) or ''
  table.insert(out, id)
  table.insert(out, payload)
end
return out
";

/// Moves each id from `reserved` to `sold` and drops its lease entry.
/// Ids not currently reserved are no-ops. Returns the argument count.
///
/// KEYS: reserved, sold, `reserved_exp`. ARGV: ids.
const CONFIRM: &str = r"
for i = 1, #ARGV do
  redis.call('SMOVE', KEYS[1], KEYS[2], ARGV[i])
  redis.call('ZREM', KEYS[3], ARGV[i])
end
return #ARGV
";

/// Moves each id from `reserved` back to `available` and drops its lease
/// entry. Ids not currently reserved are no-ops. Returns the argument count.
///
/// KEYS: reserved, available, `reserved_exp`. ARGV: ids.
const ROLLBACK: &str = r"
for i = 1, #ARGV do
  redis.call('SMOVE', KEYS[1], KEYS[2], ARGV[i])
  redis.call('ZREM', KEYS[3], ARGV[i])
end
return #ARGV
";

/// Returns up to `limit` ids whose lease expired at or before `now_ts` to
/// `available`, oldest expiry first, and returns the reclaimed ids.
///
/// KEYS: reserved, available, `reserved_exp`. ARGV: `now_ts`, limit.
const RECLAIM_EXPIRED: &str = r"
local now = tonumber(ARGV[1])
local limit = tonumber(ARGV[2])
local ids = redis.call('ZRANGEBYSCORE', KEYS[3], '-inf', now, 'LIMIT', 0, limit)
for i = 1, #ids do
  redis.call('SMOVE', KEYS[1], KEYS[2], ids[i])
  redis.call('ZREM', KEYS[3], ids[i])
end
return ids
";

/// The four transition scripts, SHA-cached for invoke-by-handle dispatch.
pub struct TransitionScripts {
    /// `available -> reserved` with lease, up to n ids.
    pub reserve_n: Script,
    /// `reserved -> sold`, terminal.
    pub confirm: Script,
    /// `reserved -> available`.
    pub rollback: Script,
    /// `reserved -> available` for expired leases, bounded batch.
    pub reclaim_expired: Script,
}

impl TransitionScripts {
    /// Builds the script set. No store round-trip happens here; call
    /// [`TransitionScripts::register`] once at startup.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reserve_n: Script::new(RESERVE_N),
            confirm: Script::new(CONFIRM),
            rollback: Script::new(ROLLBACK),
            reclaim_expired: Script::new(RECLAIM_EXPIRED),
        }
    }

    /// Registers all four scripts with the store (`SCRIPT LOAD`) so the first
    /// invocation of each can dispatch by SHA without a `NOSCRIPT` round trip.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::StoreUnavailable`] if the store rejects a
    /// load.
    pub async fn register(&self, conn: &mut ConnectionManager) -> Result<()> {
        for (name, source) in [
            ("reserve_n", RESERVE_N),
            ("confirm", CONFIRM),
            ("rollback", ROLLBACK),
            ("reclaim_expired", RECLAIM_EXPIRED),
        ] {
            let sha: String = redis::cmd("SCRIPT")
                .arg("LOAD")
                .arg(source)
                .query_async(conn)
                .await
                .map_err(|e| {
                    ReservationError::StoreUnavailable(format!(
                        "failed to register {name} script: {e}"
                    ))
                })?;
            tracing::debug!(script = name, %sha, "registered transition script");
        }
        Ok(())
    }
}

impl Default for TransitionScripts {
    fn default() -> Self {
        Self::new()
    }
}
