//! Per-class Redis key layout.
//!
//! Each class owns five containers that must live on the same cluster slot so
//! the multi-key transition scripts are legal. Embedding the class id in a
//! `{...}` hash tag pins all five keys to one slot; keys of different classes
//! may land on different slots, which is fine because no operation ever spans
//! classes.

use crate::types::ClassId;
use std::fmt;

/// The five container keys for one ticket class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassKeys {
    /// Set of ids currently purchasable.
    pub available: String,
    /// Set of ids held under a live lease.
    pub reserved: String,
    /// Set of terminally sold ids.
    pub sold: String,
    /// Hash `ticket_id -> payload`, the authoritative payload store.
    pub pool: String,
    /// Sorted set `ticket_id -> lease expiry` (epoch seconds).
    pub reserved_exp: String,
}

impl ClassKeys {
    /// Derives the container keys for `class`.
    #[must_use]
    pub fn for_class(class: ClassId) -> Self {
        let tag = HashTag(class);
        Self {
            available: format!("tickets:{tag}:available"),
            reserved: format!("tickets:{tag}:reserved"),
            sold: format!("tickets:{tag}:sold"),
            pool: format!("tickets:{tag}:pool"),
            reserved_exp: format!("tickets:{tag}:reserved:exp"),
        }
    }
}

/// Formats a class id inside cluster hash-tag braces.
struct HashTag(ClassId);

impl fmt::Display for HashTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_embed_the_class_hash_tag() {
        let keys = ClassKeys::for_class(ClassId::new(90));
        assert_eq!(keys.available, "tickets:{90}:available");
        assert_eq!(keys.reserved, "tickets:{90}:reserved");
        assert_eq!(keys.sold, "tickets:{90}:sold");
        assert_eq!(keys.pool, "tickets:{90}:pool");
        assert_eq!(keys.reserved_exp, "tickets:{90}:reserved:exp");
    }

    #[test]
    fn all_keys_of_a_class_share_one_hash_tag() {
        let keys = ClassKeys::for_class(ClassId::new(7));
        let tag_of = |k: &str| {
            let start = k.find('{').map(|i| i + 1).unwrap_or(0);
            let end = k.find('}').unwrap_or(k.len());
            k[start..end].to_string()
        };
        let tags = [
            tag_of(&keys.available),
            tag_of(&keys.reserved),
            tag_of(&keys.sold),
            tag_of(&keys.pool),
            tag_of(&keys.reserved_exp),
        ];
        assert!(tags.iter().all(|t| t == "7"));
    }

    #[test]
    fn distinct_classes_derive_distinct_keys() {
        let a = ClassKeys::for_class(ClassId::new(1));
        let b = ClassKeys::for_class(ClassId::new(2));
        assert_ne!(a.available, b.available);
        assert_ne!(a.pool, b.pool);
    }
}
