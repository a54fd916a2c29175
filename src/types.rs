//! Domain types for the reservation service.
//!
//! Identifiers are thin newtypes so a class id can never be confused with a
//! ticket id or a buyer id at an API boundary. Ticket payloads stay opaque:
//! whatever JSON was seeded into the pool is handed back to the buyer
//! verbatim on a successful purchase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a ticket class.
///
/// Each class owns its own inventory containers; there is no cross-class
/// movement of tickets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassId(u32);

impl ClassId {
    /// Creates a `ClassId` from its raw integer.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for ClassId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a ticket, unique within its class.
///
/// Ticket ids are opaque strings chosen by whoever seeds the pool.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketId(String);

impl TicketId {
    /// Creates a `TicketId` from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Buyer identifier, forwarded to the payment gateway for debiting.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    /// Creates a `PlayerId` from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A ticket handed out by a reservation: its id plus the opaque payload
/// seeded into the pool (`None` when the pool had no entry for the id).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReservedTicket {
    /// The reserved ticket's id.
    pub id: TicketId,
    /// The payload seeded for this id, if any.
    pub payload: Option<serde_json::Value>,
}

/// Cardinalities of the three lifecycle sets of a class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    /// Tickets currently purchasable.
    pub available: u64,
    /// Tickets held under a live lease.
    pub reserved: u64,
    /// Tickets terminally sold.
    pub sold: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn class_id_display_is_raw_integer() {
        assert_eq!(ClassId::new(90).to_string(), "90");
    }

    #[test]
    fn ticket_id_round_trips_through_serde() {
        let id = TicketId::new("abc-123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc-123\"");
        assert_eq!(serde_json::from_str::<TicketId>(&json).unwrap(), id);
    }

    #[test]
    fn counts_serialize_with_plain_field_names() {
        let counts = ClassCounts {
            available: 9,
            reserved: 0,
            sold: 1,
        };
        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(json["available"], 9);
        assert_eq!(json["reserved"], 0);
        assert_eq!(json["sold"], 1);
    }
}
