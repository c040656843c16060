//! Administrative authority bitmask.
//!
//! Every agent carries an authority mask that gates what it may do to its
//! own cards and to its sub-agents. The mask is persisted as lowercase hex
//! text (`"1a4"`) and decoded into [`Authority`] at the store boundary.
//!
//! # Inheritance
//!
//! Authority is narrowed on the way down the tree:
//!
//! ```text
//! admin       (MANAGE_AGENT | GENERATE_CARD | VIEW_ALL_DESCENDANTS)
//! └── r1      (MANAGE_AGENT | GENERATE_CARD)       ← subset of parent
//!     └── r1a (GENERATE_CARD)                      ← cannot exceed r1
//! ```
//!
//! # Example
//!
//! ```
//! use agentree_auth::Authority;
//!
//! let parent = Authority::MANAGE_AGENT | Authority::GENERATE_CARD;
//! let requested = Authority::GENERATE_CARD | Authority::DELETE_CARD;
//! assert_eq!(Authority::inherit(parent, requested), Authority::GENERATE_CARD);
//!
//! let mask = Authority::decode_mask("0x104").unwrap();
//! assert_eq!(mask, Authority::MANAGE_AGENT | Authority::GENERATE_CARD);
//! assert_eq!(mask.encode_mask(), "104");
//! ```

use crate::AuthorityError;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Administrative permissions held by an agent.
    ///
    /// | Bit | Flag | Allows |
    /// |-----|------|--------|
    /// | `0x001` | [`ENABLE_CARD`](Self::ENABLE_CARD) | enable/disable cards |
    /// | `0x002` | [`DELETE_CARD`](Self::DELETE_CARD) | delete unactivated cards |
    /// | `0x004` | [`MANAGE_AGENT`](Self::MANAGE_AGENT) | create, enable, disable, delete and fund sub-agents |
    /// | `0x008` | [`RETURN_BAN_TIME`](Self::RETURN_BAN_TIME) | enable cards returning banned time |
    /// | `0x010` | [`RECHARGE_CARD`](Self::RECHARGE_CARD) | recharge cards by card type |
    /// | `0x020` | [`VIEW_ALL_DESCENDANTS`](Self::VIEW_ALL_DESCENDANTS) | see every descendant, not only direct children |
    /// | `0x040` | [`UNBIND_CARD`](Self::UNBIND_CARD) | unbind cards |
    /// | `0x080` | [`QUERYABLE_BY_OTHERS`](Self::QUERYABLE_BY_OTHERS) | own cards may be queried by other agents |
    /// | `0x100` | [`GENERATE_CARD`](Self::GENERATE_CARD) | mint cards |
    ///
    /// Unknown bits read from storage are preserved, not dropped.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Authority: u64 {
        const ENABLE_CARD          = 0x0000_0001;
        const DELETE_CARD          = 0x0000_0002;
        const MANAGE_AGENT         = 0x0000_0004;
        const RETURN_BAN_TIME      = 0x0000_0008;
        const RECHARGE_CARD        = 0x0000_0010;
        const VIEW_ALL_DESCENDANTS = 0x0000_0020;
        const UNBIND_CARD          = 0x0000_0040;
        const QUERYABLE_BY_OTHERS  = 0x0000_0080;
        const GENERATE_CARD        = 0x0000_0100;

        const _ = !0;
    }
}

impl Authority {
    /// Every named permission.
    pub const ALL: Self = Self::ENABLE_CARD
        .union(Self::DELETE_CARD)
        .union(Self::MANAGE_AGENT)
        .union(Self::RETURN_BAN_TIME)
        .union(Self::RECHARGE_CARD)
        .union(Self::VIEW_ALL_DESCENDANTS)
        .union(Self::UNBIND_CARD)
        .union(Self::QUERYABLE_BY_OTHERS)
        .union(Self::GENERATE_CARD);

    /// Decodes a persisted hex mask.
    ///
    /// An empty string is "no permissions". A leading `0x` is stripped.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError::Malformed`] when the text is not valid hex.
    /// A malformed mask is never treated as zero.
    pub fn decode_mask(raw: &str) -> Result<Self, AuthorityError> {
        if raw.is_empty() {
            return Ok(Self::empty());
        }
        let digits = raw.strip_prefix("0x").unwrap_or(raw);
        // from_str_radix alone would take a leading sign.
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AuthorityError::Malformed {
                raw: raw.to_string(),
                source: None,
            });
        }
        u64::from_str_radix(digits, 16)
            .map(Self::from_bits_retain)
            .map_err(|source| AuthorityError::Malformed {
                raw: raw.to_string(),
                source: Some(source),
            })
    }

    /// Encodes the mask as lowercase hex without prefix (`0` for empty).
    #[must_use]
    pub fn encode_mask(self) -> String {
        format!("{:x}", self.bits())
    }

    /// Returns `true` if every bit of `required` is held.
    #[must_use]
    pub fn has_permission(self, required: Self) -> bool {
        self.contains(required)
    }

    /// Returns `true` if at least one of `candidates` is held in full.
    #[must_use]
    pub fn has_any(self, candidates: &[Self]) -> bool {
        candidates.iter().any(|c| self.contains(*c))
    }

    /// Returns `true` if all of `required` are held.
    #[must_use]
    pub fn has_all(self, required: &[Self]) -> bool {
        required.iter().all(|r| self.contains(*r))
    }

    /// Computes the authority a child actually receives: `parent & requested`.
    #[must_use]
    pub fn inherit(parent: Self, requested: Self) -> Self {
        parent & requested
    }

    /// Sets or clears `bit` on a persisted mask and returns the re-encoded text.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError::Malformed`] when `raw` is not valid hex.
    ///
    /// # Example
    ///
    /// ```
    /// use agentree_auth::Authority;
    ///
    /// let on = Authority::set_permission("", Authority::UNBIND_CARD, true).unwrap();
    /// assert_eq!(on, "40");
    /// let off = Authority::set_permission(&on, Authority::UNBIND_CARD, false).unwrap();
    /// assert_eq!(off, "0");
    /// ```
    pub fn set_permission(raw: &str, bit: Self, enabled: bool) -> Result<String, AuthorityError> {
        let mut mask = Self::decode_mask(raw)?;
        mask.set(bit, enabled);
        Ok(mask.encode_mask())
    }

    /// Names of the named permissions held, in bit order.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }

    /// Parses a permission name (case-insensitive, `-` accepted for `_`).
    ///
    /// ```
    /// use agentree_auth::Authority;
    ///
    /// assert_eq!(Authority::parse("manage-agent"), Some(Authority::MANAGE_AGENT));
    /// assert_eq!(Authority::parse("GENERATE_CARD"), Some(Authority::GENERATE_CARD));
    /// assert_eq!(Authority::parse("all"), Some(Authority::ALL));
    /// assert_eq!(Authority::parse("fly"), None);
    /// ```
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let normalized = name.trim().to_uppercase().replace('-', "_");
        if normalized == "ALL" {
            return Some(Self::ALL);
        }
        Self::from_name(&normalized)
    }

    /// Parses a list of names, returning the combined mask and unknown names.
    #[must_use]
    pub fn parse_list<'a>(names: &[&'a str]) -> (Self, Vec<&'a str>) {
        let mut mask = Self::empty();
        let mut unknown = Vec::new();
        for name in names {
            match Self::parse(name) {
                Some(bit) => mask |= bit,
                None => unknown.push(*name),
            }
        }
        (mask, unknown)
    }
}

impl std::fmt::Display for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self.names();
        if names.is_empty() {
            write!(f, "(none)")
        } else {
            write!(f, "{}", names.join(" | "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE_BITS: [Authority; 9] = [
        Authority::ENABLE_CARD,
        Authority::DELETE_CARD,
        Authority::MANAGE_AGENT,
        Authority::RETURN_BAN_TIME,
        Authority::RECHARGE_CARD,
        Authority::VIEW_ALL_DESCENDANTS,
        Authority::UNBIND_CARD,
        Authority::QUERYABLE_BY_OTHERS,
        Authority::GENERATE_CARD,
    ];

    #[test]
    fn bits_are_distinct_single_bits() {
        let mut seen = Authority::empty();
        for bit in SINGLE_BITS {
            assert_eq!(bit.bits().count_ones(), 1, "{bit:?}");
            assert!(!seen.intersects(bit));
            seen |= bit;
        }
        assert_eq!(seen, Authority::ALL);
        assert_eq!(Authority::ALL.bits(), 0x1ff);
    }

    #[test]
    fn decode_empty_is_zero() {
        assert_eq!(Authority::decode_mask(""), Ok(Authority::empty()));
    }

    #[test]
    fn decode_with_and_without_prefix() {
        assert_eq!(Authority::decode_mask("0x4").map(|m| m.bits()), Ok(0x4));
        assert_eq!(Authority::decode_mask("1FF").map(|m| m.bits()), Ok(0x1ff));
    }

    #[test]
    fn decode_malformed_is_an_error() {
        for raw in ["zz", "0x", "12 3", "-1", "+4", "0x+4", " 4"] {
            let err = Authority::decode_mask(raw).expect_err(raw);
            assert!(matches!(err, AuthorityError::Malformed { .. }), "{raw}");
        }
    }

    #[test]
    fn unknown_bits_survive_round_trip() {
        let mask = Authority::decode_mask("1000").expect("valid hex");
        assert_eq!(mask.bits(), 0x1000);
        assert_eq!(mask.encode_mask(), "1000");
        assert!(mask.names().is_empty());
    }

    #[test]
    fn set_permission_round_trip_every_bit() {
        let zero = Authority::empty().encode_mask();
        for bit in SINGLE_BITS {
            let on = Authority::set_permission(&zero, bit, true).expect("set");
            assert_eq!(Authority::decode_mask(&on), Ok(bit));
            let off = Authority::set_permission(&on, bit, false).expect("clear");
            assert_eq!(Authority::decode_mask(&off), Ok(Authority::empty()));
        }
    }

    #[test]
    fn set_permission_propagates_malformed() {
        assert!(Authority::set_permission("nothex", Authority::ENABLE_CARD, true).is_err());
    }

    #[test]
    fn has_any_and_all() {
        let mask = Authority::MANAGE_AGENT | Authority::GENERATE_CARD;
        assert!(mask.has_permission(Authority::MANAGE_AGENT));
        assert!(!mask.has_permission(Authority::MANAGE_AGENT | Authority::UNBIND_CARD));
        assert!(mask.has_any(&[Authority::UNBIND_CARD, Authority::GENERATE_CARD]));
        assert!(!mask.has_any(&[Authority::UNBIND_CARD]));
        assert!(mask.has_all(&[Authority::MANAGE_AGENT, Authority::GENERATE_CARD]));
        assert!(!mask.has_all(&[Authority::MANAGE_AGENT, Authority::UNBIND_CARD]));
        assert!(mask.has_all(&[]));
        assert!(!mask.has_any(&[]));
    }

    #[test]
    fn inherit_cannot_exceed_parent() {
        let parent = Authority::GENERATE_CARD;
        assert_eq!(
            Authority::inherit(parent, Authority::ALL),
            Authority::GENERATE_CARD
        );
    }

    #[test]
    fn names_and_display() {
        let mask = Authority::ENABLE_CARD | Authority::GENERATE_CARD;
        assert_eq!(mask.names(), vec!["ENABLE_CARD", "GENERATE_CARD"]);
        assert_eq!(mask.to_string(), "ENABLE_CARD | GENERATE_CARD");
        assert_eq!(Authority::empty().to_string(), "(none)");
    }

    #[test]
    fn parse_list_reports_unknown() {
        let (mask, unknown) = Authority::parse_list(&["manage_agent", "bogus", "unbind-card"]);
        assert_eq!(mask, Authority::MANAGE_AGENT | Authority::UNBIND_CARD);
        assert_eq!(unknown, vec!["bogus"]);
    }
}
