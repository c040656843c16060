//! Card-type grant sets.
//!
//! Besides its [`Authority`](crate::Authority) bits, an agent holds the set
//! of card types it may mint. The set is stored as a bracketed list
//! (`[day],[week],[month]`) in insertion order.
//!
//! # Stored vs effective grants
//!
//! | Aspect | Stored grants | Effective grants |
//! |--------|---------------|------------------|
//! | Written by | an ancestor's grant transfer | never written |
//! | Content | raw set, may name types the ancestor lacks | stored ∩ viewer's grants |
//! | Used for | self-view, minting checks | an ancestor viewing a descendant |
//!
//! The intersection is computed at read time, so a descendant can never
//! effectively wield a card type its viewer does not also hold even when its
//! stored set nominally includes it.

use agentree_types::bracket;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered, duplicate-free set of card-type names.
///
/// # Example
///
/// ```
/// use agentree_auth::CardTypeGrants;
///
/// let child = CardTypeGrants::decode("[a],[b],[c]");
/// let parent = CardTypeGrants::decode("[d],[c],[b]");
///
/// // Child order is kept.
/// assert_eq!(child.intersect(&parent).encode(), "[b],[c]");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CardTypeGrants {
    names: Vec<String>,
}

impl CardTypeGrants {
    /// Creates an empty grant set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes the stored bracketed list. Malformed input yields an empty set.
    #[must_use]
    pub fn decode(raw: &str) -> Self {
        bracket::decode(raw).into_iter().collect()
    }

    /// Encodes to the stored bracketed list.
    #[must_use]
    pub fn encode(&self) -> String {
        bracket::encode(&self.names)
    }

    /// Adds `name` if absent. Blank names are ignored.
    ///
    /// Returns `true` if the set changed.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() || self.contains(trimmed) {
            return false;
        }
        self.names.push(trimmed.to_string());
        true
    }

    /// Returns `true` if `name` is granted.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// The members whose names are also in `parent`, in this set's order.
    #[must_use]
    pub fn intersect(&self, parent: &Self) -> Self {
        Self {
            names: self
                .names
                .iter()
                .filter(|n| parent.contains(n))
                .cloned()
                .collect(),
        }
    }

    /// Names in insertion order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of granted types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if nothing is granted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates over the names in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for CardTypeGrants {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut grants = Self::new();
        for name in iter {
            grants.insert(name);
        }
        grants
    }
}

impl From<Vec<String>> for CardTypeGrants {
    fn from(names: Vec<String>) -> Self {
        names.into_iter().collect()
    }
}

impl From<CardTypeGrants> for Vec<String> {
    fn from(grants: CardTypeGrants) -> Self {
        grants.names
    }
}

impl fmt::Display for CardTypeGrants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
