//! Agent ancestry chains.
//!
//! Every agent row stores its ancestry as a bracketed list running from the
//! tenant root down to the agent itself:
//!
//! ```text
//! [admin],[reseller1],[reseller1_sub]
//!    │         │            └── the agent itself (last element)
//!    │         └── direct parent (second to last)
//!    └── tenant root
//! ```
//!
//! Chains only ever grow by appending a child name at creation time and are
//! never rewritten afterwards, so an agent's position in the tree is fixed
//! for its lifetime.
//!
//! [`AgentChain`] is the decoded, typed form used inside the services. The
//! free functions in this module answer the same questions directly on the
//! persisted text.
//!
//! Duplicate names inside one chain are accepted as stored; nothing here
//! rejects them.

use crate::bracket;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decoded ancestry chain: root first, the agent itself last.
///
/// # Example
///
/// ```
/// use agentree_types::AgentChain;
///
/// let chain = AgentChain::decode("[admin],[reseller1],[sub]");
/// assert_eq!(chain.own_name(), Some("sub"));
/// assert_eq!(chain.parent(), Some("reseller1"));
/// assert!(chain.contains("admin"));
///
/// let child = chain.child("leaf");
/// assert_eq!(child.encode(), "[admin],[reseller1],[sub],[leaf]");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentChain {
    names: Vec<String>,
}

impl AgentChain {
    /// Creates a single-element chain for a tenant root agent.
    #[must_use]
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            names: vec![name.into()],
        }
    }

    /// Builds a chain from an ordered list of names (root first).
    #[must_use]
    pub fn from_names(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Decodes the persisted form. Malformed input yields an empty chain.
    #[must_use]
    pub fn decode(raw: &str) -> Self {
        Self {
            names: bracket::decode(raw),
        }
    }

    /// Encodes to the persisted form.
    #[must_use]
    pub fn encode(&self) -> String {
        bracket::encode(&self.names)
    }

    /// All names, root first.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of names in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the chain has no names (no ancestry).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The agent's own name (last element).
    #[must_use]
    pub fn own_name(&self) -> Option<&str> {
        self.names.last().map(String::as_str)
    }

    /// The direct parent (second to last). `None` for roots and empty chains.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        if self.names.len() < 2 {
            return None;
        }
        self.names.get(self.names.len() - 2).map(String::as_str)
    }

    /// Every name except the last, root first.
    #[must_use]
    pub fn ancestors(&self) -> &[String] {
        match self.names.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    /// Returns `true` if `name` appears anywhere in the chain.
    ///
    /// This covers direct and transitive ancestry. Because the chain ends
    /// with the agent's own name, an agent "contains" itself; callers that
    /// need a strict ancestor use [`has_strict_ancestor`](Self::has_strict_ancestor).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Returns `true` if `name` appears among the ancestors (excluding the
    /// agent's own trailing entry).
    #[must_use]
    pub fn has_strict_ancestor(&self, name: &str) -> bool {
        self.ancestors().iter().any(|n| n == name)
    }

    /// Returns `true` if `name` is the direct parent.
    #[must_use]
    pub fn is_direct_parent(&self, name: &str) -> bool {
        self.parent() == Some(name)
    }

    /// Returns the chain of a new child of this agent.
    #[must_use]
    pub fn child(&self, child_name: impl Into<String>) -> Self {
        let mut names = Vec::with_capacity(self.names.len() + 1);
        names.extend(self.names.iter().cloned());
        names.push(child_name.into());
        Self { names }
    }
}

impl fmt::Display for AgentChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Decodes a persisted chain into its ordered names.
#[must_use]
pub fn decode(chain: &str) -> Vec<String> {
    bracket::decode(chain)
}

/// Returns the direct parent of the chain's agent, or `""` for roots.
#[must_use]
pub fn parent_of(chain: &str) -> String {
    AgentChain::decode(chain)
        .parent()
        .map(str::to_string)
        .unwrap_or_default()
}

/// Returns every name except the agent's own.
#[must_use]
pub fn chain_excluding_self(chain: &str) -> Vec<String> {
    AgentChain::decode(chain).ancestors().to_vec()
}

/// Returns `true` if `candidate` appears anywhere in the chain.
#[must_use]
pub fn is_ancestor(candidate: &str, chain: &str) -> bool {
    AgentChain::decode(chain).contains(candidate)
}

/// Returns `true` if `candidate` is the chain's direct parent.
#[must_use]
pub fn is_direct_parent(candidate: &str, chain: &str) -> bool {
    AgentChain::decode(chain).is_direct_parent(candidate)
}

/// Appends `child_name` to the decoded parent chain and re-encodes it.
#[must_use]
pub fn build_child_chain(parent_chain: &str, child_name: &str) -> String {
    AgentChain::decode(parent_chain).child(child_name).encode()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIN: &str = "[admin],[reseller1],[reseller1_sub]";

    #[test]
    fn parent_of_various_lengths() {
        assert_eq!(parent_of(CHAIN), "reseller1");
        assert_eq!(parent_of("[admin],[r1]"), "admin");
        assert_eq!(parent_of("[admin]"), "");
        assert_eq!(parent_of(""), "");
        assert_eq!(parent_of("garbage"), "");
    }

    #[test]
    fn excluding_self() {
        assert_eq!(chain_excluding_self(CHAIN), vec!["admin", "reseller1"]);
        assert!(chain_excluding_self("[admin]").is_empty());
        assert!(chain_excluding_self("").is_empty());
    }

    #[test]
    fn ancestry_is_transitive() {
        assert!(is_ancestor("admin", CHAIN));
        assert!(is_ancestor("reseller1", CHAIN));
        assert!(!is_ancestor("other", CHAIN));
        assert!(!is_ancestor("admin", ""));
    }

    #[test]
    fn strict_ancestor_excludes_self() {
        let chain = AgentChain::decode(CHAIN);
        assert!(chain.contains("reseller1_sub"));
        assert!(!chain.has_strict_ancestor("reseller1_sub"));
        assert!(chain.has_strict_ancestor("admin"));
    }

    #[test]
    fn direct_parent_only() {
        assert!(is_direct_parent("reseller1", CHAIN));
        assert!(!is_direct_parent("admin", CHAIN));
        assert!(!is_direct_parent("", "[admin]"));
    }

    #[test]
    fn build_child_appends() {
        let parent = "[admin],[r1]";
        let child = build_child_chain(parent, "r1_sub");
        assert_eq!(child, "[admin],[r1],[r1_sub]");

        let decoded = decode(&child);
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[..2], decode(parent)[..]);
        assert_eq!(decoded.last().map(String::as_str), Some("r1_sub"));
    }

    #[test]
    fn build_child_of_empty_chain() {
        assert_eq!(build_child_chain("", "root"), "[root]");
        assert_eq!(build_child_chain("[]", "root"), "[root]");
    }

    #[test]
    fn round_trip_is_idempotent() {
        for raw in [CHAIN, "[ a ],[b]", "[x]", "", "[],[y]"] {
            let once = decode(raw);
            let twice = decode(&bracket::encode(&once));
            assert_eq!(once, twice, "raw: {raw}");
        }
    }

    #[test]
    fn duplicate_names_are_kept() {
        let chain = AgentChain::decode("[a],[b],[a]");
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.parent(), Some("b"));
        assert!(chain.has_strict_ancestor("a"));
    }

    #[test]
    fn deep_chain_relationships() {
        let mut chain = AgentChain::root("n0");
        for i in 1..50 {
            chain = chain.child(format!("n{i}"));
        }
        assert_eq!(chain.len(), 50);
        assert_eq!(chain.parent(), Some("n48"));
        for i in 0..49 {
            assert!(chain.has_strict_ancestor(&format!("n{i}")));
        }
        assert_eq!(AgentChain::decode(&chain.encode()), chain);
    }
}
