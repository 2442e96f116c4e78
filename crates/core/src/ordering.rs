// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sibling node ordering
//!
//! The service appends a sequence number to every lock node; that number is
//! the request order. Names are compared by the number, never lexically.

use crate::error::LockError;

/// A lock node in a sibling listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SiblingNode {
    pub name: String,
    pub sequence: u64,
    /// Which lock-name tag the node carries (e.g. `lock-`, `__READ__`)
    pub tag: String,
}

impl SiblingNode {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag == tag
    }
}

/// Recognises and orders the nodes of one lock namespace.
///
/// A namespace may hold several tags (read and write nodes share one parent),
/// so ordering is done across all of them.
#[derive(Clone, Debug)]
pub struct NodeOrdering {
    tags: Vec<String>,
}

impl NodeOrdering {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a child name into a sibling node.
    ///
    /// The tag may be preceded by anything (protected names carry a
    /// `_c_<uuid>-` prefix); everything after its last occurrence must be the
    /// decimal sequence number.
    pub fn parse(&self, name: &str) -> Option<SiblingNode> {
        self.tags.iter().find_map(|tag| {
            let idx = name.rfind(tag.as_str())?;
            let digits = &name[idx + tag.len()..];
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            Some(SiblingNode {
                name: name.to_string(),
                sequence: digits.parse().ok()?,
                tag: tag.clone(),
            })
        })
    }

    /// Drop foreign entries and sort by sequence number (ties by name)
    pub fn sort<I, S>(&self, children: I) -> Vec<SiblingNode>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut nodes: Vec<SiblingNode> = children
            .into_iter()
            .filter_map(|child| self.parse(child.as_ref()))
            .collect();
        nodes.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.name.cmp(&b.name)));
        nodes
    }

    /// Index of `node_name` in a sorted listing.
    ///
    /// A missing node means ours vanished (session loss, operator delete), so
    /// the attempt has to abort.
    pub fn index_of(
        siblings: &[SiblingNode],
        node_name: &str,
        base_path: &str,
    ) -> Result<usize, LockError> {
        siblings
            .iter()
            .position(|node| node.name == node_name)
            .ok_or_else(|| LockError::IndexNotFound {
                node: node_name.to_string(),
                base_path: base_path.to_string(),
            })
    }
}

#[cfg(test)]
#[path = "ordering_tests.rs"]
mod tests;
