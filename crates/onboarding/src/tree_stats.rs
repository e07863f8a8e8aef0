//! Effective file and size totals for a scanned folder tree once the user
//! has excluded some subtrees.
//!
//! Scanner nodes only carry aggregate counters, so the files living directly
//! in a node are recovered as `aggregate - Σ children aggregates`. That is
//! only exact when every node satisfies the aggregate invariant; use
//! [`validate_tree`] to check a tree before trusting the numbers.

use std::collections::BTreeSet;

use {
    ragkit_service_traits::DirectoryTreeNode,
    serde::{Deserialize, Serialize},
};

/// Paths the user opted out of. Excluding a node drops its whole subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionSet(BTreeSet<String>);

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    pub fn insert(&mut self, path: impl Into<String>) -> bool {
        self.0.insert(path.into())
    }

    pub fn remove(&mut self, path: &str) -> bool {
        self.0.remove(path)
    }

    /// Flip membership of `path`. Returns `true` when the path is now
    /// excluded.
    pub fn toggle(&mut self, path: &str) -> bool {
        if self.0.remove(path) {
            false
        } else {
            self.0.insert(path.to_string());
            true
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveStats {
    pub files: u64,
    pub size_bytes: u64,
}

impl EffectiveStats {
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Totals under `root` after dropping every excluded subtree.
///
/// Each node is visited once. Files directly inside a node cannot be
/// excluded on their own; they go with the node.
pub fn effective_stats(root: &DirectoryTreeNode, excluded: &ExclusionSet) -> EffectiveStats {
    if excluded.contains(&root.path) {
        return EffectiveStats::default();
    }

    let mut direct_files = root.file_count;
    let mut direct_size = root.size_bytes;
    let mut included = EffectiveStats::default();

    for child in &root.children {
        direct_files = direct_files.saturating_sub(child.file_count);
        direct_size = direct_size.saturating_sub(child.size_bytes);

        let sub = effective_stats(child, excluded);
        included.files = included.files.saturating_add(sub.files);
        included.size_bytes = included.size_bytes.saturating_add(sub.size_bytes);
    }

    included.files = included.files.saturating_add(direct_files);
    included.size_bytes = included.size_bytes.saturating_add(direct_size);
    included
}

/// A node whose aggregate is smaller than what its children report.
///
/// `children` is `u64::MAX` when the children's total does not fit in a
/// `u64`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: aggregate {field} {aggregate} is below the children's total {children}")]
pub struct TreeInvariantError {
    pub path: String,
    pub field: &'static str,
    pub aggregate: u64,
    pub children: u64,
}

/// Check `file_count >= Σ children.file_count` (and the same for bytes) on
/// every node, returning the first violation in pre-order.
pub fn validate_tree(root: &DirectoryTreeNode) -> Result<(), TreeInvariantError> {
    check_field(root, "file_count", root.file_count, |c| c.file_count)?;
    check_field(root, "size_bytes", root.size_bytes, |c| c.size_bytes)?;
    root.children.iter().try_for_each(validate_tree)
}

fn check_field(
    node: &DirectoryTreeNode,
    field: &'static str,
    aggregate: u64,
    counter: impl Fn(&DirectoryTreeNode) -> u64,
) -> Result<(), TreeInvariantError> {
    let children = node
        .children
        .iter()
        .try_fold(0u64, |acc, c| acc.checked_add(counter(c)));
    match children {
        Some(total) if total <= aggregate => Ok(()),
        total => Err(TreeInvariantError {
            path: node.path.clone(),
            field,
            aggregate,
            children: total.unwrap_or(u64::MAX),
        }),
    }
}
