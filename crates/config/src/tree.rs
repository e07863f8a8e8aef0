//! Immutable configuration document with path-addressed shallow patches.
//!
//! Every update returns a new [`ConfigTree`]. The records along the patched
//! path are rebuilt and every other record is shared with the previous tree,
//! so [`ConfigTree::same_branch`] answers "did this branch change" with a
//! pointer comparison.

use std::{collections::BTreeMap, sync::Arc};

use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

/// A partial update for one record. Keys overwrite, absent keys are kept.
pub type Patch = Map<String, Value>;

/// One entry of a record: either a nested record or a primitive value
/// (number, bool, string, array, null).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigNode {
    Branch(ConfigTree),
    Leaf(Value),
}

impl ConfigNode {
    pub fn as_branch(&self) -> Option<&ConfigTree> {
        match self {
            Self::Branch(tree) => Some(tree),
            Self::Leaf(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Branch(_) => None,
            Self::Leaf(value) => Some(value),
        }
    }
}

impl From<Value> for ConfigNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Branch(ConfigTree::from(map)),
            other => Self::Leaf(other),
        }
    }
}

/// A record of named entries. The root record is the whole onboarding
/// configuration; nested records are its branches (`chunking`,
/// `retrieval.hybrid`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigTree {
    entries: Arc<BTreeMap<String, ConfigNode>>,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Look up the entry at a dotted path (`retrieval.hybrid.top_k`).
    pub fn get(&self, path: &str) -> Option<&ConfigNode> {
        let segments = segments(path);
        let (last, parents) = segments.split_last()?;
        let mut record = self;
        for segment in parents {
            record = record.entries.get(*segment)?.as_branch()?;
        }
        record.entries.get(*last)
    }

    /// The record at `path`. An empty path is the root itself.
    pub fn branch(&self, path: &str) -> Option<&ConfigTree> {
        if segments(path).is_empty() {
            return Some(self);
        }
        self.get(path)?.as_branch()
    }

    pub fn value(&self, path: &str) -> Option<&Value> {
        self.get(path)?.as_value()
    }

    pub fn str_at(&self, path: &str) -> Option<&str> {
        self.value(path)?.as_str()
    }

    pub fn has_branch(&self, path: &str) -> bool {
        self.branch(path).is_some()
    }

    /// Shallow-merge `patch` into the record at `path`.
    ///
    /// Missing records along the path are created empty; a primitive sitting
    /// where a record is expected is replaced by one. Patch values that are
    /// JSON objects replace the whole nested record under their key.
    #[must_use]
    pub fn apply(&self, path: &str, patch: &Patch) -> ConfigTree {
        self.merge_at(&segments(path), patch)
    }

    /// Create the record at `path` from `defaults` unless it already exists.
    ///
    /// An existing record is left untouched and the returned tree shares all
    /// of its storage with `self`.
    #[must_use]
    pub fn with_default(&self, path: &str, defaults: &Patch) -> ConfigTree {
        if self.has_branch(path) {
            return self.clone();
        }
        self.apply(path, defaults)
    }

    /// True when both trees hold the very same record at `path`, or neither
    /// holds one.
    pub fn same_branch(&self, other: &ConfigTree, path: &str) -> bool {
        match (self.branch(path), other.branch(path)) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        }
    }

    pub fn ptr_eq(&self, other: &ConfigTree) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    pub fn to_value(&self) -> Value {
        let map = self
            .entries
            .iter()
            .map(|(key, node)| {
                let value = match node {
                    ConfigNode::Branch(tree) => tree.to_value(),
                    ConfigNode::Leaf(value) => value.clone(),
                };
                (key.clone(), value)
            })
            .collect::<Map<String, Value>>();
        Value::Object(map)
    }

    fn merge_at(&self, segments: &[&str], patch: &Patch) -> ConfigTree {
        let mut entries = (*self.entries).clone();
        match segments.split_first() {
            None => {
                for (key, value) in patch {
                    entries.insert(key.clone(), ConfigNode::from(value.clone()));
                }
            },
            Some((head, rest)) => {
                let child = match entries.get(*head) {
                    Some(ConfigNode::Branch(tree)) => tree.merge_at(rest, patch),
                    _ => ConfigTree::new().merge_at(rest, patch),
                };
                entries.insert((*head).to_string(), ConfigNode::Branch(child));
            },
        }
        ConfigTree {
            entries: Arc::new(entries),
        }
    }
}

impl From<Map<String, Value>> for ConfigTree {
    fn from(map: Map<String, Value>) -> Self {
        let entries = map
            .into_iter()
            .map(|(key, value)| (key, ConfigNode::from(value)))
            .collect();
        Self {
            entries: Arc::new(entries),
        }
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('.')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}
