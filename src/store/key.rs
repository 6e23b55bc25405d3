//! Hierarchical entity keys and ancestry comparison.
//!
//! A [`Key`] is an ordered path of `(kind, id)` segments. Keys order
//! element-wise, so every descendant of a key sorts directly after it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DocError, Result};

/// Identifier of one path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Int(i64),
    Name(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Int(n) => write!(f, "{}", n),
            Id::Name(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Int(n)
    }
}

impl From<i32> for Id {
    fn from(n: i32) -> Self {
        Id::Int(i64::from(n))
    }
}

impl From<usize> for Id {
    fn from(n: usize) -> Self {
        Id::Int(n as i64)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::Name(s.to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::Name(s)
    }
}

/// One `(kind, id)` segment of a key path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathElement {
    pub kind: String,
    pub id: Id,
}

/// A tree address in the entity store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    pub path: Vec<PathElement>,
}

impl Key {
    pub fn root(kind: &str, id: impl Into<Id>) -> Self {
        Self {
            path: vec![PathElement {
                kind: kind.to_string(),
                id: id.into(),
            }],
        }
    }

    /// A new key one segment below this one.
    pub fn child(&self, kind: &str, id: impl Into<Id>) -> Self {
        let mut path = self.path.clone();
        path.push(PathElement {
            kind: kind.to_string(),
            id: id.into(),
        });
        Self { path }
    }

    pub fn parent(&self) -> Option<Key> {
        if self.path.len() <= 1 {
            return None;
        }
        Some(Self {
            path: self.path[..self.path.len() - 1].to_vec(),
        })
    }

    /// Kind of the last segment.
    pub fn kind(&self) -> &str {
        self.path.last().map(|e| e.kind.as_str()).unwrap_or("")
    }

    pub fn id(&self) -> Option<&Id> {
        self.path.last().map(|e| &e.id)
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// True when `other` is this key or one of its ancestors.
    pub fn starts_with(&self, other: &Key) -> bool {
        self.path.len() >= other.path.len() && self.path[..other.path.len()] == other.path[..]
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.path.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}:{}", element.kind, element.id)?;
        }
        Ok(())
    }
}

pub fn keys_equal(a: &Key, b: &Key) -> bool {
    a.path == b.path
}

/// Strict ancestry: `ancestor`'s path is a proper prefix of `key`'s path.
pub fn is_ancestor(ancestor: &Key, key: &Key) -> bool {
    key.path.len() > ancestor.path.len() && key.starts_with(ancestor)
}

/// True when `key` is exactly one segment below `parent`.
pub fn is_child(parent: &Key, key: &Key) -> bool {
    key.path.len() == parent.path.len() + 1 && key.starts_with(parent)
}

/// Locate `descendant` relative to `parent`.
///
/// Returns `Ok(None)` when `descendant` is a direct child of `parent`, and
/// otherwise the direct child of `parent` that lies on the path to it.
/// A key that is not a strict descendant of `parent` is an assertion fault.
pub fn descendant_not_child(parent: &Key, descendant: &Key) -> Result<Option<Key>> {
    if !is_ancestor(parent, descendant) {
        return Err(DocError::Assertion(format!(
            "key {} is not a descendant of {}",
            descendant, parent
        )));
    }
    if is_child(parent, descendant) {
        return Ok(None);
    }
    Ok(Some(Key {
        path: descendant.path[..parent.path.len() + 1].to_vec(),
    }))
}
