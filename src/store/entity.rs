//! Entities, mutations and queries exchanged with the entity store.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::key::Key;
use crate::error::{DocError, Result};

/// A stored record: a key plus a flat property map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub key: Key,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Entity {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            properties: Map::new(),
        }
    }

    /// Build an entity whose properties are the fields of `value`.
    pub fn from_serializable<T: Serialize>(key: Key, value: &T) -> Result<Self> {
        match serde_json::to_value(value)? {
            Value::Object(properties) => Ok(Self { key, properties }),
            other => Err(DocError::Assertion(format!(
                "entity {} must serialize to an object, got {}",
                key, other
            ))),
        }
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.properties.clone()))?)
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.properties.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }

    /// Approximate stored size: serialized key plus serialized properties.
    pub fn estimated_size(&self) -> usize {
        let key = serde_json::to_vec(&self.key).map(|v| v.len()).unwrap_or(0);
        let props = serde_json::to_vec(&self.properties)
            .map(|v| v.len())
            .unwrap_or(usize::MAX - key);
        key + props
    }
}

/// A single non-transactional write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    Upsert(Entity),
    Delete(Key),
}

impl Mutation {
    pub fn key(&self) -> &Key {
        match self {
            Mutation::Upsert(entity) => &entity.key,
            Mutation::Delete(key) => key,
        }
    }
}

/// Outcome of one commit call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    /// Number of leading mutations the store applied.
    pub applied: usize,
    /// Diagnostics for mutations the store rejected.
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn matches(&self, entity: &Entity) -> bool {
        let Some(actual) = entity.get(&self.field) else {
            return false;
        };
        let ordering = || compare_values(actual, &self.value);
        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::Ne => actual != &self.value,
            FilterOp::Lt => ordering() == Some(Ordering::Less),
            FilterOp::Lte => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
            FilterOp::Gt => ordering() == Some(Ordering::Greater),
            FilterOp::Gte => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// A kind query, optionally scoped to an ancestor and filtered by properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub kind: String,
    pub ancestor: Option<Key>,
    pub filters: Vec<Filter>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn kind(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ancestor: None,
            filters: Vec::new(),
            limit: None,
        }
    }

    pub fn has_ancestor(mut self, key: Key) -> Self {
        self.ancestor = Some(key);
        self
    }

    pub fn filter(mut self, field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Ancestor matching follows the store: the ancestor itself matches when
    /// its kind is the queried kind.
    pub fn matches(&self, entity: &Entity) -> bool {
        if entity.key.kind() != self.kind {
            return false;
        }
        if let Some(ancestor) = &self.ancestor {
            if !entity.key.starts_with(ancestor) {
                return false;
            }
        }
        self.filters.iter().all(|f| f.matches(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        size: u64,
    }

    #[test]
    fn test_serializable_roundtrip() {
        let key = Key::root("module", "oak");
        let sample = Sample {
            name: "oak".into(),
            size: 3,
        };
        let entity = Entity::from_serializable(key, &sample).unwrap();
        assert_eq!(entity.get_str("name"), Some("oak"));
        assert_eq!(entity.deserialize::<Sample>().unwrap(), sample);
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = Entity::from_serializable(Key::root("module", "oak"), &42).unwrap_err();
        assert!(matches!(err, DocError::Assertion(_)));
    }

    #[test]
    fn test_filters() {
        let entity = Entity::new(Key::root("module_version", "1"))
            .with("name", "oak")
            .with("size", 10);
        let q = Query::kind("module_version")
            .filter("size", FilterOp::Gte, 10)
            .filter("name", FilterOp::Eq, "oak");
        assert!(q.matches(&entity));
        let q = Query::kind("module_version").filter("size", FilterOp::Lt, json!(10));
        assert!(!q.matches(&entity));
        let q = Query::kind("module_version").filter("missing", FilterOp::Ne, 1);
        assert!(!q.matches(&entity));
    }

    #[test]
    fn test_ancestor_query_includes_self() {
        let ancestor = Key::root("doc_node", 1);
        let own = Entity::new(ancestor.clone());
        let child = Entity::new(ancestor.child("doc_node", 1));
        let q = Query::kind("doc_node").has_ancestor(ancestor.clone());
        assert!(q.matches(&own));
        assert!(q.matches(&child));
        assert!(!q.matches(&Entity::new(Key::root("doc_node", 2))));
    }

    #[test]
    fn test_filter_ordering_bounds() {
        let entity = Entity::new(Key::root("module_version", "v1")).with("size", 10);
        let matches = |op| Filter { field: "size".into(), op, value: json!(10) }.matches(&entity);
        assert!(matches(FilterOp::Lte));
        assert!(matches(FilterOp::Gte));
        assert!(!matches(FilterOp::Lt));
        assert!(!matches(FilterOp::Gt));

        let mismatched = Filter { field: "size".into(), op: FilterOp::Gte, value: json!("10") };
        assert!(!mismatched.matches(&entity));
    }
}
