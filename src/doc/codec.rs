//! Flattening documentation trees into ancestor-keyed records and back.
//!
//! The store caps nesting depth and entity size, so a tree is stored as one
//! record per node. Top-level nodes get sequential ids under the base key;
//! namespace elements get sequential ids under their namespace's key.
//! Definitions are stored as an opaque JSON string in the `def` field.

use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::types::{
    DeclarationKind, DocNode, DocNodeDef, DocNodeKind, JsDoc, Location, NamespaceDef,
};
use crate::config::DocConfig;
use crate::error::{DocError, Result};
use crate::store::{descendant_not_child, kinds, Entity, Key};

/// Documentation text substituted when a definition is too large to store.
pub const TRUNCATED_DOC_WARNING: &str =
    "The definition of this symbol is too large to be stored and has been omitted.";

const FIELD_KIND: &str = "kind";
const FIELD_NAME: &str = "name";
const FIELD_IS_DEFAULT: &str = "isDefault";
const FIELD_LOCATION: &str = "location";
const FIELD_DECLARATION_KIND: &str = "declarationKind";
const FIELD_JS_DOC: &str = "jsDoc";
const FIELD_DEF: &str = "def";

#[derive(Debug, Clone, Copy)]
pub struct DocCodec {
    max_entity_size: usize,
}

impl DocCodec {
    pub fn new(max_entity_size: usize) -> Self {
        Self { max_entity_size }
    }

    pub fn from_config(config: &DocConfig) -> Self {
        Self::new(config.store.max_entity_size)
    }

    /// Flatten `nodes` into records below `base`.
    ///
    /// An empty input still produces one `null` record so that "no symbols"
    /// is distinguishable from "not processed yet".
    pub fn encode(&self, nodes: &[DocNode], base: &Key) -> Result<Vec<Entity>> {
        let mut records = Vec::new();
        if nodes.is_empty() {
            records.push(self.record(base.child(kinds::DOC_NODE, 1), &DocNode::null())?);
            return Ok(records);
        }
        self.encode_into(nodes, base, &mut records)?;
        Ok(records)
    }

    fn encode_into(
        &self,
        nodes: &[DocNode],
        parent: &Key,
        records: &mut Vec<Entity>,
    ) -> Result<()> {
        for (i, node) in nodes.iter().enumerate() {
            let key = parent.child(kinds::DOC_NODE, i + 1);
            records.push(self.record(key.clone(), node)?);
            if let DocNodeDef::Namespace { namespace_def } = &node.def {
                self.encode_into(&namespace_def.elements, &key, records)?;
            }
        }
        Ok(())
    }

    fn record(&self, key: Key, node: &DocNode) -> Result<Entity> {
        let entity = node_entity(
            key.clone(),
            node,
            node.js_doc.as_ref(),
            node.def.definition()?,
        )?;
        let size = entity.estimated_size();
        if size <= self.max_entity_size {
            return Ok(entity);
        }

        warn!(
            key = %key,
            name = %node.name,
            size,
            limit = self.max_entity_size,
            "doc node exceeds entity size, storing placeholder definition"
        );
        let mut js_doc = JsDoc {
            doc: Some(TRUNCATED_DOC_WARNING.to_string()),
            tags: node.js_doc.as_ref().map(|d| d.tags.clone()).unwrap_or_default(),
        };
        let placeholder = DocNodeDef::placeholder(node.kind()).definition()?;
        let entity = node_entity(key.clone(), node, Some(&js_doc), placeholder.clone())?;
        let size = entity.estimated_size();
        if size <= self.max_entity_size || js_doc.tags.is_empty() {
            return Ok(entity);
        }

        warn!(
            key = %key,
            name = %node.name,
            size,
            tags = js_doc.tags.len(),
            "placeholder still exceeds entity size, dropping doc tags"
        );
        js_doc.tags.clear();
        let entity = node_entity(key.clone(), node, Some(&js_doc), placeholder)?;
        let size = entity.estimated_size();
        if size > self.max_entity_size {
            // Name and location are never altered; only the store can refuse now.
            warn!(
                key = %key,
                size,
                limit = self.max_entity_size,
                "doc node exceeds entity size without definition or tags"
            );
        }
        Ok(entity)
    }

    /// Rebuild the tree stored below `ancestor`.
    ///
    /// Records one level below a namespace record become its elements.
    /// Other nested records are orphans and are dropped. A record outside
    /// `ancestor` is an assertion fault. Null markers never appear in the
    /// result.
    pub fn decode(&self, records: &[Entity], ancestor: &Key) -> Result<Vec<DocNode>> {
        let mut sorted: Vec<&Entity> = records.iter().collect();
        sorted.sort_by(|a, b| a.key.cmp(&b.key));

        // Adjacency map: parent key -> records exactly one level below it.
        let mut top_level: Vec<&Entity> = Vec::new();
        let mut children: HashMap<Key, Vec<&Entity>> = HashMap::new();
        for record in sorted.iter().copied() {
            match descendant_not_child(ancestor, &record.key)? {
                None => top_level.push(record),
                Some(_) => {
                    if let Some(parent) = record.key.parent() {
                        children.entry(parent).or_default().push(record);
                    }
                }
            }
        }

        let mut used = top_level.len();
        let mut nodes = Vec::with_capacity(top_level.len());
        for record in top_level {
            let node = build_node(record, &children, &mut used)?;
            if !node.is_null() {
                nodes.push(node);
            }
        }

        let orphans = records.len() - used;
        if orphans > 0 {
            debug!(ancestor = %ancestor, orphans, "discarded orphan doc node records");
        }
        Ok(nodes)
    }
}

impl Default for DocCodec {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_ENTITY_SIZE)
    }
}

fn node_entity(
    key: Key,
    node: &DocNode,
    js_doc: Option<&JsDoc>,
    definition: Option<Value>,
) -> Result<Entity> {
    let mut entity = Entity::new(key)
        .with(FIELD_KIND, node.kind().as_str())
        .with(FIELD_NAME, node.name.clone())
        .with(FIELD_LOCATION, serde_json::to_value(&node.location)?)
        .with(
            FIELD_DECLARATION_KIND,
            serde_json::to_value(node.declaration_kind)?,
        );
    if let Some(is_default) = node.is_default {
        entity.set(FIELD_IS_DEFAULT, is_default);
    }
    if let Some(js_doc) = js_doc {
        entity.set(FIELD_JS_DOC, serde_json::to_value(js_doc)?);
    }
    if let Some(definition) = definition {
        entity.set(FIELD_DEF, serde_json::to_string(&definition)?);
    }
    Ok(entity)
}

fn build_node(
    record: &Entity,
    children: &HashMap<Key, Vec<&Entity>>,
    used: &mut usize,
) -> Result<DocNode> {
    let mut node = decode_record(record)?;
    if let DocNodeDef::Namespace { namespace_def } = &mut node.def {
        if let Some(elements) = children.get(&record.key) {
            *used += elements.len();
            let mut decoded = Vec::with_capacity(elements.len());
            for element in elements {
                let child = build_node(element, children, used)?;
                if !child.is_null() {
                    decoded.push(child);
                }
            }
            *namespace_def = NamespaceDef { elements: decoded };
        }
    }
    Ok(node)
}

fn decode_record(record: &Entity) -> Result<DocNode> {
    let kind_str = record.get_str(FIELD_KIND).unwrap_or_default();
    let kind = DocNodeKind::parse(kind_str).ok_or_else(|| {
        DocError::Assertion(format!(
            "record {} has unknown doc node kind {:?}",
            record.key, kind_str
        ))
    })?;

    let location: Location = match record.get(FIELD_LOCATION) {
        Some(value) => serde_json::from_value(value.clone())?,
        None => Location::default(),
    };
    let declaration_kind: DeclarationKind = match record.get(FIELD_DECLARATION_KIND) {
        Some(value) => serde_json::from_value(value.clone())?,
        None => DeclarationKind::default(),
    };
    let js_doc: Option<JsDoc> = match record.get(FIELD_JS_DOC) {
        Some(Value::Null) | None => None,
        Some(value) => Some(serde_json::from_value(value.clone())?),
    };
    let definition = match record.get_str(FIELD_DEF) {
        Some(raw) => Some(serde_json::from_str::<Value>(raw)?),
        None => None,
    };

    Ok(DocNode {
        name: record.get_str(FIELD_NAME).unwrap_or_default().to_string(),
        is_default: record.get(FIELD_IS_DEFAULT).and_then(Value::as_bool),
        location,
        declaration_kind,
        js_doc,
        def: DocNodeDef::from_definition(kind, definition)?,
    })
}
