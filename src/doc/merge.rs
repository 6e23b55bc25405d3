//! Merging partial declarations.
//!
//! The documented language allows a namespace or interface to be declared
//! several times; the declarations form one logical symbol. Merging unions
//! their members in encounter order and keeps the first non-empty docs.

use std::collections::HashMap;

use super::types::{DocNode, DocNodeDef, DocNodeKind};

/// Merge same-named namespaces and interfaces. Every other node passes
/// through unchanged, in its original position.
pub fn merge(nodes: Vec<DocNode>) -> Vec<DocNode> {
    let mut merged: Vec<DocNode> = Vec::with_capacity(nodes.len());
    let mut seen: HashMap<(DocNodeKind, String), usize> = HashMap::new();

    for node in nodes {
        let kind = node.kind();
        if !matches!(kind, DocNodeKind::Namespace | DocNodeKind::Interface) {
            merged.push(node);
            continue;
        }
        match seen.get(&(kind, node.name.clone())) {
            Some(&idx) => absorb(&mut merged[idx], node),
            None => {
                seen.insert((kind, node.name.clone()), merged.len());
                merged.push(node);
            }
        }
    }

    merged
}

fn absorb(target: &mut DocNode, other: DocNode) {
    if target.doc_text().is_none() && other.doc_text().is_some() {
        target.js_doc = other.js_doc;
    }

    match (&mut target.def, other.def) {
        (
            DocNodeDef::Namespace { namespace_def },
            DocNodeDef::Namespace {
                namespace_def: extra,
            },
        ) => {
            namespace_def.elements.extend(extra.elements);
        }
        (
            DocNodeDef::Interface { interface_def },
            DocNodeDef::Interface {
                interface_def: extra,
            },
        ) => {
            interface_def.extends.extend(extra.extends);
            interface_def.constructors.extend(extra.constructors);
            interface_def.methods.extend(extra.methods);
            interface_def.properties.extend(extra.properties);
            interface_def.call_signatures.extend(extra.call_signatures);
            interface_def.index_signatures.extend(extra.index_signatures);
            interface_def.type_params.extend(extra.type_params);
            for (field, value) in extra.extra {
                interface_def.extra.entry(field).or_insert(value);
            }
        }
        // Grouping is by kind, so mismatched pairs never reach here.
        _ => {}
    }
}
