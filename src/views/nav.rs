//! Per-entry navigation index.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::doc::{qualified_symbols, DeclarationKind, DocNode, DocNodeKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavItem {
    pub name: String,
    pub kind: DocNodeKind,
    pub declaration_kind: DeclarationKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavIndex {
    pub path: String,
    pub items: Vec<NavItem>,
}

impl NavIndex {
    /// Public symbols of one entry, namespace members qualified, ordered by
    /// kind then name. Overloads collapse into one item.
    pub fn build(path: &str, nodes: &[DocNode]) -> Self {
        let mut seen = HashSet::new();
        let mut items: Vec<NavItem> = qualified_symbols(nodes)
            .into_iter()
            .filter(|(_, node)| node.declaration_kind != DeclarationKind::Private)
            .filter(|(name, node)| seen.insert((node.kind(), name.clone())))
            .map(|(name, node)| NavItem {
                name,
                kind: node.kind(),
                declaration_kind: node.declaration_kind,
            })
            .collect();
        items.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));

        Self {
            path: path.to_string(),
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::parse_doc_nodes;
    use serde_json::json;

    #[test]
    fn test_nav_order_and_dedup() {
        let nodes = parse_doc_nodes(
            &json!([
                {"kind": "function", "name": "zeta", "functionDef": {}},
                {"kind": "function", "name": "alpha", "functionDef": {}},
                {"kind": "function", "name": "alpha", "functionDef": {"params": []}},
                {"kind": "class", "name": "Server", "classDef": {}},
                {"kind": "variable", "name": "internal", "declarationKind": "private", "variableDef": {}},
                {"kind": "namespace", "name": "Status", "namespaceDef": {"elements": [
                    {"kind": "variable", "name": "OK", "variableDef": {}}
                ]}}
            ])
            .to_string(),
        )
        .unwrap();

        let nav = NavIndex::build("/mod.ts", &nodes);
        let names: Vec<(&str, DocNodeKind)> = nav
            .items
            .iter()
            .map(|i| (i.name.as_str(), i.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Status", DocNodeKind::Namespace),
                ("Server", DocNodeKind::Class),
                ("alpha", DocNodeKind::Function),
                ("zeta", DocNodeKind::Function),
                ("Status.OK", DocNodeKind::Variable),
            ]
        );
    }

    #[test]
    fn test_empty_entry() {
        let nav = NavIndex::build("/empty.ts", &[]);
        assert_eq!(nav.path, "/empty.ts");
        assert!(nav.items.is_empty());
    }
}
