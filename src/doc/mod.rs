//! Documentation trees: the node model, the record codec and declaration
//! merging.

pub mod codec;
pub mod merge;
pub mod types;

pub use codec::{DocCodec, TRUNCATED_DOC_WARNING};
pub use merge::merge;
pub use types::{
    parse_doc_nodes, DeclarationKind, DocNode, DocNodeDef, DocNodeKind, InterfaceDef, JsDoc,
    Location, NamespaceDef,
};

/// Resolve a dotted symbol name (`Status.OK`) through namespaces.
///
/// Returns every declaration with that name, since functions may be
/// overloaded.
pub fn find_symbol<'a>(nodes: &'a [DocNode], name: &str) -> Vec<&'a DocNode> {
    if name.is_empty() {
        return Vec::new();
    }
    let mut parts = name.split('.');
    let Some(first) = parts.next() else {
        return Vec::new();
    };
    let mut current: Vec<&DocNode> = nodes.iter().filter(|n| n.name == first).collect();
    for part in parts {
        current = current
            .into_iter()
            .flat_map(|n| n.elements().iter())
            .filter(|n| n.name == part)
            .collect();
    }
    current
}

/// Every node paired with its namespace-qualified name, depth first.
pub fn qualified_symbols(nodes: &[DocNode]) -> Vec<(String, &DocNode)> {
    let mut out = Vec::new();
    collect_qualified(nodes, None, &mut out);
    out
}

fn collect_qualified<'a>(
    nodes: &'a [DocNode],
    prefix: Option<&str>,
    out: &mut Vec<(String, &'a DocNode)>,
) {
    for node in nodes {
        if matches!(
            node.kind(),
            DocNodeKind::Null | DocNodeKind::ModuleDoc | DocNodeKind::Import
        ) {
            continue;
        }
        let name = match prefix {
            Some(p) => format!("{}.{}", p, node.name),
            None => node.name.clone(),
        };
        out.push((name.clone(), node));
        collect_qualified(node.elements(), Some(&name), out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> Vec<DocNode> {
        parse_doc_nodes(
            &json!([
                {"kind": "moduleDoc", "name": "", "jsDoc": {"doc": "Module docs"}},
                {"kind": "import", "name": "dep", "importDef": {"src": "./dep.ts"}},
                {"kind": "function", "name": "f", "functionDef": {}},
                {"kind": "function", "name": "f", "functionDef": {"params": [{"name": "x"}]}},
                {"kind": "namespace", "name": "Status", "namespaceDef": {"elements": [
                    {"kind": "variable", "name": "OK", "variableDef": {}},
                    {"kind": "namespace", "name": "Codes", "namespaceDef": {"elements": [
                        {"kind": "variable", "name": "NotFound", "variableDef": {}}
                    ]}}
                ]}}
            ])
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_find_symbol() {
        let nodes = tree();
        assert_eq!(find_symbol(&nodes, "f").len(), 2);
        assert_eq!(find_symbol(&nodes, "Status.OK").len(), 1);
        assert_eq!(find_symbol(&nodes, "Status.Codes.NotFound")[0].name, "NotFound");
        assert!(find_symbol(&nodes, "Status.Missing").is_empty());
        assert!(find_symbol(&nodes, "").is_empty());
    }

    #[test]
    fn test_qualified_symbols_skip_module_doc_and_imports() {
        let nodes = tree();
        let names: Vec<String> = qualified_symbols(&nodes).into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["f", "f", "Status", "Status.OK", "Status.Codes", "Status.Codes.NotFound"]
        );
    }
}
