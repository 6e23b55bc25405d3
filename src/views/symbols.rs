//! Version-wide symbol index, the source of search uploads.

use serde::{Deserialize, Serialize};

use crate::doc::{qualified_symbols, DeclarationKind, DocNode, DocNodeKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolItem {
    pub path: String,
    /// Namespace-qualified name.
    pub name: String,
    pub kind: DocNodeKind,
    pub declaration_kind: DeclarationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolIndex {
    pub module: String,
    pub version: String,
    pub items: Vec<SymbolItem>,
}

impl SymbolIndex {
    pub fn new(module: &str, version: &str) -> Self {
        Self {
            module: module.to_string(),
            version: version.to_string(),
            items: Vec::new(),
        }
    }

    /// Add every symbol of one entry. Overloads are kept as separate items.
    pub fn add_entry(&mut self, path: &str, nodes: &[DocNode]) {
        for (name, node) in qualified_symbols(nodes) {
            self.items.push(SymbolItem {
                path: path.to_string(),
                name,
                kind: node.kind(),
                declaration_kind: node.declaration_kind,
                doc: node.doc_text().and_then(doc_summary),
            });
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// First paragraph of a doc comment, lines joined with spaces.
pub fn doc_summary(doc: &str) -> Option<String> {
    let normalized = doc.replace("\r\n", "\n");
    let paragraph = normalized
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty())?;
    Some(
        paragraph
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    )
}
