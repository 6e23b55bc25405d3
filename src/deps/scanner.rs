//! Import extraction from TypeScript and JavaScript sources via tree-sitter.
//!
//! Picks up static imports, re-exports, dynamic `import()` calls whose
//! argument is a string literal, and the `@deno-types` and
//! `/// <reference types>` comment directives.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use std::sync::OnceLock;
use tracing::debug;
use tree_sitter::{Language, Node, Parser};

use super::import_map::ImportMap;
use super::{ImportEdge, ModuleGraphBuilder};
use crate::error::{DocError, Result};
use crate::fetch::{LoadResponse, Loader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptLanguage {
    JavaScript,
    TypeScript,
    Tsx,
}

impl ScriptLanguage {
    /// Detect from the URL extension, then the content type. `None` for
    /// sources with no imports to scan, such as JSON.
    pub fn detect(response: &LoadResponse) -> Option<Self> {
        let path = Url::parse(&response.specifier)
            .map(|url| url.path().to_string())
            .unwrap_or_else(|_| response.specifier.clone());
        let ext = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        match ext {
            "ts" | "mts" | "cts" => return Some(ScriptLanguage::TypeScript),
            "tsx" => return Some(ScriptLanguage::Tsx),
            "js" | "mjs" | "cjs" | "jsx" => return Some(ScriptLanguage::JavaScript),
            "json" | "wasm" | "css" => return None,
            _ => {}
        }

        let content_type = response
            .headers
            .get("content-type")
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();
        if content_type.contains("json") {
            None
        } else if content_type.contains("javascript") || content_type.contains("jsx") {
            Some(ScriptLanguage::JavaScript)
        } else {
            Some(ScriptLanguage::TypeScript)
        }
    }

    pub fn tree_sitter_language(&self) -> Language {
        match self {
            ScriptLanguage::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            ScriptLanguage::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            ScriptLanguage::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// An import as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImport {
    pub specifier: String,
    pub type_only: bool,
    /// 1-based line of the import.
    pub line: usize,
}

/// Parse `source` and collect its import specifiers in source order.
pub fn scan_imports(source: &str, language: ScriptLanguage) -> Result<Vec<RawImport>> {
    let mut parser = Parser::new();
    parser
        .set_language(&language.tree_sitter_language())
        .map_err(|e| DocError::Assertion(format!("grammar rejected: {}", e)))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| DocError::BadRequest("source could not be parsed".to_string()))?;

    let mut imports = Vec::new();
    collect_imports(&tree.root_node(), source.as_bytes(), &mut imports);
    Ok(imports)
}

fn collect_imports(node: &Node, source: &[u8], imports: &mut Vec<RawImport>) {
    match node.kind() {
        "import_statement" | "export_statement" => {
            if let Some(src) = node.child_by_field_name("source") {
                if let Some(specifier) = string_literal(&src, source) {
                    imports.push(RawImport {
                        specifier,
                        type_only: has_type_keyword(node),
                        line: node.start_position().row + 1,
                    });
                }
            }
        }
        "call_expression" => {
            let is_dynamic_import = node
                .child_by_field_name("function")
                .is_some_and(|f| f.kind() == "import");
            if is_dynamic_import {
                let argument = node
                    .child_by_field_name("arguments")
                    .and_then(|args| args.named_child(0));
                if let Some(specifier) = argument.and_then(|arg| string_literal(&arg, source)) {
                    imports.push(RawImport {
                        specifier,
                        type_only: false,
                        line: node.start_position().row + 1,
                    });
                }
            }
        }
        "comment" => {
            if let Some(specifier) = node
                .utf8_text(source)
                .ok()
                .and_then(type_directive)
            {
                imports.push(RawImport {
                    specifier,
                    type_only: true,
                    line: node.start_position().row + 1,
                });
            }
        }
        _ => {}
    }

    let count = node.child_count();
    for i in 0..count {
        if let Some(child) = node.child(i) {
            collect_imports(&child, source, imports);
        }
    }
}

/// Specifier named by a `// @deno-types="..."` or
/// `/// <reference types="..." />` comment.
fn type_directive(comment: &str) -> Option<String> {
    static DIRECTIVES: OnceLock<[Regex; 2]> = OnceLock::new();
    let directives = DIRECTIVES.get_or_init(|| {
        [
            Regex::new(r#"^//\s*@deno-types\s*=\s*["']([^"']+)["']"#)
                .expect("deno-types pattern is valid"),
            Regex::new(r#"^///\s*<reference\s+types\s*=\s*["']([^"']+)["']"#)
                .expect("reference types pattern is valid"),
        ]
    });
    directives
        .iter()
        .find_map(|re| re.captures(comment.trim()))
        .map(|caps| caps[1].to_string())
}

/// `import type ...` / `export type ... from`.
fn has_type_keyword(node: &Node) -> bool {
    let count = node.child_count();
    for i in 0..count {
        if let Some(child) = node.child(i) {
            if child.kind() == "type" {
                return true;
            }
        }
    }
    false
}

/// Text of a string or substitution-free template literal, without quotes.
fn string_literal(node: &Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "string" => {}
        "template_string" => {
            for i in 0..node.named_child_count() {
                if node
                    .named_child(i)
                    .is_some_and(|c| c.kind() == "template_substitution")
                {
                    return None;
                }
            }
        }
        _ => return None,
    }
    let text = node.utf8_text(source).ok()?;
    Some(text.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string())
}

/// Resolve `specifier` as imported from `referrer`.
pub fn resolve_specifier(
    specifier: &str,
    referrer: &str,
    import_map: Option<&ImportMap>,
) -> std::result::Result<String, String> {
    if let Some(mapped) = import_map.and_then(|map| map.resolve(specifier)) {
        return Ok(mapped);
    }
    if specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/') {
        let base = Url::parse(referrer).map_err(|e| format!("invalid referrer \"{}\": {}", referrer, e))?;
        return base
            .join(specifier)
            .map(|url| url.to_string())
            .map_err(|e| format!("invalid specifier \"{}\": {}", specifier, e));
    }
    Url::parse(specifier).map(|url| url.to_string()).map_err(|_| {
        format!(
            "Relative import path \"{}\" not prefixed with / or ./ or ../ from \"{}\"",
            specifier, referrer
        )
    })
}

/// [`ModuleGraphBuilder`] that loads each file and scans it with tree-sitter.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImportScanner;

impl ImportScanner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModuleGraphBuilder for ImportScanner {
    async fn edges(
        &self,
        specifier: &str,
        loader: &dyn Loader,
        import_map: Option<&ImportMap>,
    ) -> Result<Vec<ImportEdge>> {
        let response = loader
            .load(specifier)
            .await?
            .ok_or_else(|| DocError::NotFound(format!("module not found: {}", specifier)))?;

        let Some(language) = ScriptLanguage::detect(&response) else {
            debug!(specifier, "no imports to scan");
            return Ok(Vec::new());
        };
        let imports = scan_imports(&response.content, language)?;
        debug!(specifier, count = imports.len(), "imports scanned");

        // Relative imports resolve against the final URL after redirects.
        let referrer = response.specifier.as_str();
        Ok(imports
            .into_iter()
            .map(|import| ImportEdge {
                resolved: resolve_specifier(&import.specifier, referrer, import_map),
                specifier: import.specifier,
                type_only: import.type_only,
            })
            .collect())
    }
}
