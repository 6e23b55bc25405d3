//! Documentation node model.
//!
//! The JSON shape follows the documentation engine's output: a node carries
//! `kind` plus a kind-specific definition field (`functionDef`,
//! `namespaceDef`, ...). Definitions the codec never inspects are kept as
//! opaque JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{DocError, Result};

/// The kind of a documentation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocNodeKind {
    ModuleDoc,
    Namespace,
    Class,
    Enum,
    Function,
    Interface,
    TypeAlias,
    Variable,
    Import,
    /// Marks a path that produced no exported symbols.
    Null,
}

impl DocNodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocNodeKind::ModuleDoc => "moduleDoc",
            DocNodeKind::Namespace => "namespace",
            DocNodeKind::Class => "class",
            DocNodeKind::Enum => "enum",
            DocNodeKind::Function => "function",
            DocNodeKind::Interface => "interface",
            DocNodeKind::TypeAlias => "typeAlias",
            DocNodeKind::Variable => "variable",
            DocNodeKind::Import => "import",
            DocNodeKind::Null => "null",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let kind = match s {
            "moduleDoc" => DocNodeKind::ModuleDoc,
            "namespace" => DocNodeKind::Namespace,
            "class" => DocNodeKind::Class,
            "enum" => DocNodeKind::Enum,
            "function" => DocNodeKind::Function,
            "interface" => DocNodeKind::Interface,
            "typeAlias" => DocNodeKind::TypeAlias,
            "variable" => DocNodeKind::Variable,
            "import" => DocNodeKind::Import,
            "null" => DocNodeKind::Null,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for DocNodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeclarationKind {
    #[default]
    Export,
    Declare,
    Private,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub filename: String,
    pub line: u32,
    pub col: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_index: Option<u32>,
    /// Engine fields not modeled above, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Value>,
}

impl JsDoc {
    /// Documentation text, if present and not blank.
    pub fn text(&self) -> Option<&str> {
        self.doc.as_deref().filter(|d| !d.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceDef {
    #[serde(default)]
    pub elements: Vec<DocNode>,
}

/// Interface members. Partial declarations of one interface are unioned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub def_name: Option<String>,
    #[serde(default)]
    pub extends: Vec<Value>,
    #[serde(default)]
    pub constructors: Vec<Value>,
    #[serde(default)]
    pub methods: Vec<Value>,
    #[serde(default)]
    pub properties: Vec<Value>,
    #[serde(default)]
    pub call_signatures: Vec<Value>,
    #[serde(default)]
    pub index_signatures: Vec<Value>,
    #[serde(default)]
    pub type_params: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DocNodeDef {
    ModuleDoc,
    Namespace {
        #[serde(rename = "namespaceDef")]
        namespace_def: NamespaceDef,
    },
    Class {
        #[serde(rename = "classDef")]
        class_def: Value,
    },
    Enum {
        #[serde(rename = "enumDef")]
        enum_def: Value,
    },
    Function {
        #[serde(rename = "functionDef")]
        function_def: Value,
    },
    Interface {
        #[serde(rename = "interfaceDef")]
        interface_def: InterfaceDef,
    },
    TypeAlias {
        #[serde(rename = "typeAliasDef")]
        type_alias_def: Value,
    },
    Variable {
        #[serde(rename = "variableDef")]
        variable_def: Value,
    },
    Import {
        #[serde(rename = "importDef")]
        import_def: Value,
    },
    Null,
}

impl DocNodeDef {
    pub fn kind(&self) -> DocNodeKind {
        match self {
            DocNodeDef::ModuleDoc => DocNodeKind::ModuleDoc,
            DocNodeDef::Namespace { .. } => DocNodeKind::Namespace,
            DocNodeDef::Class { .. } => DocNodeKind::Class,
            DocNodeDef::Enum { .. } => DocNodeKind::Enum,
            DocNodeDef::Function { .. } => DocNodeKind::Function,
            DocNodeDef::Interface { .. } => DocNodeKind::Interface,
            DocNodeDef::TypeAlias { .. } => DocNodeKind::TypeAlias,
            DocNodeDef::Variable { .. } => DocNodeKind::Variable,
            DocNodeDef::Import { .. } => DocNodeKind::Import,
            DocNodeDef::Null => DocNodeKind::Null,
        }
    }

    /// The definition payload stored as an opaque field. Namespaces,
    /// module docs and null nodes have none.
    pub fn definition(&self) -> Result<Option<Value>> {
        let value = match self {
            DocNodeDef::ModuleDoc | DocNodeDef::Namespace { .. } | DocNodeDef::Null => {
                return Ok(None)
            }
            DocNodeDef::Class { class_def } => class_def.clone(),
            DocNodeDef::Enum { enum_def } => enum_def.clone(),
            DocNodeDef::Function { function_def } => function_def.clone(),
            DocNodeDef::Interface { interface_def } => serde_json::to_value(interface_def)?,
            DocNodeDef::TypeAlias { type_alias_def } => type_alias_def.clone(),
            DocNodeDef::Variable { variable_def } => variable_def.clone(),
            DocNodeDef::Import { import_def } => import_def.clone(),
        };
        Ok(Some(value))
    }

    /// Rebuild a definition from its kind and stored payload. Namespaces
    /// come back without elements.
    pub fn from_definition(kind: DocNodeKind, definition: Option<Value>) -> Result<Self> {
        let payload = || definition.clone().unwrap_or_else(empty_object);
        let def = match kind {
            DocNodeKind::ModuleDoc => DocNodeDef::ModuleDoc,
            DocNodeKind::Null => DocNodeDef::Null,
            DocNodeKind::Namespace => DocNodeDef::Namespace {
                namespace_def: NamespaceDef::default(),
            },
            DocNodeKind::Class => DocNodeDef::Class {
                class_def: payload(),
            },
            DocNodeKind::Enum => DocNodeDef::Enum { enum_def: payload() },
            DocNodeKind::Function => DocNodeDef::Function {
                function_def: payload(),
            },
            DocNodeKind::Interface => DocNodeDef::Interface {
                interface_def: match definition.clone() {
                    Some(value) => serde_json::from_value(value)?,
                    None => InterfaceDef::default(),
                },
            },
            DocNodeKind::TypeAlias => DocNodeDef::TypeAlias {
                type_alias_def: payload(),
            },
            DocNodeKind::Variable => DocNodeDef::Variable {
                variable_def: payload(),
            },
            DocNodeKind::Import => DocNodeDef::Import {
                import_def: payload(),
            },
        };
        Ok(def)
    }

    /// The smallest valid definition of `kind`.
    pub fn placeholder(kind: DocNodeKind) -> Self {
        // An empty interface or empty object always deserializes.
        DocNodeDef::from_definition(kind, None).unwrap_or(DocNodeDef::Null)
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// One documentation entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub declaration_kind: DeclarationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js_doc: Option<JsDoc>,
    #[serde(flatten)]
    pub def: DocNodeDef,
}

impl DocNode {
    pub fn kind(&self) -> DocNodeKind {
        self.def.kind()
    }

    pub fn doc_text(&self) -> Option<&str> {
        self.js_doc.as_ref().and_then(JsDoc::text)
    }

    /// The sentinel written for a path without exported symbols.
    pub fn null() -> Self {
        Self {
            name: String::new(),
            is_default: None,
            location: Location::default(),
            declaration_kind: DeclarationKind::Private,
            js_doc: None,
            def: DocNodeDef::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.def, DocNodeDef::Null)
    }

    pub fn elements(&self) -> &[DocNode] {
        match &self.def {
            DocNodeDef::Namespace { namespace_def } => &namespace_def.elements,
            _ => &[],
        }
    }
}

/// Parse documentation engine output.
pub fn parse_doc_nodes(json: &str) -> Result<Vec<DocNode>> {
    serde_json::from_str(json).map_err(|e| DocError::BadRequest(format!("invalid doc nodes: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_engine_output() {
        let nodes = parse_doc_nodes(
            r#"[
            {
                "kind": "function",
                "name": "serve",
                "location": {"filename": "https://deno.land/x/oak@v1/mod.ts", "line": 3, "col": 0},
                "declarationKind": "export",
                "jsDoc": {"doc": "Start a server."},
                "functionDef": {"params": [], "isAsync": true}
            },
            {
                "kind": "namespace",
                "name": "Status",
                "location": {"filename": "mod.ts", "line": 9, "col": 0},
                "declarationKind": "export",
                "namespaceDef": {"elements": [
                    {"kind": "variable", "name": "OK", "location": {"filename": "mod.ts", "line": 10, "col": 2},
                     "declarationKind": "export", "variableDef": {"kind": "const"}}
                ]}
            }
        ]"#,
        )
        .unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].kind(), DocNodeKind::Function);
        assert_eq!(nodes[0].doc_text(), Some("Start a server."));
        assert_eq!(nodes[1].kind(), DocNodeKind::Namespace);
        assert_eq!(nodes[1].elements()[0].name, "OK");
    }

    #[test]
    fn test_serialize_matches_engine_shape() {
        let node = DocNode {
            name: "Options".into(),
            is_default: None,
            location: Location {
                filename: "mod.ts".into(),
                line: 1,
                col: 0,
                ..Default::default()
            },
            declaration_kind: DeclarationKind::Export,
            js_doc: None,
            def: DocNodeDef::Interface {
                interface_def: InterfaceDef::default(),
            },
        };
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["kind"], json!("interface"));
        assert_eq!(value["declarationKind"], json!("export"));
        assert!(value["interfaceDef"]["methods"].is_array());
        let back: DocNode = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_unmodeled_engine_fields_are_kept() {
        let nodes = parse_doc_nodes(
            &json!([{
                "kind": "interface",
                "name": "Opts",
                "isDefault": false,
                "location": {"filename": "mod.ts", "line": 4, "col": 0, "byteIndex": 42},
                "declarationKind": "export",
                "interfaceDef": {
                    "defName": "Opts",
                    "extends": [],
                    "constructors": [{"params": []}],
                    "methods": [],
                    "properties": [],
                    "callSignatures": [],
                    "indexSignatures": [],
                    "typeParams": [],
                    "readonly": true
                }
            }])
            .to_string(),
        )
        .unwrap();
        let node = &nodes[0];
        assert_eq!(node.is_default, Some(false));
        assert_eq!(node.location.byte_index, Some(42));
        let DocNodeDef::Interface { interface_def } = &node.def else {
            panic!("expected an interface");
        };
        assert_eq!(interface_def.def_name.as_deref(), Some("Opts"));
        assert_eq!(interface_def.constructors.len(), 1);
        assert_eq!(interface_def.extra.get("readonly"), Some(&json!(true)));
    }

    #[test]
    fn test_kind_strings_roundtrip() {
        for kind in [
            DocNodeKind::ModuleDoc,
            DocNodeKind::Namespace,
            DocNodeKind::TypeAlias,
            DocNodeKind::Null,
        ] {
            assert_eq!(DocNodeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(DocNodeKind::parse("struct"), None);
    }

    #[test]
    fn test_placeholder_is_empty() {
        assert_eq!(
            DocNodeDef::placeholder(DocNodeKind::Class),
            DocNodeDef::Class {
                class_def: json!({})
            }
        );
        assert_eq!(
            DocNodeDef::placeholder(DocNodeKind::Interface),
            DocNodeDef::Interface {
                interface_def: InterfaceDef::default()
            }
        );
    }

    #[test]
    fn test_bad_json_is_bad_request() {
        assert!(matches!(
            parse_doc_nodes("{not json"),
            Err(DocError::BadRequest(_))
        ));
    }
}
