//! Import maps: bare or prefix specifiers remapped to URLs.

use reqwest::Url;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::{DocError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportMap {
    imports: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RawImportMap {
    #[serde(default)]
    imports: BTreeMap<String, String>,
}

impl ImportMap {
    /// Parse an import map. Relative targets resolve against `base`.
    pub fn from_json(json: &str, base: &str) -> Result<Self> {
        let raw: RawImportMap = serde_json::from_str(json)
            .map_err(|e| DocError::BadRequest(format!("invalid import map: {}", e)))?;
        let base = Url::parse(base)
            .map_err(|e| DocError::BadRequest(format!("invalid import map base {}: {}", base, e)))?;

        let mut imports = BTreeMap::new();
        for (from, to) in raw.imports {
            let target = base
                .join(&to)
                .map_err(|e| DocError::BadRequest(format!("invalid import map target {}: {}", to, e)))?;
            imports.insert(from, target.to_string());
        }
        Ok(Self { imports })
    }

    pub fn insert(&mut self, from: &str, to: &str) {
        self.imports.insert(from.to_string(), to.to_string());
    }

    /// Exact matches win; otherwise the longest `/`-terminated prefix applies.
    pub fn resolve(&self, specifier: &str) -> Option<String> {
        if let Some(target) = self.imports.get(specifier) {
            return Some(target.clone());
        }
        self.imports
            .iter()
            .filter(|(from, _)| from.ends_with('/') && specifier.starts_with(from.as_str()))
            .max_by_key(|(from, _)| from.len())
            .map(|(from, to)| format!("{}{}", to, &specifier[from.len()..]))
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_prefix() {
        let map = ImportMap::from_json(
            r#"{"imports": {
                "oak": "https://deno.land/x/oak@v12.6.0/mod.ts",
                "std/": "https://deno.land/std@0.200.0/",
                "std/path/": "./vendor/path/"
            }}"#,
            "https://example.com/app/import_map.json",
        )
        .unwrap();

        assert_eq!(
            map.resolve("oak").as_deref(),
            Some("https://deno.land/x/oak@v12.6.0/mod.ts")
        );
        assert_eq!(
            map.resolve("std/fs/mod.ts").as_deref(),
            Some("https://deno.land/std@0.200.0/fs/mod.ts")
        );
        assert_eq!(
            map.resolve("std/path/mod.ts").as_deref(),
            Some("https://example.com/app/vendor/path/mod.ts")
        );
        assert_eq!(map.resolve("react"), None);
    }

    #[test]
    fn test_invalid_json_is_bad_request() {
        let err = ImportMap::from_json("{", "https://example.com/").unwrap_err();
        assert!(matches!(err, DocError::BadRequest(_)));
    }
}
