//! Derived views computed from documentation trees and entry listings.
//!
//! A view is cached as a single record whose `value` property holds the
//! view's JSON. Views too large for one record are served but not cached.

pub mod completions;
pub mod nav;
pub mod symbols;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

pub use completions::{DirCompletion, PathCompletions};
pub use nav::{NavIndex, NavItem};
pub use symbols::{doc_summary, SymbolIndex, SymbolItem};

use crate::error::{DocError, Result};
use crate::store::{kinds, version_key, Entity, Key};

const VALUE_FIELD: &str = "value";
/// Id of views stored once per version.
const VERSION_VIEW_ID: &str = "index";

pub fn nav_index_key(module: &str, version: &str, path: &str) -> Key {
    version_key(module, version).child(kinds::NAV_INDEX, path)
}

pub fn symbol_index_key(module: &str, version: &str) -> Key {
    version_key(module, version).child(kinds::SYMBOL_INDEX, VERSION_VIEW_ID)
}

pub fn path_completions_key(module: &str, version: &str) -> Key {
    version_key(module, version).child(kinds::PATH_COMPLETIONS, VERSION_VIEW_ID)
}

/// Record for a view, or `None` when it would exceed `max_entity_size`.
pub fn view_record<T: Serialize>(key: Key, view: &T, max_entity_size: usize) -> Result<Option<Entity>> {
    let value = serde_json::to_string(view)?;
    let entity = Entity::new(key)
        .with(VALUE_FIELD, value)
        .with("generated_at", chrono::Utc::now().to_rfc3339());
    let size = entity.estimated_size();
    if size > max_entity_size {
        warn!(
            key = %entity.key,
            size,
            limit = max_entity_size,
            "view too large to persist"
        );
        return Ok(None);
    }
    Ok(Some(entity))
}

pub fn read_view<T: DeserializeOwned>(entity: &Entity) -> Result<T> {
    let value = entity.get_str(VALUE_FIELD).ok_or_else(|| {
        DocError::Assertion(format!("view record {} has no value", entity.key))
    })?;
    Ok(serde_json::from_str(value)?)
}
