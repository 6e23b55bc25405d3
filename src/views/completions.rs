//! Directory listings used for path completion.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::store::{EntryKind, ModuleEntry};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirCompletion {
    pub path: String,
    pub dirs: Vec<String>,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCompletions {
    pub module: String,
    pub version: String,
    /// Sorted by path; the root `/` is always present.
    pub directories: Vec<DirCompletion>,
}

#[derive(Default)]
struct Children {
    dirs: BTreeSet<String>,
    files: BTreeSet<String>,
}

impl PathCompletions {
    /// Child names of every directory. Parents missing from `entries` are implied.
    pub fn build(module: &str, version: &str, entries: &[ModuleEntry]) -> Self {
        let mut tree: BTreeMap<String, Children> = BTreeMap::new();
        tree.entry("/".to_string()).or_default();

        for entry in entries {
            if entry.path == "/" {
                continue;
            }
            if entry.kind == EntryKind::Dir {
                tree.entry(entry.path.clone()).or_default();
            }
            let mut child = entry.path.as_str();
            let mut child_is_dir = entry.kind == EntryKind::Dir;
            while let Some((parent, name)) = split_parent(child) {
                let children = tree.entry(parent.to_string()).or_default();
                if child_is_dir {
                    children.dirs.insert(name.to_string());
                } else {
                    children.files.insert(name.to_string());
                }
                if parent == "/" {
                    break;
                }
                child = parent;
                child_is_dir = true;
            }
        }

        let directories = tree
            .into_iter()
            .map(|(path, children)| DirCompletion {
                path,
                dirs: children.dirs.into_iter().collect(),
                files: children.files.into_iter().collect(),
            })
            .collect();

        Self {
            module: module.to_string(),
            version: version.to_string(),
            directories,
        }
    }

    pub fn completions_for(&self, dir: &str) -> Option<&DirCompletion> {
        self.directories
            .binary_search_by(|d| d.path.as_str().cmp(dir))
            .ok()
            .map(|idx| &self.directories[idx])
    }
}

/// `/a/b.ts` -> (`/a`, `b.ts`); `/a` -> (`/`, `a`).
fn split_parent(path: &str) -> Option<(&str, &str)> {
    let (parent, name) = path.rsplit_once('/')?;
    if name.is_empty() {
        return None;
    }
    Some((if parent.is_empty() { "/" } else { parent }, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_tree() {
        let entries = vec![
            ModuleEntry::dir("/"),
            ModuleEntry::file("/mod.ts", 1),
            ModuleEntry::file("/README.md", 1),
            ModuleEntry::dir("/src"),
            ModuleEntry::file("/src/server.ts", 1),
            ModuleEntry::file("/src/util/strings.ts", 1),
            ModuleEntry::dir("/empty"),
        ];
        let completions = PathCompletions::build("oak", "v1", &entries);

        let paths: Vec<&str> = completions
            .directories
            .iter()
            .map(|d| d.path.as_str())
            .collect();
        assert_eq!(paths, vec!["/", "/empty", "/src", "/src/util"]);

        let root = completions.completions_for("/").unwrap();
        assert_eq!(root.dirs, vec!["empty", "src"]);
        assert_eq!(root.files, vec!["README.md", "mod.ts"]);

        let src = completions.completions_for("/src").unwrap();
        assert_eq!(src.dirs, vec!["util"]);
        assert_eq!(src.files, vec!["server.ts"]);

        assert!(completions.completions_for("/empty").unwrap().files.is_empty());
        assert!(completions.completions_for("/missing").is_none());
    }

    #[test]
    fn test_split_parent() {
        assert_eq!(split_parent("/a/b.ts"), Some(("/a", "b.ts")));
        assert_eq!(split_parent("/a"), Some(("/", "a")));
        assert_eq!(split_parent("/"), None);
    }
}
