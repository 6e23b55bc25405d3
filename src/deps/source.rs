//! Classifying specifiers by hosting source.
//!
//! Each known host is a regex with named groups `org`, `pkg` and `ver`.
//! The first matching pattern wins; anything else is `other`.

use regex::Regex;
use std::sync::OnceLock;

use super::DependencyKey;
use crate::config::AnalysisConfig;

/// Label for specifiers that match no known host.
pub const OTHER_SOURCE: &str = "other";

struct SourcePattern {
    source: &'static str,
    regex: Regex,
    /// Package name for hosts that serve a single package.
    fixed_pkg: Option<&'static str>,
}

const CATALOG: &[(&str, &str, Option<&str>)] = &[
    (
        "deno.land/std",
        r"^https?://deno\.land/std(?:@(?P<ver>[^/]+))?/",
        Some("std"),
    ),
    (
        "deno.land/x",
        r"^https?://deno\.land/x/(?P<pkg>[^/@]+)(?:@(?P<ver>[^/]+))?/",
        None,
    ),
    (
        "esm.sh",
        r"^https?://esm\.sh/(?:v\d+/|stable/)*(?:(?P<org>@[^/@]+)/)?(?P<pkg>[^/@?]+)(?:@(?P<ver>[^/?]+))?",
        None,
    ),
    (
        "skypack",
        r"^https?://cdn\.skypack\.dev/(?:-/)?(?:(?P<org>@[^/@]+)/)?(?P<pkg>[^/@?]+)(?:@(?P<ver>[^/?,]+))?",
        None,
    ),
    (
        "unpkg",
        r"^https?://unpkg\.com/(?:(?P<org>@[^/@]+)/)?(?P<pkg>[^/@?]+)(?:@(?P<ver>[^/?]+))?",
        None,
    ),
    (
        "jsdelivr",
        r"^https?://cdn\.jsdelivr\.net/npm/(?:(?P<org>@[^/@]+)/)?(?P<pkg>[^/@]+)(?:@(?P<ver>[^/]+))?",
        None,
    ),
    (
        "jsdelivr/gh",
        r"^https?://cdn\.jsdelivr\.net/gh/(?P<org>[^/]+)/(?P<pkg>[^/@]+)(?:@(?P<ver>[^/]+))?",
        None,
    ),
    (
        "github",
        r"^https?://raw\.githubusercontent\.com/(?P<org>[^/]+)/(?P<pkg>[^/]+)/(?P<ver>[^/]+)/",
        None,
    ),
    (
        "nest.land",
        r"^https?://x\.nest\.land/(?P<pkg>[^/@]+)@(?P<ver>[^/]+)/",
        None,
    ),
    (
        "npm",
        r"^npm:/?(?:(?P<org>@[^/@]+)/)?(?P<pkg>[^/@]+)(?:@(?P<ver>[^/]+))?",
        None,
    ),
    (
        "jsr",
        r"^jsr:/?(?P<org>@[^/@]+)/(?P<pkg>[^/@]+)(?:@(?P<ver>[^/]+))?",
        None,
    ),
    ("node", r"^node:(?P<pkg>[^/]+)", None),
];

fn catalog() -> &'static [SourcePattern] {
    static PATTERNS: OnceLock<Vec<SourcePattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        CATALOG
            .iter()
            .map(|(source, pattern, fixed_pkg)| SourcePattern {
                source,
                regex: Regex::new(pattern).expect("source catalog patterns are valid"),
                fixed_pkg: *fixed_pkg,
            })
            .collect()
    })
}

/// Classify a resolved specifier into a dependency key.
pub fn classify(specifier: &str) -> DependencyKey {
    for pattern in catalog() {
        let Some(caps) = pattern.regex.captures(specifier) else {
            continue;
        };
        let group = |name: &str| caps.name(name).map(|m| m.as_str().to_string());
        let pkg = match pattern.fixed_pkg {
            Some(pkg) => pkg.to_string(),
            None => group("pkg").unwrap_or_default(),
        };
        return DependencyKey {
            source: pattern.source.to_string(),
            org: group("org"),
            pkg,
            version: group("ver"),
        };
    }

    let host = reqwest::Url::parse(specifier)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string));
    DependencyKey {
        source: OTHER_SOURCE.to_string(),
        org: None,
        pkg: host.unwrap_or_else(|| specifier.to_string()),
        version: None,
    }
}

/// The URL prefix that addresses files of one published module version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleScope {
    prefix: String,
}

impl ModuleScope {
    pub fn new(config: &AnalysisConfig, module: &str, version: &str) -> Self {
        let prefix = if module == "std" {
            format!("{}@{}/", config.std_base.trim_end_matches('/'), version)
        } else {
            format!(
                "{}/{}@{}/",
                config.registry_base.trim_end_matches('/'),
                module,
                version
            )
        };
        Self { prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// True when `specifier` addresses a file inside this module version.
    pub fn contains(&self, specifier: &str) -> bool {
        specifier.starts_with(&self.prefix)
    }

    /// Full specifier of an entry path such as `/mod.ts`.
    pub fn specifier_for(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path.trim_start_matches('/'))
    }

    /// Entry path of a specifier inside this scope.
    pub fn path_of(&self, specifier: &str) -> Option<String> {
        specifier
            .strip_prefix(&self.prefix)
            .map(|rest| format!("/{}", rest))
    }
}
