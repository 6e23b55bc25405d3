use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::config::DocConfig;
use crate::deps::{ImportScanner, ANALYSIS_MARKER};
use crate::doc::{parse_doc_nodes, DocNodeKind};
use crate::fetch::MemoryFetcher;
use crate::search::MemorySearchIndex;
use crate::store::{kinds, MemoryStore};

const MODULE: &str = "oak";
const VERSION: &str = "v1.0.0";
const BASE: &str = "https://deno.land/x/oak@v1.0.0";

struct Harness {
    registry: Registry,
    store: Arc<MemoryStore>,
    search: Arc<MemorySearchIndex>,
    extractor: Arc<MemoryExtractor>,
}

fn mod_docs() -> Vec<DocNode> {
    parse_doc_nodes(
        &json!([
            {"kind": "moduleDoc", "name": "", "jsDoc": {"doc": "A middleware framework."}},
            {"kind": "function", "name": "serve", "jsDoc": {"doc": "Serve requests.\n\nDetails."}, "functionDef": {}},
            {"kind": "namespace", "name": "Status", "namespaceDef": {"elements": [
                {"kind": "variable", "name": "OK", "variableDef": {}}
            ]}},
            {"kind": "namespace", "name": "Status", "jsDoc": {"doc": "HTTP status codes."}, "namespaceDef": {"elements": [
                {"kind": "variable", "name": "NotFound", "variableDef": {}}
            ]}}
        ])
        .to_string(),
    )
    .unwrap()
}

fn server_docs() -> Vec<DocNode> {
    parse_doc_nodes(
        &json!([
            {"kind": "class", "name": "Server", "classDef": {}},
            {"kind": "function", "name": "listen", "functionDef": {}},
            {"kind": "function", "name": "listen", "functionDef": {"params": [{"name": "port"}]}}
        ])
        .to_string(),
    )
    .unwrap()
}

fn entries() -> Vec<ModuleEntry> {
    vec![
        ModuleEntry::dir("/"),
        ModuleEntry::file("/mod.ts", 120),
        ModuleEntry::file("/README.md", 40),
        ModuleEntry::dir("/src"),
        ModuleEntry::file("/src/server.ts", 300),
    ]
}

fn harness(config: DocConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let search = Arc::new(MemorySearchIndex::new());
    let extractor = Arc::new(
        MemoryExtractor::new()
            .with_nodes(&format!("{}/mod.ts", BASE), mod_docs())
            .with_nodes(&format!("{}/src/server.ts", BASE), server_docs()),
    );
    let fetcher = MemoryFetcher::new()
        .with_source(
            &format!("{}/mod.ts", BASE),
            "export * from './src/server.ts';\nimport { join } from 'https://deno.land/std@0.200.0/path/mod.ts';\n",
        )
        .with_source(
            &format!("{}/src/server.ts", BASE),
            "import { h } from 'https://esm.sh/preact@10.5.13';\nimport '../mod.ts';\n",
        );

    let (services, receiver) = Services::new(
        config,
        store.clone(),
        search.clone(),
        extractor.clone(),
        Arc::new(ImportScanner::new()),
        Arc::new(fetcher),
    );
    Harness {
        registry: Registry::start(services, receiver),
        store,
        search,
        extractor,
    }
}

async fn registered() -> Harness {
    let h = harness(DocConfig::default());
    h.registry
        .register_version(MODULE, VERSION, &entries())
        .unwrap();
    h.registry.wait_idle().await;
    h
}

fn count_kind(store: &MemoryStore, kind: &str) -> usize {
    store
        .snapshot()
        .iter()
        .filter(|e| e.key.kind() == kind)
        .count()
}

#[tokio::test]
async fn test_register_version_writes_records() {
    let h = registered().await;
    assert!(h.store.get(&module_key(MODULE)).is_some());
    assert!(h.store.get(&version_key(MODULE, VERSION)).is_some());
    assert_eq!(count_kind(&h.store, kinds::MODULE_ENTRY), 5);
}

#[tokio::test]
async fn test_register_version_rejects_bad_paths() {
    let h = harness(DocConfig::default());
    let err = h
        .registry
        .register_version(MODULE, VERSION, &[ModuleEntry::file("mod.ts", 1)])
        .unwrap_err();
    assert!(matches!(err, DocError::BadRequest(_)));
}

#[tokio::test]
async fn test_doc_nodes_generated_once_then_read_back() {
    let h = registered().await;

    let first = h.registry.doc_nodes(MODULE, VERSION, "/mod.ts").await.unwrap();
    // The two Status declarations come back merged.
    assert_eq!(first.len(), 3);
    assert_eq!(first[2].elements().len(), 2);
    assert_eq!(h.extractor.calls(), 1);

    h.registry.wait_idle().await;
    assert_eq!(count_kind(&h.store, kinds::DOC_NODE), 6);

    let second = h.registry.doc_nodes(MODULE, VERSION, "/mod.ts").await.unwrap();
    assert_eq!(second, first);
    assert_eq!(h.extractor.calls(), 1);
}

#[tokio::test]
async fn test_doc_nodes_request_errors() {
    let h = registered().await;

    let missing = h.registry.doc_nodes(MODULE, VERSION, "/nope.ts").await;
    assert!(matches!(missing, Err(DocError::NotFound(_))));

    let dir = h.registry.doc_nodes(MODULE, VERSION, "/src").await;
    assert!(matches!(dir, Err(DocError::BadRequest(_))));

    let malformed = h.registry.doc_nodes(MODULE, VERSION, "/src/../mod.ts").await;
    assert!(matches!(malformed, Err(DocError::BadRequest(_))));
    assert_eq!(h.extractor.calls(), 0);
}

#[tokio::test]
async fn test_symbol_lookup() {
    let h = registered().await;

    let ok = h
        .registry
        .symbol(MODULE, VERSION, "/mod.ts", "Status.NotFound")
        .await
        .unwrap();
    assert_eq!(ok.len(), 1);
    assert_eq!(ok[0].kind(), DocNodeKind::Variable);

    let overloads = h
        .registry
        .symbol(MODULE, VERSION, "/src/server.ts", "listen")
        .await
        .unwrap();
    assert_eq!(overloads.len(), 2);

    let missing = h.registry.symbol(MODULE, VERSION, "/mod.ts", "Nope").await;
    assert!(matches!(missing, Err(DocError::NotFound(_))));
}

#[tokio::test]
async fn test_nav_index_is_cached() {
    let h = registered().await;

    let nav = h.registry.nav_index(MODULE, VERSION, "/mod.ts").await.unwrap();
    let names: Vec<&str> = nav.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Status", "serve", "Status.NotFound", "Status.OK"]);

    h.registry.wait_idle().await;
    assert!(h.store.get(&nav_index_key(MODULE, VERSION, "/mod.ts")).is_some());

    let again = h.registry.nav_index(MODULE, VERSION, "/mod.ts").await.unwrap();
    assert_eq!(again, nav);
    assert_eq!(h.extractor.calls(), 1);
}

#[tokio::test]
async fn test_path_completions() {
    let h = registered().await;
    let completions = h.registry.path_completions(MODULE, VERSION).await.unwrap();
    let root = completions.completions_for("/").unwrap();
    assert_eq!(root.dirs, vec!["src"]);
    assert_eq!(root.files, vec!["README.md", "mod.ts"]);

    let unknown = h.registry.path_completions(MODULE, "v9.9.9").await;
    assert!(matches!(unknown, Err(DocError::NotFound(_))));
}

#[tokio::test]
async fn test_load_module_documents_every_file() {
    let h = registered().await;
    h.registry
        .enqueue(Task::LoadModule {
            module: MODULE.into(),
            version: VERSION.into(),
        })
        .unwrap();
    h.registry.wait_idle().await;

    assert_eq!(h.extractor.calls(), 2);
    assert!(h.store.get(&path_completions_key(MODULE, VERSION)).is_some());

    let index = h.registry.symbol_index(MODULE, VERSION).await.unwrap();
    let paths: Vec<&str> = index.items.iter().map(|i| i.path.as_str()).collect();
    assert_eq!(paths.iter().filter(|p| **p == "/mod.ts").count(), 4);
    assert_eq!(paths.iter().filter(|p| **p == "/src/server.ts").count(), 3);
    let serve = index.items.iter().find(|i| i.name == "serve").unwrap();
    assert_eq!(serve.doc.as_deref(), Some("Serve requests."));

    // A second load finds everything documented.
    h.registry
        .enqueue(Task::LoadModule {
            module: MODULE.into(),
            version: VERSION.into(),
        })
        .unwrap();
    h.registry.wait_idle().await;
    assert_eq!(h.extractor.calls(), 2);
}

#[tokio::test]
async fn test_load_module_skips_large_versions() {
    let mut config = DocConfig::default();
    config.jobs.max_modules_to_document = 1;
    let h = harness(config);
    h.registry
        .register_version(MODULE, VERSION, &entries())
        .unwrap();
    h.registry
        .enqueue(Task::LoadModule {
            module: MODULE.into(),
            version: VERSION.into(),
        })
        .unwrap();
    h.registry.wait_idle().await;

    assert_eq!(h.extractor.calls(), 0);
    assert_eq!(count_kind(&h.store, kinds::DOC_NODE), 0);
    assert_eq!(h.registry.services().queue.stats().failed, 0);
}

#[tokio::test]
async fn test_upload_to_search_dedups_unless_forced() {
    let h = registered().await;
    let upload = |force| Task::UploadToSearch {
        module: MODULE.into(),
        version: VERSION.into(),
        force,
    };
    h.registry
        .enqueue(Task::LoadModule {
            module: MODULE.into(),
            version: VERSION.into(),
        })
        .unwrap();
    h.registry.enqueue(upload(false)).unwrap();
    h.registry.wait_idle().await;

    assert_eq!(h.search.upsert_calls(), 1);
    assert_eq!(h.search.len(), 7);
    assert!(h.search.get("oak@v1.0.0:/src/server.ts:listen:1").is_some());
    let version = h.store.get(&version_key(MODULE, VERSION)).unwrap();
    assert!(version.get_str(SEARCH_UPLOADED_AT).is_some());

    h.registry.enqueue(upload(false)).unwrap();
    h.registry.wait_idle().await;
    assert_eq!(h.search.upsert_calls(), 1);

    h.registry.enqueue(upload(true)).unwrap();
    h.registry.wait_idle().await;
    assert_eq!(h.search.upsert_calls(), 2);
    assert_eq!(h.search.len(), 7);
}

#[tokio::test]
async fn test_analyze_dependencies_records_and_marks() {
    let h = registered().await;
    let stale = version_key(MODULE, VERSION).child(kinds::MODULE_DEPENDENCY, "npm::left-pad:1.0.0");
    h.registry
        .enqueue(Task::commit("stale", vec![Mutation::Upsert(Entity::new(stale.clone()))]))
        .unwrap();
    let analyze = |force| Task::AnalyzeDependencies {
        module: MODULE.into(),
        version: VERSION.into(),
        force,
    };
    h.registry.enqueue(analyze(false)).unwrap();
    h.registry.wait_idle().await;

    assert!(h.store.get(&stale).is_none());
    let deps: Vec<crate::deps::Dependency> = h
        .store
        .snapshot()
        .iter()
        .filter(|e| e.key.kind() == kinds::MODULE_DEPENDENCY)
        .map(|e| e.deserialize().unwrap())
        .collect();
    assert_eq!(deps.len(), 2);
    let std = deps.iter().find(|d| d.key.source == "deno.land/std").unwrap();
    assert_eq!(std.key.version.as_deref(), Some("0.200.0"));
    assert_eq!(std.dependents.iter().collect::<Vec<_>>(), vec!["/mod.ts"]);
    let preact = deps.iter().find(|d| d.key.pkg == "preact").unwrap();
    assert_eq!(preact.dependents.iter().collect::<Vec<_>>(), vec!["/src/server.ts"]);

    let version = h.store.get(&version_key(MODULE, VERSION)).unwrap();
    assert_eq!(version.get_str(ANALYSIS_MARKER), Some("1"));
    let analyzed_at = version.get_str("analyzed_at").map(str::to_string);

    // Matching marker: skipped.
    h.registry.enqueue(analyze(false)).unwrap();
    h.registry.wait_idle().await;
    let version = h.store.get(&version_key(MODULE, VERSION)).unwrap();
    assert_eq!(version.get_str("analyzed_at").map(str::to_string), analyzed_at);
}

#[tokio::test]
async fn test_failed_jobs_do_not_stall_the_queue() {
    let h = registered().await;
    h.registry
        .enqueue(Task::UploadToSearch {
            module: "missing".into(),
            version: "v0".into(),
            force: true,
        })
        .unwrap();
    h.registry
        .enqueue(Task::RegenerateNavIndex {
            module: MODULE.into(),
            version: VERSION.into(),
            path: "/mod.ts".into(),
        })
        .unwrap();
    h.registry.wait_idle().await;

    let stats = h.registry.services().queue.stats();
    assert_eq!(stats.failed, 1);
    assert!(h.store.get(&nav_index_key(MODULE, VERSION, "/mod.ts")).is_some());
}
