//! Docstore CLI - offline access to the codec and the dependency analyzer.
//!
//! Usage:
//!   docstore deps <root>... --module M --version V   # Analyze dependencies
//!   docstore encode <nodes.json> --module M --version V --path P
//!   docstore decode <records.json> --module M --version V --path P

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use docstore::deps::{DependencyAnalyzer, ImportMap, ImportScanner, ModuleScope};
use docstore::doc::{merge, parse_doc_nodes, DocCodec};
use docstore::fetch::{CachingLoader, FetchCache, HttpFetcher};
use docstore::store::{entry_key, validate_path, Entity};
use docstore::DocConfig;

#[derive(Parser)]
#[command(name = "docstore")]
#[command(about = "Docstore - documentation storage for a module registry", long_about = None)]
struct Cli {
    /// Config file (TOML). Defaults apply when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a module version's imports and print its external dependencies
    Deps {
        /// Root specifiers, absolute URLs or entry paths such as /mod.ts
        #[arg(required = true)]
        roots: Vec<String>,

        #[arg(long)]
        module: String,

        #[arg(long)]
        version: String,

        /// Import map applied while resolving
        #[arg(long)]
        import_map: Option<PathBuf>,
    },

    /// Encode documentation nodes into store records
    Encode {
        input: PathBuf,

        #[arg(long)]
        module: String,

        #[arg(long)]
        version: String,

        #[arg(long)]
        path: String,
    },

    /// Decode store records back into merged documentation nodes
    Decode {
        input: PathBuf,

        #[arg(long)]
        module: String,

        #[arg(long)]
        version: String,

        #[arg(long)]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = match &cli.config {
        Some(path) => DocConfig::try_load(path),
        None => Ok(DocConfig::default()),
    };
    let level = match &loaded {
        Ok(config) => config.log.level.clone(),
        Err(_) => DocConfig::default().log.level,
    };

    // Logs go to stderr; stdout carries JSON output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .init();

    let config = loaded.unwrap_or_else(|e| {
        warn!(error = %e, "invalid config, using defaults");
        DocConfig::default()
    });

    match cli.command {
        Commands::Deps {
            roots,
            module,
            version,
            import_map,
        } => cmd_deps(&config, roots, &module, &version, import_map.as_deref()).await,
        Commands::Encode {
            input,
            module,
            version,
            path,
        } => cmd_encode(&config, &input, &module, &version, &path),
        Commands::Decode {
            input,
            module,
            version,
            path,
        } => cmd_decode(&config, &input, &module, &version, &path),
    }
}

async fn cmd_deps(
    config: &DocConfig,
    roots: Vec<String>,
    module: &str,
    version: &str,
    import_map: Option<&Path>,
) -> Result<()> {
    let scope = ModuleScope::new(&config.analysis, module, version);
    let roots: Vec<String> = roots
        .into_iter()
        .map(|root| {
            if root.starts_with('/') {
                scope.specifier_for(&root)
            } else {
                root
            }
        })
        .collect();

    let import_map = match import_map {
        Some(path) => Some(load_import_map(path)?),
        None => None,
    };

    let fetcher = HttpFetcher::new(&config.fetch)?;
    let loader = CachingLoader::new(fetcher, FetchCache::new(config.cache.max_bytes));
    let scanner = ImportScanner::new();

    info!(module, version, roots = roots.len(), "analyzing dependencies");
    let graph = DependencyAnalyzer::new(&scanner, &loader)
        .with_import_map(import_map.as_ref())
        .analyze(&scope, &roots)
        .await?;

    let output = json!({
        "module": module,
        "version": version,
        "dependencies": graph.dependencies(),
        "errors": graph.errors(),
        "stats": graph.stats(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_import_map(path: &Path) -> Result<ImportMap> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading import map {}", path.display()))?;
    let absolute = std::fs::canonicalize(path)
        .with_context(|| format!("resolving import map {}", path.display()))?;
    let base = reqwest::Url::from_file_path(&absolute)
        .map_err(|_| anyhow::anyhow!("import map path {} is not absolute", absolute.display()))?;
    Ok(ImportMap::from_json(&text, base.as_str())?)
}

fn cmd_encode(config: &DocConfig, input: &Path, module: &str, version: &str, path: &str) -> Result<()> {
    validate_path(path)?;
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let nodes = parse_doc_nodes(&text)?;
    let records = DocCodec::from_config(config).encode(&nodes, &entry_key(module, version, path))?;
    info!(nodes = nodes.len(), records = records.len(), "encoded");
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn cmd_decode(config: &DocConfig, input: &Path, module: &str, version: &str, path: &str) -> Result<()> {
    validate_path(path)?;
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let records: Vec<Entity> =
        serde_json::from_str(&text).with_context(|| format!("parsing records in {}", input.display()))?;
    let nodes = merge(DocCodec::from_config(config).decode(&records, &entry_key(module, version, path))?);
    println!("{}", serde_json::to_string_pretty(&nodes)?);
    Ok(())
}
