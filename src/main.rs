//! panel-index CLI application
//!
//! Command-line interface for the panel-index library.

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use panel_index::{
    Context, IndexConfig, IndexStore, IntegrityGuard, Project, ProjectSource, ScriptSource,
    SearchQuery,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "panel-index")]
#[command(about = "Build, repair and search the full-text index of a comic project")]
#[command(version)]
struct Cli {
    /// Project root (the index lives in a hidden directory under it)
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    /// JSON file overriding index settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Give up after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ModelArgs {
    /// Project model (JSON)
    #[arg(short, long)]
    project: PathBuf,

    /// Script file indexed alongside the model
    #[arg(short, long)]
    script: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop and recreate the index from the project model
    Rebuild(ModelArgs),

    /// Replace all indexed documents with a fresh projection
    Update(ModelArgs),

    /// Populate the index only if it is empty
    Build(ModelArgs),

    /// Probe the index and rebuild it if it is corrupt
    Check(ModelArgs),

    /// Search the index
    Search {
        /// Search text
        query: String,

        /// First page to include
        #[arg(long)]
        from: Option<u32>,

        /// Last page to include
        #[arg(long)]
        to: Option<u32>,

        /// Number of results to return
        #[arg(short = 'k', long, default_value = "0")]
        limit: usize,

        /// Only return documents of this type (repeatable)
        #[arg(short = 't', long = "type")]
        types: Vec<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics
    Stats,

    /// List documents referencing the document at PATH
    WhereUsed {
        /// Structural path, e.g. bible:character:ALICE
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => IndexConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => IndexConfig::default(),
    };
    let ctx = match cli.timeout {
        Some(secs) => Context::with_timeout(Duration::from_secs(secs)),
        None => Context::background(),
    };
    let root = cli.root;

    match cli.command {
        Commands::Rebuild(model) => {
            let (project, script) = load_model(&model)?;
            let stats = run_blocking(&ctx, {
                let ctx = ctx.clone();
                move || {
                    let source = source_of(&project, script.as_ref());
                    IndexStore::open_with(&root, config)?.rebuild(&ctx, source)
                }
            })
            .await?;
            println!("✅ Rebuilt index: {}", stats);
        }
        Commands::Update(model) => {
            let (project, script) = load_model(&model)?;
            let stats = run_blocking(&ctx, {
                let ctx = ctx.clone();
                move || {
                    let source = source_of(&project, script.as_ref());
                    IndexStore::open_with(&root, config)?.update(&ctx, source)
                }
            })
            .await?;
            println!("✅ Updated index: {}", stats);
        }
        Commands::Build(model) => {
            let (project, script) = load_model(&model)?;
            let built = run_blocking(&ctx, {
                let ctx = ctx.clone();
                move || {
                    let source = source_of(&project, script.as_ref());
                    IndexStore::open_with(&root, config)?.build_if_empty(&ctx, source)
                }
            })
            .await?;
            match built {
                Some(stats) => println!("✅ Built index: {}", stats),
                None => println!("ℹ️  Index already populated; nothing to do"),
            }
        }
        Commands::Check(model) => {
            let (project, script) = load_model(&model)?;
            let report = run_blocking(&ctx, {
                let ctx = ctx.clone();
                move || {
                    let source = source_of(&project, script.as_ref());
                    IntegrityGuard::new(config).detect_and_rebuild(&ctx, &root, source)
                }
            })
            .await?;
            if report.rebuilt {
                println!(
                    "🔧 Index was corrupt ({}) and has been rebuilt",
                    report.reason.as_deref().unwrap_or("unknown")
                );
                if let Some(backup) = report.backup {
                    println!("   💾 Backup: {}", backup.display());
                }
            } else {
                println!("✅ Index is healthy");
            }
        }
        Commands::Search {
            query,
            from,
            to,
            limit,
            types,
            json,
        } => {
            let request = SearchQuery::new(query).pages(from, to).limit(limit).types(types);
            let hits = run_blocking(&ctx, {
                let ctx = ctx.clone();
                let request = request.clone();
                move || IndexStore::open_with(&root, config)?.search(&ctx, &request)
            })
            .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else if hits.is_empty() {
                println!("🔍 No results for '{}'", request.text);
            } else {
                println!("🔍 {} results for '{}':", hits.len(), request.text);
                for (i, hit) in hits.iter().enumerate() {
                    let page = hit
                        .page_id
                        .map(|p| format!("p{}", p))
                        .unwrap_or_else(|| "-".to_string());
                    println!("{:>3}. [{}] {} ({})", i + 1, hit.doc_type, hit.path, page);
                    println!("     {}", hit.snippet);
                }
            }
        }
        Commands::Stats => {
            let stats = run_blocking(&ctx, {
                let ctx = ctx.clone();
                move || IndexStore::open_with(&root, config)?.stats(&ctx)
            })
            .await?;
            println!("📊 {}", stats);
        }
        Commands::WhereUsed { path } => {
            let users = run_blocking(&ctx, {
                let ctx = ctx.clone();
                let path = path.clone();
                move || IndexStore::open_with(&root, config)?.where_used(&ctx, &path)
            })
            .await?;
            if users.is_empty() {
                println!("Nothing references {}", path);
            }
            for user in users {
                println!("{}", user);
            }
        }
    }

    Ok(())
}

fn load_model(args: &ModelArgs) -> Result<(Project, Option<ScriptSource>)> {
    let project = Project::from_json_file(&args.project)
        .with_context(|| format!("loading project {}", args.project.display()))?;
    let script = args
        .script
        .as_ref()
        .map(|path| {
            ScriptSource::from_file(path)
                .with_context(|| format!("reading script {}", path.display()))
        })
        .transpose()?;
    Ok((project, script))
}

fn source_of<'a>(project: &'a Project, script: Option<&'a ScriptSource>) -> ProjectSource<'a> {
    let source = ProjectSource::new(project);
    match script {
        Some(script) => source.with_script(script),
        None => source,
    }
}

/// Run index work on a blocking thread; Ctrl-C cancels it through `ctx`
async fn run_blocking<T, F>(ctx: &Context, work: F) -> Result<T>
where
    F: FnOnce() -> panel_index::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let watcher = ctx.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("⏹️  Cancelling...");
            watcher.cancel();
        }
    });

    let outcome = tokio::task::spawn_blocking(work)
        .await
        .context("index worker panicked")?;
    interrupt.abort();

    Ok(outcome?)
}
