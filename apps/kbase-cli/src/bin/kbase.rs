use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kbase_cli::{collect_inputs, file_report};
use kbase_core::config::Config;
use kbase_engine::{connect, DynEngine, EngineStatus};

/// Ingest documents into a namespaced knowledge base and query it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest a PDF or text file, or every supported file under a directory
    Ingest {
        path: PathBuf,
        /// Target namespace (defaults to the configured default namespace)
        #[arg(short, long)]
        namespace: Option<String>,
        /// Source label stored with each chunk (defaults to the file name)
        #[arg(short, long)]
        source: Option<String>,
    },
    /// Return the passages most similar to a query
    Search {
        query: String,
        /// Number of passages to return
        #[arg(short)]
        k: Option<usize>,
        #[arg(short, long)]
        namespace: Option<String>,
        /// Print the retrieval as JSON
        #[arg(long)]
        json: bool,
    },
    /// List namespaces that hold data
    Namespaces,
    /// Wipe every namespace and restore the sample document
    Reset,
    /// Show whether the engine is ready or disabled
    Status,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let settings = Config::load()?.settings()?;
    let default_k = settings.search.default_k;
    let engine = connect(&settings).context("starting retrieval engine")?;

    match args.command {
        Commands::Ingest { path, namespace, source } => ingest(&engine, &path, namespace.as_deref(), source.as_deref()),
        Commands::Search { query, k, namespace, json } => {
            let retrieval = engine.search(&query, k.unwrap_or(default_k), namespace.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&retrieval)?);
                return Ok(());
            }
            if retrieval.is_empty() {
                println!("{}", kbase_core::types::NO_CONTEXT);
                return Ok(());
            }
            for (rank, p) in retrieval.passages.iter().enumerate() {
                println!("{}. [{:.3}] {}", rank + 1, p.score, p.source);
                println!("   {}", p.text.replace('\n', " "));
            }
            println!("\nSources: {}", retrieval.sources().join(", "));
            Ok(())
        }
        Commands::Namespaces => {
            for ns in engine.list_namespaces() {
                println!("{ns}");
            }
            Ok(())
        }
        Commands::Reset => {
            let report = engine.reset_index()?;
            for ns in &report.cleared {
                println!("cleared {ns}");
            }
            for (ns, reason) in &report.failed {
                println!("failed  {ns}: {reason}");
            }
            if let Some(reason) = &report.listing_error {
                println!("could not list namespaces ({reason}); only {} was cleared", engine.default_namespace());
            }
            match report.sample_chunks {
                Some(n) => println!("restored {n} sample chunks into {}", engine.default_namespace()),
                None => println!("sample document not found; {} left empty", engine.default_namespace()),
            }
            if !report.succeeded() {
                bail!("reset completed with errors");
            }
            Ok(())
        }
        Commands::Status => {
            println!("{}", engine.status());
            Ok(())
        }
    }
}

fn ingest(engine: &DynEngine, path: &Path, namespace: Option<&str>, source: Option<&str>) -> Result<()> {
    if let EngineStatus::Disabled { reason } = engine.status() {
        bail!("retrieval engine is disabled: {reason}");
    }
    let files = collect_inputs(path);
    if files.is_empty() {
        bail!("no ingestible files under {}", path.display());
    }
    // a label only makes sense for a single file
    let source = if files.len() == 1 { source } else { None };

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );
    let mut chunks = 0usize;
    let mut failed = 0usize;
    for file in &files {
        pb.set_message(file.display().to_string());
        match engine.ingest(file, namespace, source) {
            Ok(n) => {
                chunks += n;
                pb.println(file_report(file, n));
            }
            Err(e) => {
                failed += 1;
                let kind = e.ingest_kind().map(|k| k.to_string()).unwrap_or_else(|| "error".to_string());
                pb.suspend(|| error!(file = %file.display(), %kind, error = %e, "ingest failed"));
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    info!(files = files.len(), failed, chunks, "ingest finished");
    println!("Ingested {} of {} files ({chunks} chunks)", files.len() - failed, files.len());
    if failed > 0 {
        bail!("{failed} file(s) failed to ingest");
    }
    Ok(())
}
