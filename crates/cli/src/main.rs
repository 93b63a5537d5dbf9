//! codeatlas CLI.
//!
//! Thin pass-through over `codeatlas-core`'s public API: index a project,
//! run a semantic query, print the context report for a file, or print its
//! structural analysis.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codeatlas_core::config::Config;
use codeatlas_core::indexer::Indexer;
use codeatlas_core::retriever;

/// codeatlas - structural code-knowledge engine
#[derive(Parser, Debug)]
#[command(name = "codeatlas", version, about = "Structural code-knowledge engine for server-framework codebases")]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Log level.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan and index a project.
    Index {
        /// Path to the project root.
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Run a semantic query against the index.
    Query {
        /// Path to the project root.
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Natural-language or keyword query text.
        query: String,

        /// Maximum number of results.
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    /// Print the context report for the top match of a query.
    Context {
        /// Path to the project root.
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Query text to retrieve context for.
        query: String,
    },

    /// Print the structural analysis (skeleton + dependencies) of a file.
    Analyze {
        /// Path to the project root.
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// File to analyze, relative to the project root.
        file: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_env_filter(&cli.log_level).init();

    match cli.command {
        Commands::Index { path } => {
            let config = Config::load(&path).context("loading configuration")?;
            let indexer = Indexer::new(config).context("opening index")?;
            let summary = indexer.index_project().await.context("indexing project")?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Query { path, query, limit } => {
            let config = Config::load(&path).context("loading configuration")?;
            let indexer = Indexer::new(config).context("opening index")?;
            let hits = retriever::query(indexer.store(), indexer.embedder(), &query, limit)
                .await
                .context("running query")?;
            for hit in &hits {
                println!("{:.4}  {}  [{}]", hit.score, hit.chunk.file_path, hit.chunk.chunk_type.as_str());
            }
        }
        Commands::Context { path, query } => {
            let config = Config::load(&path).context("loading configuration")?;
            let indexer = Indexer::new(config).context("opening index")?;
            let report = retriever::context_report(indexer.store(), indexer.embedder(), &query)
                .await
                .context("building context report")?;
            println!("{report}");
        }
        Commands::Analyze { path, file } => {
            let config = Config::load(&path).context("loading configuration")?;
            let indexer = Indexer::new(config).context("opening index")?;
            let skeleton_report = retriever::analyze_structure(indexer.store(), &file).context("analyzing file")?;
            println!("{skeleton_report}");

            let outbound = codeatlas_core::graph::outbound(indexer.store(), &file).context("listing dependencies")?;
            println!("dependencies:");
            for link in &outbound {
                println!("  -> {} ({})", link.other, link.relation.as_str());
            }

            let inbound = codeatlas_core::graph::inbound(indexer.store(), &file).context("listing dependents")?;
            println!("dependents:");
            for link in &inbound {
                println!("  <- {} ({})", link.other, link.relation.as_str());
            }
        }
    }

    Ok(())
}
