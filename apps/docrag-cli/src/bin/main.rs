//! `docrag`: build and query the hybrid document index from the command line.
//!
//! ```bash
//! docrag index              # load or build the index under data.persist_dir
//! docrag index --rebuild    # re-embed everything
//! docrag query "server platform" -k 3 --rerank
//! docrag status
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use docrag_core::config::Config;
use docrag_hybrid::{initialize, render_hits, IndexState};

#[derive(Parser)]
#[command(name = "docrag", version, about = "Hybrid (semantic + BM25) document retrieval")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest the docs directory and make sure the semantic index exists
    Index {
        /// Ignore any persisted index and re-embed every chunk
        #[arg(long)]
        rebuild: bool,
    },
    /// Run a hybrid query against the index
    Query {
        text: String,
        /// Number of results (default: retrieval.k)
        #[arg(short, long)]
        k: Option<usize>,
        /// Apply the configured rerank stage
        #[arg(long)]
        rerank: bool,
        /// Print hits as JSON instead of plain text
        #[arg(long)]
        json: bool,
    },
    /// Report where documents and the index live and whether the index is usable
    Status,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let settings = Config::load()?.settings()?;

    match cli.command {
        Command::Index { rebuild } => {
            let service = initialize(&settings, false, rebuild)?;
            if service.is_ready() {
                info!(path = %service.persist_path().display(), "index ready");
                println!("Index ready at {}", service.persist_path().display());
            } else {
                println!("No documents found in {}", service.docs_dir().display());
            }
        }
        Command::Query { text, k, rerank, json } => {
            let service = initialize(&settings, rerank || settings.rerank.enabled, false)?;
            let k = k.unwrap_or_else(|| service.default_k());
            let hits = service.query(&text, k)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else if hits.is_empty() {
                println!("No results.");
            } else {
                println!("{}", render_hits(&hits));
            }
        }
        Command::Status => {
            let base = std::env::current_dir()?;
            let docs = settings.data.docs_path(&base);
            let persist = settings.data.persist_path(&base);
            let embedder = docrag_embed::default_embedder(&settings.embedding)?;
            let lifecycle = docrag_hybrid::IndexLifecycle::new(settings.clone(), embedder, None);
            println!("docs dir:     {}", docs.display());
            println!("persist dir:  {}", persist.display());
            match lifecycle.inspect(&persist) {
                IndexState::Absent => println!("index:        absent"),
                IndexState::PresentValid => println!("index:        valid"),
                IndexState::PresentCorrupt(reason) => println!("index:        unusable ({reason})"),
            }
        }
    }
    Ok(())
}
