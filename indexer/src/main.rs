use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use semsearch::embeddings::load_embeddings;
use semsearch::persist::{commit_graph, load_artifacts, save_docs, save_graph, save_index, save_meta, IndexPaths, MetaFile};
use semsearch::{build_graph, GraphConfig, MatchStrategy, QueryOutcome, SearchEngine};
use tracing_subscriber::{fmt, EnvFilter};

use std::io::{self, BufRead, Write};
use std::path::Path;

mod input;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the similarity graph and document index, and query them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build graph, index and document store from embeddings and documents
    Build {
        /// GloVe-style embeddings file (word followed by its components, one per line)
        #[arg(long)]
        embeddings: String,
        /// Documents: a .json/.jsonl file or a directory of them
        #[arg(long)]
        documents: String,
        /// Output artifact directory
        #[arg(long, default_value = "./index")]
        output: String,
        /// Neighbors kept per vocabulary word
        #[arg(long, default_value_t = semsearch::graph::DEFAULT_TOP_N)]
        top_n: usize,
    },
    /// Query a built index; reads queries from stdin until `x` when --q is absent
    Query {
        #[arg(long, default_value = "./index")]
        index: String,
        /// Run a single query and exit
        #[arg(long)]
        q: Option<String>,
    },
    /// Rebuild the graph from the stored embeddings and save it again
    Rebuild {
        #[arg(long, default_value = "./index")]
        index: String,
        /// Defaults to the value the graph was built with
        #[arg(long)]
        top_n: Option<usize>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { embeddings, documents, output, top_n } => build(&embeddings, &documents, &output, top_n),
        Commands::Query { index, q } => query(&index, q.as_deref()),
        Commands::Rebuild { index, top_n } => rebuild(&index, top_n),
    }
}

fn build(embeddings_path: &str, documents: &str, output: &str, top_n: usize) -> Result<()> {
    let embeddings = load_embeddings(embeddings_path).with_context(|| format!("loading embeddings from {embeddings_path}"))?;
    let graph = build_graph(&embeddings, &GraphConfig { top_n })?;
    let docs = input::load_documents(Path::new(documents))?;
    let engine = SearchEngine::new(graph, docs);

    let paths = IndexPaths::new(output);
    save_graph(&paths, engine.graph())?;
    save_index(&paths, engine.index())?;
    save_docs(&paths, engine.documents())?;
    save_meta(&paths, &MetaFile::describe(engine.graph(), engine.documents().len(), now_rfc3339())?)?;

    tracing::info!(output, "artifacts written");
    Ok(())
}

fn query(index_dir: &str, q: Option<&str>) -> Result<()> {
    let (graph, index, docs, meta) = load_artifacts(&IndexPaths::new(index_dir))?;
    tracing::info!(num_docs = meta.num_docs, vocab_size = meta.vocab_size, "index loaded");
    let engine = SearchEngine::from_parts(graph, index, docs);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Some(q) = q {
        return print_outcome(&mut out, q, &engine.run(q));
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        write!(out, "search (enter x to exit): ")?;
        out.flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        if line == "x" {
            break;
        }
        print_outcome(&mut out, &line, &engine.run(&line))?;
    }
    Ok(())
}

fn print_outcome<W: Write>(out: &mut W, raw: &str, outcome: &QueryOutcome) -> Result<()> {
    writeln!(out, "Original query: {raw}")?;
    writeln!(out, "Reformulated query: {}", outcome.expanded)?;
    let label = match outcome.strategy {
        MatchStrategy::Ranked => "Search results",
        MatchStrategy::PartialMatch => "Search results (partial match)",
    };
    writeln!(out, "{label}:")?;
    for hit in &outcome.hits {
        writeln!(out, "{}: {}", hit.doc_id, hit.text)?;
    }
    Ok(())
}

fn rebuild(index_dir: &str, top_n: Option<usize>) -> Result<()> {
    let paths = IndexPaths::new(index_dir);
    let (graph, _index, docs, _meta) = load_artifacts(&paths)?;
    let config = GraphConfig { top_n: top_n.unwrap_or(graph.top_n()) };
    let graph = graph.rebuild(&config)?;
    commit_graph(&paths, &graph, &MetaFile::describe(&graph, docs.len(), now_rfc3339())?)?;
    tracing::info!(index_dir, top_n = config.top_n, "graph rebuilt");
    Ok(())
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
