use std::path::Path;

use clap::Parser;
use docket::{
    Chunker,
    Corpus,
    Pipeline,
    config::PipelineConfig,
    error::{self, Error},
    ingestion,
    pipeline::{Completion, QueryResponse},
    query::QueryAnalysis,
    walker,
};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{AnalyzeArgs, AskArgs, ChunkArgs, Cli, Command};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("DOCKET_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = PipelineConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Command::Chunk(args) => cmd_chunk(&config, &args)?,
        Command::Analyze(args) => cmd_analyze(&config, &args)?,
        Command::Ask(args) => cmd_ask(&config, &args)?,
        Command::Completions(args) => args.generate(),
    }

    Ok(())
}

fn cmd_chunk(config: &PipelineConfig, args: &ChunkArgs) -> error::Result<()> {
    let content = read_document(&args.file)?;
    let title = args
        .title
        .clone()
        .unwrap_or_else(|| ingestion::extract_title(&content, &args.file));
    let document_id =
        ingestion::document_id(&args.file, ingestion::ID_HASH_DIGITS);

    let chunker = Chunker::new(config.chunking.clone())?;
    let chunks = chunker.chunk(&content, &document_id, &title);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }

    if chunks.is_empty() {
        println!("No chunks produced.");
        return Ok(());
    }

    for chunk in &chunks {
        let meta = &chunk.metadata;
        println!(
            "{:>3}. {:?} [{}..{}) importance {:.2}",
            meta.chunk_index,
            meta.chunk_type,
            meta.char_start,
            meta.char_end,
            meta.importance
        );
        if !meta.section.is_empty() {
            println!("     section: {}", meta.section);
        }
        if !meta.entities.is_empty() {
            println!("     entities: {}", meta.entities.join(", "));
        }
    }
    println!("\n{} chunk(s)", chunks.len());
    Ok(())
}

fn cmd_analyze(
    config: &PipelineConfig,
    args: &AnalyzeArgs,
) -> error::Result<()> {
    let pipeline = Pipeline::new(config)?;
    let analysis = pipeline.analyzer().analyze(&args.query);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_analysis(&analysis);
    }
    Ok(())
}

fn print_analysis(analysis: &QueryAnalysis) {
    println!("intent:   {}", analysis.intent);
    println!("keywords: {}", analysis.keywords.join(", "));
    for entity in &analysis.entities {
        println!("entity:   {:?} {}", entity.kind, entity.value);
    }
    for (i, expanded) in analysis.expanded_queries.iter().enumerate() {
        println!("query {i}:  {expanded}");
    }

    let filters = &analysis.filters;
    if !filters.courts.is_empty() {
        println!("courts:   {}", filters.courts.join(", "));
    }
    if !filters.law_numbers.is_empty() {
        println!("laws:     {}", filters.law_numbers.join(", "));
    }
    if let Some(range) = &filters.year_range {
        let year = |y: Option<u16>| y.map_or("-".to_string(), |y| y.to_string());
        println!("years:    {} .. {}", year(range.start), year(range.end));
    }
}

fn cmd_ask(config: &PipelineConfig, args: &AskArgs) -> error::Result<()> {
    if !args.corpus.is_dir() {
        return Err(Error::NotFound {
            kind: "corpus directory",
            name: args.corpus.display().to_string(),
        });
    }

    let include = args
        .include
        .as_deref()
        .map(walker::include_matcher)
        .transpose()?;
    let files = walker::discover_matching(&args.corpus, include.as_ref())?;
    let documents = ingestion::load_documents(&files);

    let chunker = Chunker::new(config.chunking.clone())?;
    let corpus =
        Corpus::from_chunks(ingestion::chunk_documents(&chunker, &documents));

    let mut pipeline = Pipeline::new(config)?;
    if let Some(count) = args.count {
        pipeline = pipeline.with_limit(count);
    }
    let response = pipeline.query(&corpus, &args.query, args.budget);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }
    Ok(())
}

fn print_response(response: &QueryResponse) {
    if let Completion::TimedOut { stage } = response.completion {
        eprintln!("warning: query timed out during {stage:?}; results are partial");
    }

    if response.results.is_empty() {
        println!("No results found.");
        return;
    }

    for (rank, r) in response.results.iter().enumerate() {
        let meta = &r.chunk.metadata;
        println!(
            "{:>3}. [{:.3}] {} {}",
            rank + 1,
            r.score,
            meta.document_title,
            r.chunk.id
        );
        for h in &r.highlights {
            println!("     {h}");
        }
    }
    println!("\n{}", response.context);
}

fn read_document(path: &Path) -> error::Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound {
            kind: "document",
            name: path.display().to_string(),
        },
        _ => Error::Io(e),
    })
}
