use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "docket",
    about = "Chunk legal documents and build bounded retrieval context"
)]
pub struct Cli {
    /// Pipeline configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Split one document into chunks
    Chunk(ChunkArgs),
    /// Show how a query is analyzed
    Analyze(AnalyzeArgs),
    /// Answer a query from a directory of documents
    Ask(AskArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Chunk --

#[derive(Debug, Parser)]
pub struct ChunkArgs {
    /// Markdown or text file to chunk
    pub file: PathBuf,

    /// Document title (defaults to the first `# ` heading or file name)
    #[arg(long)]
    pub title: Option<String>,

    /// Output chunks as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Analyze --

#[derive(Debug, Parser)]
pub struct AnalyzeArgs {
    /// The query to analyze
    pub query: String,

    /// Output the analysis as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Ask --

#[derive(Debug, Parser)]
pub struct AskArgs {
    /// The question
    pub query: String,

    /// Directory of .md/.txt documents to search
    #[arg(long)]
    pub corpus: PathBuf,

    /// Glob applied to paths relative to the corpus directory
    #[arg(long)]
    pub include: Option<String>,

    /// Number of results to keep (overrides the configured limit)
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Token budget for the assembled context
    #[arg(long, default_value = "2000")]
    pub budget: usize,

    /// Output ranked results, context and completion as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "docket",
            &mut std::io::stdout(),
        );
    }
}
