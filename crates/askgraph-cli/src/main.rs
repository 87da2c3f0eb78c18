//! askgraph CLI
//!
//! Ask questions about a knowledge graph in natural language:
//! - `askgraph ask <question>`: answer one question and exit
//! - `askgraph chat`: interactive session with a bounded conversation window
//!
//! Answers go to stdout; logs go to stderr (`RUST_LOG`, `-v`).

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod repl;
mod setup;

use setup::ContextArgs;

#[derive(Parser)]
#[command(name = "askgraph")]
#[command(
    author,
    version,
    about = "askgraph: natural-language questions over a SPARQL knowledge graph"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Ask {
        /// The question (multiple words are joined with spaces)
        #[arg(required = true)]
        question: Vec<String>,

        #[command(flatten)]
        context: ContextArgs,
    },
    /// Interactive chat session
    Chat {
        #[command(flatten)]
        context: ContextArgs,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "askgraph=info",
        1 => "askgraph=debug",
        _ => "askgraph=trace",
    };
    let filter = if verbose > 0 {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| anyhow!("failed to initialize tokio runtime: {e}"))?;

    match cli.command {
        Commands::Ask { question, context } => {
            let question = question.join(" ");
            let pipeline = rt.block_on(setup::build_pipeline(&context))?;
            let answer = rt.block_on(
                pipeline.answer_or_apology(&question, &askgraph_pipeline::ConversationHistory::new()),
            );
            println!("{answer}");
            Ok(())
        }
        Commands::Chat { context } => {
            let pipeline = rt.block_on(setup::build_pipeline(&context))?;
            repl::cmd_chat(&rt, &pipeline)
        }
    }
}
