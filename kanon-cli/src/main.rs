//! Kanon CLI - parse model responses against schemas from the command line

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use kanon_core::prelude::*;

#[derive(Parser)]
#[command(name = "kanon")]
#[command(about = "Schema-aligned parsing for LLM output", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a response against a schema
    Parse {
        /// Schema file (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Response file; stdin when omitted
        input: Option<PathBuf>,

        /// Accept truncated input and report partiality
        #[arg(long)]
        partial: bool,

        /// Disable lossy scalar coercion
        #[arg(long)]
        strict: bool,

        /// Disable repair rewrites
        #[arg(long)]
        no_fixes: bool,

        /// Disable fenced-block extraction
        #[arg(long)]
        no_markdown: bool,

        /// Record the coercion trace
        #[arg(long)]
        trace: bool,

        /// Keep the extractor candidate with the fewest issues
        #[arg(long)]
        best: bool,

        /// Report every extractor candidate
        #[arg(long)]
        all: bool,
    },
    /// Print the prompt type hint for a schema
    Hint {
        /// Schema file (JSON)
        #[arg(short, long)]
        schema: PathBuf,
    },
    /// Version information
    Version,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("kanon {}", env!("CARGO_PKG_VERSION"));
            println!("kanon-core {}", kanon_core::VERSION);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Hint { schema } => {
            let schema = load_schema(&schema)?;
            println!("{}", type_hint(&schema));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Parse {
            schema,
            input,
            partial,
            strict,
            no_fixes,
            no_markdown,
            trace,
            best,
            all,
        } => {
            let schema = load_schema(&schema)?;
            let response = read_response(input.as_deref())?;

            let options = ParseOptions {
                strict,
                allow_fixes: !no_fixes,
                allow_markdown_json: !no_markdown,
                track_coercions: trace,
                ..Default::default()
            };

            if all {
                let results = parse_all_candidates(&response, &schema, &options);
                println!("{}", serde_json::to_string_pretty(&results)?);
                let any_success = results.iter().any(|result| result.success);
                return Ok(exit_for(any_success));
            }

            let result = if partial {
                parse_partial(&response, &schema, &options)
            } else if best {
                parse_best_candidate(&response, &schema, &options)
            } else {
                parse(&response, &schema, &options)
            };

            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(exit_for(result.success || partial))
        }
    }
}

fn load_schema(path: &std::path::Path) -> Result<Schema> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read schema file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid schema in {}", path.display()))
}

fn read_response(input: Option<&std::path::Path>) -> Result<String> {
    match input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("cannot read response file {}", path.display())),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("cannot read response from stdin")?;
            Ok(buffer)
        }
    }
}

fn exit_for(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
