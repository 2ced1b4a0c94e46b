//! # Casebook CLI (`cbk`)
//!
//! The `cbk` binary is the primary interface for Casebook. It answers
//! one-shot questions, runs an interactive chat session, and starts the
//! HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! cbk [--config ./cbk.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cbk ask "<query>"` | Resolve one question and print the answer |
//! | `cbk chat` | Interactive question/answer loop |
//! | `cbk serve` | Start the JSON HTTP server |
//! | `cbk completions <shell>` | Generate shell completions |
//!
//! Without `--config`, built-in defaults are used: the bundled case-study
//! corpus, a 0.1 relevance floor, and generation disabled.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use casebook::config;
use casebook::resolver::Resolver;
use casebook::server;

/// Casebook — a retrieval-backed question answering assistant for
/// business case-study documents.
#[derive(Parser)]
#[command(
    name = "cbk",
    about = "Casebook — question answering over business case-study documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Resolve one question and print the answer.
    Ask {
        /// The question to answer.
        query: String,

        /// Also print which tier produced the answer.
        #[arg(long)]
        explain: bool,
    },

    /// Interactive question/answer loop.
    ///
    /// Reads questions line by line from stdin; `exit` or `quit` ends the
    /// session.
    Chat,

    /// Start the JSON HTTP server.
    ///
    /// Binds to `[server].bind` and exposes `/chat`, `/ingest`, `/clear`,
    /// and `/health`.
    Serve,

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    // Completions don't need configuration.
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "cbk", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ask { query, explain } => {
            let resolver = Resolver::from_config(&cfg)?;
            resolver.seed(&cfg)?;
            let resolution = resolver.resolve(&query).await;
            if explain {
                println!("[{}] {}", resolution.source.name(), resolution.answer);
            } else {
                println!("{}", resolution.answer);
            }
        }
        Commands::Chat => {
            let resolver = Resolver::from_config(&cfg)?;
            resolver.seed(&cfg)?;
            run_chat(&resolver).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Completions { .. } => unreachable!(),
    }

    Ok(())
}

/// Line-oriented chat loop. The prompt is only printed on a real
/// terminal, so piped input produces clean output.
async fn run_chat(resolver: &Resolver) -> Result<()> {
    let interactive = atty::is(atty::Stream::Stdin);
    if interactive {
        println!("Casebook chat — ask about the case study ('exit' to quit).");
    }

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    loop {
        if interactive {
            print!("> ");
            stdout.flush()?;
        }

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim();
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }
        if query.is_empty() {
            continue;
        }

        let answer = resolver.resolve_text(query).await;
        println!("{}", answer);
    }

    Ok(())
}
