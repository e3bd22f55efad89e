//! # Chat Harness CLI (`chx`)
//!
//! The `chx` binary exposes the rendering and ingestion pipelines for
//! scripting and inspection.
//!
//! ## Usage
//!
//! ```bash
//! chx --config ./config/chx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chx render [FILE]` | Render message content to HTML or a JSON presentation tree |
//! | `chx classify <FILE>...` | Print the format each file resolves to |
//! | `chx chunk [FILE]` | Split text into overlapping chunks |
//! | `chx ingest <PATH>...` | Validate, extract and chunk a batch of uploads |
//! | `chx prompt <PATH>... --question <TEXT>` | Print the outbound prompt for files plus a question |
//!
//! Logs go to stderr. Set `RUST_LOG` to override the configured level.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use chat_harness::chunk::chunk_text;
use chat_harness::classify::Classifier;
use chat_harness::config::{self, Config};
use chat_harness::models::Role;
use chat_harness::present::{view_to_html, RenderCache};
use chat_harness::progress::ProgressMode;
use chat_harness::{compose, ingest};

/// Chat Harness CLI: message rendering and file-to-prompt ingestion for AI
/// chat clients.
#[derive(Parser)]
#[command(
    name = "chx",
    about = "Chat Harness: message rendering and file-to-prompt ingestion",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/chx.toml` when that file exists, otherwise
    /// built-in defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render message content.
    ///
    /// Reads FILE (or stdin) and prints either an HTML fragment or the JSON
    /// presentation tree. User messages are shown verbatim.
    Render {
        /// Message file; stdin when omitted.
        file: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "html")]
        output: RenderOutput,

        #[arg(long, value_enum, default_value = "assistant")]
        role: RoleArg,
    },

    /// Print the resolved format of each file.
    Classify {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// MIME type reported by the host, applied to every file.
        #[arg(long, default_value = "")]
        mime: String,
    },

    /// Split text into overlapping chunks.
    Chunk {
        /// Text file; stdin when omitted.
        file: Option<PathBuf>,

        /// Chunk size in characters (defaults to `ingest.chunk_size`).
        #[arg(long)]
        size: Option<usize>,

        /// Overlap in characters (defaults to `ingest.chunk_overlap`).
        #[arg(long)]
        overlap: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Ingest a batch of files or directories.
    ///
    /// Files are validated, extracted and chunked. Failures are reported
    /// per file and never abort the batch.
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Print the full batch report as JSON.
        #[arg(long)]
        json: bool,

        /// Progress on stderr: off, human or json. Defaults to human on a TTY.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Compose the outbound prompt for files plus a question.
    Prompt {
        paths: Vec<PathBuf>,

        #[arg(long, short)]
        question: String,

        /// JSON array of prior chat messages used as conversation context.
        #[arg(long)]
        history: Option<PathBuf>,

        /// Print the request body as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RenderOutput {
    Html,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RoleArg {
    Assistant,
    User,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Assistant => Role::Assistant,
            RoleArg::User => Role::User,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::resolve_config(cli.config.as_deref())?;
    init_tracing(&cfg, cli.verbose);

    match cli.command {
        Commands::Render { file, output, role } => {
            run_render(&cfg, file.as_deref(), output, role.into())?;
        }
        Commands::Classify { files, mime } => {
            run_classify(&files, &mime);
        }
        Commands::Chunk {
            file,
            size,
            overlap,
            json,
        } => {
            run_chunk(&cfg, file.as_deref(), size, overlap, json)?;
        }
        Commands::Ingest {
            paths,
            json,
            progress,
        } => {
            let mode = match progress.as_deref() {
                None => ProgressMode::default_for_tty(),
                Some(value) => match ProgressMode::parse(value) {
                    Some(mode) => mode,
                    None => bail!(
                        "Unknown progress mode: '{}'. Must be off, human, or json.",
                        value
                    ),
                },
            };
            ingest::run_ingest(&cfg, &paths, json, mode).await?;
        }
        Commands::Prompt {
            paths,
            question,
            history,
            json,
        } => {
            compose::run_prompt(&cfg, &paths, &question, history.as_deref(), json).await?;
        }
    }

    Ok(())
}

fn init_tracing(cfg: &Config, verbose: bool) {
    let filter = if verbose {
        "debug"
    } else {
        cfg.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn run_render(cfg: &Config, file: Option<&Path>, output: RenderOutput, role: Role) -> Result<()> {
    let content = read_input(file)?;
    let mut cache = RenderCache::new(cfg.render.cache_capacity);
    let view = cache.message_view(role, &content);
    match output {
        RenderOutput::Html => print!("{}", view_to_html(&view)),
        RenderOutput::Json => println!("{}", serde_json::to_string_pretty(&view)?),
    }
    Ok(())
}

fn run_classify(files: &[PathBuf], mime: &str) {
    let classifier = Classifier::shared();
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let format = classifier.classify(&name, mime);
        match format.document_label(&name) {
            Some(label) => println!("{}\t{}\t{}", name, format.tag(), label),
            None => println!("{}\t{}", name, format.tag()),
        }
    }
}

fn run_chunk(
    cfg: &Config,
    file: Option<&Path>,
    size: Option<usize>,
    overlap: Option<usize>,
    json: bool,
) -> Result<()> {
    let text = read_input(file)?;
    let size = size.unwrap_or(cfg.ingest.chunk_size);
    if size == 0 {
        bail!("--size must be > 0");
    }
    let overlap = overlap.unwrap_or(cfg.ingest.chunk_overlap);
    let chunks = chunk_text(&text, size, overlap);

    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }
    for (i, chunk) in chunks.iter().enumerate() {
        println!("--- chunk {} ({} chars) ---", i + 1, chunk.chars().count());
        println!("{}", chunk);
    }
    Ok(())
}
