//! # repo-context CLI (`rctx`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rctx build <owner/name>` | Build the context of a GitHub repository |
//! | `rctx build --local <dir>` | Build the context of a directory on disk |
//! | `rctx classify <path>...` | Print the role of each path |
//! | `rctx split <file>` | Split an existing document into chunk files |
//! | `rctx serve` | Start the HTTP server |
//!
//! Logs go to stderr (`RUST_LOG` controls the level); results go to stdout.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use repo_context::chunk::{chunk_filename, split_document};
use repo_context::config::{self, Backend, Config};
use repo_context::models::ContextChunk;
use repo_context::pipeline::ContextBuilder;
use repo_context::server;

/// Build LLM-ready context documents from repositories.
#[derive(Parser)]
#[command(name = "rctx", version, about)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a context document.
    ///
    /// Writes `{name}_context_{n}.txt` files (one per chunk) to `--out`,
    /// or prints the whole document with `--stdout`.
    Build {
        /// Repository as `owner/name` or a GitHub URL.
        #[arg(required_unless_present = "local", conflicts_with = "local")]
        repository: Option<String>,

        /// Build from a local directory instead of GitHub.
        #[arg(long, value_name = "DIR")]
        local: Option<PathBuf>,

        /// Override the configured remote backend.
        #[arg(long, value_enum)]
        backend: Option<Backend>,

        /// Output directory for chunk files.
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// Print the document to stdout instead of writing files.
        #[arg(long)]
        stdout: bool,
    },

    /// Print `role<TAB>path` for each path.
    Classify {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Split a text file into line-aligned chunk files.
    Split {
        file: PathBuf,

        /// Maximum bytes per chunk (defaults to the configured ceiling).
        #[arg(long)]
        ceiling_bytes: Option<usize>,

        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Start the HTTP server.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Build {
            repository,
            local,
            backend,
            out,
            stdout,
        } => {
            if let Some(backend) = backend {
                cfg.source.backend = backend;
            }
            let builder = ContextBuilder::new(cfg)?;

            // Sources use blocking HTTP clients; build off the async workers.
            let output = match (local, repository) {
                (Some(dir), _) => tokio::task::spawn_blocking(move || builder.build_local(&dir)).await,
                (None, Some(repo)) => tokio::task::spawn_blocking(move || builder.build(&repo)).await,
                (None, None) => bail!("either a repository or --local is required"),
            }
            .context("build task failed")??;

            if stdout {
                print!("{}", output.document);
            } else {
                write_chunks(&out, &output.base_filename, &output.chunks)?;
            }
            eprintln!(
                "{} files included, {} skipped, {} truncated, {} bytes in {} chunk(s)",
                output.stats.included,
                output.stats.skipped,
                output.stats.truncated,
                output.document.len(),
                output.chunks.len()
            );
        }
        Commands::Classify { paths } => {
            let classifier = cfg.classifier()?;
            for path in paths {
                println!("{}\t{}", classifier.classify(&path), path);
            }
        }
        Commands::Split {
            file,
            ceiling_bytes,
            out,
        } => {
            let ceiling = ceiling_bytes.unwrap_or(cfg.output.chunk_ceiling_bytes);
            if ceiling == 0 {
                bail!("--ceiling-bytes must be > 0");
            }
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let base = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());
            write_chunks(&out, &base, &split_document(&text, ceiling))?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

/// Write each chunk to `{dir}/{base}_{n}.txt` and print the written paths.
fn write_chunks(dir: &Path, base: &str, chunks: &[ContextChunk]) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    for chunk in chunks {
        let path = dir.join(chunk_filename(base, chunk.index));
        std::fs::write(&path, &chunk.text)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{}", path.display());
    }
    Ok(())
}
