//! # repo-context
//!
//! Turns a repository into a single plain-text context document for LLM
//! prompts: a metadata header, documentation, configuration and source
//! files grouped by type, each capped in size. Documents larger than a byte
//! ceiling are split into line-aligned chunks.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌──────────┐   ┌───────────┐   ┌─────────┐
//! │ SnapshotSrc  │──▶│  Classify  │──▶│ Retrieve │──▶│ Assemble  │──▶│  Chunk  │
//! │ API/Zip/Local│   │   roles    │   │ + caps   │   │ document  │   │ ≤ ceil  │
//! └──────────────┘   └────────────┘   └──────────┘   └───────────┘   └────┬────┘
//!                                                                         │
//!                                              ┌──────────────────────────┤
//!                                              ▼                          ▼
//!                                         ┌──────────┐             ┌────────────┐
//!                                         │   CLI    │             │ HTTP +     │
//!                                         │  (rctx)  │             │ sessions   │
//!                                         └──────────┘             └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rctx build acme/widgets              # writes widgets_context_1.txt
//! rctx build --local . --stdout        # current directory to stdout
//! rctx classify src/main.rs README.md  # show file roles
//! rctx serve                           # HTTP API on 127.0.0.1:7340
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Engine and source error types |
//! | [`models`] | Core data types |
//! | [`source`] | Snapshot backends (GitHub API, GitHub archive, local dir) |
//! | [`walk`] | Directory tree walker |
//! | [`classify`] | Path to role classification |
//! | [`retrieve`] | File retrieval and truncation |
//! | [`assemble`] | Document rendering |
//! | [`chunk`] | Line-aligned document splitting |
//! | [`pipeline`] | End-to-end build |
//! | [`session`] | Per-session chunk storage |
//! | [`server`] | HTTP server |

pub mod assemble;
pub mod chunk;
pub mod classify;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod retrieve;
pub mod server;
pub mod session;
pub mod source;
pub mod walk;

pub use error::{ContextError, SourceError};
pub use pipeline::{ContextBuilder, ContextOutput};
