//! # Casebook
//!
//! A retrieval-backed question answering assistant for business
//! case-study documents.
//!
//! Casebook resolves free-text questions about a fixed corpus through
//! layered strategies — canned rule matches first, then topic
//! classification, then TF-IDF similarity search, then an optional
//! generation collaborator — and always degrades to a fixed fallback
//! rather than failing.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────────────────────┐   ┌───────────┐
//! │  Corpus    │──▶│          Resolver             │◀──│  Query    │
//! │ txt/md/pdf │   │ rules → topics → index search │   │ CLI/HTTP  │
//! └────────────┘   │   → generate → fallback       │   └───────────┘
//!                  └──────────────┬───────────────┘
//!                                 ▼
//!                          answer string
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cbk ask "what products do they sell?"
//! cbk chat                      # interactive session
//! cbk serve                     # HTTP API on [server].bind
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`index`] | TF-IDF document index with cosine search |
//! | [`rules`] | Trigger-phrase rule matching |
//! | [`topics`] | Topic classification |
//! | [`resolver`] | Layered query resolution and response cache |
//! | [`knowledge`] | Built-in case-study data pack |
//! | [`generate`] | Answer generation collaborator |
//! | [`ingest`] | Corpus cleanup, chunking, and file loading |
//! | [`server`] | JSON HTTP server |

pub mod config;
pub mod generate;
pub mod index;
pub mod ingest;
pub mod knowledge;
pub mod models;
pub mod resolver;
pub mod rules;
pub mod server;
pub mod topics;
