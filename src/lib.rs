//! # Chat Harness
//!
//! The message-rendering and file-ingestion core of an AI chat client.
//!
//! Chat Harness provides two pipelines. The renderer turns a message's
//! markdown-like content into a presentation tree (headings, code blocks
//! with copy actions, quotes, tables, lists, paragraphs with inline
//! formatting). The ingestor turns uploaded files of arbitrary format into
//! plain text and overlapping chunks ready to be inlined into a prompt.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────┐   ┌───────────┐
//! │ Tokenizer │──▶│  Inline   │──▶│ Presenter │──▶ Element tree / HTML
//! │  blocks   │   │   spans   │   │  + cache  │
//! └───────────┘   └───────────┘   └───────────┘
//!
//! ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌─────────┐
//! │ Validate │──▶│ Classify │──▶│ Extract   │──▶│ Chunker │──▶ IngestedFile
//! └──────────┘   └──────────┘   │ + binary  │   └─────────┘        │
//!                               │ heuristics│                      ▼
//!                               └───────────┘               ┌───────────┐
//!                                                           │  Compose  │
//!                                                           │  prompt   │
//!                                                           └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! chx render reply.md --output html       # render a message
//! chx classify report.docx data.tsv       # resolve file formats
//! chx chunk notes.txt --size 500          # split text into chunks
//! chx ingest ./uploads                    # run an upload batch
//! chx prompt brief.pdf --question "Summarize this"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`tokenize`] | Block-level markdown tokenizer |
//! | [`inline`] | Inline span formatter |
//! | [`present`] | Presentation tree, message views, render cache, HTML |
//! | [`classify`] | File format classification |
//! | [`extract`] | Per-format text extraction |
//! | [`binary_text`] | Heuristic text recovery from binary containers |
//! | [`chunk`] | Overlapping text chunking |
//! | [`validate`] | Upload validation |
//! | [`ingest`] | Batch ingestion pipeline |
//! | [`sources`] | Filesystem upload discovery |
//! | [`compose`] | Prompt composition and completion contract |
//! | [`progress`] | Ingest progress reporting |
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |

pub mod binary_text;
pub mod chunk;
pub mod classify;
pub mod compose;
pub mod config;
pub mod extract;
pub mod ingest;
pub mod inline;
pub mod models;
pub mod present;
pub mod progress;
pub mod sources;
pub mod tokenize;
pub mod validate;
