//! # BIP Explorer
//!
//! A fetch-parse-categorize-serve backend for browsing Bitcoin Improvement
//! Proposals.
//!
//! BIP Explorer pulls proposal documents from the upstream GitHub
//! repository, extracts structured metadata from two legacy markup
//! dialects, tags each document with topic categories, caches the parsed
//! collection behind a pluggable store, and serves it over a JSON HTTP
//! API. Short plain-language explanations are backfilled asynchronously by
//! a background worker.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌─────────────┐
//! │   GitHub    │──▶│     Pipeline      │──▶│    Store     │
//! │ contents API│   │ Parse+Categorize │   │ File/SQLite  │
//! └─────────────┘   └──────────────────┘   └──────┬──────┘
//!                                                 │
//!                        ┌────────────────────────┤
//!                        ▼                        ▼
//!                  ┌───────────┐           ┌───────────┐
//!                  │    CLI    │           │   HTTP    │
//!                  │  (bipx)   │           │  (axum)   │
//!                  └───────────┘           └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! bipx init                     # create the cache dir / database
//! bipx refresh                  # fetch and parse the full collection
//! bipx get 141                  # inspect one document
//! bipx serve                    # start the JSON API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`source`] | Upstream GitHub client |
//! | [`parse`] | Two-dialect metadata extraction |
//! | [`categorize`] | Topic categorization |
//! | [`store`] | Pluggable cache store (file / SQLite) |
//! | [`refresh`] | Fetch→parse→categorize→persist pipeline |
//! | [`explain`] | Plain-language summaries, background backfill |
//! | [`stats`] | Derived stats, author and category indexes |
//! | [`graph`] | Reference/replacement graph |
//! | [`server`] | JSON HTTP API |

pub mod categorize;
pub mod config;
pub mod error;
pub mod explain;
pub mod graph;
pub mod models;
pub mod parse;
pub mod refresh;
pub mod server;
pub mod source;
pub mod stats;
pub mod store;
