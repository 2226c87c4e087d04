//! # Thread Context
//!
//! A context aggregation and relevance-weighting engine for software-issue
//! discussions.
//!
//! Thread Context crawls the cross-reference graph around an issue or pull
//! request (closing references, dependency mentions, plain links), weighs
//! every fetched comment by its community feedback (reactions and edit
//! history), ranks comments against a question via trigram scoring, and
//! serializes the whole tree into labeled, token-budgeted context blocks
//! for a bounded-context consumer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌───────────┐
//! │  Fetch    │──▶│ Crawler  │──▶│ Serialize │
//! │ (GitHub)  │   │ BFS tree │   │  blocks   │
//! └────┬─────┘   └────┬─────┘   └─────┬─────┘
//!      │              ▼               ▼
//!      │        ┌──────────┐    ┌──────────┐
//!      │        │ Weights  │    │  Answer  │
//!      │        │ + Trigram│──▶│  bundle  │
//!      │        └────┬─────┘    └──────────┘
//!      │             ▲
//!      ▼             │
//! ┌──────────┐  ┌──────────┐
//! │ Feedback │─▶│  SQLite  │
//! │  edits   │  │  store   │
//! └──────────┘  └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! tctx init                                            # create database
//! tctx crawl https://github.com/acme/widgets/issues/42
//! tctx ask https://github.com/acme/widgets/issues/42 \
//!     --question "why was the retry removed?"
//! tctx weights dump
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`key`] | Identity key normalization |
//! | [`extract`] | Linked-reference extraction |
//! | [`fetch`] | Issue/comment fetch adapter |
//! | [`weights`] | Reaction/edit weight calculator |
//! | [`trigram`] | Trigram relevance scoring |
//! | [`crawler`] | Bounded reference-graph traversal |
//! | [`feedback`] | Edit-driven weight updates |
//! | [`serialize`] | Context block serialization |
//! | [`answer`] | End-to-end context assembly |
//! | [`store`] | Phrase weight persistence |
//! | [`tokens`] | Token counting |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod answer;
pub mod config;
pub mod crawler;
pub mod db;
pub mod extract;
pub mod feedback;
pub mod fetch;
pub mod key;
pub mod migrate;
pub mod models;
pub mod serialize;
pub mod store;
pub mod tokens;
pub mod trigram;
pub mod weights;
