//! # Thread Context CLI (`tctx`)
//!
//! The `tctx` binary drives the context engine from the command line. It
//! provides commands for database initialization, crawling the reference
//! graph around an issue, assembling question context, and inspecting or
//! updating the phrase weight store.
//!
//! ## Usage
//!
//! ```bash
//! tctx --config ./config/tctx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tctx init` | Create the SQLite database and run schema migrations |
//! | `tctx crawl <reference>` | Crawl the reference graph and print the tree |
//! | `tctx ask <reference> --question "..."` | Assemble ranked, budgeted context |
//! | `tctx weights dump` | Print the persisted phrase weight table |
//! | `tctx weights edit` | Apply a comment edit as a feedback update |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! tctx init --config ./config/tctx.toml
//!
//! # Crawl two levels deep from an issue
//! tctx crawl https://github.com/acme/widgets/issues/42 --depth 2
//!
//! # Assemble context for a question
//! tctx ask https://github.com/acme/widgets/issues/42 \
//!     --question "why was the retry removed?"
//!
//! # Apply a comment edit as feedback
//! tctx weights edit --old before.md --new after.md --comment-id MDEyOkNvbW1lbnQ
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use thread_context::answer::assemble_context;
use thread_context::config::{self, Config};
use thread_context::crawler::Crawler;
use thread_context::db;
use thread_context::feedback::FeedbackProcessor;
use thread_context::fetch::GithubFetcher;
use thread_context::key::IssueKey;
use thread_context::migrate;
use thread_context::models::NodeStatus;
use thread_context::store::{SqliteWeightStore, WeightStore};
use thread_context::tokens::HeuristicTokenizer;
use thread_context::trigram::TrigramScorer;

/// Thread Context CLI — crawl issue discussions, weigh community feedback,
/// and assemble token-budgeted context for a question.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/tctx.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "tctx",
    about = "Thread Context — context aggregation and relevance weighting for issue discussions",
    version,
    long_about = "Thread Context crawls the cross-reference graph around an issue or pull \
    request, weighs every comment by its reactions and edit history, ranks comments against \
    a question via trigram scoring, and serializes the tree into token-budgeted context blocks."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/tctx.toml`. Database, crawler, scoring, and
    /// API settings are read from this file.
    #[arg(long, global = true, default_value = "./config/tctx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the phrase weight table.
    /// This command is idempotent — running it multiple times is safe.
    Init,

    /// Crawl the reference graph from a root item and print the tree.
    ///
    /// Follows closing references, dependency mentions, and plain links in
    /// the root's body and comments, breadth-first, up to the configured
    /// depth. Failed nodes are shown with their error instead of aborting
    /// the crawl.
    Crawl {
        /// Issue or PR reference: a full URL or a bare `org/repo/number` key.
        reference: String,

        /// Override the configured maximum crawl depth.
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Assemble ranked, token-budgeted context for a question.
    ///
    /// Crawls from the reference, ranks every fetched comment against the
    /// question, and prints the serialized context blocks followed by the
    /// top-ranked comments.
    Ask {
        /// Issue or PR reference: a full URL or a bare `org/repo/number` key.
        reference: String,

        /// The question to assemble context for.
        #[arg(long)]
        question: String,
    },

    /// Inspect or update the phrase weight store.
    Weights {
        #[command(subcommand)]
        action: WeightsAction,
    },
}

/// Weight store subcommands.
#[derive(Subcommand)]
enum WeightsAction {
    /// Print every persisted phrase weight, sorted by phrase.
    Dump,

    /// Apply a comment edit as a feedback update.
    ///
    /// Reads the comment body before and after the edit from two files,
    /// computes the changed spans, and adjusts the affected phrase weights:
    /// removed phrasing loses weight, added phrasing gains it.
    Edit {
        /// File containing the comment body before the edit.
        #[arg(long)]
        old: PathBuf,

        /// File containing the comment body after the edit.
        #[arg(long)]
        new: PathBuf,

        /// Node id of the edited comment, recorded as the update's origin.
        #[arg(long)]
        comment_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Crawl { reference, depth } => {
            run_crawl(&cfg, &reference, depth).await?;
        }
        Commands::Ask {
            reference,
            question,
        } => {
            run_ask(&cfg, &reference, &question).await?;
        }
        Commands::Weights { action } => match action {
            WeightsAction::Dump => {
                run_weights_dump(&cfg).await?;
            }
            WeightsAction::Edit {
                old,
                new,
                comment_id,
            } => {
                run_weights_edit(&cfg, &old, &new, &comment_id).await?;
            }
        },
    }

    Ok(())
}

async fn run_crawl(cfg: &Config, reference: &str, depth: Option<usize>) -> anyhow::Result<()> {
    let root = IssueKey::from_reference(reference, None)?;
    let fetcher = GithubFetcher::new(cfg)?;
    let max_depth = depth.unwrap_or(cfg.crawler.max_depth);

    let crawler = Crawler::new(&fetcher, max_depth);
    let result = crawler.crawl(root).await;

    for key in &result.order {
        let Some(node) = result.nodes.get(key) else {
            continue;
        };
        let indent = "  ".repeat(node.depth);
        let comments = result.comments.get(key).map_or(0, Vec::len);
        match &node.status {
            NodeStatus::Error(reason) => {
                println!("{indent}{key}  [error: {reason}]");
            }
            _ => {
                let kind = if node.is_pull_request { "pr" } else { "issue" };
                println!("{indent}{key}  [{kind}, {comments} comments]");
            }
        }
    }
    println!("\n{} nodes crawled.", result.order.len());

    Ok(())
}

async fn run_ask(cfg: &Config, reference: &str, question: &str) -> anyhow::Result<()> {
    let fetcher = GithubFetcher::new(cfg)?;
    let scorer = TrigramScorer::new();
    let tokenizer = HeuristicTokenizer;

    let bundle = assemble_context(question, reference, &fetcher, &scorer, &tokenizer, cfg).await?;

    for block in &bundle.blocks {
        print!("{}", block.text);
    }

    if !bundle.ranked_comments.is_empty() {
        println!("=== Relevant Comments ===\n");
        for ranked in &bundle.ranked_comments {
            println!("[{:.2}] {}: {}", ranked.score, ranked.author, ranked.body);
        }
        println!();
    }

    println!(
        "{} tokens of primary context, question signal {:.3}",
        bundle.token_count, bundle.question_signal
    );

    Ok(())
}

async fn run_weights_dump(cfg: &Config) -> anyhow::Result<()> {
    let pool = db::connect(cfg).await?;
    let store = SqliteWeightStore::new(pool);

    let weights = store.all_weights().await?;
    if weights.is_empty() {
        println!("No phrase weights stored.");
        return Ok(());
    }

    for entry in &weights {
        println!(
            "{:>10.4}  {}  (from {})",
            entry.weight, entry.phrase, entry.comment_node_id
        );
    }
    println!("\n{} phrases.", weights.len());

    Ok(())
}

async fn run_weights_edit(
    cfg: &Config,
    old: &Path,
    new: &Path,
    comment_id: &str,
) -> anyhow::Result<()> {
    let old_body = std::fs::read_to_string(old)?;
    let new_body = std::fs::read_to_string(new)?;

    let pool = db::connect(cfg).await?;
    let store = SqliteWeightStore::new(pool);
    let scorer = TrigramScorer::new();
    let processor = FeedbackProcessor::new(&store, &scorer, cfg.scoring.scoring_multiplier);

    processor.apply_edit(&old_body, &new_body, comment_id).await?;
    println!("Feedback update applied.");

    Ok(())
}
