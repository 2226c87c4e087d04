//! Phrase-weight persistence: the [`WeightStore`] seam and its backends.
//!
//! The feedback processor reads and writes per-phrase weights through this
//! trait. [`SqliteWeightStore`] is the durable backend; [`MemoryWeightStore`]
//! backs tests and short-lived embedders. Absent phrases always read as 0.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

/// One persisted phrase weight with the comment that last touched it.
#[derive(Debug, Clone)]
pub struct PhraseWeight {
    pub phrase: String,
    pub weight: f64,
    pub comment_node_id: String,
}

/// Durable phrase → weight mapping.
///
/// `set_weight` performs a read-modify-write from the caller's point of
/// view; in a multi-threaded deployment the store serializes writes to a
/// given phrase internally.
#[async_trait]
pub trait WeightStore: Send + Sync {
    /// Weight for a phrase; 0.0 when absent.
    async fn get_weight(&self, phrase: &str) -> Result<f64>;

    /// Set a phrase's weight, recording the comment that caused the change.
    async fn set_weight(&self, phrase: &str, weight: f64, origin_comment_id: &str) -> Result<()>;

    /// Dump the full weight table.
    async fn all_weights(&self) -> Result<Vec<PhraseWeight>>;
}

// ============ SQLite backend ============

/// SQLite-backed store, durable across process restarts.
pub struct SqliteWeightStore {
    pool: SqlitePool,
}

impl SqliteWeightStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WeightStore for SqliteWeightStore {
    async fn get_weight(&self, phrase: &str) -> Result<f64> {
        let weight: Option<f64> =
            sqlx::query_scalar("SELECT weight FROM phrase_weights WHERE phrase = ?")
                .bind(phrase)
                .fetch_optional(&self.pool)
                .await?;
        Ok(weight.unwrap_or(0.0))
    }

    async fn set_weight(&self, phrase: &str, weight: f64, origin_comment_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO phrase_weights (phrase, weight, comment_node_id, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(phrase) DO UPDATE SET
                weight = excluded.weight,
                comment_node_id = excluded.comment_node_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(phrase)
        .bind(weight)
        .bind(origin_comment_id)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn all_weights(&self) -> Result<Vec<PhraseWeight>> {
        let rows = sqlx::query(
            "SELECT phrase, weight, comment_node_id FROM phrase_weights ORDER BY phrase",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| PhraseWeight {
                phrase: row.get("phrase"),
                weight: row.get("weight"),
                comment_node_id: row.get("comment_node_id"),
            })
            .collect())
    }
}

// ============ In-memory backend ============

/// In-memory store for tests. Same contract, no durability.
pub struct MemoryWeightStore {
    entries: RwLock<HashMap<String, (f64, String)>>,
}

impl MemoryWeightStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryWeightStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WeightStore for MemoryWeightStore {
    async fn get_weight(&self, phrase: &str) -> Result<f64> {
        let entries = self.entries.read().expect("weight store poisoned");
        Ok(entries.get(phrase).map(|(w, _)| *w).unwrap_or(0.0))
    }

    async fn set_weight(&self, phrase: &str, weight: f64, origin_comment_id: &str) -> Result<()> {
        let mut entries = self.entries.write().expect("weight store poisoned");
        entries.insert(phrase.to_string(), (weight, origin_comment_id.to_string()));
        Ok(())
    }

    async fn all_weights(&self) -> Result<Vec<PhraseWeight>> {
        let entries = self.entries.read().expect("weight store poisoned");
        let mut weights: Vec<PhraseWeight> = entries
            .iter()
            .map(|(phrase, (weight, comment_node_id))| PhraseWeight {
                phrase: phrase.clone(),
                weight: *weight,
                comment_node_id: comment_node_id.clone(),
            })
            .collect();
        weights.sort_by(|a, b| a.phrase.cmp(&b.phrase));
        Ok(weights)
    }
}
