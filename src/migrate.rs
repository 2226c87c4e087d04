use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS phrase_weights (
            phrase TEXT PRIMARY KEY,
            weight REAL NOT NULL DEFAULT 0,
            comment_node_id TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_phrase_weights_updated_at ON phrase_weights(updated_at DESC)",
    )
    .execute(&pool)
    .await?;

    pool.close().await;
    Ok(())
}
