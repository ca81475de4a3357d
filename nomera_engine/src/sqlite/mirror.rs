use log::*;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::{
    order_types::{Order, OrderId},
    traits::{OrderMirror, OrderStoreError},
};

const CREATE_MIRROR_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS order_mirror (
    order_id   TEXT PRIMARY KEY NOT NULL,
    state      TEXT NOT NULL,
    body       TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#;

/// Sqlite-backed write-behind mirror. Orders are stored as JSON snapshots keyed by order id,
/// last-write-wins. This is a recovery copy, not a query surface; the only reads are by-id fetches when
/// the in-memory store misses after a restart.
#[derive(Clone)]
pub struct SqliteMirror {
    pool: SqlitePool,
}

impl SqliteMirror {
    pub async fn connect(url: &str) -> Result<Self, OrderStoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| OrderStoreError::Storage(e.to_string()))?;
        sqlx::query(CREATE_MIRROR_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| OrderStoreError::Storage(e.to_string()))?;
        info!("🗄️ Order mirror ready at {url}");
        Ok(Self { pool })
    }
}

impl OrderMirror for SqliteMirror {
    async fn upsert(&self, order: &Order) -> Result<(), OrderStoreError> {
        let body = serde_json::to_string(order).map_err(|e| OrderStoreError::Storage(e.to_string()))?;
        sqlx::query(
            r#"INSERT INTO order_mirror (order_id, state, body, updated_at) VALUES (?, ?, ?, ?)
               ON CONFLICT (order_id) DO UPDATE
               SET state = excluded.state, body = excluded.body, updated_at = excluded.updated_at"#,
        )
        .bind(order.order_id.as_str())
        .bind(order.state.to_string())
        .bind(body)
        .bind(order.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| OrderStoreError::Storage(e.to_string()))?;
        trace!("🗄️ Mirrored order {} ({})", order.order_id, order.state);
        Ok(())
    }

    async fn fetch(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT body FROM order_mirror WHERE order_id = ?")
            .bind(order_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| OrderStoreError::Storage(e.to_string()))?;
        match row {
            Some((body,)) => {
                let order = serde_json::from_str(&body).map_err(|e| OrderStoreError::Storage(e.to_string()))?;
                Ok(Some(order))
            },
            None => Ok(None),
        }
    }
}
