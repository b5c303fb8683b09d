//! # Database Persistence Layer
//!
//! Postgres-backed [`DocumentStore`] via SQLx.
//!
//! The database is **optional**. When `DATABASE_URL` is set, user documents
//! are persisted to the `documents` table (one JSONB body per row, keyed by
//! collection and id). When absent, the API keeps them in memory, which is
//! suitable for development and testing.

use async_trait::async_trait;
use morse_core::documents::ensure_id;
use morse_core::{Document, DocumentError, DocumentStore};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            tracing::warn!(
                "DATABASE_URL not set, keeping documents in memory. \
                 Accounts will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Document collections stored as JSONB rows.
///
/// Filters use JSONB containment (`body @> filter`), which for flat filters
/// is top-level field equality.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn backend(err: sqlx::Error) -> DocumentError {
    DocumentError::Backend(err.to_string())
}

fn into_document(collection: &str, body: Value) -> Result<Document, DocumentError> {
    match body {
        Value::Object(map) => Ok(map),
        other => Err(DocumentError::Malformed {
            collection: collection.to_string(),
            reason: format!("expected a JSON object, found {other}"),
        }),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<Option<Document>, DocumentError> {
        let row: Option<Json<Value>> = sqlx::query_scalar(
            "SELECT body FROM documents
             WHERE collection = $1 AND body @> $2
             ORDER BY created_at
             LIMIT 1",
        )
        .bind(collection)
        .bind(Json(Value::Object(filter.clone())))
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(|Json(body)| into_document(collection, body))
            .transpose()
    }

    async fn insert_one(
        &self,
        collection: &str,
        mut document: Document,
    ) -> Result<String, DocumentError> {
        let id = ensure_id(&mut document);

        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(Json(Value::Object(document)))
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(id)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        set: Document,
    ) -> Result<bool, DocumentError> {
        let result = sqlx::query(
            "UPDATE documents SET body = body || $3, updated_at = now()
             WHERE collection = $1 AND id = (
                 SELECT id FROM documents
                 WHERE collection = $1 AND body @> $2
                 ORDER BY created_at
                 LIMIT 1
             )",
        )
        .bind(collection)
        .bind(Json(Value::Object(filter.clone())))
        .bind(Json(Value::Object(set)))
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_bodies_become_documents() {
        let doc = into_document("users", json!({"email": "a@b.c"})).unwrap();
        assert_eq!(doc.get("email"), Some(&json!("a@b.c")));
    }

    #[test]
    fn non_object_bodies_are_malformed() {
        let err = into_document("users", json!([1, 2])).unwrap_err();
        assert!(matches!(err, DocumentError::Malformed { ref collection, .. } if collection == "users"));
    }
}
