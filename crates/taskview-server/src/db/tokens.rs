use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::DbPool;
use crate::error::AppError;

/// One `user_tokens` row. Columns are nullable in the hosted schema, so a
/// row can exist without being usable.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StoredToken {
    pub encrypted_token: Option<String>,
    pub token_iv: Option<String>,
    pub encryption_key: Option<String>,
}

impl std::fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredToken")
            .field("encrypted_token", &self.encrypted_token.is_some())
            .field("token_iv", &self.token_iv.is_some())
            .field("encryption_key", &self.encryption_key.is_some())
            .finish()
    }
}

/// Persistence for per-user encrypted tokens, keyed on user id.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// `None` is the normal "no token configured yet" state.
    async fn get(&self, user_id: &str) -> Result<Option<StoredToken>, AppError>;

    async fn upsert(&self, user_id: &str, token: StoredToken) -> Result<(), AppError>;

    /// Returns whether a row was removed.
    async fn delete(&self, user_id: &str) -> Result<bool, AppError>;
}

pub struct PgTokenStore {
    db: DbPool,
}

impl PgTokenStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Creates `user_tokens` when it is missing.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_tokens (
                user_id TEXT PRIMARY KEY,
                encrypted_token TEXT,
                token_iv TEXT,
                encryption_key TEXT,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

type TokenRow = (Option<String>, Option<String>, Option<String>);

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn get(&self, user_id: &str) -> Result<Option<StoredToken>, AppError> {
        let row: Option<TokenRow> = sqlx::query_as(
            "SELECT encrypted_token, token_iv, encryption_key FROM user_tokens WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|(encrypted_token, token_iv, encryption_key)| StoredToken {
            encrypted_token,
            token_iv,
            encryption_key,
        }))
    }

    async fn upsert(&self, user_id: &str, token: StoredToken) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_tokens (user_id, encrypted_token, token_iv, encryption_key, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET encrypted_token = EXCLUDED.encrypted_token,
                token_iv = EXCLUDED.token_iv,
                encryption_key = EXCLUDED.encryption_key,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id)
        .bind(&token.encrypted_token)
        .bind(&token.token_iv)
        .bind(&token.encryption_key)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM user_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// In-process store used when no database is configured.
#[derive(Default)]
pub struct MemoryTokenStore {
    rows: RwLock<HashMap<String, StoredToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, user_id: &str) -> Result<Option<StoredToken>, AppError> {
        Ok(self.rows.read().await.get(user_id).cloned())
    }

    async fn upsert(&self, user_id: &str, token: StoredToken) -> Result<(), AppError> {
        self.rows.write().await.insert(user_id.to_string(), token);
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<bool, AppError> {
        Ok(self.rows.write().await.remove(user_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(tag: &str) -> StoredToken {
        StoredToken {
            encrypted_token: Some(format!("ct-{tag}")),
            token_iv: Some(format!("iv-{tag}")),
            encryption_key: Some(format!("key-{tag}")),
        }
    }

    #[tokio::test]
    async fn memory_store_upserts_by_user() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get("u1").await.unwrap(), None);

        store.upsert("u1", row("a")).await.unwrap();
        store.upsert("u1", row("b")).await.unwrap();
        store.upsert("u2", row("c")).await.unwrap();

        assert_eq!(store.get("u1").await.unwrap(), Some(row("b")));
        assert!(store.delete("u1").await.unwrap());
        assert!(!store.delete("u1").await.unwrap());
        assert_eq!(store.get("u2").await.unwrap(), Some(row("c")));
    }

    #[test]
    fn debug_hides_secrets() {
        let rendered = format!("{:?}", row("secret"));
        assert!(!rendered.contains("secret"));
    }
}
