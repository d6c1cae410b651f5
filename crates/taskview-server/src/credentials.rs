use std::sync::Arc;

use crate::auth::SessionUser;
use crate::cipher::{self, EncryptedToken, EncryptionKey};
use crate::db::{StoredToken, TokenStore};
use crate::error::AppError;

/// Turns a session identity into the user's plaintext Todoist token.
///
/// Nothing is cached: every outbound call resolves again so a rotated token
/// takes effect immediately.
#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn TokenStore>,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, user: Option<&SessionUser>) -> Result<String, AppError> {
        let user = user.ok_or(AppError::Unauthenticated)?;

        let row = self.store.get(&user.id).await?.ok_or_else(|| {
            tracing::debug!(user_id = %user.id, "No stored Todoist token");
            AppError::NoStoredToken
        })?;

        let Some((ciphertext, iv, key)) = complete(row) else {
            tracing::warn!(user_id = %user.id, "Stored Todoist token row is incomplete");
            return Err(AppError::NoStoredToken);
        };

        let key = EncryptionKey::import(&key).map_err(|e| {
            tracing::warn!(user_id = %user.id, error = %e, "Stored encryption key is invalid");
            AppError::DecryptionFailure
        })?;

        let token = cipher::decrypt(&EncryptedToken { ciphertext, iv }, &key).map_err(|e| {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to decrypt Todoist token");
            AppError::DecryptionFailure
        })?;

        if token.is_empty() {
            return Err(AppError::DecryptionFailure);
        }

        Ok(token)
    }

    /// Seals `token` under a freshly generated key and stores it for `user`.
    pub async fn save(&self, user: &SessionUser, token: &str) -> Result<(), AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Validation("Token must not be empty".to_string()));
        }

        let key = EncryptionKey::generate();
        let sealed = cipher::encrypt(token, &key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encrypt token: {}", e)))?;

        self.store
            .upsert(
                &user.id,
                StoredToken {
                    encrypted_token: Some(sealed.ciphertext),
                    token_iv: Some(sealed.iv),
                    encryption_key: Some(key.serialize()),
                },
            )
            .await?;

        tracing::info!(user_id = %user.id, "Stored Todoist token");
        Ok(())
    }

    pub async fn is_configured(&self, user: &SessionUser) -> Result<bool, AppError> {
        Ok(self.store.get(&user.id).await?.and_then(complete).is_some())
    }

    pub async fn remove(&self, user: &SessionUser) -> Result<bool, AppError> {
        self.store.delete(&user.id).await
    }
}

/// Ciphertext, iv and key of a row, if none of them is missing or empty.
fn complete(row: StoredToken) -> Option<(String, String, String)> {
    let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
    Some((
        non_empty(row.encrypted_token)?,
        non_empty(row.token_iv)?,
        non_empty(row.encryption_key)?,
    ))
}
