use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

/// JWT payload claims the client reads without verifying.
#[derive(Deserialize)]
struct JwtClaims {
    sub: String,
    #[serde(default)]
    exp: Option<i64>,
}

/// A session issued by the proxy: the bearer JWT and the user it names.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl Session {
    /// Builds a session from a JWT, taking the user id from its `sub` claim.
    pub fn from_jwt(token: &str) -> Result<Self> {
        let claims = decode_claims(token).context("Session token is not a readable JWT")?;
        Ok(Self {
            token: token.trim().to_string(),
            user_id: claims.sub,
        })
    }

    pub fn expires_at(&self) -> Option<i64> {
        decode_claims(&self.token).and_then(|claims| claims.exp)
    }

    /// Tokens without an `exp` claim never expire on the client side.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at().map_or(false, |exp| exp <= now)
    }

    /// Get the path to the session file
    fn session_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("taskview");

        fs::create_dir_all(&config_dir).context("Could not create config directory")?;

        Ok(config_dir.join("session.json"))
    }

    /// Load the session from disk
    pub fn load() -> Result<Option<Self>> {
        Self::load_from(&Self::session_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path).context("Could not read session file")?;
        let session: Self =
            serde_json::from_str(&contents).context("Could not parse session file")?;

        Ok(Some(session))
    }

    /// Save the session to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::session_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("Could not serialize session")?;
        fs::write(path, contents).context("Could not write session file")?;
        Ok(())
    }

    /// Delete the stored session
    pub fn delete() -> Result<()> {
        let path = Self::session_path()?;

        if path.exists() {
            fs::remove_file(&path).context("Could not delete session file")?;
        }

        Ok(())
    }
}

fn decode_claims(token: &str) -> Option<JwtClaims> {
    // header.payload.signature
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let payload = URL_SAFE_NO_PAD.decode(parts[1]).ok()?;
    serde_json::from_slice(&payload).ok()
}

#[cfg(test)]
pub(crate) fn test_jwt(sub: &str, exp: Option<i64>) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = match exp {
        Some(exp) => serde_json::json!({ "sub": sub, "exp": exp }),
        None => serde_json::json!({ "sub": sub }),
    };
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}
