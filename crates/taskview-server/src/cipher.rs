//! AES-256-GCM sealing of third-party API tokens.
//!
//! Every call to [`encrypt`] draws a fresh 12-byte IV, so sealing the same
//! token twice never yields the same ciphertext. Ciphertext and IV travel as
//! separate base64 strings; keys are stored as comma-joined byte values.

use std::fmt;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("iv must be 12 bytes")]
    InvalidIv,
    #[error("invalid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("encryption failed")]
    Encrypt,
    #[error("ciphertext failed authentication")]
    Authentication,
    #[error("plaintext is not valid UTF-8")]
    Utf8,
}

#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&key);
        Self(bytes)
    }

    /// Comma-joined decimal byte values, e.g. `"12,255,0,..."`.
    pub fn serialize(&self) -> String {
        self.0
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn import(serialized: &str) -> Result<Self, CipherError> {
        let bytes = serialized
            .split(',')
            .map(|part| part.trim().parse::<u8>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CipherError::InvalidKey(e.to_string()))?;

        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            CipherError::InvalidKey(format!("expected {KEY_LEN} bytes, got {}", bytes.len()))
        })?;
        Ok(Self(bytes))
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedToken {
    pub ciphertext: String,
    pub iv: String,
}

pub fn encrypt(plaintext: &str, key: &EncryptionKey) -> Result<EncryptedToken, CipherError> {
    let iv = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = key
        .cipher()
        .encrypt(&iv, plaintext.as_bytes())
        .map_err(|_| CipherError::Encrypt)?;

    Ok(EncryptedToken {
        ciphertext: STANDARD.encode(ciphertext),
        iv: STANDARD.encode(iv),
    })
}

pub fn decrypt(token: &EncryptedToken, key: &EncryptionKey) -> Result<String, CipherError> {
    let iv = STANDARD.decode(&token.iv)?;
    if iv.len() != IV_LEN {
        return Err(CipherError::InvalidIv);
    }
    let ciphertext = STANDARD.decode(&token.ciphertext)?;

    let plaintext = key
        .cipher()
        .decrypt(Nonce::from_slice(&iv), ciphertext.as_ref())
        .map_err(|_| CipherError::Authentication)?;

    String::from_utf8(plaintext).map_err(|_| CipherError::Utf8)
}
