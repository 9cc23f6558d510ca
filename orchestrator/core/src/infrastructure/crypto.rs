// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// AES-256-GCM Secret Cipher
//
// Blob format: base64(nonce) "." base64(ciphertext+tag), 96-bit random nonce
// per encryption.
//
// Deployment key normalisation:
// - "base64:<value>" must decode to exactly 32 bytes
// - otherwise a value that base64-decodes to 32 bytes is used as-is
// - otherwise the raw string must be at least 32 bytes; the first 32 are used

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD as B64, Engine};

use crate::domain::credential::{CryptoError, SecretCipher};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

pub struct AesGcmCipher {
    key: [u8; KEY_LEN],
}

impl AesGcmCipher {
    pub fn from_key_material(raw: &str) -> Result<Self, CryptoError> {
        Ok(Self {
            key: normalize_key(raw)?,
        })
    }

    /// Reads the key from the named environment variable.
    pub fn from_env(var: &str) -> Result<Self, CryptoError> {
        let raw = std::env::var(var).map_err(|_| CryptoError::MissingKey)?;
        Self::from_key_material(&raw)
    }
}

impl std::fmt::Debug for AesGcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AesGcmCipher(..)")
    }
}

pub fn normalize_key(raw: &str) -> Result<[u8; KEY_LEN], CryptoError> {
    if raw.is_empty() {
        return Err(CryptoError::MissingKey);
    }

    if let Some(encoded) = raw.strip_prefix("base64:") {
        let decoded = B64
            .decode(encoded)
            .map_err(|e| CryptoError::InvalidKey(format!("base64 key does not decode: {}", e)))?;
        return decoded
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("base64 key must be 32 bytes".to_string()));
    }

    if let Ok(decoded) = B64.decode(raw) {
        if let Ok(key) = <[u8; KEY_LEN]>::try_from(decoded) {
            return Ok(key);
        }
    }

    let bytes = raw.as_bytes();
    if bytes.len() < KEY_LEN {
        return Err(CryptoError::InvalidKey(
            "key must be at least 32 characters".to_string(),
        ));
    }
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&bytes[..KEY_LEN]);
    Ok(key)
}

impl SecretCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        Ok(format!("{}.{}", B64.encode(nonce), B64.encode(ciphertext)))
    }

    fn decrypt(&self, blob: &str) -> Result<String, CryptoError> {
        let (nonce_b64, cipher_b64) = blob.split_once('.').ok_or(CryptoError::MalformedBlob)?;
        if nonce_b64.is_empty() || cipher_b64.is_empty() {
            return Err(CryptoError::MalformedBlob);
        }
        let nonce_bytes = B64.decode(nonce_b64).map_err(|_| CryptoError::MalformedBlob)?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(CryptoError::MalformedBlob);
        }
        let ciphertext = B64.decode(cipher_b64).map_err(|_| CryptoError::MalformedBlob)?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| CryptoError::DecryptionFailed)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
    }
}
