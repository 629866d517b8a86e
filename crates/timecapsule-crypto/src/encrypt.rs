use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};
use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::keys::{KEY_LEN, key_from_base64};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Encrypt a plaintext with AES-256-GCM.
/// Returns (ciphertext, nonce).
pub fn encrypt_bytes(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<(Vec<u8>, [u8; NONCE_LEN])> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    Ok((ciphertext, nonce_bytes))
}

/// Decrypt a ciphertext with AES-256-GCM.
pub fn decrypt_bytes(key: &[u8; KEY_LEN], ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_LEN {
        return Err(anyhow!("Decryption failed: bad nonce length {}", nonce.len()));
    }
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let nonce = Nonce::from_slice(nonce);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| anyhow!("Decryption failed: {}", e))?;

    Ok(plaintext)
}

/// Text codec for message content at rest.
///
/// The stored form is `base64(nonce || ciphertext || tag)`, one string per
/// field, so subject and body each carry their own nonce.
#[derive(Clone)]
pub struct PayloadCodec {
    key: [u8; KEY_LEN],
}

impl PayloadCodec {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    pub fn from_base64_key(encoded: &str) -> Result<Self> {
        Ok(Self::new(key_from_base64(encoded)?))
    }

    pub fn encrypt_text(&self, plaintext: &str) -> Result<String> {
        let (ciphertext, nonce) = encrypt_bytes(&self.key, plaintext.as_bytes())?;

        let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        envelope.extend_from_slice(&nonce);
        envelope.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(envelope))
    }

    pub fn decrypt_text(&self, sealed: &str) -> Result<String> {
        let envelope = BASE64
            .decode(sealed.trim())
            .map_err(|e| anyhow!("Decryption failed: invalid base64: {}", e))?;

        if envelope.len() < NONCE_LEN + TAG_LEN {
            return Err(anyhow!(
                "Decryption failed: envelope too short ({} bytes)",
                envelope.len()
            ));
        }

        let (nonce, ciphertext) = envelope.split_at(NONCE_LEN);
        let plaintext = decrypt_bytes(&self.key, ciphertext, nonce)?;

        String::from_utf8(plaintext).map_err(|_| anyhow!("Decryption failed: plaintext is not UTF-8"))
    }
}

// Never print the key.
impl std::fmt::Debug for PayloadCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadCodec").finish_non_exhaustive()
    }
}
