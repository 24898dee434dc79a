use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use thiserror::Error;

const SEAL_VERSION: u8 = 0x01;
const NONCE_LEN: usize = 12;

/// Errors raised while sealing or opening the API token
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("sealing failed: {0}")]
    Seal(String),
    #[error("opening failed: {0}")]
    Open(String),
    #[error("invalid sealed data: {0}")]
    InvalidData(String),
    #[error("base64 decode error: {0}")]
    Base64Decode(String),
    #[error("token is not valid UTF-8: {0}")]
    Utf8(String),
}

fn cipher_from_hex(key_hex: &str) -> Result<Aes256Gcm, SecretError> {
    let key_bytes = hex::decode(key_hex.trim())
        .map_err(|e| SecretError::InvalidKey(format!("not hex: {}", e)))?;

    if key_bytes.len() != 32 {
        return Err(SecretError::InvalidKey(format!(
            "expected 32 bytes (256 bits), got {}",
            key_bytes.len()
        )));
    }

    Aes256Gcm::new_from_slice(&key_bytes).map_err(|e| SecretError::InvalidKey(e.to_string()))
}

/// Seal an API token with AES-256-GCM.
///
/// Output is base64 of `[version][nonce(12)][ciphertext]`, suitable for
/// `DERIV_API_TOKEN_SEALED`.
pub fn seal_token(token: &str, key_hex: &str) -> Result<String, SecretError> {
    let cipher = cipher_from_hex(key_hex)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), token.as_bytes())
        .map_err(|e| SecretError::Seal(e.to_string()))?;

    let mut sealed = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
    sealed.push(SEAL_VERSION);
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(sealed))
}

/// Open a token produced by [`seal_token`]
pub fn open_token(sealed_b64: &str, key_hex: &str) -> Result<String, SecretError> {
    let sealed = BASE64
        .decode(sealed_b64.trim())
        .map_err(|e| SecretError::Base64Decode(e.to_string()))?;

    if sealed.len() <= 1 + NONCE_LEN {
        return Err(SecretError::InvalidData(
            "sealed token too short for version + nonce + ciphertext".to_string(),
        ));
    }

    if sealed[0] != SEAL_VERSION {
        return Err(SecretError::InvalidData(format!(
            "unsupported seal version: {}",
            sealed[0]
        )));
    }

    let cipher = cipher_from_hex(key_hex)?;
    let nonce = Nonce::from_slice(&sealed[1..1 + NONCE_LEN]);
    let plaintext = cipher
        .decrypt(nonce, &sealed[1 + NONCE_LEN..])
        .map_err(|e| SecretError::Open(e.to_string()))?;

    String::from_utf8(plaintext).map_err(|e| SecretError::Utf8(e.to_string()))
}
