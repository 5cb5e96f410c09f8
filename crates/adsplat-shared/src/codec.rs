//! Symmetric codec for protected response payloads.
//!
//! Wire format: `base64(ciphertext) /+/ hex(key) /+/ hex(iv)`, AES-128-CBC with
//! PKCS7 padding. The key travels with the ciphertext, so this only keeps the
//! payload away from casual inspection.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::constants::{CODEC_IV_SIZE, CODEC_KEY_SIZE, PAYLOAD_SEPARATOR};
use crate::error::CodecError;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

pub type CodecKey = [u8; CODEC_KEY_SIZE];
pub type CodecIv = [u8; CODEC_IV_SIZE];

pub fn generate_key() -> CodecKey {
    let mut key = [0u8; CODEC_KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut key);
    key
}

pub fn generate_iv() -> CodecIv {
    let mut iv = [0u8; CODEC_IV_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    iv
}

/// Serialize `value` to JSON and encrypt it under a fresh key and IV.
pub fn encrypt<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    let plaintext = serde_json::to_vec(value)?;
    let key = generate_key();
    let iv = generate_iv();

    let ciphertext = Aes128CbcEnc::new(&key.into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(&plaintext);

    Ok([
        STANDARD.encode(ciphertext),
        hex::encode(key),
        hex::encode(iv),
    ]
    .join(PAYLOAD_SEPARATOR))
}

/// Decrypt a three-part payload and parse the plaintext as JSON.
///
/// Missing components are treated as empty strings, which then fail the key
/// length check.
pub fn decrypt(payload: &str) -> Result<Value, CodecError> {
    let mut parts = payload.split(PAYLOAD_SEPARATOR);
    let content = parts.next().unwrap_or_default();
    let key_hex = parts.next().unwrap_or_default();
    let iv_hex = parts.next().unwrap_or_default();

    let key = hex::decode(key_hex)?;
    let iv = hex::decode(iv_hex)?;
    let ciphertext = STANDARD.decode(content.trim())?;

    let plaintext = Aes128CbcDec::new_from_slices(&key, &iv)
        .map_err(|_| CodecError::InvalidKeyLength)?
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| CodecError::DecryptionFailed)?;

    let text = String::from_utf8(plaintext)?;
    Ok(serde_json::from_str(&text)?)
}

/// Decrypt a payload straight into a typed value.
pub fn decrypt_as<T: DeserializeOwned>(payload: &str) -> Result<T, CodecError> {
    Ok(serde_json::from_value(decrypt(payload)?)?)
}
