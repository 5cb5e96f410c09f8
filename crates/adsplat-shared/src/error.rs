use thiserror::Error;

/// Failures while decoding or encoding a protected payload.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Invalid base64 ciphertext: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid hex key material: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Invalid key or IV length")]
    InvalidKeyLength,

    #[error("Decryption failed: bad padding or wrong key")]
    DecryptionFailed,

    #[error("Plaintext is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
