/*!
 * Error type shared by the library
 */

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed hex string '{input}': {source}")]
    Format {
        input: String,
        source: hex::FromHexError,
    },

    #[error("key info flags {0:#06x} match no handshake message")]
    UnrecognizedKeyInfo(u16),

    #[error("malformed handshake: {0}")]
    MalformedHandshake(String),

    #[error("no handshake available to test passphrases against")]
    NoHandshakeAvailable,

    #[error("invalid key material: {what} must be {expected} bytes, got {actual}")]
    InvalidKeyMaterial {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
