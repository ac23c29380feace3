//! Error types for configuration, salt generation and encryption.

use thiserror::Error;

/// Why an encryptor could not leave the initializing state.
///
/// Raised only once per encryptor, when it transitions to the failed state.
/// Every later operation on that encryptor reports the same value again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("no password configured for password-based encryption")]
    MissingPassword,

    #[error("invalid key obtention iteration count {value}: must be a positive integer no greater than {max}", max = u32::MAX)]
    InvalidIterationCount { value: i64 },

    #[error("invalid algorithm '{algorithm}': {reason}")]
    InvalidAlgorithm { algorithm: String, reason: String },
}

impl InitError {
    /// Name of the configuration parameter that failed validation.
    pub fn parameter(&self) -> &'static str {
        match self {
            InitError::MissingPassword => "password",
            InitError::InvalidIterationCount { .. } => "keyObtentionIterations",
            InitError::InvalidAlgorithm { .. } => "algorithm",
        }
    }
}

#[derive(Debug, Error)]
pub enum SaltError {
    #[error("OS random generator unavailable")]
    Unavailable,

    #[error("fixed salt has {available} bytes but {requested} were requested")]
    FixedSaltTooShort { requested: usize, available: usize },

    #[error("unknown salt generator '{0}' (expected random, zero or fixed:<text>)")]
    UnknownGenerator(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {name} is invalid: {reason}")]
    InvalidVariable { name: String, reason: String },
}

#[derive(Debug, Error)]
pub enum EncryptorError {
    #[error("encryptor initialization failed: {0}")]
    Initialization(#[from] InitError),

    #[error("encryptor is already initialized; its configuration is frozen")]
    AlreadyInitialized,

    #[error("salt generation failed: {0}")]
    Salt(#[from] SaltError),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed")]
    Encryption,

    #[error("Invalid password or corrupted data")]
    Decryption,

    #[error("encrypted message is too short ({0} bytes)")]
    MessageTooShort(usize),

    #[error("encrypted text is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("decrypted message is not valid UTF-8")]
    Utf8,
}
