//! Password-based encryption with pluggable, read-once configuration.
//!
//! A [`StandardPbeEncryptor`] gets its algorithm, password, key obtention
//! iterations and salt generator from a [`PbeConfig`] provider, from values
//! set directly on it, or from built-in defaults. It reads them once, on first
//! use, and never again.
//!
//! ```no_run
//! use std::sync::Arc;
//! use pbecrypt::{SimplePbeConfig, StandardPbeEncryptor};
//!
//! let config = SimplePbeConfig::new()
//!     .with_password("correct horse battery staple")
//!     .with_key_obtention_iterations(10_000);
//! let encryptor = StandardPbeEncryptor::with_config(Arc::new(config));
//!
//! let encrypted = encryptor.encrypt_str("attack at dawn")?;
//! assert_eq!(encryptor.decrypt_str(&encrypted)?.as_str(), "attack at dawn");
//! # Ok::<(), pbecrypt::EncryptorError>(())
//! ```

pub mod config;
pub mod crypto;
pub mod encryptor;
pub mod error;
pub mod salt;

pub use crate::config::{EnvNames, EnvironmentPbeConfig, PbeConfig, SimplePbeConfig};
pub use crate::crypto::PbeAlgorithm;
pub use crate::crypto::algorithm::DEFAULT_ALGORITHM;
pub use crate::encryptor::{
    ConfigSummary, DEFAULT_KEY_OBTENTION_ITERATIONS, FrozenConfig, InitState,
    StandardPbeEncryptor,
};
pub use crate::error::{ConfigError, EncryptorError, InitError, SaltError};
pub use crate::salt::{
    FixedSaltGenerator, RandomSaltGenerator, SaltGenerator, ZeroSaltGenerator,
    parse_salt_generator,
};
