//! Cipher and key derivation backing the encryptor.
//!
//! Provides algorithm name parsing, key derivation and authenticated encryption.

pub mod aead;
pub mod algorithm;
pub mod kdf;

pub use aead::{decrypt, encrypt};
pub use algorithm::{Kdf, PbeAlgorithm};
pub use kdf::derive_key;

/// Length of the salt (16 bytes).
pub const SALT_LEN: usize = 16;
/// Length of the nonce (24 bytes for XChaCha20-Poly1305).
pub const NONCE_LEN: usize = 24;
/// Length of the encryption key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
