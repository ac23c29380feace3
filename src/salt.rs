//! Salt generators pluggable into an encryptor.
//!
//! The encryptor never inspects salt bytes. It only asks a generator for
//! `len` bytes and whether those bytes have to travel with the ciphertext.

use std::sync::Arc;

use getrandom::fill;

use crate::error::SaltError;

/// Produces the salt mixed into key derivation.
///
/// Implementations must be thread-safe: one generator may be shared by many
/// encryptors and used from many threads.
pub trait SaltGenerator: Send + Sync {
    /// Returns `len` bytes of salt.
    fn generate_salt(&self, len: usize) -> Result<Vec<u8>, SaltError>;

    /// Whether the plain salt must be prepended to every encrypted message.
    ///
    /// Generators producing the same bytes on every call return `false`: the
    /// salt is regenerated on decryption instead of being stored.
    fn includes_plain_salt_in_encryption_results(&self) -> bool;

    /// Short name used in diagnostics.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Cryptographically secure random salts from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSaltGenerator;

impl SaltGenerator for RandomSaltGenerator {
    fn generate_salt(&self, len: usize) -> Result<Vec<u8>, SaltError> {
        let mut salt = vec![0u8; len];
        fill(&mut salt).map_err(|_| SaltError::Unavailable)?;
        Ok(salt)
    }

    fn includes_plain_salt_in_encryption_results(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "random"
    }
}

/// All-zero salt. Only useful for interoperability with unsalted schemes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroSaltGenerator;

impl SaltGenerator for ZeroSaltGenerator {
    fn generate_salt(&self, len: usize) -> Result<Vec<u8>, SaltError> {
        Ok(vec![0u8; len])
    }

    fn includes_plain_salt_in_encryption_results(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "zero"
    }
}

/// Caller-supplied salt, truncated to the requested length.
#[derive(Debug, Clone)]
pub struct FixedSaltGenerator {
    salt: Vec<u8>,
}

impl FixedSaltGenerator {
    pub fn new(salt: impl Into<Vec<u8>>) -> Self {
        Self { salt: salt.into() }
    }
}

impl SaltGenerator for FixedSaltGenerator {
    fn generate_salt(&self, len: usize) -> Result<Vec<u8>, SaltError> {
        if len > self.salt.len() {
            return Err(SaltError::FixedSaltTooShort {
                requested: len,
                available: self.salt.len(),
            });
        }
        Ok(self.salt[..len].to_vec())
    }

    fn includes_plain_salt_in_encryption_results(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

const FIXED_PREFIX: &str = "fixed:";

/// Builds a generator from a textual setting: `random`, `zero` or
/// `fixed:<text>` (the UTF-8 bytes of `<text>` become the salt).
///
/// Keywords are case-insensitive; `<text>` is taken as is.
pub fn parse_salt_generator(setting: &str) -> Result<Arc<dyn SaltGenerator>, SaltError> {
    if let Some((prefix, text)) = setting.split_at_checked(FIXED_PREFIX.len()) {
        if prefix.eq_ignore_ascii_case(FIXED_PREFIX) {
            return Ok(Arc::new(FixedSaltGenerator::new(text.as_bytes())));
        }
    }

    match setting.to_ascii_lowercase().as_str() {
        "random" => Ok(Arc::new(RandomSaltGenerator)),
        "zero" => Ok(Arc::new(ZeroSaltGenerator)),
        _ => Err(SaltError::UnknownGenerator(setting.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_salts_differ() {
        let g = RandomSaltGenerator;
        let a = g.generate_salt(16).unwrap();
        let b = g.generate_salt(16).unwrap();

        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
        assert!(g.includes_plain_salt_in_encryption_results());
    }

    #[test]
    fn zero_salt_is_all_zero() {
        let salt = ZeroSaltGenerator.generate_salt(8).unwrap();
        assert_eq!(salt, vec![0u8; 8]);
        assert!(!ZeroSaltGenerator.includes_plain_salt_in_encryption_results());
    }

    #[test]
    fn fixed_salt_is_truncated() {
        let g = FixedSaltGenerator::new(b"0123456789abcdefXYZ".to_vec());
        assert_eq!(g.generate_salt(16).unwrap(), b"0123456789abcdef");
        assert_eq!(g.generate_salt(16).unwrap(), g.generate_salt(16).unwrap());
    }

    #[test]
    fn fixed_salt_too_short_fails() {
        let g = FixedSaltGenerator::new(b"short".to_vec());
        match g.generate_salt(16) {
            Err(SaltError::FixedSaltTooShort {
                requested,
                available,
            }) => {
                assert_eq!(requested, 16);
                assert_eq!(available, 5);
            }
            other => panic!("expected FixedSaltTooShort, got: {other:?}"),
        }
    }

    #[test]
    fn parse_known_settings() {
        assert_eq!(parse_salt_generator("random").unwrap().name(), "random");
        assert_eq!(parse_salt_generator("ZERO").unwrap().name(), "zero");

        let fixed = parse_salt_generator("fixed:pepper-and-salt!").unwrap();
        assert_eq!(fixed.name(), "fixed");
        assert_eq!(fixed.generate_salt(6).unwrap(), b"pepper");
    }

    #[test]
    fn fixed_prefix_is_case_insensitive_but_text_is_kept() {
        let fixed = parse_salt_generator("FIXED:AbCdEf").unwrap();
        assert_eq!(fixed.name(), "fixed");
        assert_eq!(fixed.generate_salt(6).unwrap(), b"AbCdEf");

        assert_eq!(parse_salt_generator("Fixed:x").unwrap().name(), "fixed");
    }

    #[test]
    fn parse_unknown_setting_fails() {
        assert!(matches!(
            parse_salt_generator("sometimes"),
            Err(SaltError::UnknownGenerator(s)) if s == "sometimes"
        ));
    }
}
