use std::fmt;

use crate::error::InitError;

/// Name of the algorithm used when nothing else is configured.
pub const DEFAULT_ALGORITHM: &str = "PBEWithHMACSHA256AndXChaCha20Poly1305";

/// Key derivation function behind an algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kdf {
    Pbkdf2Sha256,
    Pbkdf2Sha512,
    /// The iteration count is the Argon2 time cost, i.e. passes over 19 MiB.
    /// Each pass costs far more than a PBKDF2 round, so counts in the single
    /// digits are typical; the built-in default of 1000 takes seconds per
    /// message.
    Argon2id,
}

/// Supported password-based encryption suites. All of them encrypt with
/// XChaCha20-Poly1305; they differ in how the key is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PbeAlgorithm {
    #[default]
    HmacSha256XChaCha20Poly1305,
    HmacSha512XChaCha20Poly1305,
    Argon2idXChaCha20Poly1305,
}

const ALL: [PbeAlgorithm; 3] = [
    PbeAlgorithm::HmacSha256XChaCha20Poly1305,
    PbeAlgorithm::HmacSha512XChaCha20Poly1305,
    PbeAlgorithm::Argon2idXChaCha20Poly1305,
];

impl PbeAlgorithm {
    /// Parses `NAME` or `NAME/MODE/PADDING`.
    ///
    /// Names are case-insensitive. The only mode and padding accepted are
    /// `NONE` and `NOPADDING`, since the cipher is a stream AEAD.
    pub fn parse(algorithm: &str) -> Result<Self, InitError> {
        let invalid = |reason: &str| InitError::InvalidAlgorithm {
            algorithm: algorithm.to_string(),
            reason: reason.to_string(),
        };

        if algorithm.trim().is_empty() {
            return Err(invalid("algorithm name is empty"));
        }

        let segments: Vec<&str> = algorithm.split('/').collect();
        if segments.len() != 1 && segments.len() != 3 {
            return Err(invalid("expected NAME or NAME/MODE/PADDING"));
        }
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid("empty segment in algorithm name"));
        }

        let name = segments[0].trim();
        let parsed = ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| invalid("unsupported algorithm"))?;

        if let [_, mode, padding] = segments[..] {
            if !mode.trim().eq_ignore_ascii_case("NONE") {
                return Err(invalid("unsupported mode (expected NONE)"));
            }
            if !padding.trim().eq_ignore_ascii_case("NOPADDING") {
                return Err(invalid("unsupported padding (expected NOPADDING)"));
            }
        }

        Ok(parsed)
    }

    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            PbeAlgorithm::HmacSha256XChaCha20Poly1305 => "PBEWithHMACSHA256AndXChaCha20Poly1305",
            PbeAlgorithm::HmacSha512XChaCha20Poly1305 => "PBEWithHMACSHA512AndXChaCha20Poly1305",
            PbeAlgorithm::Argon2idXChaCha20Poly1305 => "PBEWithArgon2idAndXChaCha20Poly1305",
        }
    }

    pub fn kdf(&self) -> Kdf {
        match self {
            PbeAlgorithm::HmacSha256XChaCha20Poly1305 => Kdf::Pbkdf2Sha256,
            PbeAlgorithm::HmacSha512XChaCha20Poly1305 => Kdf::Pbkdf2Sha512,
            PbeAlgorithm::Argon2idXChaCha20Poly1305 => Kdf::Argon2id,
        }
    }
}

impl fmt::Display for PbeAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
