use std::num::NonZeroU32;

use argon2::{Algorithm, Argon2, Params, Version};
use pbkdf2::pbkdf2_hmac;
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

use super::{KEY_LEN, algorithm::Kdf};
use crate::error::EncryptorError;

/// Argon2 memory cost in KiB (19 MiB).
pub const ARGON2_MEM_COST_KIB: u32 = 19 * 1024;
/// Argon2 lanes.
pub const ARGON2_PARALLELISM: u32 = 1;

/// Derive the encryption key from password and salt.
///
/// `iterations` is the PBKDF2 round count, or the Argon2 time cost. The same
/// number is used unscaled for both, so an Argon2id configuration should set
/// its own small count instead of relying on the PBKDF2-sized default.
pub fn derive_key(
    password: &str,
    salt: &[u8],
    kdf: Kdf,
    iterations: NonZeroU32,
) -> Result<Zeroizing<[u8; KEY_LEN]>, EncryptorError> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);

    match kdf {
        Kdf::Pbkdf2Sha256 => {
            pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations.get(), &mut *key)
        }
        Kdf::Pbkdf2Sha512 => {
            pbkdf2_hmac::<Sha512>(password.as_bytes(), salt, iterations.get(), &mut *key)
        }
        Kdf::Argon2id => {
            let params = Params::new(
                ARGON2_MEM_COST_KIB,
                iterations.get(),
                ARGON2_PARALLELISM,
                Some(KEY_LEN),
            )
            .map_err(|e| EncryptorError::KeyDerivation(format!("invalid Argon2 params: {e}")))?;

            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password_into(password.as_bytes(), salt, &mut *key)
                .map_err(|e| EncryptorError::KeyDerivation(format!("argon2 failed: {e}")))?;
        }
    }

    Ok(key)
}
