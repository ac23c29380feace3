//! Password-based encryptor with read-once configuration.
//!
//! A [`StandardPbeEncryptor`] starts uninitialized. The first operation, or an
//! explicit [`StandardPbeEncryptor::initialize`], runs the initialization
//! exactly once:
//!
//! 1. query the [`PbeConfig`] provider (if any) once per parameter,
//! 2. merge provider values over the encryptor's own values over the
//!    built-in defaults,
//! 3. validate password, iteration count and algorithm,
//! 4. freeze the result.
//!
//! The outcome, ready or failed, is permanent. Concurrent first use blocks
//! every caller but one until the outcome is known; afterwards reads of the
//! frozen configuration take no lock.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Serialize;
use tracing::{debug, info, trace, warn};
use zeroize::Zeroizing;

use crate::config::PbeConfig;
use crate::crypto::{self, NONCE_LEN, PbeAlgorithm, SALT_LEN, algorithm::DEFAULT_ALGORITHM};
use crate::error::{EncryptorError, InitError};
use crate::salt::{RandomSaltGenerator, SaltGenerator};

/// Iteration count used when neither the provider nor the encryptor sets one.
pub const DEFAULT_KEY_OBTENTION_ITERATIONS: u32 = 1000;

/// Lifecycle of an encryptor's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InitState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const READY: u8 = 2;
const FAILED: u8 = 3;

/// The validated parameter set an encryptor committed to.
pub struct FrozenConfig {
    algorithm: PbeAlgorithm,
    password: Zeroizing<String>,
    key_obtention_iterations: NonZeroU32,
    salt_generator: Option<Arc<dyn SaltGenerator>>,
}

impl FrozenConfig {
    pub fn algorithm(&self) -> PbeAlgorithm {
        self.algorithm
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn key_obtention_iterations(&self) -> NonZeroU32 {
        self.key_obtention_iterations
    }

    /// The configured salt generator; `None` means the encryptor's default.
    pub fn salt_generator(&self) -> Option<&Arc<dyn SaltGenerator>> {
        self.salt_generator.as_ref()
    }

    /// Non-secret view of the configuration.
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            algorithm: self.algorithm.name().to_string(),
            key_obtention_iterations: self.key_obtention_iterations.get(),
            salt_generator: self
                .salt_generator
                .as_ref()
                .map_or("default (random)", |g| g.name())
                .to_string(),
        }
    }
}

impl fmt::Debug for FrozenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrozenConfig")
            .field("algorithm", &self.algorithm)
            .field("password", &"<redacted>")
            .field("key_obtention_iterations", &self.key_obtention_iterations)
            .field(
                "salt_generator",
                &self.salt_generator.as_ref().map(|g| g.name().to_string()),
            )
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSummary {
    pub algorithm: String,
    pub key_obtention_iterations: u32,
    pub salt_generator: String,
}

/// Values handed to the encryptor before initialization.
#[derive(Default)]
struct Pending {
    config: Option<Arc<dyn PbeConfig>>,
    algorithm: Option<String>,
    password: Option<Zeroizing<String>>,
    key_obtention_iterations: Option<i64>,
    salt_generator: Option<Arc<dyn SaltGenerator>>,
}

/// One reading of every provider accessor.
#[derive(Default)]
struct Provided {
    algorithm: Option<String>,
    password: Option<Zeroizing<String>>,
    key_obtention_iterations: Option<i64>,
    salt_generator: Option<Arc<dyn SaltGenerator>>,
}

impl Provided {
    fn query(config: &dyn PbeConfig) -> Self {
        Self {
            algorithm: config.algorithm(),
            password: config.password(),
            key_obtention_iterations: config.key_obtention_iterations(),
            salt_generator: config.salt_generator(),
        }
    }
}

impl Pending {
    fn resolve(&self) -> Result<FrozenConfig, InitError> {
        let provided = self
            .config
            .as_deref()
            .map(|config| Provided::query(config))
            .unwrap_or_default();

        let password = provided
            .password
            .or_else(|| self.password.clone())
            .ok_or(InitError::MissingPassword)?;

        let iterations = provided
            .key_obtention_iterations
            .or(self.key_obtention_iterations)
            .unwrap_or(i64::from(DEFAULT_KEY_OBTENTION_ITERATIONS));
        let key_obtention_iterations = u32::try_from(iterations)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or(InitError::InvalidIterationCount { value: iterations })?;

        let algorithm = provided
            .algorithm
            .or_else(|| self.algorithm.clone())
            .unwrap_or_else(|| DEFAULT_ALGORITHM.to_string());
        let algorithm = PbeAlgorithm::parse(&algorithm)?;

        Ok(FrozenConfig {
            algorithm,
            password,
            key_obtention_iterations,
            salt_generator: provided
                .salt_generator
                .or_else(|| self.salt_generator.clone()),
        })
    }
}

/// Puts the phase back to uninitialized if initialization unwinds, since the
/// `OnceLock` then stays empty and the next caller starts over.
struct UnwindReset<'a>(&'a AtomicU8);

impl Drop for UnwindReset<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.store(UNINITIALIZED, Ordering::Release);
        }
    }
}

/// Password-based encryptor configured once from a [`PbeConfig`] provider
/// and/or values set directly on it.
///
/// Provider values win over directly set values, which win over built-in
/// defaults. The password has no built-in default.
pub struct StandardPbeEncryptor {
    pending: Mutex<Pending>,
    phase: AtomicU8,
    outcome: OnceLock<Result<FrozenConfig, InitError>>,
    default_salt_generator: RandomSaltGenerator,
}

impl Default for StandardPbeEncryptor {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardPbeEncryptor {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Pending::default()),
            phase: AtomicU8::new(UNINITIALIZED),
            outcome: OnceLock::new(),
            default_salt_generator: RandomSaltGenerator,
        }
    }

    pub fn with_config(config: Arc<dyn PbeConfig>) -> Self {
        let encryptor = Self::new();
        encryptor.lock_pending().config = Some(config);
        encryptor
    }

    pub fn set_config(&mut self, config: Arc<dyn PbeConfig>) -> Result<(), EncryptorError> {
        self.pending_mut()?.config = Some(config);
        Ok(())
    }

    pub fn set_algorithm(&mut self, algorithm: impl Into<String>) -> Result<(), EncryptorError> {
        self.pending_mut()?.algorithm = Some(algorithm.into());
        Ok(())
    }

    /// Sets the password used when the provider has none.
    pub fn set_password(&mut self, password: impl Into<String>) -> Result<(), EncryptorError> {
        self.pending_mut()?.password = Some(Zeroizing::new(password.into()));
        Ok(())
    }

    pub fn set_key_obtention_iterations(&mut self, iterations: i64) -> Result<(), EncryptorError> {
        self.pending_mut()?.key_obtention_iterations = Some(iterations);
        Ok(())
    }

    pub fn set_salt_generator(
        &mut self,
        generator: Arc<dyn SaltGenerator>,
    ) -> Result<(), EncryptorError> {
        self.pending_mut()?.salt_generator = Some(generator);
        Ok(())
    }

    fn pending_mut(&mut self) -> Result<&mut Pending, EncryptorError> {
        if self.outcome.get().is_some() {
            return Err(EncryptorError::AlreadyInitialized);
        }
        Ok(self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner))
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> InitState {
        match self.phase.load(Ordering::Acquire) {
            UNINITIALIZED => InitState::Uninitialized,
            INITIALIZING => InitState::Initializing,
            READY => InitState::Ready,
            _ => InitState::Failed,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// Runs initialization if it has not happened yet and returns its outcome.
    ///
    /// Only the first call queries the provider; every other call, including
    /// calls racing with the first one, returns the same result.
    pub fn initialize(&self) -> Result<&FrozenConfig, InitError> {
        let outcome = self.outcome.get_or_init(|| {
            self.phase.store(INITIALIZING, Ordering::Release);
            let _reset = UnwindReset(&self.phase);
            debug!("initializing password-based encryptor");

            // pending values survive a panicking provider; after that they
            // are dropped, which releases the provider
            let outcome = {
                let mut pending = self.lock_pending();
                let outcome = pending.resolve();
                *pending = Pending::default();
                outcome
            };

            match &outcome {
                Ok(frozen) => {
                    info!(
                        algorithm = %frozen.algorithm,
                        iterations = frozen.key_obtention_iterations.get(),
                        salt_generator = frozen.salt_generator.as_ref().map_or("default", |g| g.name()),
                        "encryptor ready"
                    );
                    self.phase.store(READY, Ordering::Release);
                }
                Err(e) => {
                    warn!(parameter = e.parameter(), error = %e, "encryptor initialization failed");
                    self.phase.store(FAILED, Ordering::Release);
                }
            }
            outcome
        });

        outcome.as_ref().map_err(Clone::clone)
    }

    fn salt_generator<'a>(&'a self, config: &'a FrozenConfig) -> &'a dyn SaltGenerator {
        match config.salt_generator() {
            Some(generator) => generator.as_ref(),
            None => &self.default_salt_generator,
        }
    }

    /// Encrypts `message`.
    ///
    /// Output: `[salt] || nonce || ciphertext`, where the salt is present only
    /// if the salt generator asks for it.
    pub fn encrypt(&self, message: &[u8]) -> Result<Vec<u8>, EncryptorError> {
        let config = self.initialize()?;
        let generator = self.salt_generator(config);

        let salt = Zeroizing::new(generator.generate_salt(SALT_LEN)?);
        let key = crypto::derive_key(
            config.password(),
            &salt,
            config.algorithm.kdf(),
            config.key_obtention_iterations,
        )?;
        let (ciphertext, nonce) = crypto::encrypt(&key, message)?;

        let with_salt = generator.includes_plain_salt_in_encryption_results();
        let salt_len = if with_salt { SALT_LEN } else { 0 };
        let mut out = Vec::with_capacity(salt_len + NONCE_LEN + ciphertext.len());
        if with_salt {
            out.extend_from_slice(&salt);
        }
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);

        trace!(len = message.len(), "encrypted message");
        Ok(out)
    }

    /// Decrypts a message produced by [`encrypt`](Self::encrypt) with the same
    /// configuration.
    pub fn decrypt(&self, encrypted: &[u8]) -> Result<Zeroizing<Vec<u8>>, EncryptorError> {
        let config = self.initialize()?;
        let generator = self.salt_generator(config);

        let with_salt = generator.includes_plain_salt_in_encryption_results();
        let header_len = (if with_salt { SALT_LEN } else { 0 }) + NONCE_LEN;
        if encrypted.len() < header_len {
            return Err(EncryptorError::MessageTooShort(encrypted.len()));
        }

        let (salt, rest) = if with_salt {
            let (salt, rest) = encrypted.split_at(SALT_LEN);
            (Zeroizing::new(salt.to_vec()), rest)
        } else {
            (Zeroizing::new(generator.generate_salt(SALT_LEN)?), encrypted)
        };

        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        let nonce: &[u8; NONCE_LEN] = nonce
            .try_into()
            .map_err(|_| EncryptorError::MessageTooShort(encrypted.len()))?;

        let key = crypto::derive_key(
            config.password(),
            &salt,
            config.algorithm.kdf(),
            config.key_obtention_iterations,
        )?;
        let plaintext = crypto::decrypt(&key, nonce, ciphertext)?;

        trace!(len = plaintext.len(), "decrypted message");
        Ok(plaintext)
    }

    /// Encrypts UTF-8 text and returns it base64 encoded.
    pub fn encrypt_str(&self, message: &str) -> Result<String, EncryptorError> {
        Ok(STANDARD.encode(self.encrypt(message.as_bytes())?))
    }

    /// Decrypts base64 text produced by [`encrypt_str`](Self::encrypt_str).
    pub fn decrypt_str(&self, encrypted: &str) -> Result<Zeroizing<String>, EncryptorError> {
        let data = STANDARD.decode(encrypted.trim())?;
        let plaintext = self.decrypt(&data)?;
        let text = String::from_utf8(plaintext.to_vec()).map_err(|_| EncryptorError::Utf8)?;
        Ok(Zeroizing::new(text))
    }
}

impl fmt::Debug for StandardPbeEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardPbeEncryptor")
            .field("state", &self.state())
            .field("config", &self.outcome.get())
            .finish()
    }
}
