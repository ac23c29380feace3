//! Configuration providers for password-based encryptors.
//!
//! An encryptor queries its provider exactly once, while initializing, and
//! freezes what it got. Providers may therefore read from sources that are
//! slow or change over time without affecting a running encryptor.

use std::collections::HashMap;
use std::env::{self, VarError};
use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::error::ConfigError;
use crate::salt::{SaltGenerator, parse_salt_generator};

/// Source of the parameters a password-based encryptor needs.
///
/// `None` always means "not configured here": the encryptor then falls back
/// to its own value, and for algorithm and iterations to a built-in default.
/// A present but empty or non-positive value is *not* a request for the
/// default and fails validation instead.
pub trait PbeConfig: Send + Sync {
    /// Algorithm name, `NAME` or `NAME/MODE/PADDING`.
    fn algorithm(&self) -> Option<String>;

    /// Password. There is no default for it anywhere.
    fn password(&self) -> Option<Zeroizing<String>>;

    /// Number of key derivation iterations.
    fn key_obtention_iterations(&self) -> Option<i64>;

    /// Salt generator. `None` leaves the choice to the encryptor.
    fn salt_generator(&self) -> Option<Arc<dyn SaltGenerator>>;
}

/// Values populated by the caller.
#[derive(Clone, Default)]
pub struct SimplePbeConfig {
    algorithm: Option<String>,
    password: Option<Zeroizing<String>>,
    key_obtention_iterations: Option<i64>,
    salt_generator: Option<Arc<dyn SaltGenerator>>,
}

impl SimplePbeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.set_algorithm(algorithm);
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.set_password(password);
        self
    }

    pub fn with_key_obtention_iterations(mut self, iterations: i64) -> Self {
        self.set_key_obtention_iterations(iterations);
        self
    }

    pub fn with_salt_generator(mut self, generator: Arc<dyn SaltGenerator>) -> Self {
        self.set_salt_generator(generator);
        self
    }

    pub fn set_algorithm(&mut self, algorithm: impl Into<String>) {
        self.algorithm = Some(algorithm.into());
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = Some(Zeroizing::new(password.into()));
    }

    pub fn set_key_obtention_iterations(&mut self, iterations: i64) {
        self.key_obtention_iterations = Some(iterations);
    }

    pub fn set_salt_generator(&mut self, generator: Arc<dyn SaltGenerator>) {
        self.salt_generator = Some(generator);
    }
}

impl PbeConfig for SimplePbeConfig {
    fn algorithm(&self) -> Option<String> {
        self.algorithm.clone()
    }

    fn password(&self) -> Option<Zeroizing<String>> {
        self.password.clone()
    }

    fn key_obtention_iterations(&self) -> Option<i64> {
        self.key_obtention_iterations
    }

    fn salt_generator(&self) -> Option<Arc<dyn SaltGenerator>> {
        self.salt_generator.clone()
    }
}

impl fmt::Debug for SimplePbeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimplePbeConfig")
            .field("algorithm", &self.algorithm)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("key_obtention_iterations", &self.key_obtention_iterations)
            .field(
                "salt_generator",
                &self.salt_generator.as_ref().map(|g| g.name().to_string()),
            )
            .finish()
    }
}

/// Names of the environment variables an [`EnvironmentPbeConfig`] reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvNames {
    pub algorithm: String,
    pub password: String,
    pub key_obtention_iterations: String,
    pub salt_generator: String,
}

impl Default for EnvNames {
    fn default() -> Self {
        Self {
            algorithm: "PBECRYPT_ALGORITHM".into(),
            password: "PBECRYPT_PASSWORD".into(),
            key_obtention_iterations: "PBECRYPT_ITERATIONS".into(),
            salt_generator: "PBECRYPT_SALT_GENERATOR".into(),
        }
    }
}

/// Values read from environment variables when the config is loaded.
///
/// An unset variable is absent. A variable set to the empty string is
/// present, so `PBECRYPT_ALGORITHM=` is rejected rather than defaulted.
#[derive(Clone, Default)]
pub struct EnvironmentPbeConfig {
    names: EnvNames,
    values: SimplePbeConfig,
}

impl EnvironmentPbeConfig {
    /// Loads the default variable names from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(EnvNames::default(), |name| env::var(name))
    }

    /// Loads `names` through `lookup`, which behaves like [`std::env::var`].
    ///
    /// `VarError::NotPresent` means unset. A variable that is set but not
    /// valid UTF-8 fails loading.
    pub fn load_with<F>(names: EnvNames, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let read = |name: &str| match lookup(name) {
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(_)) => Err(ConfigError::InvalidVariable {
                name: name.to_string(),
                reason: "not valid UTF-8".to_string(),
            }),
        };

        let mut values = SimplePbeConfig::new();

        if let Some(algorithm) = read(&names.algorithm)? {
            values.set_algorithm(algorithm);
        }

        if let Some(password) = read(&names.password)? {
            values.set_password(password);
        }

        if let Some(raw) = read(&names.key_obtention_iterations)? {
            let iterations =
                raw.trim()
                    .parse::<i64>()
                    .map_err(|e| ConfigError::InvalidVariable {
                        name: names.key_obtention_iterations.clone(),
                        reason: format!("'{raw}' is not an integer: {e}"),
                    })?;
            values.set_key_obtention_iterations(iterations);
        }

        if let Some(setting) = read(&names.salt_generator)? {
            let generator =
                parse_salt_generator(&setting).map_err(|e| ConfigError::InvalidVariable {
                    name: names.salt_generator.clone(),
                    reason: e.to_string(),
                })?;
            values.set_salt_generator(generator);
        }

        Ok(Self { names, values })
    }

    /// Loads from a fixed map of variables.
    pub fn from_map(names: EnvNames, vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load_with(names, |name| vars.get(name).cloned().ok_or(VarError::NotPresent))
    }

    pub fn names(&self) -> &EnvNames {
        &self.names
    }
}

impl PbeConfig for EnvironmentPbeConfig {
    fn algorithm(&self) -> Option<String> {
        self.values.algorithm()
    }

    fn password(&self) -> Option<Zeroizing<String>> {
        self.values.password()
    }

    fn key_obtention_iterations(&self) -> Option<i64> {
        self.values.key_obtention_iterations()
    }

    fn salt_generator(&self) -> Option<Arc<dyn SaltGenerator>> {
        self.values.salt_generator()
    }
}

impl fmt::Debug for EnvironmentPbeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentPbeConfig")
            .field("names", &self.names)
            .field("values", &self.values)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::salt::ZeroSaltGenerator;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_simple_config_has_nothing_set() {
        let cfg = SimplePbeConfig::new();
        assert!(cfg.algorithm().is_none());
        assert!(cfg.password().is_none());
        assert!(cfg.key_obtention_iterations().is_none());
        assert!(cfg.salt_generator().is_none());
    }

    #[test]
    fn simple_config_returns_what_was_set() {
        let cfg = SimplePbeConfig::new()
            .with_algorithm("PBEWithHMACSHA512AndXChaCha20Poly1305")
            .with_password("pw")
            .with_key_obtention_iterations(2000)
            .with_salt_generator(Arc::new(ZeroSaltGenerator));

        assert_eq!(
            cfg.algorithm().as_deref(),
            Some("PBEWithHMACSHA512AndXChaCha20Poly1305")
        );
        assert_eq!(cfg.password().as_deref().map(String::as_str), Some("pw"));
        assert_eq!(cfg.key_obtention_iterations(), Some(2000));
        assert_eq!(cfg.salt_generator().unwrap().name(), "zero");
    }

    #[test]
    fn debug_output_redacts_password() {
        let cfg = SimplePbeConfig::new().with_password("hunter2");
        let out = format!("{cfg:?}");
        assert!(!out.contains("hunter2"));
        assert!(out.contains("<redacted>"));
    }

    #[test]
    fn environment_config_reads_all_variables() {
        let env = vars(&[
            ("PBECRYPT_ALGORITHM", "PBEWithArgon2idAndXChaCha20Poly1305"),
            ("PBECRYPT_PASSWORD", "pw"),
            ("PBECRYPT_ITERATIONS", " 3 "),
            ("PBECRYPT_SALT_GENERATOR", "zero"),
        ]);
        let cfg = EnvironmentPbeConfig::from_map(EnvNames::default(), &env).unwrap();

        assert_eq!(
            cfg.algorithm().as_deref(),
            Some("PBEWithArgon2idAndXChaCha20Poly1305")
        );
        assert_eq!(cfg.password().as_deref().map(String::as_str), Some("pw"));
        assert_eq!(cfg.key_obtention_iterations(), Some(3));
        assert_eq!(cfg.salt_generator().unwrap().name(), "zero");
    }

    #[test]
    fn unset_variables_are_absent_but_empty_ones_are_present() {
        let env = vars(&[("PBECRYPT_ALGORITHM", "")]);
        let cfg = EnvironmentPbeConfig::from_map(EnvNames::default(), &env).unwrap();

        assert_eq!(cfg.algorithm().as_deref(), Some(""));
        assert!(cfg.password().is_none());
        assert!(cfg.key_obtention_iterations().is_none());
        assert!(cfg.salt_generator().is_none());
    }

    #[test]
    fn custom_variable_names_are_honoured() {
        let names = EnvNames {
            password: "APP_SECRET".into(),
            ..EnvNames::default()
        };
        let env = vars(&[("APP_SECRET", "s3cret"), ("PBECRYPT_PASSWORD", "ignored")]);
        let cfg = EnvironmentPbeConfig::from_map(names, &env).unwrap();

        assert_eq!(cfg.password().as_deref().map(String::as_str), Some("s3cret"));
        assert_eq!(cfg.names().password, "APP_SECRET");
    }

    #[test]
    fn non_numeric_iterations_fail_loading() {
        let env = vars(&[("PBECRYPT_ITERATIONS", "lots")]);
        match EnvironmentPbeConfig::from_map(EnvNames::default(), &env) {
            Err(ConfigError::InvalidVariable { name, .. }) => {
                assert_eq!(name, "PBECRYPT_ITERATIONS")
            }
            other => panic!("expected InvalidVariable, got: {other:?}"),
        }
    }

    #[test]
    fn negative_iterations_load_and_are_left_to_validation() {
        let env = vars(&[("PBECRYPT_ITERATIONS", "-3")]);
        let cfg = EnvironmentPbeConfig::from_map(EnvNames::default(), &env).unwrap();
        assert_eq!(cfg.key_obtention_iterations(), Some(-3));
    }

    #[test]
    fn non_unicode_variable_fails_loading() {
        let result = EnvironmentPbeConfig::load_with(EnvNames::default(), |name| match name {
            "PBECRYPT_PASSWORD" => Ok("pw".to_string()),
            "PBECRYPT_ITERATIONS" => Err(VarError::NotUnicode("50?".into())),
            _ => Err(VarError::NotPresent),
        });

        match result {
            Err(ConfigError::InvalidVariable { name, reason }) => {
                assert_eq!(name, "PBECRYPT_ITERATIONS");
                assert_eq!(reason, "not valid UTF-8");
            }
            other => panic!("expected InvalidVariable, got: {other:?}"),
        }
    }

    #[test]
    fn unknown_salt_generator_fails_loading() {
        let env = vars(&[("PBECRYPT_SALT_GENERATOR", "pepper")]);
        assert!(EnvironmentPbeConfig::from_map(EnvNames::default(), &env).is_err());
    }
}
