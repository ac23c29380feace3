use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
mod auth;
use directories::ProjectDirs;
use pbecrypt::{EnvironmentPbeConfig, PbeConfig, StandardPbeEncryptor, parse_salt_generator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Encryptor values used when the environment does not set them.
#[derive(Debug, clap::Args)]
struct EncryptorArgs {
    /// Algorithm, used when PBECRYPT_ALGORITHM is not set
    /// (default: PBEWithHMACSHA256AndXChaCha20Poly1305)
    #[arg(long, global = true)]
    algorithm: Option<String>,

    /// Key obtention iterations, used when PBECRYPT_ITERATIONS is not set (default: 1000)
    #[arg(long, global = true, allow_negative_numbers = true)]
    iterations: Option<i64>,

    /// Salt generator (random, zero or fixed:<text>), used when
    /// PBECRYPT_SALT_GENERATOR is not set (default: random)
    #[arg(long = "salt", global = true, value_name = "GENERATOR")]
    salt_generator: Option<String>,
}

impl EncryptorArgs {
    fn apply(&self, encryptor: &mut StandardPbeEncryptor) -> Result<()> {
        if let Some(algorithm) = &self.algorithm {
            encryptor.set_algorithm(algorithm.as_str())?;
        }
        if let Some(iterations) = self.iterations {
            encryptor.set_key_obtention_iterations(iterations)?;
        }
        if let Some(setting) = &self.salt_generator {
            let generator = parse_salt_generator(setting).context("invalid --salt value")?;
            encryptor.set_salt_generator(generator)?;
        }
        Ok(())
    }
}

#[derive(Debug, Parser)]
#[command(name = "pbecrypt")]
#[command(
    version,
    about = "Password-based encryption configured from the environment."
)]
struct Cli {
    /// Path to a .env file with PBECRYPT_* variables
    #[arg(long, global = true, value_name = "PATH", env = "PBECRYPT_ENV_FILE")]
    env_file: Option<PathBuf>,

    #[command(flatten)]
    encryptor: EncryptorArgs,

    /// Log initialization and encryption steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Encrypts a message and prints it base64 encoded
    #[command(arg_required_else_help = true)]
    Encrypt { message: String },

    /// Decrypts a base64 message produced by `encrypt`
    #[command(arg_required_else_help = true)]
    Decrypt { ciphertext: String },

    /// Shows the configuration the encryptor resolved
    Info {
        /// Print as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        init_logging();
    }

    load_env_files(cli.env_file.as_deref())?;

    let config = EnvironmentPbeConfig::load().context("failed to read configuration")?;
    let provider_has_password = config.password().is_some();

    let mut encryptor = StandardPbeEncryptor::with_config(Arc::new(config));
    cli.encryptor.apply(&mut encryptor)?;

    if !provider_has_password {
        let confirm = matches!(cli.command, Commands::Encrypt { .. });
        if let Some(password) = auth::read_password(confirm)? {
            encryptor.set_password(password.as_str())?;
        }
    }

    match cli.command {
        Commands::Encrypt { message } => {
            println!("{}", encryptor.encrypt_str(&message)?);
        }
        Commands::Decrypt { ciphertext } => {
            let message = encryptor.decrypt_str(&ciphertext)?;
            println!("{}", message.as_str());
        }
        Commands::Info { json } => {
            let summary = encryptor.initialize()?.summary();
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("algorithm: {}", summary.algorithm);
                println!(
                    "key obtention iterations: {}",
                    summary.key_obtention_iterations
                );
                println!("salt generator: {}", summary.salt_generator);
            }
        }
    }

    Ok(())
}

/// Loads `.env` style files into the process environment. Variables already
/// set in the environment are never overridden.
fn load_env_files(explicit: Option<&Path>) -> Result<()> {
    if let Some(path) = explicit {
        dotenvy::from_path(path)
            .with_context(|| format!("failed to load env file {}", path.display()))?;
        return Ok(());
    }

    // Load .env file (ignore if not found)
    dotenvy::dotenv().ok();

    if let Some(dirs) = ProjectDirs::from("", "", "pbecrypt") {
        let path = dirs.config_dir().join("pbecrypt.env");
        if path.exists() {
            dotenvy::from_path(&path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
        }
    }

    Ok(())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pbecrypt=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
