use std::path::PathBuf;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand};
use root_scope::{Root, RootSource, SensitiveExtensions};
use secure_store::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_DATA_DIR, DEFAULT_REDIS_URL, StorageConfig};

#[derive(Parser, Debug)]
#[command(name = "guarded-fs")]
#[command(about = "MCP server with root-scoped path authorization and encrypted session storage")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Allowed root directory. Repeat the flag or pass a comma-separated list.
    #[arg(long = "root", env = "ALLOWED_ROOTS", value_delimiter = ',')]
    pub roots: Vec<PathBuf>,

    /// Allow the current working directory when no roots are configured
    #[arg(long, env = "ALLOW_CWD", value_parser = BoolishValueParser::new())]
    pub allow_cwd: bool,

    /// Persist session storage across restarts (requires both keys)
    #[arg(long, env = "USE_PERSISTENT_STORAGE", value_parser = BoolishValueParser::new())]
    pub persist: bool,

    /// Use Redis for persistent storage. Implies --persist.
    #[arg(long, env = "USE_REDIS", value_parser = BoolishValueParser::new())]
    pub redis: bool,

    /// Redis connection URL
    #[arg(long, env = "REDIS_URL", default_value = DEFAULT_REDIS_URL)]
    pub redis_url: String,

    /// Directory holding the on-disk store
    #[arg(long, env = "STORAGE_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Key used to sign session tokens
    #[arg(long, env = "JWT_SIGNING_KEY", hide_env_values = true)]
    pub jwt_signing_key: Option<String>,

    /// URL-safe base64 32-byte key encrypting stored values
    #[arg(long, env = "STORAGE_ENCRYPTION_KEY", hide_env_values = true)]
    pub storage_encryption_key: Option<String>,

    /// File extensions that are always denied, comma-separated
    #[arg(long, env = "SENSITIVE_EXTENSIONS", value_delimiter = ',')]
    pub sensitive_extensions: Option<Vec<String>>,

    /// How long to wait for the client's roots before using server roots only
    #[arg(long, env = "ROOTS_TIMEOUT_MS", default_value_t = 5000)]
    pub roots_timeout_ms: u64,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print a fresh JWT_SIGNING_KEY / STORAGE_ENCRYPTION_KEY pair for an env file
    Keygen,
}

/// Server configuration resolved from the command line and environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub roots: Vec<PathBuf>,
    pub allow_cwd: bool,
    pub sensitive_extensions: SensitiveExtensions,
    pub roots_timeout: Duration,
    pub storage: StorageConfig,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        let sensitive_extensions = match cli.sensitive_extensions {
            Some(list) => SensitiveExtensions::new(list),
            None => SensitiveExtensions::default(),
        };

        Self {
            roots: cli.roots,
            allow_cwd: cli.allow_cwd,
            sensitive_extensions,
            roots_timeout: Duration::from_millis(cli.roots_timeout_ms),
            storage: StorageConfig {
                signing_key: cli.jwt_signing_key,
                encryption_key: cli.storage_encryption_key,
                persist: cli.persist || cli.redis,
                networked: cli.redis,
                redis_url: cli.redis_url,
                data_dir: cli.data_dir,
                connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            },
        }
    }
}

impl Config {
    /// Build the startup root set.
    ///
    /// Configured entries that are not existing directories are skipped with a
    /// warning. The working directory is only added when nothing else is
    /// configured and `allow_cwd` is set.
    pub fn static_roots(&self) -> Vec<Root> {
        let mut roots: Vec<Root> = self
            .roots
            .iter()
            .filter_map(|path| match Root::from_directory(path, RootSource::Static) {
                Ok(root) => Some(root),
                Err(e) => {
                    tracing::warn!("Skipping configured root {}: {}", path.display(), e);
                    None
                }
            })
            .collect();

        if roots.is_empty() && self.allow_cwd {
            match std::env::current_dir().map(|cwd| Root::from_directory(cwd, RootSource::Static)) {
                Ok(Ok(root)) => {
                    tracing::info!("No roots configured, allowing working directory {}", root);
                    roots.push(root);
                }
                Ok(Err(e)) => tracing::warn!("Working directory is not usable as a root: {}", e),
                Err(e) => tracing::warn!("Could not determine working directory: {}", e),
            }
        }

        if roots.is_empty() {
            tracing::warn!(
                "No allowed roots configured; only client-provided roots will be accepted"
            );
        }
        roots
    }
}
