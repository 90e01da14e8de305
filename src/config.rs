use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub default_bucket_size: u32,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Bucket/Item capacity-checked CRUD API")]
pub struct Args {
    /// Host to bind to (overrides BUCKET_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides BUCKET_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides BUCKET_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// SQLite pool size (overrides BUCKET_STORE_MAX_CONNECTIONS)
    #[arg(long)]
    pub max_connections: Option<u32>,

    /// Size of buckets created without one (overrides BUCKET_STORE_DEFAULT_BUCKET_SIZE)
    #[arg(long)]
    pub default_bucket_size: Option<u32>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        Self::from_args(Args::parse())
    }

    /// Merge already-parsed CLI args over the environment. CLI wins; the
    /// environment is only consulted for values the CLI left out.
    pub fn from_args(args: Args) -> Result<(Self, bool)> {
        let host = match args.host {
            Some(host) => host,
            None => env::var("BUCKET_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        };
        let port = match args.port {
            Some(port) => port,
            None => env_or("BUCKET_STORE_PORT", 3000)?,
        };
        let database_url = match args.database_url {
            Some(url) => url,
            None => env::var("BUCKET_STORE_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://./data/bucket_store.db".into()),
        };
        let max_connections = match args.max_connections {
            Some(n) => n,
            None => env_or("BUCKET_STORE_MAX_CONNECTIONS", 5)?,
        };
        let default_bucket_size = match args.default_bucket_size {
            Some(n) => n,
            None => env_or("BUCKET_STORE_DEFAULT_BUCKET_SIZE", 10)?,
        };

        let cfg = Self {
            host,
            port,
            database_url,
            max_connections,
            default_bucket_size,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read and parse `key`, falling back to `default` when it is unset.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_values_win() {
        let args = Args::try_parse_from([
            "bucket-store",
            "--host",
            "127.0.0.1",
            "--port",
            "8081",
            "--database-url",
            "sqlite::memory:",
            "--max-connections",
            "2",
            "--default-bucket-size",
            "4",
            "--migrate",
        ])
        .unwrap();

        let (cfg, migrate) = AppConfig::from_args(args).unwrap();
        assert!(migrate);
        assert_eq!(
            cfg,
            AppConfig {
                host: "127.0.0.1".into(),
                port: 8081,
                database_url: "sqlite::memory:".into(),
                max_connections: 2,
                default_bucket_size: 4,
            }
        );
        assert_eq!(cfg.addr(), "127.0.0.1:8081");
    }

    #[test]
    fn rejects_non_numeric_port() {
        assert!(Args::try_parse_from(["bucket-store", "--port", "http"]).is_err());
    }
}
