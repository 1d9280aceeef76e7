//! Settings for the `serve` and `migrate` commands.
//!
//! Sources are applied lowest first: `config/default.*`, `postcache.*`, the
//! `--config-file` path, `POSTCACHE__SECTION__KEY` variables, then flags.

use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::cache::{DEFAULT_CACHE_TTL, MAX_CACHE_TTL};
use crate::application::posts::{CachePolicy, InvalidationPolicy};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "postcache";
const ENV_PREFIX: &str = "POSTCACHE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_CACHE_CAPACITY: usize = 1000;
const MUST_BE_POSITIVE: &str = "must be greater than zero";

/// Command-line arguments for the postcache binary.
#[derive(Debug, Parser)]
#[command(
    name = "postcache",
    version,
    about = "Cache-aside post service backed by Postgres"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "POSTCACHE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Apply pending database migrations and exit.
    Migrate(MigrateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the per-operation deadline.
    #[arg(long = "server-request-timeout-seconds", value_name = "SECONDS")]
    pub request_timeout_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Toggle the post cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the cache entry time-to-live.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the maximum number of cached entries.
    #[arg(long = "cache-capacity", value_name = "COUNT")]
    pub cache_capacity: Option<usize>,

    /// Override the invalidation policy (id_only|all_keys).
    #[arg(long = "cache-invalidation", value_name = "POLICY")]
    pub cache_invalidation: Option<String>,

    /// Surface cache write failures to callers.
    #[arg(
        long = "cache-strict-writes",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_strict_writes: Option<bool>,
}

/// Validated settings with every default filled in.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl: Duration,
    pub capacity: usize,
    pub invalidation: InvalidationPolicy,
    pub strict_writes: bool,
}

impl CacheSettings {
    pub fn policy(&self) -> CachePolicy {
        CachePolicy {
            ttl: self.ttl,
            invalidation: self.invalidation,
            strict_writes: self.strict_writes,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read configuration sources: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Merge every source and validate the result.
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Migrate(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Parse process arguments and load settings with them.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, cli: &ServeOverrides) {
        overlay(&mut self.server.host, &cli.server_host);
        overlay(&mut self.server.port, &cli.server_port);
        overlay(
            &mut self.server.request_timeout_seconds,
            &cli.request_timeout_seconds,
        );
        overlay(&mut self.logging.level, &cli.log_level);
        overlay(&mut self.logging.json, &cli.log_json);
        overlay(&mut self.database.url, &cli.database_url);
        overlay(
            &mut self.database.max_connections,
            &cli.database_max_connections,
        );
        overlay(&mut self.cache.enabled, &cli.cache_enabled);
        overlay(&mut self.cache.ttl_seconds, &cli.cache_ttl_seconds);
        overlay(&mut self.cache.capacity, &cli.cache_capacity);
        overlay(&mut self.cache.invalidation, &cli.cache_invalidation);
        overlay(&mut self.cache.strict_writes, &cli.cache_strict_writes);
    }

    fn apply_database_override(&mut self, cli: &DatabaseOverride) {
        overlay(&mut self.database.url, &cli.database_url);
    }
}

/// A flag given on the command line replaces whatever the files and
/// environment produced.
fn overlay<T: Clone>(slot: &mut Option<T>, flag: &Option<T>) {
    if let Some(value) = flag {
        *slot = Some(value.clone());
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cache,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.as_deref().unwrap_or(DEFAULT_HOST);
    let port = positive(server.port.unwrap_or(DEFAULT_PORT), "server.port")?;
    let ip: IpAddr = host
        .trim_matches(|c| c == '[' || c == ']')
        .parse()
        .map_err(|err| LoadError::invalid("server.host", format!("`{host}`: {err}")))?;

    let timeout_secs = positive(
        server
            .request_timeout_seconds
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        "server.request_timeout_seconds",
    )?;

    Ok(ServerSettings {
        addr: SocketAddr::new(ip, port),
        request_timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = logging
        .level
        .as_deref()
        .map(LevelFilter::from_str)
        .transpose()
        .map_err(|err| LoadError::invalid("logging.level", err.to_string()))?
        .unwrap_or(LevelFilter::INFO);

    let format = match logging.json {
        Some(true) => LogFormat::Json,
        _ => LogFormat::Compact,
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database
        .url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty());

    let max_connections = NonZeroU32::new(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
    )
    .ok_or_else(|| LoadError::invalid("database.max_connections", MUST_BE_POSITIVE))?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let ttl = match cache.ttl_seconds {
        Some(seconds) if seconds > MAX_CACHE_TTL.as_secs() => {
            return Err(LoadError::invalid(
                "cache.ttl_seconds",
                format!("must not exceed {}", MAX_CACHE_TTL.as_secs()),
            ));
        }
        Some(seconds) => Duration::from_secs(positive(seconds, "cache.ttl_seconds")?),
        None => DEFAULT_CACHE_TTL,
    };
    let capacity = positive(
        cache.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
        "cache.capacity",
    )?;

    let invalidation = cache
        .invalidation
        .as_deref()
        .map(InvalidationPolicy::from_str)
        .transpose()
        .map_err(|reason| LoadError::invalid("cache.invalidation", reason))?
        .unwrap_or_default();

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        ttl,
        capacity,
        invalidation,
        strict_writes: cache.strict_writes.unwrap_or(true),
    })
}

fn positive<T>(value: T, key: &'static str) -> Result<T, LoadError>
where
    T: PartialEq + Default,
{
    if value == T::default() {
        return Err(LoadError::invalid(key, MUST_BE_POSITIVE));
    }
    Ok(value)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    ttl_seconds: Option<u64>,
    capacity: Option<usize>,
    invalidation: Option<String>,
    strict_writes: Option<bool>,
}
