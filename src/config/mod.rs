//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::posts::BlogOptions;
use crate::domain::ids::id_to_uuid;
use crate::util::timezone::parse_zone;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "quire";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_API_BASE_URL: &str = "https://www.notion.so/api/v3/";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Command-line arguments for the Quire binary.
#[derive(Debug, Parser)]
#[command(name = "quire", version, about = "Notion-backed blog backend")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "QUIRE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve the published post list over HTTP.
    Serve(Box<ServeArgs>),
    /// Print the published post list as JSON.
    Posts(PostsArgs),
    /// Print the record map of one page as JSON.
    Blocks(BlocksArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct NotionOverrides {
    /// Override the id of the blog database page.
    #[arg(long = "notion-page-id", value_name = "ID")]
    pub page_id: Option<String>,

    /// Override the `token_v2` cookie sent to Notion.
    #[arg(long = "notion-token", value_name = "TOKEN")]
    pub token: Option<String>,

    /// Restrict enumeration to one view of the database.
    #[arg(long = "notion-view-id", value_name = "ID")]
    pub view_id: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub notion: NotionOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

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

    /// Override the cache time-to-live.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PostsArgs {
    #[command(flatten)]
    pub notion: NotionOverrides,

    /// Keep entries of type `Page` alongside posts.
    #[arg(long = "include-pages", action = clap::ArgAction::SetTrue)]
    pub include_pages: bool,
}

#[derive(Debug, Args, Clone)]
pub struct BlocksArgs {
    #[command(flatten)]
    pub notion: NotionOverrides,

    /// Page id, compact or dashed.
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub notion: NotionSettings,
    pub blog: BlogSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
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
pub struct NotionSettings {
    /// Dashed id of the blog database page.
    pub root_page_id: Option<String>,
    pub token: Option<String>,
    /// Always ends in `/` so endpoint names join beneath it.
    pub api_base_url: Url,
    pub view_id: Option<String>,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct BlogSettings {
    pub sort_by_date: bool,
    pub timezone: Tz,
    pub include_pages: bool,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl: Duration,
}

impl Settings {
    /// Options for the post service. An unset root page leaves the id empty.
    pub fn blog_options(&self) -> BlogOptions {
        BlogOptions {
            root_page_id: self.notion.root_page_id.clone().unwrap_or_default(),
            view_id: self.notion.view_id.clone(),
            sort_by_date: self.blog.sort_by_date,
            timezone: self.blog.timezone,
        }
    }

    /// The blog database id, required by anything that lists posts.
    pub fn require_root_page(&self) -> Result<&str, LoadError> {
        self.notion
            .root_page_id
            .as_deref()
            .ok_or_else(|| LoadError::invalid("notion.page_id", "a blog database id is required"))
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
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

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("QUIRE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Posts(args)) => raw.apply_notion_overrides(&args.notion),
        Some(Command::Blocks(args)) => raw.apply_notion_overrides(&args.notion),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    notion: RawNotionSettings,
    blog: RawBlogSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(seconds) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(seconds);
        }

        self.apply_notion_overrides(&overrides.notion);
    }

    fn apply_notion_overrides(&mut self, overrides: &NotionOverrides) {
        if let Some(page_id) = overrides.page_id.as_ref() {
            self.notion.page_id = Some(page_id.clone());
        }
        if let Some(token) = overrides.token.as_ref() {
            self.notion.token = Some(token.clone());
        }
        if let Some(view_id) = overrides.view_id.as_ref() {
            self.notion.view_id = Some(view_id.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            notion,
            blog,
            cache,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let notion = build_notion_settings(notion)?;
        let blog = build_blog_settings(blog)?;
        let cache = build_cache_settings(cache)?;

        Ok(Self {
            server,
            logging,
            notion,
            blog,
            cache,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_notion_settings(notion: RawNotionSettings) -> Result<NotionSettings, LoadError> {
    let root_page_id = match non_empty(notion.page_id) {
        Some(id) => Some(id_to_uuid(&id).ok_or_else(|| {
            LoadError::invalid("notion.page_id", format!("`{id}` is not a Notion id"))
        })?),
        None => None,
    };

    let view_id = match non_empty(notion.view_id) {
        Some(id) => Some(id_to_uuid(&id).ok_or_else(|| {
            LoadError::invalid("notion.view_id", format!("`{id}` is not a Notion id"))
        })?),
        None => None,
    };

    let mut base = non_empty(notion.api_base_url).unwrap_or_else(|| DEFAULT_API_BASE_URL.into());
    if !base.ends_with('/') {
        base.push('/');
    }
    let api_base_url = Url::parse(&base)
        .map_err(|err| LoadError::invalid("notion.api_base_url", err.to_string()))?;

    let timeout_secs = notion
        .request_timeout_seconds
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "notion.request_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(NotionSettings {
        root_page_id,
        token: non_empty(notion.token),
        api_base_url,
        view_id,
        request_timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_blog_settings(blog: RawBlogSettings) -> Result<BlogSettings, LoadError> {
    let zone = non_empty(blog.timezone).unwrap_or_else(|| DEFAULT_TIMEZONE.into());
    let timezone = parse_zone(&zone).ok_or_else(|| {
        LoadError::invalid("blog.timezone", format!("unknown time zone `{zone}`"))
    })?;

    Ok(BlogSettings {
        sort_by_date: blog.sort_by_date.unwrap_or(false),
        timezone,
        include_pages: blog.include_pages.unwrap_or(false),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let ttl_seconds = cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            "must be greater than zero",
        ));
    }
    Ok(CacheSettings {
        ttl: Duration::from_secs(ttl_seconds),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawNotionSettings {
    page_id: Option<String>,
    token: Option<String>,
    api_base_url: Option<String>,
    view_id: Option<String>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBlogSettings {
    sort_by_date: Option<bool>,
    timezone: Option<String>,
    include_pages: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    ttl_seconds: Option<u64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
