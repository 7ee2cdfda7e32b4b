//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{net::SocketAddr, num::NonZeroUsize, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::listing::ListingOptions;
use crate::application::pagination::{
    DEFAULT_BREAKPOINT_PX, DEFAULT_MAX_VISIBLE_PAGES, DEFAULT_NARROW_PAGE_SIZE,
    DEFAULT_WIDE_PAGE_SIZE, PageSizes,
};
use crate::domain::posts::DEFAULT_EXCERPT_CHARS;

pub use cli::{
    CategoriesArgs, CliArgs, Command, ListArgs, ServeArgs, ServeOverrides, ShowArgs,
    SourceKindArg, SourceOverrides, SubmitArgs, ViewportArg,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "sithai";
const ENV_PREFIX: &str = "SITHAI";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_API_BASE_URL: &str = "http://localhost:4000";
const DEFAULT_DOCUMENTS_PATH: &str = "data/documents.json";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub source: SourceSettings,
    pub listing: ListingSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// REST backend speaking the `{ success, data, message }` envelope.
    Api,
    /// Document collections loaded from a local seed file.
    Documents,
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "api" | "rest" => Ok(SourceKind::Api),
            "documents" | "document" => Ok(SourceKind::Documents),
            other => Err(format!("unknown source kind `{other}` (expected api|documents)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub kind: SourceKind,
    pub api_base_url: Url,
    pub documents_path: PathBuf,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ListingSettings {
    pub narrow_page_size: NonZeroUsize,
    pub wide_page_size: NonZeroUsize,
    pub breakpoint_px: u32,
    pub max_visible_pages: NonZeroUsize,
    pub excerpt_chars: NonZeroUsize,
}

impl ListingSettings {
    pub fn options(&self) -> ListingOptions {
        ListingOptions {
            page_sizes: PageSizes {
                narrow: self.narrow_page_size.get(),
                wide: self.wide_page_size.get(),
            },
            max_visible_pages: self.max_visible_pages.get(),
            excerpt_chars: self.excerpt_chars.get(),
        }
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

/// Load settings using the configured precedence (file → environment → CLI).
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
        Some(Command::List(args)) => raw.apply_source_overrides(&args.overrides),
        Some(Command::Show(args)) => raw.apply_source_overrides(&args.overrides),
        Some(Command::Categories(args)) => raw.apply_source_overrides(&args.overrides),
        Some(Command::Submit(args)) => raw.apply_source_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    source: RawSourceSettings,
    listing: RawListingSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(size) = overrides.listing_narrow_page_size {
            self.listing.narrow_page_size = Some(size);
        }
        if let Some(size) = overrides.listing_wide_page_size {
            self.listing.wide_page_size = Some(size);
        }
        if let Some(width) = overrides.listing_breakpoint_px {
            self.listing.breakpoint_px = Some(width);
        }
        if let Some(count) = overrides.listing_max_visible_pages {
            self.listing.max_visible_pages = Some(count);
        }

        self.apply_source_overrides(&overrides.source);
    }

    fn apply_source_overrides(&mut self, overrides: &SourceOverrides) {
        if let Some(kind) = overrides.kind {
            self.source.kind = Some(
                match kind {
                    SourceKindArg::Api => "api",
                    SourceKindArg::Documents => "documents",
                }
                .to_string(),
            );
        }
        if let Some(url) = overrides.api_base_url.as_ref() {
            self.source.api_base_url = Some(url.clone());
        }
        if let Some(path) = overrides.documents_path.as_ref() {
            self.source.documents_path = Some(path.clone());
        }
        if let Some(seconds) = overrides.request_timeout_seconds {
            self.source.request_timeout_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            source,
            listing,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let source = build_source_settings(source)?;
        let listing = build_listing_settings(listing)?;

        Ok(Self {
            server,
            logging,
            source,
            listing,
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

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
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

fn build_source_settings(source: RawSourceSettings) -> Result<SourceSettings, LoadError> {
    let kind = match source.kind {
        Some(kind) => {
            SourceKind::from_str(&kind).map_err(|reason| LoadError::invalid("source.kind", reason))?
        }
        None => SourceKind::Api,
    };

    let raw_url = source
        .api_base_url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let api_base_url = Url::parse(&raw_url).map_err(|err| {
        LoadError::invalid("source.api_base_url", format!("invalid url `{raw_url}`: {err}"))
    })?;
    if !matches!(api_base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "source.api_base_url",
            "scheme must be http or https",
        ));
    }

    let documents_path = source
        .documents_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DOCUMENTS_PATH));

    let timeout_secs = source
        .request_timeout_seconds
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "source.request_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(SourceSettings {
        kind,
        api_base_url,
        documents_path,
        request_timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_listing_settings(listing: RawListingSettings) -> Result<ListingSettings, LoadError> {
    let narrow_page_size = non_zero_usize(
        listing
            .narrow_page_size
            .unwrap_or(DEFAULT_NARROW_PAGE_SIZE as u64),
        "listing.narrow_page_size",
    )?;
    let wide_page_size = non_zero_usize(
        listing
            .wide_page_size
            .unwrap_or(DEFAULT_WIDE_PAGE_SIZE as u64),
        "listing.wide_page_size",
    )?;
    let max_visible_pages = non_zero_usize(
        listing
            .max_visible_pages
            .unwrap_or(DEFAULT_MAX_VISIBLE_PAGES as u64),
        "listing.max_visible_pages",
    )?;
    let excerpt_chars = non_zero_usize(
        listing
            .excerpt_chars
            .unwrap_or(DEFAULT_EXCERPT_CHARS as u64),
        "listing.excerpt_chars",
    )?;

    let breakpoint_px = listing.breakpoint_px.unwrap_or(DEFAULT_BREAKPOINT_PX);
    if breakpoint_px == 0 {
        return Err(LoadError::invalid(
            "listing.breakpoint_px",
            "must be greater than zero",
        ));
    }

    Ok(ListingSettings {
        narrow_page_size,
        wide_page_size,
        breakpoint_px,
        max_visible_pages,
        excerpt_chars,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSourceSettings {
    kind: Option<String>,
    api_base_url: Option<String>,
    documents_path: Option<PathBuf>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawListingSettings {
    narrow_page_size: Option<u64>,
    wide_page_size: Option<u64>,
    breakpoint_px: Option<u32>,
    max_visible_pages: Option<u64>,
    excerpt_chars: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
