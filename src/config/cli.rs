use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

use crate::application::pagination::Viewport;

/// Command-line arguments for the Sithai binary.
#[derive(Debug, Parser)]
#[command(name = "sithai", version, about = "Sithai bilingual blog reader")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "SITHAI_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP reading surface.
    Serve(Box<ServeArgs>),
    /// Print one page of the post listing as JSON.
    List(ListArgs),
    /// Print a single verified post as JSON.
    Show(ShowArgs),
    /// Print the category list as JSON.
    Categories(CategoriesArgs),
    /// Submit a new post for review.
    Submit(SubmitArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKindArg {
    Api,
    Documents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewportArg {
    Narrow,
    Wide,
}

impl From<ViewportArg> for Viewport {
    fn from(value: ViewportArg) -> Self {
        match value {
            ViewportArg::Narrow => Viewport::Narrow,
            ViewportArg::Wide => Viewport::Wide,
        }
    }
}

/// Overrides shared by every command that talks to a data source.
#[derive(Debug, Args, Default, Clone)]
pub struct SourceOverrides {
    /// Override the data source backend.
    #[arg(long = "source-kind", value_enum, value_name = "KIND")]
    pub kind: Option<SourceKindArg>,

    /// Override the REST API base URL.
    #[arg(long = "source-api-base-url", value_name = "URL", value_hint = ValueHint::Url)]
    pub api_base_url: Option<String>,

    /// Override the document store seed file.
    #[arg(
        long = "source-documents-path",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub documents_path: Option<PathBuf>,

    /// Override the per-request timeout for the REST API.
    #[arg(long = "source-request-timeout-seconds", value_name = "SECONDS")]
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
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub source: SourceOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the page size used for narrow viewports.
    #[arg(long = "listing-narrow-page-size", value_name = "COUNT")]
    pub listing_narrow_page_size: Option<u64>,

    /// Override the page size used for wide viewports.
    #[arg(long = "listing-wide-page-size", value_name = "COUNT")]
    pub listing_wide_page_size: Option<u64>,

    /// Override the viewport width that separates narrow from wide layouts.
    #[arg(long = "listing-breakpoint-px", value_name = "PIXELS")]
    pub listing_breakpoint_px: Option<u32>,

    /// Override the number of page links shown in wide layouts.
    #[arg(long = "listing-max-visible-pages", value_name = "COUNT")]
    pub listing_max_visible_pages: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub overrides: SourceOverrides,

    /// Category id to filter by; `all` or absent lists every category.
    #[arg(long, value_name = "ID")]
    pub category: Option<String>,

    /// 1-based page to show; out-of-range values are clamped.
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub page: i64,

    /// Layout class used to size the page.
    #[arg(long, value_enum, default_value_t = ViewportArg::Wide)]
    pub viewport: ViewportArg,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub overrides: SourceOverrides,

    /// Slug of the post to show.
    pub slug: String,
}

#[derive(Debug, Args, Clone)]
pub struct CategoriesArgs {
    #[command(flatten)]
    pub overrides: SourceOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub overrides: SourceOverrides,

    /// Post title in Tamil, English, or both.
    #[arg(long)]
    pub title: String,

    /// Category id; defaults to the first category the source returns.
    #[arg(long, value_name = "ID")]
    pub category: Option<String>,

    /// Read the body from this file instead of `--content`.
    #[arg(
        long = "content-file",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        conflicts_with = "content"
    )]
    pub content_file: Option<PathBuf>,

    /// Post body.
    #[arg(long)]
    pub content: Option<String>,

    /// Optional cover image URL.
    #[arg(long = "image-url", value_name = "URL")]
    pub image_url: Option<String>,
}
