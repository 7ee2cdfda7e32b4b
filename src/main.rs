use std::{process, sync::Arc};

use serde::Serialize;
use sithai::{
    application::{
        detail::PostDetailService,
        error::AppError,
        feed::{FeedService, ListingQuery},
        repos::{BlogSource, BlogWriteRepo},
        submission::{BlogForm, SubmissionService},
    },
    config::{self, Command, ListArgs, ShowArgs, SourceKind, SubmitArgs},
    infra::{
        api::HttpBlogSource,
        documents::DocumentBlogSource,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tokio::sync::watch;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let sources = init_sources(&settings.source).await?;

    match command {
        Command::Serve(_) => run_serve(settings, sources).await,
        Command::List(args) => run_list(&settings, sources, args).await,
        Command::Show(args) => run_show(sources, args).await,
        Command::Categories(_) => run_categories(&settings, sources).await,
        Command::Submit(args) => run_submit(sources, args).await,
    }
}

#[derive(Clone)]
struct Sources {
    reader: Arc<dyn BlogSource>,
    writer: Arc<dyn BlogWriteRepo>,
}

async fn init_sources(settings: &config::SourceSettings) -> Result<Sources, AppError> {
    match settings.kind {
        SourceKind::Api => {
            let source = Arc::new(HttpBlogSource::new(
                settings.api_base_url.clone(),
                settings.request_timeout,
            )?);
            info!(base = %source.base(), "using REST data source");
            Ok(Sources {
                reader: source.clone(),
                writer: source,
            })
        }
        SourceKind::Documents => {
            let source = Arc::new(DocumentBlogSource::load(&settings.documents_path).await?);
            info!(
                path = %settings.documents_path.display(),
                "using document data source"
            );
            Ok(Sources {
                reader: source.clone(),
                writer: source,
            })
        }
    }
}

async fn run_serve(settings: config::Settings, sources: Sources) -> Result<(), AppError> {
    let feed = Arc::new(FeedService::new(
        sources.reader.clone(),
        settings.listing.options(),
    ));
    let categories = feed.watch_categories();

    let state = HttpState {
        feed,
        detail: Arc::new(PostDetailService::new(sources.reader.clone())),
        submissions: Arc::new(SubmissionService::new(sources.reader, sources.writer)),
        breakpoint_px: settings.listing.breakpoint_px,
    };

    let result = serve_http(&settings.server, state).await;
    categories.unsubscribe().await;
    result
}

async fn serve_http(settings: &config::ServerSettings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.addr, "http server listening");

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = stop_rx.wait_for(|stop| *stop).await;
            })
            .await
    });

    tokio::select! {
        joined = &mut server => return server_outcome(joined),
        () = shutdown_signal() => {}
    }

    info!(grace = ?settings.graceful_shutdown, "shutting down");
    let _ = stop_tx.send(true);
    match tokio::time::timeout(settings.graceful_shutdown, &mut server).await {
        Ok(joined) => server_outcome(joined),
        Err(_) => {
            warn!("graceful shutdown timed out; dropping open connections");
            server.abort();
            Ok(())
        }
    }
}

fn server_outcome(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::unexpected(format!("server error: {err}"))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn run_list(
    settings: &config::Settings,
    sources: Sources,
    args: ListArgs,
) -> Result<(), AppError> {
    let feed = FeedService::new(sources.reader, settings.listing.options());
    let view = feed
        .listing(ListingQuery {
            category: args.category,
            page: Some(args.page),
            viewport: args.viewport.into(),
        })
        .await;
    print_json(&view)
}

async fn run_show(sources: Sources, args: ShowArgs) -> Result<(), AppError> {
    let detail = PostDetailService::new(sources.reader)
        .by_slug(&args.slug)
        .await?;
    print_json(&detail)
}

async fn run_categories(settings: &config::Settings, sources: Sources) -> Result<(), AppError> {
    let feed = FeedService::new(sources.reader, settings.listing.options());
    let categories = feed.categories().await?;
    print_json(&categories)
}

async fn run_submit(sources: Sources, args: SubmitArgs) -> Result<(), AppError> {
    let content = match (&args.content_file, args.content) {
        (Some(path), _) => tokio::fs::read_to_string(path)
            .await
            .map_err(|err| AppError::from(InfraError::from(err)))?,
        (None, Some(content)) => content,
        (None, None) => String::new(),
    };

    let mut form = BlogForm::new();
    form.title = args.title;
    form.category_id = args.category;
    form.content = content;
    form.image_url = args.image_url;
    form.categories_loaded(&sources.reader.list_categories().await?);

    let service = SubmissionService::new(sources.reader, sources.writer);
    let record = service.submit(&mut form).await?;
    print_json(&record)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
