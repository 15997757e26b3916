use std::{io::Write, process, sync::Arc};

use quire::{
    application::{error::AppError, fetchers::NotionFetcher, posts::PostService},
    cache::{CacheConfig, NotionCache, SystemClock},
    config,
    infra::{
        http::{self, HttpState},
        notion::NotionClient,
        telemetry,
    },
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info};
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
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Posts(args) => run_posts(settings, args.include_pages).await,
        config::Command::Blocks(args) => run_blocks(settings, &args.id).await,
    }
}

fn build_post_service(settings: &config::Settings) -> Result<PostService, AppError> {
    let options = settings.blog_options();
    let client = NotionClient::new(&settings.notion, options.timezone.name())?;
    let clock = Arc::new(SystemClock);
    let cache = Arc::new(NotionCache::with_clock(
        &CacheConfig::from(&settings.cache),
        clock.clone(),
    ));
    let fetcher = NotionFetcher::new(Arc::new(client), cache);
    Ok(PostService::new(fetcher, options, clock))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    settings.require_root_page()?;
    let posts = Arc::new(build_post_service(&settings)?);
    info!(
        root_page_id = %posts.options().root_page_id,
        ttl_secs = settings.cache.ttl.as_secs(),
        "starting quire"
    );
    let state = HttpState {
        posts,
        include_pages: settings.blog.include_pages,
    };
    http::serve(&settings.server, state).await?;
    Ok(())
}

async fn run_posts(settings: config::Settings, include_pages: bool) -> Result<(), AppError> {
    settings.require_root_page()?;
    let posts = build_post_service(&settings)?;
    let include_pages = include_pages || settings.blog.include_pages;
    let list = posts
        .get_all_posts(include_pages)
        .await
        .ok_or_else(|| AppError::unavailable("the blog database could not be read"))?;
    print_json(&list)
}

async fn run_blocks(settings: config::Settings, id: &str) -> Result<(), AppError> {
    let posts = build_post_service(&settings)?;
    let record_map = posts.get_post_blocks(id).await?;
    print_json(record_map.as_ref())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    writeln!(stdout).map_err(|err| AppError::unexpected(format!("failed to write output: {err}")))
}
