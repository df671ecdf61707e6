use anyhow::Context;
use poem::listener::TcpListener;
use placeholder_engine::core::fonts::FontBook;
use placeholder_engine::core::renderer::RenderingEngine;
use placeholder_engine::settings::get_config;
use placeholder_engine::{AppState, init_openapi_route};

use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, source) = get_config()?;

    // Logging to File
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level())
        .init();

    tracing::info!("{}", source.describe());
    tracing::info!("Initializing Placeholder Service...");
    tracing::info!("run with config: {:?}", config);

    let mut fonts = FontBook::system();
    if let Some(dir) = &config.font_dir {
        fonts.load_dir(dir);
    }
    if fonts.is_empty() {
        tracing::warn!("no fonts available, PNG labels will not be drawn");
    }
    let engine = RenderingEngine::with_fonts(fonts);

    // Init App State
    let app_state = Arc::new(AppState::new(
        engine,
        config.public_url()?,
        config.max_previews,
    ));

    tracing::info!("Rendering engine initialized successfully");

    let app = init_openapi_route(app_state.clone(), &config);
    tracing::info!("run server on {}:{}", config.host, config.port);
    poem::Server::new(TcpListener::bind(format!(
        "{}:{}",
        config.host, config.port
    )))
    .run(app)
    .await
    .context("server stopped with an error")
}
