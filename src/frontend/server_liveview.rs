use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::ws::WebSocketUpgrade, response::Html, routing::get, Router};
use indoc::formatdoc;
use tracing::info;

use super::app::{app, AppProps};
use crate::chat_core::{FileStorage, LocalTranscript, TranscriptStore};
use crate::config::Config;

pub async fn start_server() -> Result<()> {
    let config = Arc::new(Config::from_env()?);

    // Unreadable history stops the server before anyone connects.
    let history = LocalTranscript::new(FileStorage::new(&config.history_dir))
        .load()
        .with_context(|| {
            format!(
                "Failed to load chat history from {}",
                config.history_dir.display()
            )
        })?;
    info!(entries = history.len(), "Chat history loaded");

    let addr = config.listen_addr;
    let page = formatdoc!(
        r#"
        <!DOCTYPE html>
        <html>
            <head>
                <title>Kalpataru</title>
                <meta name="viewport"
                content="width=device-width,
                initial-scale=1,
                minimum-scale=1,
                maximum-scale=1,
                user-scalable=no">
            </head>
            <body> <div id="main"></div> </body>
            {glue}
        </html>
        "#,
        glue = dioxus_liveview::interpreter_glue(&format!("ws://{}/ws", config.reachable_addr))
    );

    let view = dioxus_liveview::LiveViewPool::new();
    let session_config = Arc::clone(&config);

    let app = Router::new()
        .route("/", get(move || async move { Html(page) }))
        .route(
            "/ws",
            get(move |ws: WebSocketUpgrade| async move {
                ws.on_upgrade(move |socket| async move {
                    let props = AppProps {
                        config: session_config,
                    };
                    _ = view
                        .launch_with_props(dioxus_liveview::axum_socket(socket), app, props)
                        .await;
                })
            }),
        );

    info!(api = %config.api_url, "Listening on http://{addr}");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
