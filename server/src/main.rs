use anyhow::Result;
use axum::Router;
use clap::Parser;
use sift_core::REQUEST_WINDOW;
use sift_server::{build_app, AppConfig};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Space-separated stop words
    #[arg(long, env = "SIFT_STOP_WORDS", default_value = "")]
    stop_words: String,
    /// Token required by POST/DELETE /documents
    #[arg(long, env = "ADMIN_TOKEN")]
    admin_token: Option<String>,
    /// Comma-separated list of allowed CORS origins
    #[arg(long, env = "CORS_ALLOW_ORIGIN")]
    cors_allow_origin: Option<String>,
    /// Number of recent searches kept for statistics
    #[arg(long, default_value_t = REQUEST_WINDOW)]
    request_window: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = AppConfig {
        stop_words: args.stop_words,
        admin_token: args.admin_token,
        cors_allow_origin: args.cors_allow_origin,
        request_window: args.request_window,
    };
    let app: Router = build_app(&config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
