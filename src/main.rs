/// vLEI BFF - backend-for-frontend over a KERIA identity agent
///
/// Exposes plain JSON endpoints for identifier, signing, OOBI and
/// credential workflows while the remote agent holds all key material.

mod agent;
mod api;
mod config;
mod context;
mod domain;
mod error;
mod keri;
mod operations;
mod server;
mod session;

use config::ServerConfig;
use context::AppContext;
use error::BffResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> BffResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vlei_bff=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config)?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
        _     _____ ___   ____  _____ _____
 __   _| |   | ____|_ _| | __ )|  ___|  ___|
 \ \ / / |   |  _|  | |  |  _ \| |_  | |_
  \ V /| |___| |___ | |  | |_) |  _| |  _|
   \_/ |_____|_____|___| |____/|_|   |_|

        vLEI Backend-for-Frontend v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
