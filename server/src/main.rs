//! Campus server: reads settings from the environment (and `.env`), bootstraps the
//! database and serves the site.
//!
//! Run from repo root: `cargo run -p campus-server`

use campus::{app, AppState, Settings};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("campus=info,campus_server=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let state = AppState::bootstrap(&settings).await?;

    let listener = TcpListener::bind(settings.bind_addr).await?;
    let addr = listener.local_addr()?;
    tracing::info!(mode = ?settings.mode, "campus listening on http://{}", addr);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
