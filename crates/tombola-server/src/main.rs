//! Tombola server binary.
//!
//! Configuration via environment:
//! - `TOMBOLA_ADDR` — bind address (default `0.0.0.0:8080`)
//! - `RUST_LOG` — tracing filter (default `info`)

use tombola_server::TombolaServerBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("TOMBOLA_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let server = TombolaServerBuilder::new().bind(&addr).build().await?;
    tracing::info!(%addr, "tombola server starting");

    server.run().await?;
    Ok(())
}
