use anyhow::Result;
use clap::Parser;
use radio_streamer::{app::App, args::Args};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    tracing::info!(
        "radio-streamer {} (git {})",
        env!("CARGO_PKG_VERSION"),
        git_version::git_version!(fallback = "unknown")
    );
    App::new(&Args::parse()).await?.run().await
}
