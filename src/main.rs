//! segmentctl - declarative management of segmentation policy engine objects

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use segmentctl::cli::Cli;

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries only the JSON result document
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = cli.run().await {
        eprintln!("segmentctl: {e}");
        std::process::exit(1);
    }
}
