use tracing::{error, info};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

mod api;
mod commands;
mod config;
mod models;
mod services;
mod utils;

fn env_filter() -> EnvFilter {
    let mut filter = EnvFilter::from_default_env();
    for directive in ["markup_wallet=debug", "tungstenite=warn", "reqwest=warn"] {
        if let Ok(directive) = directive.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("💼 markup-wallet v{}", env!("CARGO_PKG_VERSION"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = commands::execute(&args).await {
        error!("❌ {}", e);
        std::process::exit(1);
    }
}
