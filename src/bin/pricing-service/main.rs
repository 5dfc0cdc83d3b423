mod app;
mod audit;
mod cache;
mod cli;
mod config;
mod context;
mod endpoints;
mod error;
mod feeds;
mod orchestrator;
mod ratelimit;
mod result_cache;
mod singleflight;
mod store;
mod watcher;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;

use cli::Opt;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let opt = Opt::parse();
    opt.init_logger()?;

    let listener = TcpListener::bind(&opt.bind)
        .await
        .with_context(|| format!("cannot bind to {}", opt.bind))?;

    opt.into_app_builder().await?.start(listener).await
}
