//! underblog - a tiny static blog generator for dated markdown posts.

mod build;
mod cli;
mod config;
mod error;
mod generator;
mod init;
mod logger;
mod pipeline;
mod post;
mod serve;
mod watch;

use anyhow::{Context, Result};
use build::build_blog;
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use init::new_blog;
use pipeline::CancelToken;
use serve::serve_blog;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = SiteConfig::load(&cli)?;
    let cancel = CancelToken::new();

    match &cli.command {
        Commands::Init { name } => new_blog(&config, name.is_some()),
        Commands::Build => build(&config, &cancel),
        Commands::Serve { .. } => {
            // A failing first build is fatal; later rebuilds only log
            build(&config, &cancel)?;
            serve_blog(&cli, config, &cancel)
        }
    }
}

fn build(config: &SiteConfig, cancel: &CancelToken) -> Result<()> {
    build_blog(config, cancel)
        .map(|_| ())
        .with_context(|| format!("Failed to build {}", config.root.display()))
}
