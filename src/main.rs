use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

mod app;
mod cache;
mod cli;
mod config;
mod core;
mod display;
mod executor;
mod gate;
mod input;
mod pipeline;
mod providers;
mod roles;
mod session;
mod system;

use crate::app::Application;
use crate::cache::ResponseCache;
use crate::cli::Args;
use crate::config::{Config, Provider};
use crate::core::error::AishError;
use crate::roles::RoleRegistry;
use crate::session::SessionStore;

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "aish=debug" } else { "aish=warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), AishError> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = Config::load()?;

    let provider = match &args.provider {
        Some(name) => Provider::from_str(name)
            .ok_or_else(|| AishError::Config(format!("Unsupported provider: {}", name)))?,
        None => config.active_provider.unwrap_or_default(),
    };
    let provider_config = config.provider_config(provider);

    let model = args
        .model
        .clone()
        .or_else(|| provider_config.model.clone())
        .unwrap_or_else(|| provider.default_model().to_string());

    let client = providers::factory::create_client(provider, &provider_config)?;

    let mut registry = RoleRegistry::builtin();
    registry.load_custom(&Config::roles_dir())?;

    let sessions = SessionStore::new(Config::sessions_dir());
    let cache = ResponseCache::new(Config::cache_dir(), config.cache_capacity);

    let mut application =
        Application::new(args, config, registry, sessions, cache, client, model);
    application.run().await
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {}", style("error:").bold().red(), e);
        if e.is_transient() {
            eprintln!("{}", style("The failure looks temporary, try again.").dim());
        }
        std::process::exit(1);
    }
}
