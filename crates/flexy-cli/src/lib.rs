pub mod cli;
pub mod client;
pub mod commands;
pub mod render;

use std::ffi::OsString;
use std::path::Path;

use anyhow::{Context, anyhow};
use clap::Parser;
use flexy_core::config::{CONFIG_ENV_VAR, FlexyConfig, resolve_config_path};
use tracing::{debug, info};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = cli::GlobalCli::parse_from(raw_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting flexy CLI"
    );

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(api) = cli.api {
        config.api_base = api.trim().trim_end_matches('/').to_string();
    }
    if config.api_base.is_empty() {
        return Err(anyhow!(
            "no backend address: set api_base in {} or pass --api",
            flexy_core::config::CONFIG_FILE_NAME
        ));
    }
    debug!(api_base = %config.api_base, "using backend");

    let client = client::HttpShiftApi::new(config.api_base.clone());
    let renderer = render::Renderer::new(!cli.no_color);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(commands::dispatch(&client, &config, &renderer, cli.command))?;

    info!("done");
    Ok(())
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<FlexyConfig> {
    let env_value = std::env::var(CONFIG_ENV_VAR).ok();
    let config_dir = dirs::config_dir();

    match resolve_config_path(explicit, env_value.as_deref(), config_dir.as_deref()) {
        Some(path) => FlexyConfig::load(&path).context("failed to load configuration"),
        None => Ok(FlexyConfig::default()),
    }
}
