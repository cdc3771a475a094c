//! Stagen - An incremental static site generator.

mod assets;
mod build;
mod cli;
mod config;
mod content;
mod error;
mod logger;
mod menu;
mod pagination;
mod render;
mod site;
mod state;
mod watch;

use anyhow::{Result, bail};
use build::BuildContext;
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use std::path::Path;
use watch::watch_for_changes_blocking;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Build { .. } => {
            let (_, failed) = build_all(config, &cli)?;
            if failed {
                bail!("build finished with errors");
            }
            Ok(())
        }
        Commands::Clean => build::clean(&config),
        Commands::Watch { .. } => {
            let (mut ctx, _) = build_all(config, &cli)?;
            watch_for_changes_blocking(&mut ctx)
        }
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &Cli) -> Result<SiteConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    let mut config = if config_path.exists() {
        SiteConfig::from_path(&config_path)?
    } else {
        SiteConfig::default()
    };
    config.update_with_cli(cli);

    if matches!(cli.command, Commands::Clean) {
        return Ok(config);
    }
    config.validate()?;
    Ok(config)
}

/// Run a full build and copy assets. Returns the context for further
/// incremental passes and whether the build had failures.
fn build_all(config: SiteConfig, cli: &Cli) -> Result<(BuildContext, bool)> {
    if cli.build_args().is_some_and(|args| args.clean) {
        build::clean(&config)?;
    }

    let mut ctx = BuildContext::from_config(config);
    let report = ctx.full_build();
    report.log();
    assets::copy_assets(ctx.config())?;
    Ok((ctx, report.has_failures()))
}
