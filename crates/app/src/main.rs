use anyhow::Context;
use clap::Parser;
use yarn_core::SceneConfig;

mod cli;
mod dispatch;
mod logging;
mod shaders;

use cli::Cli;
use dispatch::Destination;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::setup_tracing(cli.log_level());

    let mut config = match &cli.config {
        Some(path) => SceneConfig::load(path)?,
        None => SceneConfig::default(),
    };
    cli.apply(&mut config);

    if cli.print_config {
        let json = config.to_json_pretty().context("failed to serialize config")?;
        println!("{json}");
        return Ok(());
    }

    let destination = if cli.dry_run {
        Destination::DryRun
    } else if let Some(path) = &cli.rib {
        Destination::Archive(path)
    } else {
        shaders::compile_shaders(&cli.shaders)?;
        Destination::Renderer(&cli.renderer)
    };

    let stats = dispatch::run(&config, destination)?;
    tracing::info!(
        tori = stats.tori,
        strands = stats.strands,
        control_points = stats.control_points,
        "done"
    );
    Ok(())
}
