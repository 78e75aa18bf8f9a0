use anyhow::{Context, bail};
use env_logger::Builder;
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use v2x_channel_sim::config::RunnerConfig;
use v2x_channel_sim::runner::run_scene;
use v2x_channel_sim::scene::load_scene;

struct Args {
    scene_path: PathBuf,
    config_path: Option<PathBuf>,
    seed: Option<u64>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut scene_path = None;
    let mut config_path = None;
    let mut seed = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args.next().context("--config requires a path")?;
                config_path = Some(PathBuf::from(value));
            }
            "--seed" => {
                let value = args.next().context("--seed requires a value")?;
                seed = Some(value.parse::<u64>().context("--seed must be an unsigned integer")?);
            }
            _ if scene_path.is_none() => scene_path = Some(PathBuf::from(arg)),
            other => bail!("unexpected argument: {other}"),
        }
    }

    let Some(scene_path) = scene_path else {
        bail!("usage: v2x-channel-sim <scene.json> [--config config.toml] [--seed N]");
    };
    Ok(Args {
        scene_path,
        config_path,
        seed,
    })
}

fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    let config = match &args.config_path {
        Some(path) => RunnerConfig::load(path).map_err(|e| anyhow::anyhow!(e))?,
        None => RunnerConfig::default(),
    };

    let level = LevelFilter::from_str(&config.log_level).unwrap_or(LevelFilter::Info);
    Builder::from_default_env().filter_level(level).init();

    let mut scene = load_scene(Path::new(&args.scene_path))
        .with_context(|| format!("Failed to load scene {}", args.scene_path.display()))?;

    // CLI seed beats the config file, which beats the scene.
    if let Some(seed) = args.seed.or(config.seed) {
        scene.seed = seed;
    }

    log::info!(
        "running scene {} with {} objects and {} transmissions (seed {})",
        args.scene_path.display(),
        scene.objects.len(),
        scene.transmissions.len(),
        scene.seed
    );

    let report = run_scene(&scene);
    log::info!(
        "done: {} sent, {} delivered, {} interfered",
        report.sent,
        report.delivered,
        report.interfered
    );
    Ok(())
}
