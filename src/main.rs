//! Order Book Replay
//!
//! Loads a recorded snapshot, replays depth update files against it and
//! prints the resulting book state.

use anyhow::Context;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use avl_orderbook::{Config, LogFormat, Replayer};

fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter = EnvFilter::from_default_env().add_directive(Level::INFO.into());
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init(),
    }

    info!(
        symbol = %config.symbol,
        decimals = config.scale.decimals(),
        deltas = config.delta_paths.len(),
        "Starting order book replay"
    );

    let snapshot_path = config
        .snapshot_path
        .as_deref()
        .context("SNAPSHOT_PATH must point to a snapshot file")?;

    let mut replayer = Replayer::from_config(&config);
    replayer
        .load_snapshot_file(snapshot_path)
        .with_context(|| format!("loading snapshot {}", snapshot_path.display()))?;

    for path in &config.delta_paths {
        replayer
            .replay_file(path)
            .with_context(|| format!("replaying {}", path.display()))?;
    }

    let book = replayer.book();
    info!(
        best_bid = ?book.best_bid().map(|p| config.scale.to_decimal(p)),
        best_ask = ?book.best_ask().map(|p| config.scale.to_decimal(p)),
        spread = ?book.spread(),
        "Replay complete"
    );

    let state = replayer.state(config.depth_levels);
    println!("{}", serde_json::to_string_pretty(&state)?);

    if config.print_structure {
        print!("{book}");
    }

    Ok(())
}
