use clap::Parser;
use voltrend::cli::{Cli, Commands};
use voltrend::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Invalid configuration is fatal before anything starts
    let config = Config::load(&cli.config)?;

    voltrend::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!(config = %cli.config, "starting analysis engine");
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Exchange: {}", config.feed.exchange);
            println!("  Symbols: {}", config.feed.symbols.join(", "));
            println!(
                "  Timeframes: {} (signal: {})",
                config
                    .feed
                    .timeframes
                    .iter()
                    .map(|tf| tf.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                config.feed.signal_timeframe
            );
            println!(
                "  Profile: bucket width {}, window {} candles",
                config.profile.bucket_width, config.profile.window_candles
            );
            println!(
                "  Signal: confidence >= {}, cooldown {}s / {} candles",
                config.signal.actionable_confidence,
                config.signal.cooldown_secs,
                config.signal.cooldown_candles
            );
            println!("  Notify: {:?}", config.notify.mode);
        }
        Commands::Status => {
            println!("voltrend status");
            println!("  Status: not running");
        }
    }

    Ok(())
}
