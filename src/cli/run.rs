//! Run command implementation

use crate::config::{Config, NotifyMode};
use crate::engine::Engine;
use crate::feed::{BinanceFuturesFeed, FuturesRestClient, MarketFeed};
use crate::gateway::ApiGateway;
use crate::notify::{self, LogSink, NotificationSink, TelegramSink};
use anyhow::Context;
use clap::Args;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Skip the REST backfill and warm up from live data only
    #[arg(long)]
    pub no_backfill: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let gateway = Arc::new(ApiGateway::new(config.gateway_params()));

        let feed: Arc<dyn MarketFeed> = Arc::new(BinanceFuturesFeed::new(
            config.feed.symbols.iter().map(String::as_str),
        ));
        let rest = (config.feed.backfill && !self.no_backfill)
            .then(|| Arc::new(FuturesRestClient::new(gateway.clone())));

        let sink: Arc<dyn NotificationSink> = match config.notify.mode {
            NotifyMode::Log => Arc::new(LogSink),
            NotifyMode::Telegram => {
                let token = std::env::var("TELEGRAM_BOT_TOKEN")
                    .context("TELEGRAM_BOT_TOKEN is required for telegram notifications")?;
                let chat_id = config
                    .notify
                    .telegram_chat_id
                    .clone()
                    .context("notify.telegram_chat_id is required for telegram mode")?;
                Arc::new(TelegramSink::new(token, chat_id))
            }
        };

        let (signal_tx, signal_rx) = mpsc::channel(256);
        let dispatcher = notify::spawn_dispatcher(signal_rx, sink);

        let mut engine = Engine::new(config.engine_params(), feed, rest, signal_tx);
        engine.start().await?;

        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for shutdown signal")?;
        tracing::info!("shutdown requested");

        engine.shutdown().await;
        drop(engine);
        dispatcher
            .await
            .context("notification dispatcher panicked")?;
        Ok(())
    }
}
