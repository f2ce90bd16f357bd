use std::sync::Arc;

use qa_relay::channels::{Channel, TelegramChannel};
use qa_relay::config::BotConfig;
use qa_relay::error::{ConfigError, Error};
use qa_relay::relay::Relay;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            if matches!(e, ConfigError::MissingEnvVar(_)) {
                eprintln!("  export TELEGRAM_BOT_TOKEN=123456:ABC...");
            }
            return Err(Error::from(e).into());
        }
    };

    eprintln!("🤖 QA Relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Queue capacity: {}", config.relay.max_questions);
    match config.relay.group_id {
        Some(id) => eprintln!("   Group: {id}"),
        None => eprintln!("   Group: any"),
    }
    eprintln!("   Date offset: {}", config.relay.utc_offset);
    eprintln!("   Poll timeout: {}s\n", config.poll_timeout_secs);

    let telegram = TelegramChannel::from_config(&config);
    telegram.health_check().await?;

    let channel: Arc<dyn Channel> = Arc::new(telegram);
    let relay = Relay::new(config.relay.clone(), channel);

    tracing::info!("🤖 Bot is running");
    relay.run().await?;

    Ok(())
}
