use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use clinic_bot::bot::{schema, AppState};
use clinic_bot::clock::SystemClock;
use clinic_bot::config::{BotConfig, LogFormat};
use clinic_bot::gateway::HttpClinicGateway;
use clinic_bot::localization::{init_localization, t_lang};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = BotConfig::from_env()?;
    init_tracing(config.log_format);

    info!(
        api_url = %config.api.base_url,
        default_language = %config.default_language,
        "Starting Clinic Telegram Bot"
    );

    init_localization(&config.default_language)?;

    let gateway = Arc::new(HttpClinicGateway::new(&config.api)?);
    let state = Arc::new(AppState::in_memory(
        gateway,
        Arc::new(SystemClock),
        config.session_ttl,
        config.draft_ttl,
    ));

    let bot = Bot::new(&config.telegram_token);

    let lang = Some(config.default_language.as_str());
    let commands = vec![
        BotCommand::new("start", t_lang("command-start", lang)),
        BotCommand::new("menu", t_lang("command-menu", lang)),
        BotCommand::new("logout", t_lang("command-logout", lang)),
    ];
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    info!("Bot initialized, starting dispatcher");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
