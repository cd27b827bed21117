//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{debug, info};

use super::router::route_text;
use super::AppState;
use crate::store::UserKey;

pub async fn message_handler(bot: Bot, msg: Message, state: Arc<AppState>) -> Result<()> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    // Photos, stickers and the like get no reply
    let Some(text) = msg.text() else {
        debug!(user_id = %from.id, "Ignoring non-text message");
        return Ok(());
    };

    let user = UserKey(from.id.0);
    let lang = from.language_code.as_deref();
    info!(user_id = %user, chat_id = %msg.chat.id, "Received text message");

    let reply = route_text(&state, user, text, &from.first_name, lang).await;

    if reply.delete_source {
        // Needs admin rights in groups; failing to delete is not an error
        if let Err(e) = bot.delete_message(msg.chat.id, msg.id).await {
            debug!(user_id = %user, error = %e, "Could not delete credentials message");
        }
    }

    bot.send_message(msg.chat.id, reply.screen.text)
        .parse_mode(ParseMode::Html)
        .reply_markup(reply.screen.keyboard)
        .await?;

    Ok(())
}
