//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ParseMode};
use tracing::{debug, warn};

use super::callback_data::CallbackAction;
use super::router::route_callback;
use super::AppState;
use crate::localization::t_lang;
use crate::store::UserKey;

/// Handle callback queries from inline keyboards
pub async fn callback_handler(bot: Bot, q: CallbackQuery, state: Arc<AppState>) -> Result<()> {
    let user = UserKey(q.from.id.0);
    let lang = q.from.language_code.as_deref();
    let data = q.data.as_deref().unwrap_or_default();
    debug!(user_id = %user, data = data, "Received callback query");

    let Some(action) = CallbackAction::parse(data) else {
        warn!(user_id = %user, data = data, "Unknown callback data");
        bot.answer_callback_query(q.id.clone())
            .text(t_lang("unknown-callback", lang))
            .await?;
        return Ok(());
    };

    // Stop the button spinner before the backend round trip
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(screen) = route_callback(&state, user, action, lang).await else {
        return Ok(());
    };

    if let Some(msg) = &q.message {
        let edited = bot
            .edit_message_text(msg.chat().id, msg.id(), screen.text.clone())
            .parse_mode(ParseMode::Html)
            .reply_markup(screen.keyboard.clone())
            .await;
        match edited {
            Ok(_) => return Ok(()),
            Err(e) => debug!(user_id = %user, error = %e, "Could not edit message, sending a new one"),
        }
    }

    let chat_id = q
        .message
        .as_ref()
        .map(|msg| msg.chat().id)
        .unwrap_or_else(|| ChatId::from(q.from.id));
    bot.send_message(chat_id, screen.text)
        .parse_mode(ParseMode::Html)
        .reply_markup(screen.keyboard)
        .await?;

    Ok(())
}
