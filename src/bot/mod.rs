//! The Telegram side of the accountant: the Bot API client, the message handlers and the two ways
//! of receiving updates (long polling and a webhook server).

mod handlers;
mod poll;
mod telegram;
mod webhook;

pub(crate) use handlers::Handlers;
pub(crate) use poll::poll;
pub(crate) use telegram::Telegram;
pub use telegram::{Chat, Message, Update, User, WebhookInfo};
pub(crate) use webhook::serve;

use crate::error::Res;

/// Sends a text message to a chat. `Telegram` implements it, tests record the messages instead.
#[async_trait::async_trait]
pub(crate) trait Sender {
    async fn send_message(&self, chat_id: i64, text: &str) -> Res<()>;
}
