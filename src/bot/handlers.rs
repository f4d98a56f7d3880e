use crate::bot::{Message, Sender, Update};
use crate::error::{ErrorType, IntoResult};
use crate::ledger::Ledger;
use crate::model::ExpenseEntry;
use crate::Result;
use tracing::{debug, error, info, warn};

const USAGE_EXAMPLE: &str = "Example: `Lunch 2.95`";

/// Turns incoming messages into ledger operations and replies to the chat.
pub(crate) struct Handlers {
    ledger: Ledger,
    sender: Box<dyn Sender + Send + Sync>,
    currency: String,
}

impl Handlers {
    pub(crate) fn new(
        ledger: Ledger,
        sender: Box<dyn Sender + Send + Sync>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            sender,
            currency: currency.into(),
        }
    }

    /// Handles one update. Updates without a text message are ignored.
    ///
    /// # Errors
    /// Returns an error when the expense could not be written to the sheet. Nothing is sent to
    /// the chat in that case, the caller decides whether to retry or to tell the user.
    pub(crate) async fn process_update(&mut self, update: &Update) -> Result<()> {
        let Some(message) = &update.message else {
            debug!("Ignoring update {} without a message", update.update_id);
            return Ok(());
        };
        let Some(text) = message.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            debug!("Ignoring update {} without text", update.update_id);
            return Ok(());
        };
        if is_start_command(text) {
            return self.start(message).await;
        }
        self.expense(message, text).await
    }

    /// Welcomes the user by first name. A `/start` without a sender, such as one posted on behalf
    /// of a channel, gets no reply.
    async fn start(&self, message: &Message) -> Result<()> {
        let Some(user) = &message.from else {
            debug!("Ignoring /start without a sender in chat {}", message.chat.id);
            return Ok(());
        };
        info!(
            user_id = user.id,
            username = user.username.as_deref().unwrap_or_default(),
            "User started the bot"
        );
        let first_name = &user.first_name;
        let welcome = format!(
            "Hi {first_name}! 👋\n\n\
            I'm your personal accountant bot. Send me expenses in this format:\n\n\
            {USAGE_EXAMPLE}"
        );
        self.reply(message, &welcome).await
    }

    async fn expense(&mut self, message: &Message, text: &str) -> Result<()> {
        info!(chat_id = message.chat.id, text, "Received message");
        let entry: ExpenseEntry = match text.parse() {
            Ok(entry) => entry,
            Err(e) => {
                info!("Could not parse '{text}' as an expense: {e}");
                let reply =
                    format!("Could not parse expense. Please use format:\n\n{USAGE_EXAMPLE}");
                return self.reply(message, &reply).await;
            }
        };

        let recorded = self.ledger.record(&entry).await?;

        let currency = &self.currency;
        let spent = format!(
            "💸 Spent {}{currency} on {}.",
            entry.amount(),
            entry.description()
        );
        let reply = match recorded.total {
            Ok(total) => {
                info!(tab = %recorded.tab, total = %total, "New monthly total");
                format!("{spent} New monthly total is {total}{currency}")
            }
            Err(e) => {
                error!("Failed to compute the monthly total of '{}': {e}", recorded.tab);
                format!("{spent} The new monthly total could not be computed.")
            }
        };
        self.reply(message, &reply).await
    }

    /// Tells the sender of `update` that their expense was not recorded. Used after
    /// `process_update` failed and the update will not be retried.
    pub(crate) async fn notify_failure(&self, update: &Update) {
        let Some(message) = &update.message else {
            return;
        };
        let text = "Sorry, the expense could not be recorded. Please try again later.";
        if let Err(e) = self.reply(message, text).await {
            warn!("Unable to tell chat {} about the failure: {e}", message.chat.id);
        }
    }

    async fn reply(&self, message: &Message, text: &str) -> Result<()> {
        self.sender
            .send_message(message.chat.id, text)
            .await
            .pub_result(ErrorType::Transport)
    }
}

/// `/start`, also in the `/start@my_bot` form that Telegram uses in groups.
fn is_start_command(text: &str) -> bool {
    let command = text.split_whitespace().next().unwrap_or_default();
    command == "/start" || command.starts_with("/start@")
}
