//! Records expenses into a monthly Google Sheets ledger and reports the month's total, either from
//! the command line or through a Telegram bot.

mod api;
pub mod args;
mod bot;
pub mod commands;
mod config;
mod error;
mod ledger;
mod model;
mod utils;


pub use api::Mode;
pub use bot::{Chat, Message, Update, User, WebhookInfo};
pub use config::Config;
pub use error::{Error, ErrorType, Result};
pub use ledger::{Ledger, Recorded, Row};
pub use model::{Amount, AmountError, ExpenseEntry};
