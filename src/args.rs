//! These structs provide the CLI interface for the accountant CLI.

use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// accountant: Record expenses in a monthly Google Sheets ledger, from the command line or from a
/// Telegram chat.
///
/// The spreadsheet holds one tab per month with the newest month first. Each tab has an income
/// section ending in a "Total Net income" row, followed by a header row and two expense blocks:
/// Fundamentals in columns A and B, Fun in columns C and D. New expenses go into the first empty
/// row of the Fundamentals block.
///
/// You will need to set up a Google OAuth client for this. Run `accountant init` with the client
/// credentials and the sheet URL, then `accountant auth`.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration files.
    ///
    /// This is the first command you should run. You need two things ready beforehand:
    ///
    /// - The URL of your ledger Google Sheet, passed as --sheet-url.
    ///
    /// - The OAuth client credentials downloaded from the Google Cloud console, passed as
    ///   --client-secret.
    Init(InitArgs),
    /// Authenticate with Google Sheets via OAuth.
    Auth(AuthArgs),
    /// Record an expense such as "Lunch 2.95" in the current month.
    Add(AddArgs),
    /// Print the expense total of the current month.
    Total,
    /// Run the Telegram bot with long polling.
    Poll(PollArgs),
    /// Run the Telegram bot as a webhook server.
    Serve(ServeArgs),
    /// Manage the Telegram webhook registration.
    Webhook(WebhookArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the configuration and OAuth secrets are held. Defaults to ~/accountant
    #[arg(long, env = "ACCOUNTANT_HOME", default_value_t = default_accountant_home())]
    accountant_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, accountant_home: PathBuf) -> Self {
        Self {
            log_level,
            accountant_home: accountant_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn accountant_home(&self) -> &DisplayPath {
        &self.accountant_home
    }
}

/// (Not shown): Args for the `accountant init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The URL to your ledger Google Sheet. It looks like this:
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    #[arg(long)]
    sheet_url: String,

    /// The path to your downloaded OAuth client credentials. This file will be copied to the
    /// secrets location in the data directory.
    #[arg(long)]
    client_secret: PathBuf,
}

impl InitArgs {
    pub fn new(sheet_url: impl Into<String>, client_secret: impl Into<PathBuf>) -> Self {
        Self {
            sheet_url: sheet_url.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn sheet_url(&self) -> &str {
        &self.sheet_url
    }

    pub fn client_secret(&self) -> &Path {
        &self.client_secret
    }
}

/// (Not shown): Args for the `accountant auth` command.
#[derive(Debug, Parser, Clone)]
pub struct AuthArgs {
    /// Verify and refresh authentication.
    #[arg(long)]
    verify: bool,
}

impl AuthArgs {
    pub fn new(verify: bool) -> Self {
        Self { verify }
    }

    pub fn verify(&self) -> bool {
        self.verify
    }
}

/// (Not shown): Args for the `accountant add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    /// The expense, a description followed by an amount, e.g. `Lunch 2.95` or `Bus ticket 1,50`.
    #[arg(required = true, num_args = 1..)]
    message: Vec<String>,
}

impl AddArgs {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: vec![message.into()],
        }
    }

    /// The words of the message joined by single spaces.
    pub fn message(&self) -> String {
        self.message.join(" ")
    }
}

/// The Telegram bot token, shared by every bot subcommand.
#[derive(Debug, Parser, Clone)]
pub struct BotToken {
    /// The token BotFather gave you for the bot.
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    bot_token: String,
}

impl BotToken {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
        }
    }

    pub fn bot_token(&self) -> &str {
        &self.bot_token
    }
}

/// (Not shown): Args for the `accountant poll` command.
#[derive(Debug, Parser, Clone)]
pub struct PollArgs {
    #[clap(flatten)]
    token: BotToken,
}

impl PollArgs {
    pub fn new(token: BotToken) -> Self {
        Self { token }
    }

    pub fn bot_token(&self) -> &str {
        self.token.bot_token()
    }
}

/// (Not shown): Args for the `accountant serve` command.
#[derive(Debug, Parser, Clone)]
pub struct ServeArgs {
    #[clap(flatten)]
    token: BotToken,

    /// The address the webhook server listens on.
    #[arg(long, env = "ACCOUNTANT_ADDR", default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// When given, requests must carry this value in the X-Telegram-Bot-Api-Secret-Token header.
    #[arg(long, env = "TELEGRAM_SECRET_TOKEN", hide_env_values = true)]
    secret_token: Option<String>,
}

impl ServeArgs {
    pub fn new(token: BotToken, addr: SocketAddr, secret_token: Option<String>) -> Self {
        Self {
            token,
            addr,
            secret_token,
        }
    }

    pub fn bot_token(&self) -> &str {
        self.token.bot_token()
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn secret_token(&self) -> Option<&str> {
        self.secret_token.as_deref()
    }
}

/// (Not shown): Args for the `accountant webhook` command.
#[derive(Debug, Parser, Clone)]
pub struct WebhookArgs {
    #[clap(flatten)]
    token: BotToken,

    #[command(subcommand)]
    action: WebhookSubcommand,
}

impl WebhookArgs {
    pub fn new(token: BotToken, action: WebhookSubcommand) -> Self {
        Self { token, action }
    }

    pub fn bot_token(&self) -> &str {
        self.token.bot_token()
    }

    pub fn action(&self) -> &WebhookSubcommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum WebhookSubcommand {
    /// Point the bot at a webhook URL. Pending updates are dropped.
    Set(WebhookSetArgs),
    /// Remove the webhook so the bot can be polled.
    Delete,
    /// Show the current webhook registration.
    Info,
}

/// (Not shown): Args for the `accountant webhook set` command.
#[derive(Debug, Parser, Clone)]
pub struct WebhookSetArgs {
    /// The public HTTPS URL Telegram should post updates to.
    #[arg(long)]
    url: String,

    /// A secret Telegram will send in the X-Telegram-Bot-Api-Secret-Token header.
    #[arg(long, env = "TELEGRAM_SECRET_TOKEN", hide_env_values = true)]
    secret_token: Option<String>,
}

impl WebhookSetArgs {
    pub fn new(url: impl Into<String>, secret_token: Option<String>) -> Self {
        Self {
            url: url.into(),
            secret_token,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn secret_token(&self) -> Option<&str> {
        self.secret_token.as_deref()
    }
}

fn default_accountant_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("accountant"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --accountant-home or ACCOUNTANT_HOME instead of relying on the \
                default directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("accountant")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_joins_words() {
        let args = Args::try_parse_from(["accountant", "add", "Bus", "ticket", "1,50"]).unwrap();
        match args.command() {
            Command::Add(add) => assert_eq!(add.message(), "Bus ticket 1,50"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_webhook_set() {
        let args = Args::try_parse_from([
            "accountant",
            "webhook",
            "--bot-token",
            "123:abc",
            "set",
            "--url",
            "https://example.com/hook",
        ])
        .unwrap();
        match args.command() {
            Command::Webhook(webhook) => {
                assert_eq!(webhook.bot_token(), "123:abc");
                match webhook.action() {
                    WebhookSubcommand::Set(set) => assert_eq!(set.url(), "https://example.com/hook"),
                    other => panic!("unexpected action {other:?}"),
                }
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_log_level() {
        let args =
            Args::try_parse_from(["accountant", "--log-level", "debug", "total"]).unwrap();
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
    }
}
