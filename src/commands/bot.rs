//! Commands that run the Telegram bot or manage its webhook registration.

use crate::api::Mode;
use crate::bot::{self, Handlers, Telegram, WebhookInfo};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult, Res};
use crate::ledger::Ledger;
use crate::{Config, Error, Result};
use anyhow::{anyhow, ensure, Context};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use url::Url;

/// Runs the bot with long polling until Ctrl-C is pressed.
///
/// Telegram does not deliver updates to `getUpdates` while a webhook is registered, so this fails
/// if one is.
pub async fn poll(config: &Config, mode: Mode, bot_token: &str) -> Result<Out<()>> {
    let telegram = telegram(bot_token)?;
    let info = telegram
        .webhook_info()
        .await
        .pub_result(ErrorType::Transport)?;
    if !info.url.is_empty() {
        return Err(Error::new(
            ErrorType::Config,
            anyhow!(
                "A webhook is registered at {}, run 'accountant webhook delete' before polling",
                info.url
            ),
        ));
    }
    let ledger = Ledger::open(config, mode).await?;
    let mut handlers = Handlers::new(ledger, Box::new(telegram.clone()), config.currency());
    bot::poll(&telegram, &mut handlers)
        .await
        .pub_result(ErrorType::Transport)?;
    Ok("Stopped polling".into())
}

/// Runs the webhook server on `addr` until Ctrl-C is pressed. When `secret_token` is given, only
/// requests carrying it in `X-Telegram-Bot-Api-Secret-Token` are accepted.
pub async fn serve(
    config: &Config,
    mode: Mode,
    bot_token: &str,
    addr: SocketAddr,
    secret_token: Option<String>,
) -> Result<Out<()>> {
    let telegram = telegram(bot_token)?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Unable to listen on {addr}"))
        .pub_result(ErrorType::Config)?;
    let ledger = Ledger::open(config, mode).await?;
    let handlers = Handlers::new(ledger, Box::new(telegram), config.currency());
    bot::serve(listener, handlers, secret_token)
        .await
        .pub_result(ErrorType::Transport)?;
    Ok("Stopped the webhook server".into())
}

/// Points the bot's webhook at `url`, replacing any previous one and dropping pending updates.
pub async fn webhook_set(
    bot_token: &str,
    url: &str,
    secret_token: Option<&str>,
) -> Result<Out<WebhookInfo>> {
    let url = validate_webhook_url(url).pub_result(ErrorType::Config)?;
    let telegram = telegram(bot_token)?;
    telegram
        .set_webhook(url.as_str(), secret_token)
        .await
        .pub_result(ErrorType::Transport)?;
    let info = telegram
        .webhook_info()
        .await
        .pub_result(ErrorType::Transport)?;
    Ok(Out::new(format!("Webhook set to {}", info.url), info))
}

pub async fn webhook_delete(bot_token: &str) -> Result<Out<()>> {
    telegram(bot_token)?
        .delete_webhook()
        .await
        .pub_result(ErrorType::Transport)?;
    Ok("Webhook deleted".into())
}

pub async fn webhook_info(bot_token: &str) -> Result<Out<WebhookInfo>> {
    let info = telegram(bot_token)?
        .webhook_info()
        .await
        .pub_result(ErrorType::Transport)?;
    let message = if info.url.is_empty() {
        "No webhook is set".to_string()
    } else {
        format!(
            "Webhook is set to {} with {} pending updates",
            info.url, info.pending_update_count
        )
    };
    Ok(Out::new(message, info))
}

fn telegram(bot_token: &str) -> Result<Telegram> {
    Telegram::new(bot_token).pub_result(ErrorType::Config)
}

/// Telegram only delivers to HTTPS URLs.
fn validate_webhook_url(url: &str) -> Res<Url> {
    let url = Url::parse(url).with_context(|| format!("Invalid webhook URL '{url}'"))?;
    ensure!(
        url.scheme() == "https",
        "The webhook URL must use https, got '{url}'"
    );
    Ok(url)
}
