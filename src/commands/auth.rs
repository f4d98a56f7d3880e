//! Authentication command handlers for OAuth flow.
//!
//! This module implements the CLI commands for:
//! - `accountant auth` - Initial OAuth consent flow
//! - `accountant auth --verify` - Verify and refresh authentication

use crate::api::{Mode, TokenProvider};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::ledger::Ledger;
use crate::{Config, Result};
use anyhow::Context;
use serde::Serialize;

/// Handles the `accountant auth` command - runs the OAuth consent flow
///
/// This is the ONLY command that should open a browser for OAuth authentication.
///
/// This guides the user through setting up Google Sheets authentication:
/// 1. Loads client_secret.json
/// 2. Prints the consent URL and waits for the redirect
/// 3. Saves tokens to token.json with required scopes
///
/// # Errors
/// Returns an error if OAuth flow fails or if client_secret.json is missing
pub async fn auth(config: &Config) -> Result<Out<()>> {
    let _ = TokenProvider::initialize(config.client_secret_path(), config.token_path())
        .await
        .pub_result(ErrorType::Auth)?;
    Ok("Authorization complete, run 'accountant auth --verify' to check access to the sheet".into())
}

/// What `accountant auth --verify` found.
#[derive(Debug, Clone, Serialize)]
pub struct Verified {
    pub spreadsheet_id: String,
    pub active_tab: String,
}

/// Handles the `accountant auth --verify` command - verifies authentication
///
/// This command NEVER opens a browser or triggers an interactive OAuth flow.
/// It only verifies that existing cached tokens are valid and that the sheet can be read.
///
/// If the token is missing, invalid, or has the wrong scopes, this command will
/// fail with an error message telling the user to run `accountant auth`.
pub async fn auth_verify(config: &Config, mode: Mode) -> Result<Out<Verified>> {
    if mode == Mode::Google {
        let mut token_provider =
            TokenProvider::load(config.client_secret_path(), config.token_path())
                .await
                .context(
                    "Unable to use the existing tokens found in the token JSON file. \n\n\
                    You should run 'accountant auth' (without the --verify flag).",
                )
                .pub_result(ErrorType::Auth)?;
        token_provider
            .refresh()
            .await
            .context("Unable to refresh the token")
            .pub_result(ErrorType::Auth)?;
    }
    let mut ledger = Ledger::open(config, mode).await?;
    let active_tab = ledger.active_tab().await?;
    Ok(Out::new(
        format!("Your OAuth token is valid! The current month is '{active_tab}'"),
        Verified {
            spreadsheet_id: config.spreadsheet_id().to_string(),
            active_tab,
        },
    ))
}
