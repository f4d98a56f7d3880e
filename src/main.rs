use accountant::args::{Args, Command, WebhookSubcommand};
use accountant::{commands, Config, Mode, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().accountant_home().path();

    // This allows for testing the program without hitting the Google APIs. When
    // ACCOUNTANT_IN_TEST_MODE is set and non-zero in length, then the mode will be Mode::Test,
    // otherwise it will be Mode::Google.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.client_secret(), init_args.sheet_url())
                .await?
                .print()
        }

        Command::Auth(auth_args) => {
            let config = Config::load(home).await?;
            if auth_args.verify() {
                commands::auth_verify(&config, mode).await?.print()
            } else {
                commands::auth(&config).await?.print()
            }
        }

        Command::Add(add_args) => {
            let config = Config::load(home).await?;
            commands::add(&config, mode, &add_args.message())
                .await?
                .print()
        }

        Command::Total => {
            let config = Config::load(home).await?;
            commands::total(&config, mode).await?.print()
        }

        Command::Poll(poll_args) => {
            let config = Config::load(home).await?;
            commands::poll(&config, mode, poll_args.bot_token())
                .await?
                .print()
        }

        Command::Serve(serve_args) => {
            let config = Config::load(home).await?;
            commands::serve(
                &config,
                mode,
                serve_args.bot_token(),
                serve_args.addr(),
                serve_args.secret_token().map(str::to_string),
            )
            .await?
            .print()
        }

        Command::Webhook(webhook_args) => {
            let token = webhook_args.bot_token();
            match webhook_args.action() {
                WebhookSubcommand::Set(set_args) => {
                    commands::webhook_set(token, set_args.url(), set_args.secret_token())
                        .await?
                        .print()
                }
                WebhookSubcommand::Delete => commands::webhook_delete(token).await?.print(),
                WebhookSubcommand::Info => commands::webhook_info(token).await?.print(),
            }
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
