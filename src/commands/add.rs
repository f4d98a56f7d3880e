use crate::api::Mode;
use crate::commands::Out;
use crate::ledger::{Ledger, Row};
use crate::model::{Amount, ExpenseEntry};
use crate::{Config, Result};
use serde::Serialize;
use tracing::warn;

/// The outcome of `accountant add`.
#[derive(Debug, Clone, Serialize)]
pub struct Added {
    pub tab: String,
    pub row: Row,
    pub entry: ExpenseEntry,
    /// `None` if the expense was written but the new total could not be computed.
    pub total: Option<Amount>,
}

/// The outcome of `accountant total`.
#[derive(Debug, Clone, Serialize)]
pub struct Total {
    pub tab: String,
    pub total: Amount,
}

/// Parses `message` as an expense, e.g. `Lunch 2.95`, and appends it to the current month.
///
/// # Errors
/// - `ErrorType::Parse` if `message` is not an expense.
/// - `ErrorType::Format` if the current month has no `Total Net income` row.
/// - `ErrorType::Transport` if the sheet cannot be read or written.
pub async fn add(config: &Config, mode: Mode, message: &str) -> Result<Out<Added>> {
    let entry: ExpenseEntry = message.parse()?;
    let mut ledger = Ledger::open(config, mode).await?;
    let recorded = ledger.record(&entry).await?;
    let currency = config.currency();
    let spent = format!(
        "Spent {}{currency} on {} (row {} of '{}').",
        entry.amount(),
        entry.description(),
        recorded.row,
        recorded.tab
    );
    let (message, total) = match recorded.total {
        Ok(total) => (
            format!("{spent} New monthly total is {total}{currency}"),
            Some(total),
        ),
        Err(e) => {
            warn!("The expense was recorded but the monthly total failed: {e}");
            (
                format!("{spent} The new monthly total could not be computed."),
                None,
            )
        }
    };
    Ok(Out::new(
        message,
        Added {
            tab: recorded.tab,
            row: recorded.row,
            entry,
            total,
        },
    ))
}

/// Computes the total of the current month.
pub async fn total(config: &Config, mode: Mode) -> Result<Out<Total>> {
    let mut ledger = Ledger::open(config, mode).await?;
    let (tab, total) = ledger.current_total().await?;
    Ok(Out::new(
        format!("The monthly total of '{tab}' is {total}{}", config.currency()),
        Total { tab, total },
    ))
}
