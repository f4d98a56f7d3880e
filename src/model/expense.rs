use crate::error::{ErrorType, IntoResult, Res};
use crate::model::Amount;
use crate::{Error, Result};
use anyhow::{bail, ensure, Context};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// One expense as typed into the chat, e.g. `Lunch 2.95` or `Train ticket 12,40`.
///
/// The description is everything before the last run of whitespace, the amount is the trailing
/// number. The amount is always greater than zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseEntry {
    description: String,
    amount: Amount,
}

impl ExpenseEntry {
    pub fn new(description: impl Into<String>, amount: Amount) -> Result<Self> {
        Self::validated(description.into(), amount).pub_result(ErrorType::Parse)
    }

    fn validated(description: String, amount: Amount) -> Res<Self> {
        let description = description.trim().to_string();
        ensure!(!description.is_empty(), "The description is empty");
        ensure!(amount.is_positive(), "The amount must be positive, got {amount}");
        Ok(Self {
            description,
            amount,
        })
    }

    fn parse(message: &str) -> Res<Self> {
        lazy_static! {
            static ref RE: Regex = Regex::new(r"^(.+?)\s+([\d,.]+)$").unwrap();
        }
        let message = message.trim();
        if message.is_empty() {
            bail!("The message is empty");
        }
        let caps = RE
            .captures(message)
            .with_context(|| format!("Expected a description followed by an amount: '{message}'"))?;
        let amount: Amount = caps[2]
            .parse()
            .with_context(|| format!("Invalid amount '{}'", &caps[2]))?;
        Self::validated(caps[1].to_string(), amount)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }
}

impl FromStr for ExpenseEntry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).pub_result(ErrorType::Parse)
    }
}

impl Display for ExpenseEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.description, self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn amount(s: &str) -> Amount {
        Amount::new(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_parse_simple() {
        let entry: ExpenseEntry = "Lunch 2.95".parse().unwrap();
        assert_eq!(entry.description(), "Lunch");
        assert_eq!(entry.amount(), amount("2.95"));
    }

    #[test]
    fn test_parse_multi_word_and_comma() {
        let entry: ExpenseEntry = "  Train ticket to Porto   12,40 ".parse().unwrap();
        assert_eq!(entry.description(), "Train ticket to Porto");
        assert_eq!(entry.amount(), amount("12.40"));
    }

    #[test]
    fn test_parse_integer_amount() {
        let entry: ExpenseEntry = "Cinema 12".parse().unwrap();
        assert_eq!(entry.amount(), amount("12"));
    }

    #[test]
    fn test_parse_errors() {
        for message in ["", "   ", "Lunch", "2.95", "Lunch 2.95€", "Lunch abc", "Lunch 0", "Lunch 1.2.3"] {
            let err = message.parse::<ExpenseEntry>().unwrap_err();
            assert_eq!(err.error_type(), ErrorType::Parse, "message: '{message}'");
        }
    }

    #[test]
    fn test_new_validates() {
        assert!(ExpenseEntry::new("  ", amount("1")).is_err());
        assert!(ExpenseEntry::new("Coffee", amount("-1")).is_err());
        let entry = ExpenseEntry::new(" Coffee ", amount("1.5")).unwrap();
        assert_eq!(entry.to_string(), "Coffee 1,50");
    }
}
