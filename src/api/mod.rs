//! Access to the Google spreadsheet that holds the ledger.
//!
//! The ledger logic only ever talks to the `Sheet` trait. `GoogleSheet` implements it against the
//! Sheets API, `TestSheet` keeps the tabs in memory so that the whole program can run without
//! Google.

mod a1;
mod files;
mod oauth;
mod sheet;
mod test_sheet;

pub(crate) use a1::A1Range;
pub(crate) use oauth::TokenProvider;
pub(crate) use sheet::GoogleSheet;
pub(crate) use test_sheet::TestSheet;
#[cfg(test)]
pub(crate) use test_sheet::{grid, CURRENT_MONTH};

use crate::error::Res;
use crate::Config;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

/// OAuth scopes required for reading and writing the ledger.
const OAUTH_SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];

/// When this environment variable is set and non-empty the program uses `TestSheet` instead of
/// Google Sheets.
const TEST_MODE_ENV: &str = "ACCOUNTANT_IN_TEST_MODE";

/// Raw cell values as returned by a range read: one inner `Vec` per row. Rows can be shorter than
/// the range is wide, and an empty row comes back as an empty `Vec`.
pub(crate) type Grid = Vec<Vec<String>>;

/// A value written to a cell. Values are written as-is (`RAW`), so a `Number` lands in the sheet
/// as a number and `Text` as text.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum CellValue {
    Text(String),
    Number(Decimal),
}

impl CellValue {
    /// How the value reads back from a formatted range read.
    pub(crate) fn display(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => n.normalize().to_string(),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Number(n) => match n.to_f64() {
                Some(f) => serializer.serialize_f64(f),
                None => serializer.serialize_str(&n.to_string()),
            },
        }
    }
}

/// The spreadsheet operations the ledger needs. Ranges are A1 notation with the tab name, e.g.
/// `'October 2025'!A:A`.
#[async_trait::async_trait]
pub(crate) trait Sheet {
    /// The title of the first (leftmost) tab. The newest month is always the first tab.
    async fn first_tab(&mut self) -> Res<String>;

    /// Reads a single-column range.
    async fn get_column(&mut self, range: &A1Range) -> Res<Grid>;

    /// Reads several single-column ranges in one round trip. The returned grids are in the same
    /// order as `ranges`.
    async fn batch_get_columns(&mut self, ranges: &[A1Range]) -> Res<Vec<Grid>>;

    /// Writes one row of cells starting at the top-left of `range`.
    async fn write_cells(&mut self, range: &A1Range, values: &[CellValue]) -> Res<()>;
}

/// Whether to talk to Google or to the in-memory `TestSheet`.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Google,
    Test,
}

impl Mode {
    /// `Mode::Test` if `ACCOUNTANT_IN_TEST_MODE` is set and non-empty, `Mode::Google` otherwise.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Google,
        }
    }
}

/// Creates the `Sheet` implementation for `mode`.
pub(crate) async fn sheet(config: &Config, mode: Mode) -> Res<Box<dyn Sheet + Send + Sync>> {
    match mode {
        Mode::Google => {
            let token_provider =
                TokenProvider::load(config.client_secret_path(), config.token_path()).await?;
            Ok(Box::new(GoogleSheet::new(config, token_provider)))
        }
        Mode::Test => Ok(Box::new(TestSheet::for_spreadsheet(config.spreadsheet_id()))),
    }
}
