//! The ledger: a monthly tab that starts with a free-form income summary and continues with an
//! append-only expense log in two side-by-side category blocks.
//!
//! ```text
//!   |  A                |  B       |  C      |  D      |
//!   |  Income           |          |         |         |
//!   |  Salary           |  2500    |         |         |
//!   |  Total Net income |  2500    |         |         |   <- sentinel
//!   |  Fundamentals     |  Amount  |  Fun    |  Amount |   <- header
//!   |  Rent             |  900     |  Cinema |  12,50  |
//!   |                   |          |         |         |   <- next expense goes here
//! ```
//!
//! The newest month is always the first tab. Nothing is cached between operations, the sheet is
//! the only state. There is no protection against two writers appending to the same tab at the
//! same time.

mod column;
mod rows;
mod total;

pub use rows::Row;

pub(crate) use column::Column;
pub(crate) use total::{BlockColumns, BLOCKS, FUNDAMENTALS};

use crate::api::{A1Range, CellValue, Mode, Sheet};
use crate::error::{ErrorType, IntoResult};
use crate::model::{Amount, ExpenseEntry};
use crate::{Config, Error, Result};
use anyhow::anyhow;
use tracing::{debug, info};

/// Reads and writes the ledger through a `Sheet`. Create one per program run and pass it to
/// whoever needs it.
pub struct Ledger {
    sheet: Box<dyn Sheet + Send + Sync>,
}

/// The outcome of `Ledger::record`. The expense is in the sheet. The total was computed
/// afterwards and may have failed on its own.
#[derive(Debug)]
pub struct Recorded {
    pub tab: String,
    pub row: Row,
    pub total: Result<Amount>,
}

impl Ledger {
    pub(crate) fn new(sheet: Box<dyn Sheet + Send + Sync>) -> Self {
        Self { sheet }
    }

    /// Connects to the spreadsheet in `config`, or to the in-memory test sheet in `Mode::Test`.
    pub async fn open(config: &Config, mode: Mode) -> Result<Self> {
        let sheet = crate::api::sheet(config, mode)
            .await
            .pub_result(ErrorType::Auth)?;
        Ok(Self::new(sheet))
    }

    /// The name of the current month's tab, which is the first tab of the spreadsheet.
    pub async fn active_tab(&mut self) -> Result<String> {
        let tab = self
            .sheet
            .first_tab()
            .await
            .pub_result(ErrorType::Transport)?;
        debug!("Active tab is '{tab}'");
        Ok(tab)
    }

    /// Writes `entry` into the first empty row of the fundamentals block of `tab` and returns
    /// that row. Fails with `ErrorType::Format` if `tab` has no `Total Net income` row.
    pub async fn append(&mut self, tab: &str, entry: &ExpenseEntry) -> Result<Row> {
        let range = A1Range::column(tab, FUNDAMENTALS.description);
        let descriptions = Column::from(
            self.sheet
                .get_column(&range)
                .await
                .pub_result(ErrorType::Transport)?,
        );
        let start = rows::expense_start(&descriptions).ok_or_else(|| {
            Error::new(
                ErrorType::Format,
                anyhow!(
                    "No row containing '{}' in tab '{tab}', refusing to guess where expenses go",
                    rows::SENTINEL
                ),
            )
        })?;
        let row = rows::next_empty_row(&descriptions, start);
        debug!("Expense log of '{tab}' starts at row {start}, next empty row is {row}");

        let target = A1Range::row(
            tab,
            FUNDAMENTALS.description,
            FUNDAMENTALS.amount,
            row.number(),
        );
        let values = [
            CellValue::Text(entry.description().to_string()),
            CellValue::Number(entry.amount().value()),
        ];
        self.sheet
            .write_cells(&target, &values)
            .await
            .pub_result(ErrorType::Transport)?;
        info!(
            tab,
            row = row.number(),
            description = entry.description(),
            amount = %entry.amount(),
            "Appended expense"
        );
        Ok(row)
    }

    /// The sum of both category blocks of `tab`, read in a single batch. A tab without the
    /// `Total Net income` row has a total of zero.
    pub async fn monthly_total(&mut self, tab: &str) -> Result<Amount> {
        let ranges: Vec<A1Range> = BLOCKS
            .iter()
            .flat_map(|block| {
                [
                    A1Range::column(tab, block.description),
                    A1Range::column(tab, block.amount),
                ]
            })
            .collect();
        let mut grids = self
            .sheet
            .batch_get_columns(&ranges)
            .await
            .pub_result(ErrorType::Transport)?
            .into_iter();
        let mut blocks = Vec::with_capacity(BLOCKS.len());
        for block in BLOCKS {
            let (Some(descriptions), Some(amounts)) = (grids.next(), grids.next()) else {
                return Err(Error::new(
                    ErrorType::Transport,
                    anyhow!("Missing columns for the {} block of '{tab}'", block.name),
                ));
            };
            blocks.push(BlockColumns {
                descriptions: Column::from(descriptions),
                amounts: Column::from(amounts),
            });
        }
        let total = total::monthly_total(&blocks);
        debug!("Monthly total of '{tab}' is {total}");
        Ok(total)
    }

    /// Appends `entry` to the active tab and then computes the new total of that tab. The tab is
    /// resolved once so that both steps look at the same month. A failed append is returned as an
    /// error. A failed total is reported inside `Recorded` because the expense is already saved.
    pub async fn record(&mut self, entry: &ExpenseEntry) -> Result<Recorded> {
        let tab = self.active_tab().await?;
        let row = self.append(&tab, entry).await?;
        let total = self.monthly_total(&tab).await;
        Ok(Recorded { tab, row, total })
    }

    /// The total of the active tab.
    pub async fn current_total(&mut self) -> Result<(String, Amount)> {
        let tab = self.active_tab().await?;
        let total = self.monthly_total(&tab).await?;
        Ok((tab, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{grid, TestSheet, CURRENT_MONTH};
    use crate::test::FailingSheet;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn amount(s: &str) -> Amount {
        Amount::new(Decimal::from_str(s).unwrap())
    }

    fn entry(message: &str) -> ExpenseEntry {
        message.parse().unwrap()
    }

    #[tokio::test]
    async fn test_monthly_total_of_seed_data() {
        let mut ledger = Ledger::new(Box::new(TestSheet::default()));
        assert_eq!(ledger.active_tab().await.unwrap(), CURRENT_MONTH);
        let total = ledger.monthly_total(CURRENT_MONTH).await.unwrap();
        assert_eq!(total, amount("1017.90"));
    }

    #[tokio::test]
    async fn test_monthly_total_is_idempotent() {
        let mut ledger = Ledger::new(Box::new(TestSheet::default()));
        let first = ledger.current_total().await.unwrap();
        let second = ledger.current_total().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_append_then_total() {
        let sheet = TestSheet::default();
        let mut ledger = Ledger::new(Box::new(sheet.clone()));
        let before = ledger.monthly_total(CURRENT_MONTH).await.unwrap();

        let row = ledger
            .append(CURRENT_MONTH, &entry("Lunch 2.95"))
            .await
            .unwrap();
        assert_eq!(row.number(), 8);

        let after = ledger.monthly_total(CURRENT_MONTH).await.unwrap();
        assert_eq!(after, before.checked_add(amount("2.95")).unwrap());

        let rows = sheet.rows(CURRENT_MONTH).await.unwrap();
        assert_eq!(rows[7], vec!["Lunch".to_string(), "2.95".to_string()]);

        let row = ledger
            .append(CURRENT_MONTH, &entry("Coffee 1,20"))
            .await
            .unwrap();
        assert_eq!(row.number(), 9);
    }

    #[tokio::test]
    async fn test_append_fills_a_gap_and_keeps_fun_column() {
        let sheet = TestSheet::new(vec![(
            "Tab".to_string(),
            grid(&[
                &["Total Net income", "100"],
                &["Fundamentals", "Amount", "Fun", "Amount"],
                &["Rent", "50", "Bar", "10"],
                &["", "", "Games", "5"],
                &["Food", "20"],
            ]),
        )]);
        let mut ledger = Ledger::new(Box::new(sheet.clone()));
        let row = ledger.append("Tab", &entry("Bus 3")).await.unwrap();
        assert_eq!(row.number(), 4);
        let rows = sheet.rows("Tab").await.unwrap();
        assert_eq!(rows[3], grid(&[&["Bus", "3", "Games", "5"]])[0]);
        assert_eq!(ledger.monthly_total("Tab").await.unwrap(), amount("88"));
    }

    #[tokio::test]
    async fn test_huge_amounts_do_not_break_the_total() {
        let max = Decimal::MAX.to_string();
        let sheet = TestSheet::new(vec![(
            "Tab".to_string(),
            grid(&[
                &["Total Net income", "100"],
                &["Fundamentals", "Amount"],
                &["Yacht", max.as_str()],
                &["Island", max.as_str()],
            ]),
        )]);
        let mut ledger = Ledger::new(Box::new(sheet));
        let total = ledger.monthly_total("Tab").await.unwrap();
        assert_eq!(total, Amount::new(Decimal::MAX));
    }

    #[tokio::test]
    async fn test_append_without_sentinel_is_a_format_error() {
        let sheet = TestSheet::new(vec![(
            "Tab".to_string(),
            grid(&[&["Rent", "50"], &["Food", "20"]]),
        )]);
        let mut ledger = Ledger::new(Box::new(sheet.clone()));
        let err = ledger.append("Tab", &entry("Bus 3")).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Format);
        assert_eq!(sheet.rows("Tab").await.unwrap().len(), 2);
        assert_eq!(ledger.monthly_total("Tab").await.unwrap(), Amount::ZERO);
    }

    #[tokio::test]
    async fn test_record_reports_a_failed_total_separately() {
        let sheet = TestSheet::default();
        let failing = FailingSheet::new(sheet.clone()).fail_batch_reads();
        let mut ledger = Ledger::new(Box::new(failing));
        let recorded = ledger.record(&entry("Lunch 2.95")).await.unwrap();
        assert_eq!(recorded.tab, CURRENT_MONTH);
        assert_eq!(recorded.row.number(), 8);
        let err = recorded.total.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Transport);
        let rows = sheet.rows(CURRENT_MONTH).await.unwrap();
        assert_eq!(rows[7][0], "Lunch");
    }

    #[tokio::test]
    async fn test_record_surfaces_a_failed_write() {
        let failing = FailingSheet::new(TestSheet::default()).fail_writes();
        let mut ledger = Ledger::new(Box::new(failing));
        let err = ledger.record(&entry("Lunch 2.95")).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Transport);
    }
}
