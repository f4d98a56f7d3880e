//! Implements the `Sheet` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Sheets.

use crate::api::{A1Range, CellValue, Grid, Sheet};
use crate::error::Res;
use anyhow::Context;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

type Tabs = Arc<Mutex<Vec<(String, Grid)>>>;

lazy_static! {
    /// Every `TestSheet` created for the same spreadsheet ID shares its tabs, so that one command
    /// sees what an earlier command in the same process wrote.
    static ref SPREADSHEETS: std::sync::Mutex<HashMap<String, Tabs>> =
        std::sync::Mutex::new(HashMap::new());
}

/// An implementation of the `Sheet` trait that does not use Google sheets. Tabs are held in
/// display order and, by default, seeded with two months of ledger data. Clones share the same
/// tabs, so a test can keep a clone and look at what was written.
#[derive(Debug, Clone)]
pub(crate) struct TestSheet {
    tabs: Tabs,
}

impl TestSheet {
    /// Create a new `TestSheet` from `(tab name, rows)` pairs, first tab first.
    pub(crate) fn new(tabs: Vec<(String, Grid)>) -> Self {
        Self {
            tabs: Arc::new(Mutex::new(tabs)),
        }
    }

    /// The `TestSheet` for `spreadsheet_id`, seeded with the default data the first time it is
    /// asked for.
    pub(crate) fn for_spreadsheet(spreadsheet_id: &str) -> Self {
        let mut spreadsheets = SPREADSHEETS
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let tabs = spreadsheets
            .entry(spreadsheet_id.to_string())
            .or_insert_with(|| TestSheet::default().tabs);
        Self { tabs: tabs.clone() }
    }

    /// The rows of `tab` exactly as they are stored.
    #[cfg(test)]
    pub(crate) async fn rows(&self, tab: &str) -> Option<Grid> {
        let tabs = self.tabs.lock().await;
        tabs.iter()
            .find(|(name, _)| name == tab)
            .map(|(_, rows)| rows.clone())
    }
}

impl Default for TestSheet {
    /// Loads seed data from this module.
    fn default() -> Self {
        Self::new(vec![
            (CURRENT_MONTH.to_string(), grid(CURRENT_MONTH_DATA)),
            (PREVIOUS_MONTH.to_string(), grid(PREVIOUS_MONTH_DATA)),
        ])
    }
}

#[async_trait::async_trait]
impl Sheet for TestSheet {
    async fn first_tab(&mut self) -> Res<String> {
        let tabs = self.tabs.lock().await;
        tabs.first()
            .map(|(name, _)| name.clone())
            .context("The spreadsheet has no tabs")
    }

    async fn get_column(&mut self, range: &A1Range) -> Res<Grid> {
        let tabs = self.tabs.lock().await;
        read_column(&tabs, range)
    }

    async fn batch_get_columns(&mut self, ranges: &[A1Range]) -> Res<Vec<Grid>> {
        let tabs = self.tabs.lock().await;
        ranges.iter().map(|range| read_column(&tabs, range)).collect()
    }

    async fn write_cells(&mut self, range: &A1Range, values: &[CellValue]) -> Res<()> {
        let mut tabs = self.tabs.lock().await;
        let rows = tabs
            .iter_mut()
            .find(|(name, _)| name == range.tab())
            .map(|(_, rows)| rows)
            .with_context(|| format!("Unable to parse range: {range}"))?;
        let row = range
            .first_row()
            .with_context(|| format!("Range {range} has no row to write to"))?;
        if rows.len() < row {
            rows.resize(row, Vec::new());
        }
        let cells = &mut rows[row - 1];
        let first = range.first_column();
        if cells.len() < first + values.len() {
            cells.resize(first + values.len(), String::new());
        }
        for (offset, value) in values.iter().enumerate() {
            cells[first + offset] = value.display();
        }
        Ok(())
    }
}

/// Reads a column the way the Sheets API returns it: one row per sheet row, an empty row for an
/// empty cell and no trailing empty rows.
fn read_column(tabs: &[(String, Grid)], range: &A1Range) -> Res<Grid> {
    let (_, rows) = tabs
        .iter()
        .find(|(name, _)| name == range.tab())
        .with_context(|| format!("Unable to parse range: {range}"))?;
    let column = range.first_column();
    let mut values: Grid = rows
        .iter()
        .map(|row| match row.get(column) {
            Some(cell) if !cell.is_empty() => vec![cell.clone()],
            _ => Vec::new(),
        })
        .collect();
    while values.last().is_some_and(|row| row.is_empty()) {
        values.pop();
    }
    Ok(values)
}

pub(crate) fn grid(rows: &[&[&str]]) -> Grid {
    rows.iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

pub(crate) const CURRENT_MONTH: &str = "October 2025";
const PREVIOUS_MONTH: &str = "September 2025";

/// Seed data for the newest month. The monthly total is 1017.90 and the next expense goes to
/// row 8.
const CURRENT_MONTH_DATA: &[&[&str]] = &[
    &["Income"],
    &["Salary", "2500.00"],
    &["Side gig", "300,00"],
    &["Total Net income", "2800.00"],
    &["Fundamentals", "Amount", "Fun", "Amount"],
    &["Rent", "900.00", "Cinema", "12.50"],
    &["Groceries", "85,40", "Books", "20.00"],
];

const PREVIOUS_MONTH_DATA: &[&[&str]] = &[
    &["Income"],
    &["Salary", "2500.00"],
    &["Total Net income", "2500.00"],
    &["Fundamentals", "Amount", "Fun", "Amount"],
    &["Rent", "900.00", "Concert", "45.00"],
];
