//! Finding where the expense log starts and where the next expense goes.

use crate::ledger::Column;
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Marks the last row of the income summary. Matched as a substring, so a description like
/// `Total Net income (October)` also counts.
pub(crate) const SENTINEL: &str = "Total Net income";

/// A 1-based spreadsheet row number, the way A1 notation counts rows.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(transparent)]
pub struct Row(usize);

impl Row {
    /// The row that holds the value at 0-based `index` of a `Column`.
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index + 1)
    }

    /// The 0-based index of this row within a `Column`.
    pub(crate) const fn index(self) -> usize {
        self.0 - 1
    }

    pub const fn number(self) -> usize {
        self.0
    }
}

impl Display for Row {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Where scanning the expense log starts: the row right after the sentinel, i.e. sentinel index
/// plus two as a 1-based row. That row is the header of the expense log. Its description is never
/// empty and its amount is not a number, so both the row search and the sum pass over it.
/// `None` if no description contains the sentinel.
pub(crate) fn expense_start(descriptions: &Column) -> Option<Row> {
    descriptions
        .position_containing(SENTINEL)
        .map(|index| Row::from_index(index + 1))
}

/// The first row at or after `start` whose description is empty or that lies past the end of the
/// column. Every row in between is checked because blank rows can appear anywhere.
pub(crate) fn next_empty_row(descriptions: &Column, start: Row) -> Row {
    let mut index = start.index();
    while let Some(value) = descriptions.get(index) {
        if value.is_empty() {
            break;
        }
        index += 1;
    }
    Row::from_index(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::grid;

    fn column(values: &[&str]) -> Column {
        let rows: Vec<&[&str]> = values.iter().map(std::slice::from_ref).collect();
        Column::flatten(&grid(&rows))
    }

    fn row(number: usize) -> Row {
        Row::from_index(number - 1)
    }

    #[test]
    fn test_expense_start_is_the_row_after_the_sentinel() {
        let descriptions = column(&["Income", "Salary", "Total Net income", "Header", "Rent"]);
        assert_eq!(expense_start(&descriptions), Some(row(4)));
    }

    #[test]
    fn test_expense_start_not_found() {
        assert_eq!(expense_start(&column(&["Income", "Salary", "Rent"])), None);
        assert_eq!(expense_start(&Column::default()), None);
    }

    #[test]
    fn test_expense_start_first_match_wins() {
        let descriptions = column(&["Total Net income", "x", "Total Net income"]);
        assert_eq!(expense_start(&descriptions), Some(row(2)));
    }

    #[test]
    fn test_next_empty_row_finds_the_gap() {
        let descriptions = column(&["Total Net income", "Header", "Rent", "", "Coffee"]);
        assert_eq!(next_empty_row(&descriptions, row(3)), row(4));
    }

    #[test]
    fn test_next_empty_row_at_start() {
        let descriptions = column(&["Total Net income", "Header", "", "Coffee"]);
        assert_eq!(next_empty_row(&descriptions, row(3)), row(3));
    }

    #[test]
    fn test_next_empty_row_appends_after_last() {
        let descriptions = column(&["Total Net income", "Header", "Rent", "Food"]);
        assert_eq!(next_empty_row(&descriptions, row(3)), row(5));
    }

    #[test]
    fn test_next_empty_row_beyond_data() {
        let descriptions = column(&["Total Net income", "Header"]);
        assert_eq!(next_empty_row(&descriptions, row(3)), row(3));
        assert_eq!(next_empty_row(&descriptions, row(10)), row(10));
    }

    #[test]
    fn test_no_gap_between_start_and_result() {
        let descriptions = column(&["a", "b", "c", "", "d", "", "e"]);
        for start in 1..=8 {
            let found = next_empty_row(&descriptions, row(start));
            assert!(found >= row(start));
            for n in start..found.number() {
                assert_ne!(descriptions.get(n - 1), Some(""), "row {n} is empty");
            }
            assert!(matches!(descriptions.get(found.index()), None | Some("")));
        }
    }

    #[test]
    fn test_row_display() {
        assert_eq!(row(8).to_string(), "8");
        assert_eq!(row(8).number(), 8);
    }
}
