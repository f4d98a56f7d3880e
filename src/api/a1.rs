//! A1-notation ranges such as `'October 2025'!A:A` or `'October 2025'!A8:B8`.
//!
//! Columns are held 0-based (`A` = 0) and rows 1-based, matching the way the Sheets API addresses
//! cells. A range with no row numbers covers the whole column span.

use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct A1Range {
    tab: String,
    start: Cell,
    end: Cell,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct Cell {
    column: usize,
    row: Option<usize>,
}

impl A1Range {
    /// A whole single column, e.g. `'Tab'!C:C`.
    pub(crate) fn column(tab: impl Into<String>, column: usize) -> Self {
        let cell = Cell { column, row: None };
        Self {
            tab: tab.into(),
            start: cell,
            end: cell,
        }
    }

    /// Columns `first..=last` of a single 1-based `row`, e.g. `'Tab'!A8:B8`.
    pub(crate) fn row(tab: impl Into<String>, first: usize, last: usize, row: usize) -> Self {
        Self {
            tab: tab.into(),
            start: Cell {
                column: first,
                row: Some(row),
            },
            end: Cell {
                column: last,
                row: Some(row),
            },
        }
    }

    pub(crate) fn tab(&self) -> &str {
        &self.tab
    }

    pub(crate) fn first_column(&self) -> usize {
        self.start.column
    }

    /// The 1-based row where the range starts, `None` for whole-column ranges.
    pub(crate) fn first_row(&self) -> Option<usize> {
        self.start.row
    }
}

impl Display for A1Range {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}'!{}:{}",
            self.tab.replace('\'', "''"),
            self.start,
            self.end
        )
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&column_letters(self.column))?;
        if let Some(row) = self.row {
            write!(f, "{row}")?;
        }
        Ok(())
    }
}

/// 0 -> `A`, 25 -> `Z`, 26 -> `AA`.
fn column_letters(column: usize) -> String {
    let mut letters = Vec::new();
    let mut n = column + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_range_display() {
        assert_eq!(A1Range::column("October 2025", 0).to_string(), "'October 2025'!A:A");
        assert_eq!(A1Range::column("Sheet1", 3).to_string(), "'Sheet1'!D:D");
    }

    #[test]
    fn test_row_range_display() {
        assert_eq!(A1Range::row("Nov", 0, 1, 8).to_string(), "'Nov'!A8:B8");
    }

    #[test]
    fn test_tab_with_quote_is_escaped() {
        let range = A1Range::column("Bob's budget", 2);
        assert_eq!(range.to_string(), "'Bob''s budget'!C:C");
        assert_eq!(range.tab(), "Bob's budget");
    }

    #[test]
    fn test_accessors() {
        let range = A1Range::row("October 2025", 0, 1, 8);
        assert_eq!(range.tab(), "October 2025");
        assert_eq!(range.first_column(), 0);
        assert_eq!(range.first_row(), Some(8));

        let range = A1Range::column("October 2025", 2);
        assert_eq!(range.first_column(), 2);
        assert_eq!(range.first_row(), None);
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
    }
}
