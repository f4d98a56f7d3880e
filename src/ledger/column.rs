use crate::api::Grid;

/// One spreadsheet column as a dense list of trimmed strings. Index 0 is the first row of the
/// sheet and a missing cell is an empty string, so the position of every value is its row.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub(crate) struct Column(Vec<String>);

impl Column {
    /// Flattens the grid returned by a single-column range read. Only the first cell of each row
    /// is used. An empty grid gives an empty column.
    pub(crate) fn flatten(grid: &[Vec<String>]) -> Self {
        Self(
            grid.iter()
                .map(|row| row.first().map(|cell| cell.trim().to_string()).unwrap_or_default())
                .collect(),
        )
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    /// The value at a 0-based `index`, `None` past the end of the column.
    pub(crate) fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// The index of the first value that contains `needle`.
    pub(crate) fn position_containing(&self, needle: &str) -> Option<usize> {
        self.0.iter().position(|value| value.contains(needle))
    }
}

impl From<Grid> for Column {
    fn from(grid: Grid) -> Self {
        Self::flatten(&grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::grid;

    #[test]
    fn test_flatten_keeps_row_positions() {
        let column = Column::flatten(&grid(&[&[" Rent "], &[], &["Food", "ignored"], &[""]]));
        assert_eq!(column.len(), 4);
        assert_eq!(column.get(0), Some("Rent"));
        assert_eq!(column.get(1), Some(""));
        assert_eq!(column.get(2), Some("Food"));
        assert_eq!(column.get(3), Some(""));
        assert_eq!(column.get(4), None);
    }

    #[test]
    fn test_flatten_empty_grid() {
        let column = Column::flatten(&[]);
        assert_eq!(column.len(), 0);
        assert_eq!(column, Column::default());
    }

    #[test]
    fn test_length_matches_grid() {
        for rows in 0..6 {
            let g: Grid = (0..rows)
                .map(|i| if i % 2 == 0 { Vec::new() } else { vec![i.to_string()] })
                .collect();
            assert_eq!(Column::from(g).len(), rows);
        }
    }

    #[test]
    fn test_position_containing_is_a_substring_match() {
        let column = Column::flatten(&grid(&[&["Income"], &["== Total Net income (Oct) =="]]));
        assert_eq!(column.position_containing("Total Net income"), Some(1));
        assert_eq!(column.position_containing("Expenses"), None);
    }
}
