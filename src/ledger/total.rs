//! Summing the expense log.

use crate::ledger::{rows, Column, Row};
use crate::model::Amount;
use tracing::{trace, warn};

/// A pair of side-by-side columns holding one category of expenses: a description column and the
/// amount column to its right. Columns are 0-based (`A` = 0).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct CategoryBlock {
    pub(crate) name: &'static str,
    pub(crate) description: usize,
    pub(crate) amount: usize,
}

/// Columns A and B. New expenses always go here.
pub(crate) const FUNDAMENTALS: CategoryBlock = CategoryBlock {
    name: "fundamentals",
    description: 0,
    amount: 1,
};

/// Columns C and D.
pub(crate) const FUN: CategoryBlock = CategoryBlock {
    name: "fun",
    description: 2,
    amount: 3,
};

pub(crate) const BLOCKS: [CategoryBlock; 2] = [FUNDAMENTALS, FUN];

/// The description and amount columns of one `CategoryBlock` as read from the sheet.
#[derive(Debug, Clone, Default)]
pub(crate) struct BlockColumns {
    pub(crate) descriptions: Column,
    pub(crate) amounts: Column,
}

/// Sums the amounts of one block from `start` to the end of the amount column. A row counts only
/// when both its description and amount are filled in and the amount is a number. Anything else,
/// including a description column that is shorter than the amount column, is skipped. So is an
/// amount that would overflow the running total.
pub(crate) fn sum_block(block: &BlockColumns, start: Row) -> Amount {
    let amounts = (start.index()..block.amounts.len()).filter_map(|index| {
        let description = block.descriptions.get(index)?;
        let amount = block.amounts.get(index)?;
        if description.is_empty() || amount.is_empty() {
            return None;
        }
        match amount.parse::<Amount>() {
            Ok(amount) => Some((index, amount)),
            Err(e) => {
                trace!("Skipping row {}, '{amount}' is not an amount: {e}", index + 1);
                None
            }
        }
    });
    amounts.fold(Amount::ZERO, |total, (index, amount)| {
        total.checked_add(amount).unwrap_or_else(|| {
            warn!("Skipping row {}, adding {amount} overflows the total", index + 1);
            total
        })
    })
}

/// The total of all blocks. The expense log is located with the description column of the first
/// block and the same start row is used for every block. A sheet without the sentinel has no
/// expenses, so its total is zero.
pub(crate) fn monthly_total(blocks: &[BlockColumns]) -> Amount {
    let Some(first) = blocks.first() else {
        return Amount::ZERO;
    };
    let Some(start) = rows::expense_start(&first.descriptions) else {
        return Amount::ZERO;
    };
    blocks.iter().fold(Amount::ZERO, |total, block| {
        let subtotal = sum_block(block, start);
        total.checked_add(subtotal).unwrap_or_else(|| {
            warn!("Skipping a block total of {subtotal}, it overflows the monthly total");
            total
        })
    })
}
