//! Types that represent what a user sends us: an `ExpenseEntry` made of a description and an
//! `Amount`.
mod amount;
mod expense;

pub use amount::{Amount, AmountError};
pub use expense::ExpenseEntry;
