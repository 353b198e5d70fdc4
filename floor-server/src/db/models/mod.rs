//! Database Models

pub mod dining_table;
pub mod guest;

pub use dining_table::{DiningTable, DiningTableCreate};
pub use guest::Guest;
