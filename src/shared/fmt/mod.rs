//! Display formatting for chart labels and values.

pub mod label;
pub mod num;
