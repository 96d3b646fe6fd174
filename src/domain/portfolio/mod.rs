//! Portfolio domain — feed samples, holdings detail, and the sliding window.

mod convert;
pub mod state;
pub mod wire;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::DecodeError;

pub use state::{SeriesSnapshot, SeriesWindow, DEFAULT_WINDOW_CAPACITY};

/// One observation of the portfolio value.
///
/// Immutable once decoded; read through the accessors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    timestamp: DateTime<Utc>,
    value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Cash and position detail the producer sends alongside the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Holdings {
    pub cash: Decimal,
    pub position_size: i64,
    pub position_price: Decimal,
}

impl Holdings {
    /// Whether the portfolio is entirely in cash.
    pub fn is_flat(&self) -> bool {
        self.position_size == 0
    }

    /// Mark-to-market value of the open position.
    pub fn position_value(&self) -> Decimal {
        self.position_price * Decimal::from(self.position_size)
    }
}

/// A decoded feed message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioUpdate {
    pub sample: Sample,
    /// Present only when the message carried all holdings fields.
    pub holdings: Option<Holdings>,
}

/// Decode one raw feed text frame.
pub fn decode_update(text: &str) -> Result<PortfolioUpdate, DecodeError> {
    let msg: wire::PortfolioMessage = serde_json::from_str(text)?;
    PortfolioUpdate::try_from(msg)
}
