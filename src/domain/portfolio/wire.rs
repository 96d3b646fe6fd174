//! Wire types for the portfolio feed (WS).

use serde::{Deserialize, Serialize};

/// `datetime` as the producer sends it: an ISO-8601 string, or an epoch
/// number (seconds or milliseconds) from older producers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    Epoch(f64),
    Text(String),
}

/// One feed text frame.
///
/// Unknown fields are ignored so producers can add data without breaking
/// consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMessage {
    pub datetime: WireTimestamp,
    pub portfolio_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_price: Option<f64>,
}
