//! Conversions from wire types to domain types for the portfolio feed.

use super::wire::{PortfolioMessage, WireTimestamp};
use super::{Holdings, PortfolioUpdate, Sample};
use crate::error::DecodeError;
use crate::shared::{parse_epoch, parse_timestamp_str};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

fn parse_wire_timestamp(ts: WireTimestamp) -> Result<DateTime<Utc>, DecodeError> {
    match ts {
        WireTimestamp::Epoch(epoch) => parse_epoch(epoch),
        WireTimestamp::Text(text) => parse_timestamp_str(&text),
    }
    .map_err(DecodeError::InvalidTimestamp)
}

fn money(field: &'static str, value: f64) -> Result<Decimal, DecodeError> {
    Decimal::try_from(value).map_err(|_| DecodeError::InvalidHoldings { field, value })
}

impl TryFrom<PortfolioMessage> for PortfolioUpdate {
    type Error = DecodeError;

    fn try_from(msg: PortfolioMessage) -> Result<Self, Self::Error> {
        if !msg.portfolio_value.is_finite() {
            return Err(DecodeError::NonFiniteValue(msg.portfolio_value));
        }

        let timestamp = parse_wire_timestamp(msg.datetime)?;

        let holdings = match (msg.cash, msg.position_size, msg.position_price) {
            (Some(cash), Some(position_size), Some(position_price)) => Some(Holdings {
                cash: money("cash", cash)?,
                position_size,
                position_price: money("position_price", position_price)?,
            }),
            _ => None,
        };

        Ok(Self {
            sample: Sample::new(timestamp, msg.portfolio_value),
            holdings,
        })
    }
}
