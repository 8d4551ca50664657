//! Hypothetical order the costs are estimated for

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SimulatorError;
use crate::orderbook::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Side of the book this order would execute against
    pub fn book_side(&self) -> Side {
        match self {
            OrderSide::Buy => Side::Ask,
            OrderSide::Sell => Side::Bid,
        }
    }

    /// +1 for buys, -1 for sells
    pub fn direction(&self) -> f64 {
        match self {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        }
    }
}

impl FromStr for OrderSide {
    type Err = SimulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            other => Err(SimulatorError::ConfigError(format!(
                "Unknown order side: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

impl FromStr for OrderType {
    type Err = SimulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            other => Err(SimulatorError::ConfigError(format!(
                "Unknown order type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "market"),
            OrderType::Limit => write!(f, "limit"),
        }
    }
}

/// Order whose execution cost is being estimated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub side: OrderSide,
    pub order_type: OrderType,
    /// Notional size in quote currency
    pub size_usd: f64,
    /// Only meaningful for limit orders
    pub limit_price: Option<f64>,
    /// Caller-supplied volatility; derived from the spread when absent
    pub volatility: Option<f64>,
}

impl OrderRequest {
    pub fn market(side: OrderSide, size_usd: f64) -> Self {
        Self {
            side,
            order_type: OrderType::Market,
            size_usd,
            limit_price: None,
            volatility: None,
        }
    }

    pub fn limit(side: OrderSide, size_usd: f64, limit_price: f64) -> Self {
        Self {
            side,
            order_type: OrderType::Limit,
            size_usd,
            limit_price: Some(limit_price),
            volatility: None,
        }
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = Some(volatility);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_side_and_type() {
        assert_eq!("BUY".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!(" sell ".parse::<OrderSide>().unwrap(), OrderSide::Sell);
        assert_eq!("Limit".parse::<OrderType>().unwrap(), OrderType::Limit);
        assert!(matches!(
            "hold".parse::<OrderSide>(),
            Err(SimulatorError::ConfigError(_))
        ));
        assert!("stop".parse::<OrderType>().is_err());
    }

    #[test]
    fn test_book_side() {
        assert_eq!(OrderSide::Buy.book_side(), Side::Ask);
        assert_eq!(OrderSide::Sell.book_side(), Side::Bid);
    }
}
