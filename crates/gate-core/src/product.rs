//! # Product Types
//!
//! The product sold at checkout. Playgate sells exactly one fixed-price item.

use serde::{Deserialize, Serialize};

/// Checkout currency (ISO 4217). Plays are sold in US dollars only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    USD,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Price with amount in smallest currency unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in smallest currency unit (cents for USD)
    pub amount: i64,
    /// Currency
    pub currency: Currency,
}

impl Price {
    /// Create a price from smallest unit (cents)
    pub const fn from_cents(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Format for display (e.g., "$50.00")
    pub fn display(&self) -> String {
        format!(
            "{}{}.{:02}",
            self.currency.symbol(),
            self.amount / 100,
            (self.amount % 100).abs()
        )
    }
}

/// A product offered at checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Display name shown on the hosted checkout page
    pub name: String,
    /// Unit price
    pub price: Price,
}

impl Product {
    /// Name of the single product sold
    pub const GAME_PLAY_ACCESS_NAME: &'static str = "Game Play Access";

    /// Price of one play, $50.00
    pub const GAME_PLAY_ACCESS_PRICE: Price = Price::from_cents(5000, Currency::USD);

    /// The one-time game access product
    pub fn game_play_access() -> Self {
        Self {
            name: Self::GAME_PLAY_ACCESS_NAME.to_string(),
            price: Self::GAME_PLAY_ACCESS_PRICE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_play_access_price() {
        let product = Product::game_play_access();
        assert_eq!(product.price.amount, 5000);
        assert_eq!(product.price.currency, Currency::USD);
        assert_eq!(product.price.display(), "$50.00");
    }

    #[test]
    fn test_currency_codes() {
        assert_eq!(Currency::USD.as_str(), "usd");
        assert_eq!(Currency::USD.to_string(), "USD");
    }
}
