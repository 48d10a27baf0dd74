use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Side of the marketplace a price belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Buy, Side::Sell];
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Direction of a price move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "UP"),
            Direction::Down => write!(f, "DOWN"),
        }
    }
}

/// One retained observation of both sides of the book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub timestamp: DateTime<Utc>,
    #[serde(alias = "buy")]
    pub buy_price: f64,
    #[serde(alias = "sell")]
    pub sell_price: f64,
}

impl PriceSample {
    pub fn new(timestamp: DateTime<Utc>, buy_price: f64, sell_price: f64) -> Self {
        Self {
            timestamp,
            buy_price,
            sell_price,
        }
    }

    pub fn price(&self, side: Side) -> f64 {
        match side {
            Side::Buy => self.buy_price,
            Side::Sell => self.sell_price,
        }
    }
}

/// Details of the advertiser behind the best offer on one side.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OfferDetails {
    pub trader: String,
    pub month_orders: u64,
    /// Amount of the asset still available on the advertisement.
    pub available: f64,
    pub payment_methods: Vec<String>,
}

/// Best price on one side together with the offer it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideQuote {
    pub price: f64,
    pub offer: Option<OfferDetails>,
}

impl SideQuote {
    pub fn bare(price: f64) -> Self {
        Self { price, offer: None }
    }
}

/// A price source reading. Either side may be missing when the marketplace
/// had no matching offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub timestamp: DateTime<Utc>,
    pub buy: Option<SideQuote>,
    pub sell: Option<SideQuote>,
}

impl Quote {
    pub fn side(&self, side: Side) -> Option<&SideQuote> {
        match side {
            Side::Buy => self.buy.as_ref(),
            Side::Sell => self.sell.as_ref(),
        }
    }

    /// Price for `side`, treating non-positive values as missing.
    pub fn price(&self, side: Side) -> Option<f64> {
        self.side(side).map(|q| q.price).filter(|p| *p > 0.0)
    }

    /// A retainable sample, only when both sides are present.
    pub fn to_sample(&self) -> Option<PriceSample> {
        Some(PriceSample::new(
            self.timestamp,
            self.price(Side::Buy)?,
            self.price(Side::Sell)?,
        ))
    }
}

/// A qualifying move on one side, measured from that side's baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub side: Side,
    pub direction: Direction,
    /// Signed percentage change from `from_price` to `to_price`.
    pub percent_change: f64,
    pub from_price: f64,
    pub to_price: f64,
    pub timestamp: DateTime<Utc>,
    pub offer: Option<OfferDetails>,
}

/// Identifier of a message held by a notification transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i32);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(buy: Option<f64>, sell: Option<f64>) -> Quote {
        Quote {
            timestamp: Utc::now(),
            buy: buy.map(SideQuote::bare),
            sell: sell.map(SideQuote::bare),
        }
    }

    #[test]
    fn sample_requires_both_sides() {
        assert!(quote(Some(36.5), None).to_sample().is_none());
        assert!(quote(None, Some(36.1)).to_sample().is_none());

        let sample = quote(Some(36.5), Some(36.1)).to_sample().unwrap();
        assert_eq!(sample.price(Side::Buy), 36.5);
        assert_eq!(sample.price(Side::Sell), 36.1);
    }

    #[test]
    fn non_positive_price_is_missing() {
        let q = quote(Some(0.0), Some(-1.0));
        assert_eq!(q.price(Side::Buy), None);
        assert_eq!(q.price(Side::Sell), None);
        assert!(q.to_sample().is_none());
    }

    #[test]
    fn sample_accepts_short_field_names() {
        let sample: PriceSample = serde_json::from_str(
            r#"{"timestamp": "2026-03-01T12:00:00Z", "buy": 36.5, "sell": 36.1}"#,
        )
        .unwrap();
        assert_eq!(sample.buy_price, 36.5);
        assert_eq!(sample.sell_price, 36.1);

        let json = serde_json::to_value(sample).unwrap();
        assert_eq!(json["buy_price"], 36.5);
    }
}
