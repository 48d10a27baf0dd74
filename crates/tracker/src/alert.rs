use chrono::{DateTime, Utc};
use tracing::{debug, info};

use common::{AlertEvent, Direction, Quote, Side};

/// Reference price a side's next move is measured from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Baseline {
    Uninitialized,
    Tracking { price: f64, timestamp: DateTime<Utc> },
}

impl Baseline {
    pub fn price(&self) -> Option<f64> {
        match self {
            Baseline::Tracking { price, .. } => Some(*price),
            Baseline::Uninitialized => None,
        }
    }
}

/// Threshold-crossing detector with hysteresis by re-basing.
///
/// Each side keeps its own baseline. When the move from baseline reaches
/// `threshold_pct` an `AlertEvent` is produced and the baseline jumps to the
/// triggering price in the same call, so one move yields exactly one alert.
#[derive(Debug, Clone)]
pub struct AlertStateMachine {
    threshold_pct: f64,
    buy: Baseline,
    sell: Baseline,
}

impl AlertStateMachine {
    pub fn new(threshold_pct: f64) -> Self {
        Self {
            threshold_pct,
            buy: Baseline::Uninitialized,
            sell: Baseline::Uninitialized,
        }
    }

    pub fn threshold_pct(&self) -> f64 {
        self.threshold_pct
    }

    pub fn baseline(&self, side: Side) -> Baseline {
        match side {
            Side::Buy => self.buy,
            Side::Sell => self.sell,
        }
    }

    /// Evaluate both sides of a quote. Missing sides are skipped.
    pub fn evaluate(&mut self, quote: &Quote) -> Vec<AlertEvent> {
        Side::ALL
            .into_iter()
            .filter_map(|side| {
                let price = quote.price(side)?;
                let event = self.observe(side, price, quote.timestamp)?;
                Some(AlertEvent {
                    offer: quote.side(side).and_then(|q| q.offer.clone()),
                    ..event
                })
            })
            .collect()
    }

    /// Feed one price for one side. Non-positive prices are ignored.
    pub fn observe(&mut self, side: Side, price: f64, now: DateTime<Utc>) -> Option<AlertEvent> {
        if price <= 0.0 {
            return None;
        }
        let threshold = self.threshold_pct;
        let baseline = match side {
            Side::Buy => &mut self.buy,
            Side::Sell => &mut self.sell,
        };

        let current = *baseline;
        let base_price = match current {
            Baseline::Tracking { price: base, .. } if base > 0.0 => base,
            _ => {
                info!(side = %side, price, "Initialized baseline");
                *baseline = Baseline::Tracking { price, timestamp: now };
                return None;
            }
        };

        let change = (price - base_price) / base_price * 100.0;
        debug!(side = %side, price, baseline = base_price, change, threshold, "Baseline check");

        if change.abs() < threshold {
            return None;
        }

        info!(
            side = %side,
            change,
            from = base_price,
            to = price,
            "Alert triggered, resetting baseline"
        );
        *baseline = Baseline::Tracking { price, timestamp: now };

        Some(AlertEvent {
            side,
            direction: if change > 0.0 { Direction::Up } else { Direction::Down },
            percent_change: change,
            from_price: base_price,
            to_price: price,
            timestamp: now,
            offer: None,
        })
    }
}
