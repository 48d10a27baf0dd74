use chrono::{DateTime, Duration, Utc};

use common::Side;

use crate::history::SampleStore;

/// Percentage change over one lookback window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowDelta {
    /// No sample old enough yet, or the past price was zero.
    Unavailable,
    Available { percent: f64, past_price: f64 },
}

impl WindowDelta {
    pub fn percent(&self) -> Option<f64> {
        match self {
            WindowDelta::Available { percent, .. } => Some(*percent),
            WindowDelta::Unavailable => None,
        }
    }
}

/// Buy and sell deltas for a single window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideDeltas {
    pub window: Duration,
    pub buy: WindowDelta,
    pub sell: WindowDelta,
}

impl SideDeltas {
    pub fn get(&self, side: Side) -> WindowDelta {
        match side {
            Side::Buy => self.buy,
            Side::Sell => self.sell,
        }
    }
}

/// Derives displayed percentage changes from the retained history.
#[derive(Debug, Clone)]
pub struct WindowDeltaCalculator {
    windows: Vec<Duration>,
}

impl WindowDeltaCalculator {
    pub fn new(windows: Vec<Duration>) -> Self {
        Self { windows }
    }

    pub fn windows(&self) -> &[Duration] {
        &self.windows
    }

    pub fn delta(
        &self,
        store: &SampleStore,
        current_price: f64,
        window: Duration,
        side: Side,
        now: DateTime<Utc>,
    ) -> WindowDelta {
        let Some(past) = store.sample_at_or_before(now - window) else {
            return WindowDelta::Unavailable;
        };
        let past_price = past.price(side);
        if past_price == 0.0 {
            return WindowDelta::Unavailable;
        }
        WindowDelta::Available {
            percent: (current_price - past_price) / past_price * 100.0,
            past_price,
        }
    }

    /// Deltas for every configured window, in configuration order.
    pub fn compute(
        &self,
        store: &SampleStore,
        buy: Option<f64>,
        sell: Option<f64>,
        now: DateTime<Utc>,
    ) -> Vec<SideDeltas> {
        let side = |price: Option<f64>, window: Duration, side: Side| match price {
            Some(p) => self.delta(store, p, window, side, now),
            None => WindowDelta::Unavailable,
        };

        self.windows
            .iter()
            .map(|&window| SideDeltas {
                window,
                buy: side(buy, window, Side::Buy),
                sell: side(sell, window, Side::Sell),
            })
            .collect()
    }
}

/// Short label for a window: "15m", "1h", "1h30m".
pub fn window_label(window: Duration) -> String {
    let minutes = window.num_minutes();
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h{m}m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::PriceSample;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn calc() -> WindowDeltaCalculator {
        WindowDeltaCalculator::new(vec![
            Duration::minutes(15),
            Duration::minutes(30),
            Duration::hours(1),
        ])
    }

    #[test]
    fn empty_history_is_unavailable() {
        let store = SampleStore::new(Duration::hours(24));
        let d = calc().delta(&store, 36.0, Duration::minutes(15), Side::Buy, t0());
        assert_eq!(d, WindowDelta::Unavailable);
    }

    #[test]
    fn unavailable_until_window_is_covered() {
        let mut store = SampleStore::new(Duration::hours(24));
        store.append(PriceSample::new(t0(), 100.0, 90.0));

        let now = t0() + Duration::minutes(14);
        let d = calc().delta(&store, 110.0, Duration::minutes(15), Side::Buy, now);
        assert_eq!(d, WindowDelta::Unavailable);

        let now = t0() + Duration::minutes(15);
        let d = calc().delta(&store, 110.0, Duration::minutes(15), Side::Buy, now);
        assert_eq!(d, WindowDelta::Available { percent: 10.0, past_price: 100.0 });
    }

    #[test]
    fn uses_nearest_earlier_sample_per_side() {
        let mut store = SampleStore::new(Duration::hours(24));
        store.append(PriceSample::new(t0(), 100.0, 80.0));
        store.append(PriceSample::new(t0() + Duration::minutes(10), 200.0, 50.0));

        let now = t0() + Duration::minutes(27);
        let deltas = calc().compute(&store, Some(220.0), Some(40.0), now);

        assert_eq!(deltas.len(), 3);
        // 15m -> sample at +10m
        assert_eq!(deltas[0].buy.percent(), Some(10.0));
        assert_eq!(deltas[0].sell.percent(), Some(-20.0));
        // 30m, 1h -> nothing that old
        assert_eq!(deltas[1].buy, WindowDelta::Unavailable);
        assert_eq!(deltas[2].sell, WindowDelta::Unavailable);
    }

    #[test]
    fn zero_past_price_is_unavailable() {
        let mut store = SampleStore::new(Duration::hours(24));
        store.append(PriceSample::new(t0(), 0.0, 10.0));
        let now = t0() + Duration::hours(1);
        let deltas = calc().compute(&store, Some(5.0), Some(11.0), now);
        assert!(deltas.iter().all(|d| d.buy == WindowDelta::Unavailable));
        assert!(deltas.iter().all(|d| d.sell.percent().is_some()));
    }

    #[test]
    fn missing_current_price_is_unavailable() {
        let mut store = SampleStore::new(Duration::hours(24));
        store.append(PriceSample::new(t0(), 10.0, 10.0));
        let deltas = calc().compute(&store, None, Some(11.0), t0() + Duration::hours(2));
        assert_eq!(deltas[0].get(Side::Buy), WindowDelta::Unavailable);
        assert!(deltas[0].get(Side::Sell).percent().is_some());
    }

    #[test]
    fn labels() {
        assert_eq!(window_label(Duration::minutes(15)), "15m");
        assert_eq!(window_label(Duration::hours(1)), "1h");
        assert_eq!(window_label(Duration::minutes(90)), "1h30m");
    }
}
