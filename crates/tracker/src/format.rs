use std::fmt::Write;

use chrono::{DateTime, Utc};

use common::{AlertEvent, Direction, OfferDetails, Quote, Side};

use crate::config::Language;
use crate::delta::{window_label, SideDeltas, WindowDelta};

struct Labels {
    price_update: &'static str,
    best_buy: &'static str,
    best_sell: &'static str,
    buy: &'static str,
    sell: &'static str,
    orders: &'static str,
    spread: &'static str,
    price_changes: &'static str,
    no_offers: &'static str,
    alert_title: &'static str,
    change: &'static str,
    up: &'static str,
    down: &'static str,
}

static EN: Labels = Labels {
    price_update: "Binance P2P Price Update",
    best_buy: "Best BUY",
    best_sell: "Best SELL",
    buy: "BUY",
    sell: "SELL",
    orders: "orders",
    spread: "Spread",
    price_changes: "Price Changes",
    no_offers: "No offers",
    alert_title: "SUDDEN PRICE CHANGE ALERT!",
    change: "Change",
    up: "UP",
    down: "DOWN",
};

static ES: Labels = Labels {
    price_update: "Actualización de Precios P2P Binance",
    best_buy: "Mejor COMPRA",
    best_sell: "Mejor VENTA",
    buy: "COMPRA",
    sell: "VENTA",
    orders: "órdenes",
    spread: "Diferencial",
    price_changes: "Cambios de Precio",
    no_offers: "Sin ofertas",
    alert_title: "¡ALERTA DE CAMBIO REPENTINO DE PRECIO!",
    change: "Cambio",
    up: "SUBIÓ",
    down: "BAJÓ",
};

/// Renders status and alert messages as Telegram HTML.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    asset: String,
    fiat: String,
    language: Language,
}

impl MessageFormatter {
    pub fn new(asset: impl Into<String>, fiat: impl Into<String>, language: Language) -> Self {
        Self {
            asset: asset.into(),
            fiat: fiat.into(),
            language,
        }
    }

    fn labels(&self) -> &'static Labels {
        match self.language {
            Language::En => &EN,
            Language::Es => &ES,
        }
    }

    fn header(&self, title: &str, now: DateTime<Utc>) -> String {
        format!(
            "<b>{title}</b>\n<b>{}/{}</b> • {}\n",
            self.fiat,
            self.asset,
            now.format("%Y-%m-%d %H:%M UTC")
        )
    }

    /// Continuously edited status view.
    pub fn status(&self, quote: &Quote, deltas: &[SideDeltas], now: DateTime<Utc>) -> String {
        let l = self.labels();
        let mut msg = self.header(l.price_update, now);

        for side in Side::ALL {
            let title = match side {
                Side::Buy => l.best_buy,
                Side::Sell => l.best_sell,
            };
            let _ = write!(msg, "\n<b>{title}</b>\n");
            match (quote.price(side), quote.side(side)) {
                (Some(price), Some(side_quote)) => {
                    let _ = writeln!(msg, "<b>{price:.2}</b> {}", self.fiat);
                    if let Some(offer) = &side_quote.offer {
                        self.write_offer(&mut msg, offer, 2);
                    }
                }
                _ => {
                    let _ = writeln!(msg, "{}", l.no_offers);
                }
            }
        }

        if let (Some(buy), Some(sell)) = (quote.price(Side::Buy), quote.price(Side::Sell)) {
            let spread = buy - sell;
            let spread_pct = (buy / sell - 1.0) * 100.0;
            let _ = write!(
                msg,
                "\n<b>{}</b>: {spread:.2} {} • {spread_pct:.2}%\n",
                l.spread, self.fiat
            );
        }

        if !deltas.is_empty() {
            let _ = write!(msg, "\n<b>{}</b>\n", l.price_changes);
            for d in deltas {
                let _ = writeln!(
                    msg,
                    "<b>{}</b>  {} {}  •  {} {}",
                    window_label(d.window),
                    l.buy,
                    fmt_delta(d.buy),
                    l.sell,
                    fmt_delta(d.sell)
                );
            }
        }

        msg
    }

    /// One combined message for every alert fired in a tick.
    pub fn alert(&self, events: &[AlertEvent], now: DateTime<Utc>) -> String {
        let l = self.labels();
        let mut msg = self.header(&format!("⚡ {}", l.alert_title), now);

        for event in events {
            let side_label = match event.side {
                Side::Buy => l.buy,
                Side::Sell => l.sell,
            };
            let (trend, direction) = match event.direction {
                Direction::Up => ("🟢 ↗️", l.up),
                Direction::Down => ("🔴 ↘️", l.down),
            };
            let _ = write!(msg, "\n<b>{side_label}</b> {trend} {direction}\n");
            let _ = writeln!(
                msg,
                "{}: <b>{:.2}%</b>",
                l.change,
                event.percent_change.abs()
            );
            let _ = writeln!(
                msg,
                "<b>{:.2}</b> → <b>{:.2}</b> {}",
                event.from_price, event.to_price, self.fiat
            );
            if let Some(offer) = &event.offer {
                self.write_offer(&mut msg, offer, usize::MAX);
            }
        }

        msg
    }

    fn write_offer(&self, msg: &mut String, offer: &OfferDetails, max_methods: usize) {
        let l = self.labels();
        let _ = writeln!(msg, "👤 {}", escape_html(&offer.trader));
        let _ = writeln!(
            msg,
            "📦 {} {}  •  💰 {:.2} {}",
            offer.month_orders, l.orders, offer.available, self.asset
        );
        if !offer.payment_methods.is_empty() {
            let methods: Vec<&str> = offer
                .payment_methods
                .iter()
                .take(max_methods)
                .map(String::as_str)
                .collect();
            let _ = writeln!(msg, "💳 {}", escape_html(&methods.join(", ")));
        }
    }
}

fn fmt_delta(delta: WindowDelta) -> String {
    match delta {
        WindowDelta::Available { percent, .. } if percent > 0.0 => format!("🟢 +{percent:.2}%"),
        WindowDelta::Available { percent, .. } => format!("🔴 {percent:.2}%"),
        WindowDelta::Unavailable => "n/a".to_string(),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use common::SideQuote;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn offer() -> OfferDetails {
        OfferDetails {
            trader: "Cambios<VE>".into(),
            month_orders: 1520,
            available: 812.5,
            payment_methods: vec!["Pago Movil".into(), "Banesco".into(), "Mercantil".into()],
        }
    }

    #[test]
    fn status_lists_prices_spread_and_windows() {
        let quote = Quote {
            timestamp: now(),
            buy: Some(SideQuote { price: 40.0, offer: Some(offer()) }),
            sell: Some(SideQuote::bare(39.0)),
        };
        let deltas = vec![
            SideDeltas {
                window: Duration::minutes(15),
                buy: WindowDelta::Available { percent: 1.25, past_price: 39.5 },
                sell: WindowDelta::Available { percent: -0.5, past_price: 39.2 },
            },
            SideDeltas {
                window: Duration::hours(1),
                buy: WindowDelta::Unavailable,
                sell: WindowDelta::Unavailable,
            },
        ];
        let f = MessageFormatter::new("USDT", "VES", Language::En);
        let msg = f.status(&quote, &deltas, now());

        assert!(msg.contains("VES/USDT"));
        assert!(msg.contains("<b>40.00</b> VES"));
        assert!(msg.contains("Cambios&lt;VE&gt;"));
        assert!(msg.contains("Pago Movil, Banesco"));
        assert!(!msg.contains("Mercantil"));
        assert!(msg.contains("1.00 VES"));
        assert!(msg.contains("+1.25%"));
        assert!(msg.contains("-0.50%"));
        assert!(msg.contains("<b>1h</b>"));
        assert!(msg.contains("n/a"));
    }

    #[test]
    fn status_marks_missing_side() {
        let quote = Quote {
            timestamp: now(),
            buy: None,
            sell: Some(SideQuote::bare(39.0)),
        };
        let f = MessageFormatter::new("USDT", "VES", Language::Es);
        let msg = f.status(&quote, &[], now());
        assert!(msg.contains("Sin ofertas"));
        assert!(!msg.contains("Diferencial"));
    }

    #[test]
    fn alert_combines_events() {
        let events = vec![
            AlertEvent {
                side: Side::Buy,
                direction: Direction::Up,
                percent_change: 5.07,
                from_price: 690.0,
                to_price: 725.0,
                timestamp: now(),
                offer: Some(offer()),
            },
            AlertEvent {
                side: Side::Sell,
                direction: Direction::Down,
                percent_change: -6.0,
                from_price: 700.0,
                to_price: 658.0,
                timestamp: now(),
                offer: None,
            },
        ];
        let f = MessageFormatter::new("USDT", "VES", Language::En);
        let msg = f.alert(&events, now());

        assert!(msg.contains("SUDDEN PRICE CHANGE ALERT!"));
        assert!(msg.contains("<b>690.00</b> → <b>725.00</b> VES"));
        assert!(msg.contains("<b>6.00%</b>"));
        assert!(msg.contains("UP"));
        assert!(msg.contains("DOWN"));
        assert!(msg.contains("Mercantil"));
    }
}
