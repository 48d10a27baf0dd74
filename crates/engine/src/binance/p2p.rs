use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use common::{Error, OfferDetails, PriceSource, Quote, Result, Side, SideQuote};
use tracker::SourceConfig;

const SEARCH_URL: &str = "https://p2p.binance.com/bapi/c2c/v2/friendly/c2c/adv/search";
const MAX_RETRY_AFTER: Duration = Duration::from_secs(300);

/// Binance P2P advertisement search client. Samples the best merchant BUY
/// and SELL price for one asset/fiat pair.
pub struct P2pClient {
    asset: String,
    fiat: String,
    source: SourceConfig,
    http: Client,
}

impl P2pClient {
    pub fn new(
        asset: impl Into<String>,
        fiat: impl Into<String>,
        source: SourceConfig,
    ) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(source.request_timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            asset: asset.into(),
            fiat: fiat.into(),
            source,
            http,
        })
    }

    fn request(&self, side: Side) -> SearchRequest<'_> {
        SearchRequest {
            fiat: &self.fiat,
            asset: &self.asset,
            page: 1,
            rows: self.source.rows,
            trade_type: side.to_string(),
            pay_types: self
                .source
                .payment_methods
                .iter()
                .map(|m| m.replace([' ', '-'], ""))
                .collect(),
            trans_amount: self.source.min_amount,
            publisher_type: "merchant",
            countries: Vec::new(),
            pro_merchant_ads: false,
            shield_merchant_ads: false,
            filter_type: "tradable",
            classifies: ["mass", "profession", "fiat_trade"],
        }
    }

    /// Search one side, retrying with exponential backoff.
    async fn search(&self, side: Side) -> Result<Vec<Advertisement>> {
        let body = self.request(side);
        let attempts = self.source.max_retries.max(1);
        let mut last_error = Error::Source(format!("no attempt made for {side}"));

        for attempt in 0..attempts {
            let backoff = Duration::from_secs(1 << attempt.min(6));
            let (error, wait) = match self.http.post(SEARCH_URL).json(&body).send().await {
                Err(e) => {
                    warn!(side = %side, attempt = attempt + 1, error = %e, "P2P request failed");
                    (Error::Http(e.to_string()), backoff)
                }
                Ok(resp) => {
                    let status = resp.status();
                    if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
                        let wait = retry_after(&resp).unwrap_or(backoff).min(MAX_RETRY_AFTER);
                        warn!(side = %side, status = %status, wait = ?wait, "Rate limited by Binance P2P");
                        (Error::Source(format!("rate limited (HTTP {status})")), wait)
                    } else if !status.is_success() {
                        warn!(side = %side, status = %status, attempt = attempt + 1, "P2P request rejected");
                        (Error::Http(format!("HTTP {status}")), backoff)
                    } else {
                        match resp.text().await {
                            Ok(text) => match parse_response(&text) {
                                Ok(ads) => return Ok(ads),
                                Err(e) => {
                                    warn!(side = %side, attempt = attempt + 1, error = %e, "Undecodable P2P response");
                                    (e, backoff)
                                }
                            },
                            Err(e) => {
                                warn!(side = %side, attempt = attempt + 1, error = %e, "Failed to read P2P response");
                                (Error::Http(e.to_string()), backoff)
                            }
                        }
                    }
                }
            };

            last_error = error;
            if let Some(wait) = retry_delay(attempt, attempts, wait) {
                tokio::time::sleep(wait).await;
            }
        }

        error!(side = %side, attempts, "Giving up on P2P search");
        Err(last_error)
    }

    async fn best_quote(&self, side: Side) -> Result<Option<SideQuote>> {
        let ads = self.search(side).await?;
        let total = ads.len();
        let kept = filter_offers(ads, &self.source);
        debug!(side = %side, total, kept = kept.len(), "Filtered P2P offers");
        Ok(best_offer(side, &kept))
    }
}

#[async_trait]
impl PriceSource for P2pClient {
    async fn fetch_quote(&self) -> Result<Quote> {
        let (buy, sell) = tokio::join!(self.best_quote(Side::Buy), self.best_quote(Side::Sell));

        let buy = buy.unwrap_or_else(|e| {
            warn!(error = %e, "BUY side unavailable");
            None
        });
        let sell = sell.unwrap_or_else(|e| {
            warn!(error = %e, "SELL side unavailable");
            None
        });

        if buy.is_none() && sell.is_none() {
            return Err(Error::Source(format!(
                "no {}/{} offers after filtering",
                self.fiat, self.asset
            )));
        }

        if let (Some(b), Some(s)) = (&buy, &sell) {
            if b.price > s.price * 2.0 || s.price > b.price * 2.0 {
                warn!(buy = b.price, sell = s.price, "Suspicious price spread");
            }
        }
        info!(
            buy = buy.as_ref().map(|q| q.price),
            sell = sell.as_ref().map(|q| q.price),
            "Fetched P2P quote"
        );

        Ok(Quote {
            timestamp: Utc::now(),
            buy,
            sell,
        })
    }
}

/// Pause before the next attempt; `None` after the last one.
fn retry_delay(attempt: u32, attempts: u32, wait: Duration) -> Option<Duration> {
    (attempt + 1 < attempts).then_some(wait)
}

fn parse_response(text: &str) -> Result<Vec<Advertisement>> {
    let parsed: SearchResponse = serde_json::from_str(text)?;
    Ok(parsed.data)
}

fn retry_after(resp: &reqwest::Response) -> Option<Duration> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn normalize_method(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Apply the local offer filters: promoted ads, payment methods, amount range,
/// and non-positive prices.
fn filter_offers(ads: Vec<Advertisement>, cfg: &SourceConfig) -> Vec<Advertisement> {
    let wanted: Vec<String> = cfg.payment_methods.iter().map(|m| normalize_method(m)).collect();
    let excluded: Vec<String> = cfg.exclude_methods.iter().map(|m| normalize_method(m)).collect();

    ads.into_iter()
        .filter(|ad| ad.privilege_type.is_none())
        .filter(|ad| ad.adv.price() > 0.0)
        .filter(|ad| {
            let methods: Vec<String> = ad.adv.method_names().map(normalize_method).collect();
            let has_wanted = wanted.is_empty() || methods.iter().any(|m| wanted.contains(m));
            let has_excluded = methods.iter().any(|m| excluded.contains(m));
            has_wanted && !has_excluded
        })
        .filter(|ad| {
            if cfg.min_amount <= 0.0 {
                return true;
            }
            let min = parse_amount(ad.adv.min_single_trans_amount.as_deref());
            let max = parse_amount(
                ad.adv
                    .dynamic_max_single_trans_amount
                    .as_deref()
                    .or(ad.adv.max_single_trans_amount.as_deref()),
            );
            max > 0.0 && min <= cfg.min_amount && cfg.min_amount <= max
        })
        .collect()
}

/// Lowest price for BUY, highest for SELL.
fn best_offer(side: Side, ads: &[Advertisement]) -> Option<SideQuote> {
    let by_price = |a: &&Advertisement, b: &&Advertisement| a.adv.price().total_cmp(&b.adv.price());
    let best = match side {
        Side::Buy => ads.iter().min_by(by_price),
        Side::Sell => ads.iter().max_by(by_price),
    }?;

    Some(SideQuote {
        price: best.adv.price(),
        offer: Some(OfferDetails {
            trader: best
                .advertiser
                .nick_name
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            month_orders: best.advertiser.month_order_count.unwrap_or(0),
            available: parse_amount(best.adv.surplus_amount.as_deref()),
            payment_methods: best.adv.method_names().map(str::to_string).collect(),
        }),
    })
}

fn parse_amount(value: Option<&str>) -> f64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0.0)
}

// ─── Request / response types ─────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    fiat: &'a str,
    asset: &'a str,
    page: u32,
    rows: u32,
    trade_type: String,
    pay_types: Vec<String>,
    trans_amount: f64,
    publisher_type: &'static str,
    countries: Vec<String>,
    pro_merchant_ads: bool,
    shield_merchant_ads: bool,
    filter_type: &'static str,
    classifies: [&'static str; 3],
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Advertisement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Advertisement {
    adv: Adv,
    #[serde(default)]
    advertiser: Advertiser,
    #[serde(default)]
    privilege_type: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Adv {
    price: String,
    #[serde(default)]
    surplus_amount: Option<String>,
    #[serde(default)]
    min_single_trans_amount: Option<String>,
    #[serde(default)]
    max_single_trans_amount: Option<String>,
    #[serde(default)]
    dynamic_max_single_trans_amount: Option<String>,
    #[serde(default)]
    trade_methods: Vec<TradeMethod>,
}

impl Adv {
    fn price(&self) -> f64 {
        parse_amount(Some(&self.price))
    }

    fn method_names(&self) -> impl Iterator<Item = &str> {
        self.trade_methods
            .iter()
            .filter_map(|m| m.trade_method_name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeMethod {
    #[serde(default)]
    trade_method_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Advertiser {
    #[serde(default)]
    nick_name: Option<String>,
    #[serde(default)]
    month_order_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "code": "000000",
        "data": [
            {
                "adv": {
                    "price": "36.80",
                    "surplusAmount": "120.5",
                    "minSingleTransAmount": "1000",
                    "maxSingleTransAmount": "50000",
                    "tradeMethods": [{"identifier": "PagoMovil", "tradeMethodName": "Pago Movil"}]
                },
                "advertiser": {"nickName": "promo", "monthOrderCount": 10},
                "privilegeType": 8
            },
            {
                "adv": {
                    "price": "36.95",
                    "surplusAmount": "300",
                    "minSingleTransAmount": "500",
                    "dynamicMaxSingleTransAmount": "20000",
                    "tradeMethods": [
                        {"identifier": "PagoMovil", "tradeMethodName": "Pago Movil"},
                        {"identifier": "Banesco", "tradeMethodName": "Banesco"}
                    ]
                },
                "advertiser": {"nickName": "cambista", "monthOrderCount": 1520},
                "privilegeType": null
            },
            {
                "adv": {
                    "price": "37.10",
                    "minSingleTransAmount": "10000",
                    "maxSingleTransAmount": "90000",
                    "tradeMethods": [{"tradeMethodName": "Pago Movil"}]
                },
                "advertiser": {"nickName": "bigticket", "monthOrderCount": 88}
            },
            {
                "adv": {
                    "price": "36.00",
                    "minSingleTransAmount": "100",
                    "maxSingleTransAmount": "90000",
                    "tradeMethods": [{"tradeMethodName": "Recarga Pines"}]
                },
                "advertiser": {"nickName": "pines"}
            }
        ]
    }"#;

    fn ads() -> Vec<Advertisement> {
        parse_response(RESPONSE).unwrap()
    }

    fn nicks(ads: &[Advertisement]) -> Vec<String> {
        ads.iter()
            .map(|a| a.advertiser.nick_name.clone().unwrap_or_default())
            .collect()
    }

    #[test]
    fn promoted_and_excluded_offers_are_dropped() {
        let kept = filter_offers(ads(), &SourceConfig::default());
        assert_eq!(nicks(&kept), vec!["cambista", "bigticket"]);
    }

    #[test]
    fn amount_filter_uses_dynamic_max_first() {
        let cfg = SourceConfig {
            min_amount: 15_000.0,
            ..SourceConfig::default()
        };
        let kept = filter_offers(ads(), &cfg);
        assert_eq!(nicks(&kept), vec!["cambista", "bigticket"]);

        let cfg = SourceConfig {
            min_amount: 25_000.0,
            ..SourceConfig::default()
        };
        assert_eq!(nicks(&filter_offers(ads(), &cfg)), vec!["bigticket"]);
    }

    #[test]
    fn payment_method_filter_ignores_spacing_and_case() {
        let cfg = SourceConfig {
            payment_methods: vec!["banesco".into()],
            ..SourceConfig::default()
        };
        assert_eq!(nicks(&filter_offers(ads(), &cfg)), vec!["cambista"]);

        let cfg = SourceConfig {
            payment_methods: vec!["PagoMovil".into()],
            ..SourceConfig::default()
        };
        assert_eq!(nicks(&filter_offers(ads(), &cfg)), vec!["cambista", "bigticket"]);
    }

    #[test]
    fn best_buy_is_lowest_and_best_sell_is_highest() {
        let kept = filter_offers(ads(), &SourceConfig::default());

        let buy = best_offer(Side::Buy, &kept).unwrap();
        assert_eq!(buy.price, 36.95);
        let offer = buy.offer.unwrap();
        assert_eq!(offer.trader, "cambista");
        assert_eq!(offer.month_orders, 1520);
        assert_eq!(offer.available, 300.0);
        assert_eq!(offer.payment_methods, vec!["Pago Movil", "Banesco"]);

        let sell = best_offer(Side::Sell, &kept).unwrap();
        assert_eq!(sell.price, 37.10);
        assert_eq!(sell.offer.unwrap().available, 0.0);
    }

    #[test]
    fn no_offers_means_no_quote() {
        assert!(best_offer(Side::Buy, &[]).is_none());
    }

    #[test]
    fn request_strips_method_spacing() {
        let client = P2pClient::new(
            "USDT",
            "VES",
            SourceConfig {
                payment_methods: vec!["Pago Movil".into(), "Bank-Transfer".into()],
                min_amount: 5000.0,
                ..SourceConfig::default()
            },
        )
        .unwrap();
        let body = serde_json::to_value(client.request(Side::Sell)).unwrap();
        assert_eq!(body["tradeType"], "SELL");
        assert_eq!(body["payTypes"], serde_json::json!(["PagoMovil", "BankTransfer"]));
        assert_eq!(body["transAmount"], 5000.0);
        assert_eq!(body["fiat"], "VES");
        assert_eq!(body["rows"], 10);
    }

    #[test]
    fn no_pause_after_the_last_attempt() {
        let wait = Duration::from_secs(2);
        assert_eq!(retry_delay(0, 3, wait), Some(wait));
        assert_eq!(retry_delay(1, 3, wait), Some(wait));
        assert_eq!(retry_delay(2, 3, wait), None);
        assert_eq!(retry_delay(0, 1, wait), None);
    }

    #[test]
    fn undecodable_body_is_a_json_error() {
        assert!(matches!(parse_response("<html>busy</html>"), Err(Error::Json(_))));
        assert!(parse_response("{}").unwrap().is_empty());
    }
}
