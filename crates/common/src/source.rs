use async_trait::async_trait;

use crate::{Quote, Result};

/// Abstraction over the marketplace the tracker samples.
///
/// `P2pClient` in `crates/engine` implements this against Binance P2P.
/// An `Err` means "no sample this tick" and is never fatal to the tracker.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the current best BUY and SELL quotes.
    async fn fetch_quote(&self) -> Result<Quote>;
}
