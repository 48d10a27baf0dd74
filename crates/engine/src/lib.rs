pub mod binance;
pub mod lifecycle;

pub use binance::P2pClient;
pub use lifecycle::{TickReport, Tracker, TrackerHandle};
