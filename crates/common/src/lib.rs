pub mod config;
pub mod error;
pub mod source;
pub mod transport;
pub mod types;

pub use config::{Config, TelegramSettings};
pub use error::{Error, Result};
pub use source::PriceSource;
pub use transport::NotificationTransport;
pub use types::*;
