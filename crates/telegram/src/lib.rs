pub mod transport;

pub use transport::TelegramTransport;
