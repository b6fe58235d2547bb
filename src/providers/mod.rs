pub mod exchange_rate_api;
pub mod fallback;

pub use exchange_rate_api::ExchangeRateApiFetcher;
pub use fallback::{FallbackFetcher, fallback_rates};
