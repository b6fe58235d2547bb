pub mod memory;

pub use memory::{CacheStatus, DEFAULT_BASE_CURRENCY, DEFAULT_TTL, RateCacheState, RateStore};
