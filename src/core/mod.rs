//! Core business logic abstractions

pub mod config;
pub mod conversion;
pub mod currency;
pub mod entity;
pub mod log;
pub mod rates;
pub mod resolver;

// Re-export main types for cleaner imports
pub use conversion::{ConversionOutcome, Converter};
pub use entity::{ConversionStamp, Convertible, FieldError};
pub use rates::{RateFetcher, RateSource, RateTable};
pub use resolver::{RatePath, Resolution, ResolutionObserver};
