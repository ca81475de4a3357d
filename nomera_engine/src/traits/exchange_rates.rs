use std::future::Future;

use thiserror::Error;

use crate::order_types::ExchangeRate;

/// A live UAH/TON price feed. Implementations query an external market API; the engine never calls this
/// directly, only through the caching [`crate::ExchangeRateApi`].
pub trait RateSource: Clone + Send + Sync {
    fn fetch_rate(&self) -> impl Future<Output = Result<ExchangeRate, ExchangeRateError>> + Send;
}

#[derive(Debug, Clone, Error)]
pub enum ExchangeRateError {
    #[error("The rate source is unavailable: {0}")]
    SourceUnavailable(String),
    #[error("The rate source returned an unusable quote: {0}")]
    InvalidQuote(String),
}
