use std::{sync::Arc, time::Duration as StdDuration};

use chrono::{Duration, Utc};
use log::*;
use tokio::sync::RwLock;

use crate::{order_types::ExchangeRate, traits::RateSource};

const SOURCE_CALL_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// The caching front for the UAH/TON price feed.
///
/// A fetched quote stays fresh for the configured TTL. When the source fails, times out, or returns a
/// nonsense quote, the last good quote is served stale; if no quote was ever fetched, the configured
/// fallback is served. This never errors: an order submission must not fail because a market API is down,
/// and whatever quote is returned gets frozen into the order anyway.
pub struct ExchangeRateApi<S: RateSource> {
    source: S,
    cache: Arc<RwLock<Option<ExchangeRate>>>,
    ttl: Duration,
    fallback: ExchangeRate,
}

impl<S: RateSource> Clone for ExchangeRateApi<S> {
    fn clone(&self) -> Self {
        Self { source: self.source.clone(), cache: Arc::clone(&self.cache), ttl: self.ttl, fallback: self.fallback }
    }
}

impl<S: RateSource> std::fmt::Debug for ExchangeRateApi<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExchangeRateApi")
    }
}

impl<S: RateSource> ExchangeRateApi<S> {
    pub fn new(source: S, ttl: Duration, fallback: ExchangeRate) -> Self {
        Self { source, cache: Arc::new(RwLock::new(None)), ttl, fallback }
    }

    /// The current quote: fresh cache hit, a newly fetched quote, a stale quote, or the fallback,
    /// in that order of preference.
    pub async fn current_rate(&self) -> ExchangeRate {
        if let Some(rate) = *self.cache.read().await {
            if Utc::now() - rate.updated_at < self.ttl {
                return rate;
            }
        }
        match tokio::time::timeout(SOURCE_CALL_TIMEOUT, self.source.fetch_rate()).await {
            Ok(Ok(rate)) if rate.kopiyky_per_ton > 0 => {
                info!("💱 TON rate updated: {rate}");
                *self.cache.write().await = Some(rate);
                rate
            },
            Ok(Ok(rate)) => {
                warn!("💱 Rate source returned a non-positive quote ({}). Serving the previous one.", rate.kopiyky_per_ton);
                self.stale_or_fallback().await
            },
            Ok(Err(e)) => {
                warn!("💱 Rate source failed: {e}. Serving the previous quote.");
                self.stale_or_fallback().await
            },
            Err(_) => {
                warn!("💱 Rate source timed out after {SOURCE_CALL_TIMEOUT:?}. Serving the previous quote.");
                self.stale_or_fallback().await
            },
        }
    }

    async fn stale_or_fallback(&self) -> ExchangeRate {
        match *self.cache.read().await {
            Some(rate) => rate,
            None => self.fallback,
        }
    }
}
