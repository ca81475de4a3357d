use std::future::Future;

use chrono::{DateTime, Utc};
use npe_common::NanoTon;
use thiserror::Error;

use crate::order_types::TonAddress;

/// An incoming transfer observed on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TonTransfer {
    pub tx_ref: String,
    pub amount: NanoTon,
    pub timestamp: DateTime<Utc>,
}

/// Query-by-address view of the TON chain. The underlying explorer only supports polling, so the
/// [`crate::PaymentVerifier`] calls this at bounded intervals rather than subscribing.
pub trait TonLedger: Clone + Send + Sync {
    /// All transfers into `address` with a timestamp at or after `since`, oldest first.
    fn incoming_transfers(
        &self,
        address: &TonAddress,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<TonTransfer>, LedgerError>> + Send;
}

#[derive(Debug, Clone, Error)]
#[error("Ledger query failed: {0}")]
pub struct LedgerError(pub String);
