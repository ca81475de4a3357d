use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::{
    order_types::{ChatTarget, ExchangeRate, TonAddress},
    traits::{
        AddressLookup,
        AddressLookupError,
        ExchangeRateError,
        LedgerError,
        MessageButton,
        MessageRef,
        MessagingError,
        MessagingGateway,
        PickupPoint,
        RateSource,
        RegionCandidate,
        TonLedger,
        TonTransfer,
    },
};

//--------------------------------------   RecordingGateway   --------------------------------------------------------
/// Everything "sent" lands in an in-memory log for the test to assert against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub target: ChatTarget,
    pub text: String,
    pub buttons: Vec<MessageButton>,
}

#[derive(Clone, Default)]
pub struct RecordingGateway {
    sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn messages_to(&self, target: &ChatTarget) -> Vec<SentMessage> {
        self.sent.lock().unwrap().iter().filter(|m| &m.target == target).cloned().collect()
    }

    pub fn count_to(&self, target: &ChatTarget) -> usize {
        self.sent.lock().unwrap().iter().filter(|m| &m.target == target).count()
    }

    pub fn last_to(&self, target: &ChatTarget) -> Option<SentMessage> {
        self.sent.lock().unwrap().iter().filter(|m| &m.target == target).next_back().cloned()
    }

    fn record(&self, target: &ChatTarget, text: &str, buttons: &[MessageButton]) -> MessageRef {
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentMessage { target: target.clone(), text: text.to_string(), buttons: buttons.to_vec() });
        MessageRef(format!("msg-{}", sent.len()))
    }
}

impl MessagingGateway for RecordingGateway {
    async fn send_message(&self, target: &ChatTarget, text: &str) -> Result<MessageRef, MessagingError> {
        Ok(self.record(target, text, &[]))
    }

    async fn send_with_buttons(
        &self,
        target: &ChatTarget,
        text: &str,
        buttons: &[MessageButton],
    ) -> Result<MessageRef, MessagingError> {
        Ok(self.record(target, text, buttons))
    }
}

//--------------------------------------   StaticRateSource   --------------------------------------------------------
/// Always quotes the same rate.
#[derive(Clone)]
pub struct StaticRateSource {
    pub uah_per_ton: i64,
}

impl StaticRateSource {
    pub fn new(uah_per_ton: i64) -> Self {
        Self { uah_per_ton }
    }
}

impl RateSource for StaticRateSource {
    async fn fetch_rate(&self) -> Result<ExchangeRate, ExchangeRateError> {
        Ok(ExchangeRate::from_uah_per_ton(self.uah_per_ton))
    }
}

//--------------------------------------     StaticLedger     --------------------------------------------------------
/// A wallet ledger the test scripts by pushing transfers into it.
#[derive(Clone, Default)]
pub struct StaticLedger {
    transfers: Arc<Mutex<Vec<TonTransfer>>>,
}

impl StaticLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_transfer(&self, transfer: TonTransfer) {
        self.transfers.lock().unwrap().push(transfer);
    }
}

impl TonLedger for StaticLedger {
    async fn incoming_transfers(
        &self,
        _address: &TonAddress,
        since: DateTime<Utc>,
    ) -> Result<Vec<TonTransfer>, LedgerError> {
        Ok(self.transfers.lock().unwrap().iter().filter(|t| t.timestamp >= since).cloned().collect())
    }
}

//--------------------------------------  StaticAddressBook   --------------------------------------------------------
/// A fixed set of region candidates and pickup points, matched by case-insensitive city substring.
#[derive(Clone, Default)]
pub struct StaticAddressBook {
    pub regions: Vec<RegionCandidate>,
    pub points: Vec<(String, PickupPoint)>,
}

impl AddressLookup for StaticAddressBook {
    async fn find_regions(&self, city_query: &str) -> Result<Vec<RegionCandidate>, AddressLookupError> {
        let query = city_query.to_lowercase();
        Ok(self.regions.iter().filter(|r| r.city.to_lowercase().contains(&query)).cloned().collect())
    }

    async fn pickup_points(&self, city: &str) -> Result<Vec<PickupPoint>, AddressLookupError> {
        Ok(self.points.iter().filter(|(c, _)| c == city).map(|(_, p)| p.clone()).collect())
    }
}
