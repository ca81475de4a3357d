use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use npe_common::{NanoTon, Uah, NANOTON_PER_TON};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

//--------------------------------------      ChatTarget     ---------------------------------------------------------
/// A lightweight wrapper around the messaging gateway's addressing token (a chat id, in practice).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatTarget(pub String);

impl Display for ChatTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S: Into<String>> From<S> for ChatTarget {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

//--------------------------------------      TonAddress     ---------------------------------------------------------
/// The destination wallet address that customers pay into. Opaque to the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TonAddress(pub String);

impl Display for TonAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S: Into<String>> From<S> for TonAddress {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

//--------------------------------------        OrderId       --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generates a fresh order id from 96 bits of OS randomness. Collisions are negligible, but the store
    /// still checks for them on insert.
    pub fn random() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        let id = bytes.iter().fold(String::with_capacity(24), |mut s, b| {
            use std::fmt::Write;
            let _ = write!(s, "{b:02x}");
            s
        });
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------      OrderState      --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    /// The order record exists but the admin notification has not been prepared yet. Transient.
    Created,
    /// The admin has been asked to confirm that the numbers are in stock.
    AwaitingAdminDecision,
    /// The admin confirmed availability; the customer must submit delivery details.
    AwaitingDeliveryData,
    /// Delivery details are in; the customer must pick cash-on-delivery or TON.
    AwaitingPaymentChoice,
    /// The customer chose TON; a transfer is awaited until the payment deadline.
    AwaitingTonPayment,
    /// Terminal. The customer will pay on delivery.
    ConfirmedCash,
    /// Terminal. A matching TON transfer was observed.
    Paid,
    /// Terminal. The admin reported the numbers as unavailable.
    Rejected,
}

impl OrderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::ConfirmedCash | OrderState::Paid | OrderState::Rejected)
    }
}

impl Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderState::Created => "Created",
            OrderState::AwaitingAdminDecision => "AwaitingAdminDecision",
            OrderState::AwaitingDeliveryData => "AwaitingDeliveryData",
            OrderState::AwaitingPaymentChoice => "AwaitingPaymentChoice",
            OrderState::AwaitingTonPayment => "AwaitingTonPayment",
            OrderState::ConfirmedCash => "ConfirmedCash",
            OrderState::Paid => "Paid",
            OrderState::Rejected => "Rejected",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order state: {0}")]
pub struct StateConversionError(String);

impl FromStr for OrderState {
    type Err = StateConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(Self::Created),
            "AwaitingAdminDecision" => Ok(Self::AwaitingAdminDecision),
            "AwaitingDeliveryData" => Ok(Self::AwaitingDeliveryData),
            "AwaitingPaymentChoice" => Ok(Self::AwaitingPaymentChoice),
            "AwaitingTonPayment" => Ok(Self::AwaitingTonPayment),
            "ConfirmedCash" => Ok(Self::ConfirmedCash),
            "Paid" => Ok(Self::Paid),
            "Rejected" => Ok(Self::Rejected),
            s => Err(StateConversionError(s.to_string())),
        }
    }
}

//--------------------------------------    AdminDecision     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminDecision {
    Available,
    Unavailable,
}

//--------------------------------------    PaymentMethod     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    CashOnDelivery,
    Ton,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::CashOnDelivery => write!(f, "Оплата при отриманні"),
            PaymentMethod::Ton => write!(f, "Оплата в TON"),
        }
    }
}

//--------------------------------------     CustomerRef      --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRef {
    /// Where customer-facing messages get delivered.
    pub chat: ChatTarget,
    /// Display name, if the gateway knows one.
    pub username: Option<String>,
}

impl CustomerRef {
    pub fn new<C: Into<ChatTarget>>(chat: C, username: Option<String>) -> Self {
        Self { chat: chat.into(), username }
    }

    pub fn display_name(&self) -> String {
        match &self.username {
            Some(name) => format!("@{name}"),
            None => "невідомий".to_string(),
        }
    }
}

//--------------------------------------     DeliveryData     --------------------------------------------------------
/// Nova Poshta delivery details, submitted through the structured form. Free-text parsing of chat replies is
/// deliberately not supported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryData {
    pub phone: String,
    pub last_name: String,
    pub first_name: String,
    pub city: String,
    pub region: String,
    pub district: Option<String>,
    pub pickup_point: String,
}

pub const DISTRICT_PLACEHOLDER: &str = "не вказано";

impl DeliveryData {
    /// Names of required fields that are empty or missing. `district` is optional.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let required: [(&str, &str); 6] = [
            ("phone", &self.phone),
            ("last_name", &self.last_name),
            ("first_name", &self.first_name),
            ("city", &self.city),
            ("region", &self.region),
            ("pickup_point", &self.pickup_point),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                missing.push(name);
            }
        }
        missing
    }

    pub fn district_or_placeholder(&self) -> &str {
        self.district.as_deref().filter(|d| !d.trim().is_empty()).unwrap_or(DISTRICT_PLACEHOLDER)
    }
}

//--------------------------------------      OrderLine       --------------------------------------------------------
/// A snapshot of a catalog phone at order time. Catalog price changes after this point must not affect the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub phone_number: String,
    pub price: Uah,
}

impl OrderLine {
    pub fn new<S: Into<String>>(phone_number: S, price: Uah) -> Self {
        Self { phone_number: phone_number.into(), price }
    }
}

//--------------------------------------     ExchangeRate     --------------------------------------------------------
/// A UAH/TON quote, in kopiyky per whole TON. Snapshotted into every order so that the price shown to the
/// customer never drifts, whatever the rate source does afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub kopiyky_per_ton: i64,
    pub updated_at: DateTime<Utc>,
}

/// 180 UAH per TON, the hardcoded last-resort quote when the rate source has never answered.
pub const FALLBACK_KOPIYKY_PER_TON: i64 = 18_000;

impl ExchangeRate {
    pub fn new(kopiyky_per_ton: i64, updated_at: Option<DateTime<Utc>>) -> Self {
        Self { kopiyky_per_ton, updated_at: updated_at.unwrap_or_else(Utc::now) }
    }

    pub fn from_uah_per_ton(uah: i64) -> Self {
        Self::new(uah * 100, None)
    }

    pub fn fallback() -> Self {
        Self::new(FALLBACK_KOPIYKY_PER_TON, None)
    }

    /// Convert an amount in kopiyky to nanoton at this rate, rounding towards zero. A non-positive
    /// quote quotes at the hardcoded fallback instead; the order path must never panic on a corrupt rate.
    pub fn kopiyky_to_nanoton(&self, kopiyky: i64) -> NanoTon {
        let per_ton = if self.kopiyky_per_ton > 0 { self.kopiyky_per_ton } else { FALLBACK_KOPIYKY_PER_TON };
        let nanoton = (kopiyky as i128 * NANOTON_PER_TON as i128) / per_ton as i128;
        #[allow(clippy::cast_possible_truncation)]
        NanoTon::from(nanoton as i64)
    }
}

impl Display for ExchangeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "1 TON => {}.{:02} грн.", self.kopiyky_per_ton / 100, self.kopiyky_per_ton % 100)
    }
}

//--------------------------------------       NewOrder       --------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub lines: Vec<OrderLine>,
    pub customer: CustomerRef,
}

impl NewOrder {
    pub fn new(lines: Vec<OrderLine>, customer: CustomerRef) -> Self {
        Self { lines, customer }
    }

    pub fn total(&self) -> Uah {
        self.lines.iter().map(|l| l.price).sum()
    }
}

//--------------------------------------        Order         --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    /// Insertion order is display order. Never empty.
    pub lines: Vec<OrderLine>,
    /// Sum of line prices at creation time. Immutable.
    pub total: Uah,
    /// The rate snapshot taken when the order was created.
    pub rate: ExchangeRate,
    /// The 5%-discounted TON quote, frozen at creation.
    pub discounted_ton: NanoTon,
    pub customer: CustomerRef,
    pub delivery: Option<DeliveryData>,
    pub payment_method: Option<PaymentMethod>,
    pub state: OrderState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set while the order is in `AwaitingTonPayment`; cleared on confirm or fallback.
    pub ton_deadline: Option<DateTime<Utc>>,
    /// When the customer last picked the TON path. Bounds the ledger search window.
    pub ton_chosen_at: Option<DateTime<Utc>>,
    /// The transaction reference of the accepted transfer, once the order is `Paid`.
    pub ton_tx_ref: Option<String>,
}

impl Order {
    pub fn phone_list(&self) -> String {
        self.lines.iter().map(|l| l.phone_number.as_str()).collect::<Vec<_>>().join(", ")
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn random_order_ids_are_unique_and_opaque() {
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let id = OrderId::random();
            assert_eq!(id.as_str().len(), 24);
            assert!(seen.insert(id));
        }
    }

    #[test]
    fn state_round_trip() {
        for state in [
            OrderState::Created,
            OrderState::AwaitingAdminDecision,
            OrderState::AwaitingDeliveryData,
            OrderState::AwaitingPaymentChoice,
            OrderState::AwaitingTonPayment,
            OrderState::ConfirmedCash,
            OrderState::Paid,
            OrderState::Rejected,
        ] {
            assert_eq!(state.to_string().parse::<OrderState>().unwrap(), state);
        }
        assert!("AwaitingGodot".parse::<OrderState>().is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(OrderState::Rejected.is_terminal());
        assert!(OrderState::ConfirmedCash.is_terminal());
        assert!(OrderState::Paid.is_terminal());
        assert!(!OrderState::AwaitingTonPayment.is_terminal());
    }

    #[test]
    fn delivery_data_validation() {
        let data = DeliveryData {
            phone: "+380671234567".into(),
            last_name: "Шевченко".into(),
            first_name: "Олена".into(),
            city: "Київ".into(),
            region: "Київська".into(),
            district: None,
            pickup_point: "12".into(),
        };
        assert!(data.missing_fields().is_empty());
        assert_eq!(data.district_or_placeholder(), DISTRICT_PLACEHOLDER);

        let incomplete = DeliveryData { city: "  ".into(), ..data };
        assert_eq!(incomplete.missing_fields(), vec!["city"]);
    }

    #[test]
    fn rate_conversion() {
        let rate = ExchangeRate::from_uah_per_ton(180);
        // 4750 UAH at 180 UAH/TON => 26.388... TON
        assert_eq!(rate.kopiyky_to_nanoton(475_000), NanoTon::from(26_388_888_888));
        assert_eq!(format!("{rate}"), "1 TON => 180.00 грн.");
    }

    #[test]
    fn non_positive_rates_quote_at_the_fallback() {
        let expected = ExchangeRate::fallback().kopiyky_to_nanoton(475_000);
        assert_eq!(ExchangeRate::from_uah_per_ton(0).kopiyky_to_nanoton(475_000), expected);
        assert_eq!(ExchangeRate::from_uah_per_ton(-5).kopiyky_to_nanoton(475_000), expected);
    }
}
