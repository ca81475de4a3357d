//! Shared scaffolding for the integration suites: a fully wired engine with a recording gateway, a
//! static rate source and an in-memory store.
use chrono::Duration;
use nomera_engine::{
    config::EngineConfig,
    events::EventProducers,
    order_types::{ChatTarget, CustomerRef, DeliveryData, NewOrder, Order, OrderLine, TonAddress},
    test_utils::{RecordingGateway, StaticRateSource},
    ExchangeRateApi,
    MemoryStore,
    OrderFlowApi,
};
use npe_common::Uah;

pub type TestApi = OrderFlowApi<MemoryStore, RecordingGateway, StaticRateSource>;

pub struct Harness {
    pub api: TestApi,
    pub gateway: RecordingGateway,
    pub store: MemoryStore,
    pub admin: ChatTarget,
    pub customer: ChatTarget,
}

pub fn test_config(payment_timeout: Duration) -> EngineConfig {
    EngineConfig {
        admin_chat: ChatTarget::from("admin-chat"),
        ton_wallet: TonAddress::from("UQtest-wallet"),
        payment_timeout,
        ..EngineConfig::default()
    }
}

pub fn harness_with(config: EngineConfig, producers: EventProducers) -> Harness {
    let _ = env_logger::try_init();
    let store = MemoryStore::new();
    let gateway = RecordingGateway::new();
    let rates = ExchangeRateApi::new(StaticRateSource::new(180), Duration::minutes(60), config.fallback_rate);
    let api = OrderFlowApi::new(store.clone(), gateway.clone(), rates, config, producers);
    Harness {
        api,
        gateway,
        store,
        admin: ChatTarget::from("admin-chat"),
        customer: ChatTarget::from("customer-chat"),
    }
}

pub fn harness() -> Harness {
    harness_with(test_config(Duration::seconds(600)), EventProducers::default())
}

pub fn harness_with_timeout(payment_timeout: Duration) -> Harness {
    harness_with(test_config(payment_timeout), EventProducers::default())
}

pub fn new_order() -> NewOrder {
    NewOrder::new(
        vec![OrderLine::new("+380 (67) 123-45-67", Uah::from(5000))],
        CustomerRef::new("customer-chat", Some("alice".to_string())),
    )
}

pub fn delivery_data() -> DeliveryData {
    DeliveryData {
        phone: "+380501112233".into(),
        last_name: "Шевченко".into(),
        first_name: "Олена".into(),
        city: "Київ".into(),
        region: "Київська".into(),
        district: None,
        pickup_point: "17".into(),
    }
}

/// Submit an order and walk it to `AwaitingPaymentChoice`.
pub async fn order_at_payment_choice(h: &Harness) -> Order {
    use nomera_engine::order_types::AdminDecision;
    let order = h.api.submit_order(new_order()).await.unwrap();
    h.api.admin_decision(&order.order_id, AdminDecision::Available).await.unwrap();
    h.api.submit_delivery_data(&order.order_id, delivery_data()).await.unwrap()
}
