use std::env;

use chrono::Duration;
use log::*;
use npe_common::{helpers::parse_int_flag, Secret};

use crate::order_types::{ChatTarget, ExchangeRate, TonAddress};

/// The fixed discount applied to the TON payment path, in percent. Applied once at order creation;
/// the resulting quote never changes afterwards.
pub const TON_DISCOUNT_PERCENT: i64 = 5;

const DEFAULT_PAYMENT_TIMEOUT_SECS: i64 = 600;
const DEFAULT_TON_GRACE_SECS: i64 = 60;
const DEFAULT_RATE_CACHE_TTL_SECS: i64 = 3600;
const DEFAULT_FALLBACK_RATE_UAH: i64 = 180;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Where admin-facing decision requests and receipts go.
    pub admin_chat: ChatTarget,
    /// The wallet customers pay TON into.
    pub ton_wallet: TonAddress,
    /// The chat-bot credential, passed through to the gateway implementation.
    pub bot_token: Secret<String>,
    /// How long a customer gets to complete a TON transfer before the cash fallback is offered.
    pub payment_timeout: Duration,
    /// Clock-skew allowance when matching ledger transfers against the payment-choice time.
    pub ton_grace: Duration,
    /// How long a fetched UAH/TON quote stays fresh.
    pub rate_cache_ttl: Duration,
    /// Served when the rate source has never answered.
    pub fallback_rate: ExchangeRate,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            admin_chat: ChatTarget::from("0"),
            ton_wallet: TonAddress::from(""),
            bot_token: Secret::default(),
            payment_timeout: Duration::seconds(DEFAULT_PAYMENT_TIMEOUT_SECS),
            ton_grace: Duration::seconds(DEFAULT_TON_GRACE_SECS),
            rate_cache_ttl: Duration::seconds(DEFAULT_RATE_CACHE_TTL_SECS),
            fallback_rate: ExchangeRate::from_uah_per_ton(DEFAULT_FALLBACK_RATE_UAH),
        }
    }
}

impl EngineConfig {
    /// Read the configuration from `NOMERA_*` environment variables, falling back to defaults for
    /// anything missing or unparseable. Missing credentials are logged, not fatal; the engine can run
    /// (and be tested) without them.
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let admin_chat = match env::var("NOMERA_ADMIN_CHAT") {
            Ok(chat) if !chat.trim().is_empty() => ChatTarget::from(chat),
            _ => {
                warn!("🪛️ NOMERA_ADMIN_CHAT is not set. Admin notifications will go nowhere useful.");
                defaults.admin_chat.clone()
            },
        };
        let ton_wallet = match env::var("NOMERA_TON_WALLET") {
            Ok(wallet) if !wallet.trim().is_empty() => TonAddress::from(wallet),
            _ => {
                warn!("🪛️ NOMERA_TON_WALLET is not set. TON payment instructions will carry an empty address.");
                defaults.ton_wallet.clone()
            },
        };
        let bot_token = env::var("NOMERA_BOT_TOKEN").map(Secret::new).unwrap_or_default();
        let payment_timeout =
            Duration::seconds(parse_int_flag(env::var("NOMERA_PAYMENT_TIMEOUT_SECS").ok(), DEFAULT_PAYMENT_TIMEOUT_SECS));
        let ton_grace = Duration::seconds(parse_int_flag(env::var("NOMERA_TON_GRACE_SECS").ok(), DEFAULT_TON_GRACE_SECS));
        let rate_cache_ttl =
            Duration::seconds(parse_int_flag(env::var("NOMERA_RATE_CACHE_TTL_SECS").ok(), DEFAULT_RATE_CACHE_TTL_SECS));
        let fallback_uah = parse_int_flag(env::var("NOMERA_FALLBACK_RATE_UAH").ok(), DEFAULT_FALLBACK_RATE_UAH);
        let fallback_rate = if fallback_uah > 0 {
            ExchangeRate::from_uah_per_ton(fallback_uah)
        } else {
            warn!("🪛️ NOMERA_FALLBACK_RATE_UAH must be positive, not {fallback_uah}. Using {DEFAULT_FALLBACK_RATE_UAH}.");
            ExchangeRate::from_uah_per_ton(DEFAULT_FALLBACK_RATE_UAH)
        };
        Self { admin_chat, ton_wallet, bot_token, payment_timeout, ton_grace, rate_cache_ttl, fallback_rate }
    }
}
