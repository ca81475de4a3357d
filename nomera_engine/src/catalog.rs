//! Catalog presentation: raw spreadsheet rows in, displayable [`Phone`] records out.
//!
//! Phones are derived data with no lifecycle of their own; every fetch recomputes the whole list.
//! Ukrainian mobile numbers get the `+380 (XX) XXX-XX-XX` rendering, an operator label by prefix, a price
//! category and a short marketing blurb based on the digit pattern of the tail.

use std::sync::OnceLock;

use log::*;
use npe_common::Uah;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::traits::{CatalogError, CatalogRow, CatalogSource};

//--------------------------------------    PriceCategory     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceCategory {
    Vip,
    Gold,
    Silver,
    Bronze,
}

impl PriceCategory {
    pub fn for_price(price: Uah) -> Self {
        match price.value() {
            p if p >= 15_000 => Self::Vip,
            p if p >= 8_000 => Self::Gold,
            p if p >= 3_000 => Self::Silver,
            _ => Self::Bronze,
        }
    }
}

//--------------------------------------        Phone         --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone {
    pub id: i64,
    pub raw_number: String,
    pub number: String,
    pub operator: String,
    pub category: PriceCategory,
    pub price: Uah,
    pub description: String,
    pub features: Vec<String>,
}

//--------------------------------------      CatalogApi      --------------------------------------------------------
/// Fetches rows from the catalog collaborator and derives the displayable phone list. An upstream failure
/// surfaces as an error, never as partial data.
#[derive(Clone)]
pub struct CatalogApi<C: CatalogSource> {
    source: C,
}

impl<C: CatalogSource> CatalogApi<C> {
    pub fn new(source: C) -> Self {
        Self { source }
    }

    pub async fn fetch_phones(&self) -> Result<Vec<Phone>, CatalogError> {
        let rows = self.source.fetch_rows().await?;
        let phones = phones_from_rows(&rows);
        debug!("📗 Catalog fetch complete: {} rows, {} displayable phones", rows.len(), phones.len());
        Ok(phones)
    }
}

/// Blank numbers and non-positive prices are dropped, matching the spreadsheet's habit of half-filled rows.
pub fn phones_from_rows(rows: &[CatalogRow]) -> Vec<Phone> {
    rows.iter()
        .filter(|row| !row.raw_number.trim().is_empty() && row.price > 0)
        .enumerate()
        .map(|(i, row)| {
            let raw = row.raw_number.trim().to_string();
            let price = Uah::from(row.price);
            Phone {
                id: i as i64 + 1,
                number: format_number(&raw),
                operator: operator_for(&raw).to_string(),
                category: PriceCategory::for_price(price),
                description: description_for(&raw, price),
                features: features_for(&raw, price),
                raw_number: raw,
                price,
            }
        })
        .collect()
}

fn digits_of(raw: &str) -> String {
    static NON_DIGIT: OnceLock<Regex> = OnceLock::new();
    let re = NON_DIGIT.get_or_init(|| Regex::new(r"\D").expect("static regex is valid"));
    re.replace_all(raw, "").into_owned()
}

/// `380671234567` or `0671234567` become `+380 (67) 123-45-67`; anything else is passed through untouched.
pub fn format_number(raw: &str) -> String {
    let digits = digits_of(raw);
    let parts = if digits.starts_with("380") && digits.len() >= 12 {
        Some((&digits[3..5], &digits[5..8], &digits[8..10], &digits[10..12]))
    } else if digits.starts_with('0') && digits.len() >= 10 {
        Some((&digits[1..3], &digits[3..6], &digits[6..8], &digits[8..10]))
    } else {
        None
    };
    match parts {
        Some((code, a, b, c)) => format!("+380 ({code}) {a}-{b}-{c}"),
        None => raw.to_string(),
    }
}

pub fn operator_for(raw: &str) -> &'static str {
    let digits = digits_of(raw);
    let code = if digits.starts_with("380") && digits.len() >= 5 {
        &digits[3..5]
    } else if digits.len() >= 3 {
        &digits[1..3]
    } else {
        ""
    };
    match code {
        "39" | "67" | "68" | "96" | "97" | "98" => "Kyivstar",
        "50" | "66" | "95" | "99" => "Vodafone",
        "63" | "73" | "93" => "lifecell",
        "91" => "Trimob",
        "92" => "Peoplenet",
        _ => "Інший оператор",
    }
}

fn tail_digits(raw: &str) -> String {
    let digits = digits_of(raw);
    let skip = digits.len().saturating_sub(7);
    digits[skip..].to_string()
}

/// Four or more of the same digit in a row.
fn has_repeat_run(digits: &str) -> bool {
    let bytes = digits.as_bytes();
    bytes.windows(4).any(|w| w.iter().all(|&b| b == w[0]))
}

/// Three consecutive ascending or descending digits.
fn has_sequence(digits: &str) -> bool {
    let bytes = digits.as_bytes();
    bytes.windows(3).any(|w| {
        (w[1] == w[0] + 1 && w[2] == w[1] + 1) || (w[1] + 1 == w[0] && w[2] + 1 == w[1])
    })
}

/// The last three digits are all the same.
fn has_pretty_tail(digits: &str) -> bool {
    let bytes = digits.as_bytes();
    bytes.len() >= 3 && bytes[bytes.len() - 3..].iter().all(|&b| b == bytes[bytes.len() - 1])
}

pub fn description_for(raw: &str, price: Uah) -> String {
    let tail = tail_digits(raw);
    if has_repeat_run(&tail) {
        "Красивий номер з повторюваними цифрами".to_string()
    } else if has_sequence(&tail) {
        "Номер з послідовністю цифр".to_string()
    } else if has_pretty_tail(&tail) {
        "Номер з однаковими останніми цифрами".to_string()
    } else if price.value() >= 15_000 {
        "Ексклюзивний VIP номер".to_string()
    } else if price.value() >= 8_000 {
        "Преміум номер для бізнесу".to_string()
    } else {
        "Гарний номер телефону".to_string()
    }
}

/// At most three selling points per phone.
pub fn features_for(raw: &str, price: Uah) -> Vec<String> {
    let tail = tail_digits(raw);
    let mut features = Vec::new();
    if price.value() >= 15_000 {
        features.push("VIP".to_string());
    }
    if price.value() >= 8_000 {
        features.push("Преміум".to_string());
    }
    if has_repeat_run(&tail) {
        features.push("Повторювані цифри".to_string());
    }
    if has_sequence(&tail) {
        features.push("Послідовність".to_string());
    }
    if has_pretty_tail(&tail) {
        features.push("Красива кінцівка".to_string());
    }
    if price.value() < 3_000 {
        features.push("Доступна ціна".to_string());
    }
    features.push("Легко запам'ятати".to_string());
    features.truncate(3);
    features
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn formats_international_and_local_numbers() {
        assert_eq!(format_number("380671234567"), "+380 (67) 123-45-67");
        assert_eq!(format_number("+380671234567"), "+380 (67) 123-45-67");
        assert_eq!(format_number("0671234567"), "+380 (67) 123-45-67");
        assert_eq!(format_number("12345"), "12345");
    }

    #[test]
    fn detects_operators() {
        assert_eq!(operator_for("380671234567"), "Kyivstar");
        assert_eq!(operator_for("0501234567"), "Vodafone");
        assert_eq!(operator_for("0931234567"), "lifecell");
        assert_eq!(operator_for("0911234567"), "Trimob");
        assert_eq!(operator_for("0111234567"), "Інший оператор");
    }

    #[test]
    fn price_categories() {
        assert_eq!(PriceCategory::for_price(Uah::from(20_000)), PriceCategory::Vip);
        assert_eq!(PriceCategory::for_price(Uah::from(8_000)), PriceCategory::Gold);
        assert_eq!(PriceCategory::for_price(Uah::from(3_500)), PriceCategory::Silver);
        assert_eq!(PriceCategory::for_price(Uah::from(500)), PriceCategory::Bronze);
    }

    #[test]
    fn digit_pattern_descriptions() {
        assert_eq!(description_for("380677777123", Uah::from(100)), "Красивий номер з повторюваними цифрами");
        assert_eq!(description_for("380671239945", Uah::from(100)), "Номер з послідовністю цифр");
        assert_eq!(description_for("380679040555", Uah::from(100)), "Номер з однаковими останніми цифрами");
        assert_eq!(description_for("380670917846", Uah::from(20_000)), "Ексклюзивний VIP номер");
        assert_eq!(description_for("380670917846", Uah::from(900)), "Гарний номер телефону");
    }

    #[test]
    fn features_are_capped_at_three() {
        let features = features_for("380677777555", Uah::from(20_000));
        assert_eq!(features.len(), 3);
        assert_eq!(features[0], "VIP");
        let features = features_for("380670917846", Uah::from(900)); // no patterns
        assert_eq!(features, vec!["Доступна ціна", "Легко запам'ятати"]);
    }

    #[test]
    fn blank_and_priceless_rows_are_skipped() {
        let rows = vec![
            CatalogRow { raw_number: "380671234567".into(), price: 5000 },
            CatalogRow { raw_number: "   ".into(), price: 5000 },
            CatalogRow { raw_number: "380509876543".into(), price: 0 },
        ];
        let phones = phones_from_rows(&rows);
        assert_eq!(phones.len(), 1);
        assert_eq!(phones[0].id, 1);
        assert_eq!(phones[0].number, "+380 (67) 123-45-67");
        assert_eq!(phones[0].operator, "Kyivstar");
    }
}
