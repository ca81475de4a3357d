use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
};

use serde::{Deserialize, Serialize};

use crate::op;

pub const TON_CURRENCY_CODE: &str = "TON";
pub const NANOTON_PER_TON: i64 = 1_000_000_000;

//--------------------------------------      NanoTon       ----------------------------------------------------------
/// An amount in nanoton (10⁻⁹ TON), the smallest on-chain unit. All ledger amounts and payment quotes are
/// carried in nanoton so that tolerance checks are exact integer comparisons.
#[derive(Debug, Clone, Copy, Default, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NanoTon(i64);

op!(binary NanoTon, Add, add);
op!(binary NanoTon, Sub, sub);
op!(inplace NanoTon, SubAssign, sub_assign);
op!(unary NanoTon, Neg, neg);

impl Mul<i64> for NanoTon {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for NanoTon {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl From<i64> for NanoTon {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for NanoTon {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for NanoTon {}

impl Display for NanoTon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.abs() < 1_000_000 {
            write!(f, "{} nTON", self.0)
        } else {
            let ton = self.0 as f64 / NANOTON_PER_TON as f64;
            write!(f, "{ton:0.3} TON")
        }
    }
}

impl NanoTon {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_ton(ton: i64) -> Self {
        Self(ton * NANOTON_PER_TON)
    }

    /// `pct` percent of the amount, rounded towards zero.
    pub fn percent(&self, pct: i64) -> Self {
        let scaled = (self.0 as i128 * pct as i128) / 100;
        #[allow(clippy::cast_possible_truncation)]
        Self(scaled as i64)
    }
}
