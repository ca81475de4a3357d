use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::op;

pub const UAH_CURRENCY_CODE: &str = "UAH";

//--------------------------------------        Uah         ----------------------------------------------------------
/// An amount in whole Ukrainian hryvnia. Catalog prices are integral, so no kopiyka fraction is carried here;
/// conversions that need sub-hryvnia precision (the TON discount) go through [`Uah::to_kopiyky`].
#[derive(Debug, Clone, Copy, Default, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Uah(i64);

op!(binary Uah, Add, add);
op!(binary Uah, Sub, sub);
op!(inplace Uah, SubAssign, sub_assign);
op!(unary Uah, Neg, neg);

impl Mul<i64> for Uah {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Uah {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in hryvnia: {0}")]
pub struct UahConversionError(String);

impl From<i64> for Uah {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Uah {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Uah {}

impl TryFrom<u64> for Uah {
    type Error = UahConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(UahConversionError(format!("Value {} is too large to convert to Uah", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Uah {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} грн.", group_thousands(self.0))
    }
}

impl Uah {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn to_kopiyky(&self) -> i64 {
        self.0 * 100
    }

    pub fn from_kopiyky(kopiyky: i64) -> Self {
        Self(kopiyky / 100)
    }
}

/// Renders 12345 as "12 345", the uk-UA digit grouping used in customer-facing messages.
fn group_thousands(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - offset) % 3 == 0 {
            out.push('\u{a0}');
        }
        out.push(c);
    }
    if negative {
        format!("-{out}")
    } else {
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Uah::from(5000);
        let b = Uah::from(1500);
        assert_eq!(a + b, Uah::from(6500));
        assert_eq!(a - b, Uah::from(3500));
        assert_eq!(-b, Uah::from(-1500));
        assert_eq!(a * 3, Uah::from(15_000));
        let total: Uah = vec![a, b, Uah::from(500)].into_iter().sum();
        assert_eq!(total, Uah::from(7000));
    }

    #[test]
    fn display_groups_digits() {
        assert_eq!(format!("{}", Uah::from(500)), "500 грн.");
        assert_eq!(format!("{}", Uah::from(5000)), "5\u{a0}000 грн.");
        assert_eq!(format!("{}", Uah::from(1_250_000)), "1\u{a0}250\u{a0}000 грн.");
    }

    #[test]
    fn kopiyky_round_trip() {
        assert_eq!(Uah::from(4750).to_kopiyky(), 475_000);
        assert_eq!(Uah::from_kopiyky(475_099), Uah::from(4750));
    }
}
