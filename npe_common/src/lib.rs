mod nanoton;
mod uah;

pub mod helpers;
pub mod op;
mod secret;

pub use nanoton::{NanoTon, NANOTON_PER_TON, TON_CURRENCY_CODE};
pub use secret::Secret;
pub use uah::{Uah, UahConversionError, UAH_CURRENCY_CODE};
