//! Deterministic stand-ins for the engine's collaborators, used by the test suites and available to
//! downstream crates for their own testing.
mod doubles;
#[cfg(feature = "test_utils")]
mod prepare_env;

pub use doubles::{RecordingGateway, SentMessage, StaticAddressBook, StaticLedger, StaticRateSource};
#[cfg(feature = "test_utils")]
pub use prepare_env::prepare_env;
