//! # Collaborator contracts.
//!
//! The engine drives the order state machine; everything around it (storage, messaging, the price feed,
//! the chain explorer and the catalog spreadsheet) is an external collaborator, represented here by a trait.
//!
//! * [`OrderStore`] is the single source of truth for order state. [`OrderMirror`] is the best-effort
//!   write-behind copy used for crash recovery; it may never block a transition.
//! * [`MessagingGateway`] delivers texts and inline keyboards to the customer and the admin. Delivery is
//!   best-effort; a failed send is logged and never rolls back a state change.
//! * [`RateSource`] supplies the UAH/TON quote. [`TonLedger`] answers address-scoped transfer queries for
//!   the payment verifier. [`CatalogSource`] yields raw spreadsheet rows. [`AddressLookup`] offers
//!   city/region/pickup-point completions for the delivery form.
mod address_lookup;
mod catalog_source;
mod exchange_rates;
mod ledger;
mod messaging;
mod order_store;

pub use address_lookup::{AddressLookup, AddressLookupError, PickupPoint, RegionCandidate};
pub use catalog_source::{CatalogError, CatalogRow, CatalogSource};
pub use exchange_rates::{ExchangeRateError, RateSource};
pub use ledger::{LedgerError, TonLedger, TonTransfer};
pub use messaging::{MessageButton, MessageRef, MessagingError, MessagingGateway};
pub use order_store::{OrderMirror, OrderStore, OrderStoreError};
