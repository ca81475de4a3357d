use std::future::Future;

use thiserror::Error;

/// A delivery region matching a free-text city query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionCandidate {
    pub city: String,
    pub region: String,
    pub district: Option<String>,
}

/// A carrier pickup point within a resolved city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickupPoint {
    pub label: String,
    pub address: String,
}

/// Resolves free-text city input to delivery regions and lists carrier pickup points. Used by the form
/// front-end to offer completions; the engine itself accepts whatever the submitted form carries, so a
/// lookup outage degrades the form to manual entry and nothing else.
pub trait AddressLookup: Clone + Send + Sync {
    /// Candidate regions for a city query, best match first. An empty result is a valid answer.
    fn find_regions(&self, city_query: &str) -> impl Future<Output = Result<Vec<RegionCandidate>, AddressLookupError>> + Send;

    /// Pickup points in the given city, in carrier numbering order.
    fn pickup_points(&self, city: &str) -> impl Future<Output = Result<Vec<PickupPoint>, AddressLookupError>> + Send;
}

#[derive(Debug, Clone, Error)]
#[error("Address lookup failed: {0}")]
pub struct AddressLookupError(pub String);
