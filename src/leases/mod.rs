pub mod manager;
pub mod registry;

pub use manager::{ExpiryCallback, LeaseManager};
pub use registry::LeaseRegistry;

/// Lease ids can be long; logs only carry a prefix.
pub(crate) fn short_id(lease_id: &str) -> &str {
    lease_id.get(..16).unwrap_or(lease_id)
}
