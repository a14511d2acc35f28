pub mod vault;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use vault::VaultIssuer;

/// A freshly minted credential lease. `data` carries the credential
/// material itself and is opaque to the lease machinery.
#[derive(Debug, Clone)]
pub struct IssuedLease {
    pub lease_id: String,
    pub lease_duration: i64,
    pub renewable: bool,
    pub data: Value,
}

/// Issuer response to a renewal request.
#[derive(Debug, Clone)]
pub struct RenewedLease {
    pub lease_id: String,
    pub lease_duration: i64,
    pub renewable: bool,
}

/// Mints, renews, and revokes time-bound credential leases.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    async fn issue(&self) -> Result<IssuedLease>;

    async fn renew(&self, lease_id: &str) -> Result<RenewedLease>;

    async fn revoke(&self, lease_id: &str) -> Result<()>;
}
