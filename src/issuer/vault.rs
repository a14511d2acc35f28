use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;

use crate::config::Config;
use crate::issuer::{CredentialIssuer, IssuedLease, RenewedLease};

/// Credential issuer backed by HashiCorp Vault's AWS secrets engine.
///
/// Minting hits `GET /v1/<mount>/creds/<role>`, which makes Vault call STS
/// AssumeRole and wrap the temporary credentials in a lease. Renewal and
/// revocation go through the generic `sys/leases` endpoints.
pub struct VaultIssuer {
    addr: String,
    token: Option<String>,
    mount: String,
    role: String,
    client: reqwest::Client,
}

impl VaultIssuer {
    pub fn new(addr: impl Into<String>, token: Option<String>, role: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            token,
            mount: "aws".to_string(),
            role: role.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.vault_addr.clone(),
            config.vault_token.clone(),
            config.vault_role.clone(),
        )
    }

    pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
        self.mount = mount.into();
        self
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.header("X-Vault-Token", token),
            None => builder,
        }
    }
}

#[async_trait]
impl CredentialIssuer for VaultIssuer {
    async fn issue(&self) -> Result<IssuedLease> {
        let url = format!("{}/v1/{}/creds/{}", self.addr, self.mount, self.role);
        let response = self
            .request(self.client.get(url))
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        let lease_id = body["lease_id"]
            .as_str()
            .ok_or_else(|| anyhow!("Vault credential response carries no lease_id"))?
            .to_string();

        Ok(IssuedLease {
            lease_id,
            lease_duration: body["lease_duration"].as_i64().unwrap_or(0),
            renewable: body["renewable"].as_bool().unwrap_or(false),
            data: body["data"].clone(),
        })
    }

    async fn renew(&self, lease_id: &str) -> Result<RenewedLease> {
        let url = format!("{}/v1/sys/leases/renew", self.addr);
        let response = self
            .request(self.client.put(url))
            .json(&json!({ "lease_id": lease_id }))
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;

        Ok(RenewedLease {
            lease_id: body["lease_id"].as_str().unwrap_or(lease_id).to_string(),
            lease_duration: body["lease_duration"].as_i64().unwrap_or(0),
            renewable: body["renewable"].as_bool().unwrap_or(false),
        })
    }

    async fn revoke(&self, lease_id: &str) -> Result<()> {
        let url = format!("{}/v1/sys/leases/revoke", self.addr);
        self.request(self.client.put(url))
            .json(&json!({ "lease_id": lease_id }))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
