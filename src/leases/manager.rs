use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::issuer::CredentialIssuer;
use crate::leases::registry::LeaseRegistry;
use crate::leases::short_id;
use crate::types::Lease;

/// Invoked with the lease id when a lease expires without being renewed.
pub type ExpiryCallback = Arc<dyn Fn(&str) + Send + Sync>;

const TICK_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Owns the lease registry and drives the renewal lifecycle.
///
/// While running, a background task polls the registry: leases inside the
/// renewal threshold are renewed through the issuer, then expired leases
/// are swept and the expiry callback fires once per removal. `stop`
/// cancels the task, waits for it, and revokes every remaining lease.
///
/// Cloning yields another handle to the same manager.
#[derive(Clone)]
pub struct LeaseManager {
    registry: Arc<LeaseRegistry>,
    issuer: Arc<dyn CredentialIssuer>,
    poll_interval: Duration,
    auto_renew: bool,
    running: Arc<AtomicBool>,
    renewal_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    on_expired: Arc<RwLock<Option<ExpiryCallback>>>,
}

impl LeaseManager {
    pub fn new(issuer: Arc<dyn CredentialIssuer>, config: &Config) -> Self {
        Self {
            registry: Arc::new(LeaseRegistry::new(config.renewal_threshold_secs)),
            issuer,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            auto_renew: config.auto_renew,
            running: Arc::new(AtomicBool::new(false)),
            renewal_task: Arc::new(Mutex::new(None)),
            on_expired: Arc::new(RwLock::new(None)),
        }
    }

    pub fn registry(&self) -> &Arc<LeaseRegistry> {
        &self.registry
    }

    /// Track a newly minted lease.
    pub fn register_lease(&self, lease_id: &str, duration_secs: i64, renewable: bool) -> Lease {
        self.registry.register(lease_id, duration_secs, renewable)
    }

    /// Start the background renewal task. A second call while running is a
    /// no-op.
    pub async fn start(&self, on_expired: Option<ExpiryCallback>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        *self.on_expired.write().unwrap() = on_expired;

        if self.auto_renew {
            let manager = self.clone();
            let handle = tokio::spawn(async move {
                manager.renewal_loop().await;
            });
            *self.renewal_task.lock().await = Some(handle);
        }

        log::info!("lease manager started");
    }

    /// Cancel the renewal task, wait for it to wind down, then revoke all
    /// remaining leases. Safe to call again once stopped.
    pub async fn stop(&self) {
        log::info!("stopping lease manager");
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.renewal_task.lock().await.take() {
            handle.abort();
            let _ = handle.await;
        }

        self.revoke_all().await;
        log::info!("lease manager stopped");
    }

    /// Renew one lease through the issuer, updating the registry on
    /// success. Failures are logged; the lease is left untouched so the
    /// next tick retries it.
    pub async fn renew_lease(&self, lease_id: &str) -> bool {
        let Some(lease) = self.registry.get(lease_id) else {
            log::warn!("attempted to renew unknown lease {}", short_id(lease_id));
            return false;
        };

        if !lease.renewable {
            log::warn!("lease {} is not renewable", short_id(lease_id));
            return false;
        }

        match self.issuer.renew(lease_id).await {
            Ok(renewed) => {
                if let Some(updated) = self.registry.mark_renewed(lease_id, renewed.lease_duration)
                {
                    log::info!(
                        "renewed lease {}, new duration={}s, renewal #{}",
                        short_id(lease_id),
                        updated.duration_secs,
                        updated.renewal_count
                    );
                }
                true
            }
            Err(e) => {
                log::error!("failed to renew lease {}: {e:#}", short_id(lease_id));
                false
            }
        }
    }

    /// Revoke one lease. The lease stays registered if the issuer call
    /// fails.
    pub async fn revoke_lease(&self, lease_id: &str) -> bool {
        match self.issuer.revoke(lease_id).await {
            Ok(()) => {
                self.registry.unregister(lease_id);
                true
            }
            Err(e) => {
                log::error!("failed to revoke lease {}: {e:#}", short_id(lease_id));
                false
            }
        }
    }

    /// Shutdown sweep: every remaining lease gets one revoke attempt and
    /// is dropped from the registry regardless of the outcome.
    pub async fn revoke_all(&self) {
        let leases = self.registry.active();
        log::info!("revoking {} active leases", leases.len());

        for lease in leases {
            if let Err(e) = self.issuer.revoke(&lease.lease_id).await {
                log::error!(
                    "failed to revoke lease {}: {e:#}",
                    short_id(&lease.lease_id)
                );
            }
            self.registry.unregister(&lease.lease_id);
        }
    }

    async fn renewal_loop(&self) {
        log::info!("lease renewal loop running");

        while self.running.load(Ordering::SeqCst) {
            if let Err(e) = self.run_tick().await {
                log::error!("renewal loop tick failed: {e:#}");
                tokio::time::sleep(TICK_ERROR_BACKOFF).await;
                continue;
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        log::info!("lease renewal loop stopped");
    }

    /// One poll tick: renew everything inside the threshold, then sweep
    /// expired leases. The expiry scan always runs after the renewals so a
    /// lease renewed in this tick is never swept by it.
    async fn run_tick(&self) -> Result<()> {
        for lease in self.registry.needing_renewal() {
            self.renew_lease(&lease.lease_id).await;
        }

        let now = Utc::now();
        for lease in self.registry.active() {
            if lease.expires_at() <= now {
                log::warn!("lease {} has expired", short_id(&lease.lease_id));
                if self.registry.unregister(&lease.lease_id).is_some() {
                    if let Some(callback) = self.on_expired.read().unwrap().as_ref() {
                        callback(&lease.lease_id);
                    }
                }
            }
        }

        Ok(())
    }
}
