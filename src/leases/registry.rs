use std::collections::HashMap;
use std::sync::RwLock;

use crate::leases::short_id;
use crate::types::Lease;

/// Synchronized in-memory table of active leases.
///
/// Pure bookkeeping: the registry never talks to the issuer. Renewal and
/// expiry decisions are driven from the outside against the snapshots it
/// hands out.
pub struct LeaseRegistry {
    leases: RwLock<HashMap<String, Lease>>,
    renewal_threshold_secs: i64,
}

impl LeaseRegistry {
    pub fn new(renewal_threshold_secs: i64) -> Self {
        Self {
            leases: RwLock::new(HashMap::new()),
            renewal_threshold_secs,
        }
    }

    pub fn register(&self, lease_id: &str, duration_secs: i64, renewable: bool) -> Lease {
        let lease = Lease::new(lease_id.to_string(), duration_secs, renewable);
        self.leases
            .write()
            .unwrap()
            .insert(lease_id.to_string(), lease.clone());

        log::info!(
            "registered lease {}, expires in {}s, renewable={}",
            short_id(lease_id),
            duration_secs,
            renewable
        );

        lease
    }

    pub fn get(&self, lease_id: &str) -> Option<Lease> {
        self.leases.read().unwrap().get(lease_id).cloned()
    }

    /// Remove a lease from tracking. No-op when the lease is unknown.
    pub fn unregister(&self, lease_id: &str) -> Option<Lease> {
        let removed = self.leases.write().unwrap().remove(lease_id);
        if removed.is_some() {
            log::debug!("unregistered lease {}", short_id(lease_id));
        }
        removed
    }

    pub fn active(&self) -> Vec<Lease> {
        self.leases.read().unwrap().values().cloned().collect()
    }

    pub fn needing_renewal(&self) -> Vec<Lease> {
        self.leases
            .read()
            .unwrap()
            .values()
            .filter(|lease| lease.needs_renewal(self.renewal_threshold_secs))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.leases.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.leases.read().unwrap().is_empty()
    }

    pub(crate) fn mark_renewed(&self, lease_id: &str, new_duration_secs: i64) -> Option<Lease> {
        let mut leases = self.leases.write().unwrap();
        leases.get_mut(lease_id).map(|lease| {
            lease.mark_renewed(new_duration_secs);
            lease.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_get_roundtrip() {
        let registry = LeaseRegistry::new(300);
        registry.register("aws/creds/agent/abc123", 3600, true);

        let lease = registry.get("aws/creds/agent/abc123").unwrap();
        assert_eq!(lease.duration_secs, 3600);
        assert!(lease.renewable);
        assert_eq!(lease.renewal_count, 0);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = LeaseRegistry::new(300);
        registry.register("lease-a", 60, true);

        assert!(registry.unregister("lease-a").is_some());
        assert!(registry.unregister("lease-a").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_needing_renewal_honors_threshold_boundary() {
        let registry = LeaseRegistry::new(300);
        registry.register("at-threshold", 300, true);
        registry.register("well-above", 3600, true);
        registry.register("not-renewable", 60, false);

        let due: Vec<String> = registry
            .needing_renewal()
            .into_iter()
            .map(|l| l.lease_id)
            .collect();
        assert_eq!(due, vec!["at-threshold".to_string()]);
    }

    #[test]
    fn test_mark_renewed_updates_bookkeeping() {
        let registry = LeaseRegistry::new(300);
        registry.register("lease-a", 60, true);

        let renewed = registry.mark_renewed("lease-a", 120).unwrap();
        assert_eq!(renewed.renewal_count, 1);
        assert_eq!(renewed.duration_secs, 120);

        assert!(registry.mark_renewed("unknown", 120).is_none());
    }
}
