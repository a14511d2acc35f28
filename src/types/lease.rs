use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A tracked time-bound credential grant.
///
/// The lease expires `duration_secs` after its creation or its most recent
/// renewal, whichever came last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lease {
    pub lease_id: String,
    pub created_at: DateTime<Utc>,
    pub duration_secs: i64,
    pub renewable: bool,
    pub last_renewed: Option<DateTime<Utc>>,
    pub renewal_count: u32,
}

impl Lease {
    pub fn new(lease_id: String, duration_secs: i64, renewable: bool) -> Self {
        Self {
            lease_id,
            created_at: Utc::now(),
            duration_secs,
            renewable,
            last_renewed: None,
            renewal_count: 0,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        let base = self.last_renewed.unwrap_or(self.created_at);
        base + Duration::seconds(self.duration_secs)
    }

    /// Seconds until expiry, clamped at zero.
    pub fn seconds_remaining(&self) -> i64 {
        (self.expires_at() - Utc::now()).num_seconds().max(0)
    }

    pub fn needs_renewal(&self, threshold_secs: i64) -> bool {
        self.renewable && self.seconds_remaining() <= threshold_secs
    }

    pub fn mark_renewed(&mut self, new_duration_secs: i64) {
        self.last_renewed = Some(Utc::now());
        self.duration_secs = new_duration_secs;
        self.renewal_count += 1;
    }
}
