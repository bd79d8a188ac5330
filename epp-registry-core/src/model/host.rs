//! Host resources.

use std::collections::BTreeSet;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::resource::ResourceCommon;

/// A host (nameserver) object.
///
/// A host is "subordinate" (in bailiwick) when its name falls under a domain
/// on a TLD this registry manages, and "external" otherwise. Subordinate
/// hosts must carry at least one address (glue); external hosts carry none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub common: ResourceCommon,
    /// Glue addresses, ordered for stable rendering.
    pub addresses: BTreeSet<IpAddr>,
    /// Foreign key of the superordinate domain; `None` for external hosts.
    /// A weak reference: resolved through the store at read time, never an
    /// owning link (host and domain lifetimes are independent).
    pub superordinate_domain: Option<String>,
    /// When the superordinate link last changed. Resolves transfer-time
    /// inheritance ordering on rename (see the update flow).
    pub last_superordinate_change: Option<DateTime<Utc>>,
}

impl Host {
    #[must_use]
    pub const fn is_subordinate(&self) -> bool {
        self.superordinate_domain.is_some()
    }

    /// The effective last transfer time, taking superordinate inheritance
    /// into account.
    ///
    /// Hosts transfer with their superordinate domain. If the current
    /// superordinate domain was transferred *after* this host was attached
    /// to it, the domain's transfer time is the host's too; otherwise the
    /// host keeps its own recorded value. `superordinate_transfer_time` is
    /// the old superordinate's last transfer time as read in the same
    /// transaction, so a later transfer of that domain cannot leak in.
    #[must_use]
    pub fn compute_last_transfer_time(
        &self,
        superordinate_transfer_time: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        if !self.is_subordinate() {
            return self.common.last_transfer_time;
        }
        let attached_since = self
            .last_superordinate_change
            .unwrap_or(self.common.creation_time);
        match superordinate_transfer_time {
            Some(domain_time) if domain_time > attached_since => Some(domain_time),
            _ => self.common.last_transfer_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::model::resource::RepoId;

    use super::*;

    fn host_at(created_days_ago: i64) -> Host {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap();
        Host {
            common: ResourceCommon::create(
                RepoId::new(1, "ROID"),
                "ns1.example.tld",
                "TheRegistrar",
                now - Duration::days(created_days_ago),
            ),
            addresses: BTreeSet::new(),
            superordinate_domain: Some("example.tld".to_string()),
            last_superordinate_change: None,
        }
    }

    #[test]
    fn domain_transfer_after_attachment_wins() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap();
        let mut host = host_at(30);
        host.last_superordinate_change = Some(now - Duration::days(4));
        host.common.last_transfer_time = Some(now - Duration::days(12));
        // Domain transferred two days ago, after the host attached.
        let inherited = host.compute_last_transfer_time(Some(now - Duration::days(2)));
        assert_eq!(inherited, Some(now - Duration::days(2)));
    }

    #[test]
    fn host_keeps_own_time_when_domain_transfer_is_older() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap();
        let mut host = host_at(30);
        host.last_superordinate_change = Some(now - Duration::days(4));
        host.common.last_transfer_time = Some(now - Duration::days(12));
        let kept = host.compute_last_transfer_time(Some(now - Duration::days(14)));
        assert_eq!(kept, Some(now - Duration::days(12)));
    }

    #[test]
    fn attachment_falls_back_to_creation_time() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap();
        let host = host_at(3);
        // Domain transferred after the host was created; no explicit
        // superordinate change recorded.
        let inherited = host.compute_last_transfer_time(Some(now - Duration::days(2)));
        assert_eq!(inherited, Some(now - Duration::days(2)));
    }

    #[test]
    fn external_host_ignores_domain_time() {
        let mut host = host_at(3);
        host.superordinate_domain = None;
        assert_eq!(host.compute_last_transfer_time(Some(Utc::now())), None);
    }
}
