//! Shared resource attributes and the repository-id scheme.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use epp_registry_proto::{ResourceKind, StatusValue};

use super::contact::Contact;
use super::domain::Domain;
use super::host::Host;

/// Sentinel deletion time for resources that have never been deleted.
///
/// Using a far-future instant instead of `Option` keeps the "active during
/// [creation, deletion)" interval arithmetic branch-free.
#[must_use]
pub fn end_of_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).single().unwrap_or_default()
}

/// Globally unique, immutable repository id in the `HEX-SUFFIX` format,
/// e.g. `3F2A-TLD`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepoId(String);

impl RepoId {
    /// Builds a repo id from an allocated numeric id and a ROID suffix.
    #[must_use]
    pub fn new(id: u64, roid_suffix: &str) -> Self {
        Self(format!("{id:X}-{roid_suffix}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attributes common to every EPP resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceCommon {
    pub repo_id: RepoId,
    /// Human-readable identifier: fully-qualified name for domains/hosts,
    /// contact id for contacts. Mutable for hosts (rename).
    pub foreign_key: String,
    pub creation_registrar: String,
    pub creation_time: DateTime<Utc>,
    /// [`end_of_time`] while the resource is active.
    pub deletion_time: DateTime<Utc>,
    /// The sponsoring registrar as persisted; the projected sponsor may
    /// differ once a pending transfer's expiration passes.
    pub sponsor_registrar: String,
    pub last_update_time: Option<DateTime<Utc>>,
    pub last_update_registrar: Option<String>,
    pub last_transfer_time: Option<DateTime<Utc>>,
    pub statuses: BTreeSet<StatusValue>,
}

impl ResourceCommon {
    /// A fresh resource created by `registrar` at `now`.
    #[must_use]
    pub fn create(
        repo_id: RepoId,
        foreign_key: impl Into<String>,
        registrar: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let registrar = registrar.into();
        Self {
            repo_id,
            foreign_key: foreign_key.into(),
            creation_registrar: registrar.clone(),
            creation_time: now,
            deletion_time: end_of_time(),
            sponsor_registrar: registrar,
            last_update_time: None,
            last_update_registrar: None,
            last_transfer_time: None,
            statuses: BTreeSet::new(),
        }
    }

    /// Whether the resource exists at `time` (creation inclusive, deletion
    /// exclusive).
    #[must_use]
    pub fn is_active(&self, time: DateTime<Utc>) -> bool {
        self.creation_time <= time && time < self.deletion_time
    }

    #[must_use]
    pub fn has_status(&self, status: StatusValue) -> bool {
        self.statuses.contains(&status)
    }

    /// Records a mutation by `registrar` at `now`.
    pub fn touch(&mut self, registrar: &str, now: DateTime<Utc>) {
        self.last_update_time = Some(now);
        self.last_update_registrar = Some(registrar.to_string());
    }
}

/// A stored resource of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Resource {
    Domain(Domain),
    Host(Host),
    Contact(Contact),
}

impl Resource {
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Domain(_) => ResourceKind::Domain,
            Self::Host(_) => ResourceKind::Host,
            Self::Contact(_) => ResourceKind::Contact,
        }
    }

    #[must_use]
    pub const fn common(&self) -> &ResourceCommon {
        match self {
            Self::Domain(domain) => &domain.common,
            Self::Host(host) => &host.common,
            Self::Contact(contact) => &contact.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut ResourceCommon {
        match self {
            Self::Domain(domain) => &mut domain.common,
            Self::Host(host) => &mut host.common,
            Self::Contact(contact) => &mut contact.common,
        }
    }

    #[must_use]
    pub fn repo_id(&self) -> &RepoId {
        &self.common().repo_id
    }

    #[must_use]
    pub fn foreign_key(&self) -> &str {
        &self.common().foreign_key
    }

    #[must_use]
    pub const fn as_domain(&self) -> Option<&Domain> {
        match self {
            Self::Domain(domain) => Some(domain),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_host(&self) -> Option<&Host> {
        match self {
            Self::Host(host) => Some(host),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_contact(&self) -> Option<&Contact> {
        match self {
            Self::Contact(contact) => Some(contact),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn repo_id_format_is_uppercase_hex() {
        assert_eq!(RepoId::new(0x3F2A, "TLD").as_str(), "3F2A-TLD");
        assert_eq!(RepoId::new(10, "ROID").as_str(), "A-ROID");
    }

    #[test]
    fn lifetime_is_half_open() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut common = ResourceCommon::create(RepoId::new(1, "X"), "a.tld", "r1", t0);
        assert!(common.is_active(t0));
        assert!(!common.is_active(t0 - chrono::Duration::seconds(1)));
        common.deletion_time = t0 + chrono::Duration::days(1);
        assert!(!common.is_active(common.deletion_time));
        assert!(common.is_active(common.deletion_time - chrono::Duration::seconds(1)));
    }
}
