//! Temporal projection: the observable state of a resource at an instant.
//!
//! Persisted resources store *scheduled* transitions — a pending delete with
//! a future deletion time, a pending transfer with an auto-approval time, a
//! registration expiration that autorenews. Reading a resource therefore
//! means combining the persisted form with a timestamp. `project` is a pure
//! function of (resource, time): it never touches the store, and calling it
//! twice yields identical results.

use chrono::{DateTime, Utc};

use epp_registry_proto::StatusValue;

use crate::model::{add_years, Domain, Resource, TransferStatus};

/// Projects a persisted resource to its effective state at `as_of`.
///
/// Returns `None` when the resource does not observably exist at that
/// instant: before its creation time, or at/after its deletion time.
#[must_use]
pub fn project(resource: &Resource, as_of: DateTime<Utc>) -> Option<Resource> {
    if !resource.common().is_active(as_of) {
        return None;
    }
    let mut projected = resource.clone();
    match &mut projected {
        Resource::Domain(domain) => {
            project_transfer(domain, as_of);
            project_autorenew(domain, as_of);
        }
        Resource::Contact(contact) => {
            let transfer = &contact.transfer_data;
            if transfer.is_pending() {
                if let Some(expiration) = transfer.pending_expiration_time {
                    if expiration <= as_of {
                        contact.common.statuses.remove(&StatusValue::PendingTransfer);
                        if let Some(gaining) = transfer.gaining_registrar.clone() {
                            contact.common.sponsor_registrar = gaining;
                        }
                        contact.common.last_transfer_time = Some(expiration);
                        contact.transfer_data =
                            contact.transfer_data.resolve(TransferStatus::ServerApproved);
                    }
                }
            }
        }
        // Hosts carry no self-scheduled transitions; transfers ride the
        // superordinate domain and deletion is handled by the lifetime
        // check above.
        Resource::Host(_) => {}
    }
    Some(projected)
}

/// Resolves a pending transfer whose auto-approval time has passed.
///
/// The projected sponsor is the gaining registrar even though no explicit
/// approve flow ever ran; the staged server-approve entity references are
/// cleared exactly as an explicit server approval would.
fn project_transfer(domain: &mut Domain, as_of: DateTime<Utc>) {
    let transfer = &domain.transfer_data;
    if !transfer.is_pending() {
        return;
    }
    let Some(expiration) = transfer.pending_expiration_time else {
        return;
    };
    if expiration > as_of {
        return;
    }
    domain.common.statuses.remove(&StatusValue::PendingTransfer);
    if let Some(gaining) = transfer.gaining_registrar.clone() {
        domain.common.sponsor_registrar = gaining;
    }
    domain.common.last_transfer_time = Some(expiration);
    if let Some(new_expiration) = transfer.server_approve_new_expiration {
        domain.registration_expiration_time = new_expiration;
    }
    domain.transfer_data = domain.transfer_data.resolve(TransferStatus::ServerApproved);
}

/// Advances an expired registration in one-year steps until it is in the
/// future. Billing/poll bookkeeping for autorenews is written by flows that
/// commit the projection; the projection itself persists nothing.
fn project_autorenew(domain: &mut Domain, as_of: DateTime<Utc>) {
    if domain.common.has_status(StatusValue::PendingDelete) {
        return;
    }
    while domain.registration_expiration_time <= as_of {
        domain.registration_expiration_time = add_years(domain.registration_expiration_time, 1);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{Duration, TimeZone};

    use crate::model::{RepoId, ResourceCommon, TransferData};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn domain() -> Domain {
        Domain {
            common: ResourceCommon::create(RepoId::new(1, "TLD"), "example.tld", "TheRegistrar", t0()),
            tld: "tld".to_string(),
            registrant: "jd1234".to_string(),
            contacts: Vec::new(),
            nameservers: BTreeSet::new(),
            subordinate_hosts: BTreeSet::new(),
            registration_expiration_time: t0() + Duration::days(365),
            transfer_data: TransferData::default(),
            auth_info: "2fooBAR".to_string(),
            autorenew_billing_id: None,
            autorenew_poll_id: None,
        }
    }

    #[test]
    fn nonexistent_outside_lifetime() {
        let resource = Resource::Domain(domain());
        assert!(project(&resource, t0() - Duration::seconds(1)).is_none());
        let mut deleted = domain();
        deleted.common.deletion_time = t0() + Duration::days(10);
        let resource = Resource::Domain(deleted);
        assert!(project(&resource, t0() + Duration::days(10)).is_none());
        assert!(project(&resource, t0() + Duration::days(9)).is_some());
    }

    #[test]
    fn projection_is_idempotent_and_pure() {
        let mut d = domain();
        d.transfer_data = TransferData {
            status: Some(TransferStatus::Pending),
            gaining_registrar: Some("NewRegistrar".to_string()),
            losing_registrar: Some("TheRegistrar".to_string()),
            request_time: Some(t0() + Duration::days(1)),
            pending_expiration_time: Some(t0() + Duration::days(6)),
            period_years: 1,
            ..TransferData::default()
        };
        d.common.statuses.insert(StatusValue::PendingTransfer);
        let resource = Resource::Domain(d);
        let as_of = t0() + Duration::days(30);

        let once = project(&resource, as_of).unwrap();
        let twice = project(&once, as_of).unwrap();
        assert_eq!(once, twice);
        // The input is untouched.
        assert!(resource
            .common()
            .has_status(StatusValue::PendingTransfer));
    }

    #[test]
    fn pending_transfer_past_expiration_projects_gaining_sponsor() {
        let mut d = domain();
        let expiration = t0() + Duration::days(6);
        d.transfer_data = TransferData {
            status: Some(TransferStatus::Pending),
            gaining_registrar: Some("NewRegistrar".to_string()),
            losing_registrar: Some("TheRegistrar".to_string()),
            pending_expiration_time: Some(expiration),
            server_approve_new_expiration: Some(t0() + Duration::days(365 * 2)),
            server_approve_billing_id: Some(42),
            period_years: 1,
            ..TransferData::default()
        };
        d.common.statuses.insert(StatusValue::PendingTransfer);
        let resource = Resource::Domain(d);

        // One second early: still sponsored by the losing registrar.
        let before = project(&resource, expiration - Duration::seconds(1)).unwrap();
        assert_eq!(before.common().sponsor_registrar, "TheRegistrar");

        let after = project(&resource, expiration).unwrap();
        assert_eq!(after.common().sponsor_registrar, "NewRegistrar");
        assert!(!after.common().has_status(StatusValue::PendingTransfer));
        assert_eq!(after.common().last_transfer_time, Some(expiration));
        let after_domain = after.as_domain().unwrap();
        assert_eq!(
            after_domain.transfer_data.status,
            Some(TransferStatus::ServerApproved)
        );
        assert!(after_domain.transfer_data.staged_entity_ids().is_empty());
        assert_eq!(
            after_domain.registration_expiration_time,
            t0() + Duration::days(365 * 2)
        );
    }

    #[test]
    fn expired_domain_autorenews_in_projection() {
        let d = domain();
        let expiration = d.registration_expiration_time;
        let resource = Resource::Domain(d);
        let projected = project(&resource, expiration + Duration::days(3)).unwrap();
        let projected = projected.as_domain().unwrap();
        assert!(projected.registration_expiration_time > expiration + Duration::days(3));
        // Advanced by exactly one year, not more.
        assert_eq!(
            projected.registration_expiration_time,
            add_years(expiration, 1)
        );
    }

    #[test]
    fn pending_delete_domain_does_not_autorenew() {
        let mut d = domain();
        d.common.statuses.insert(StatusValue::PendingDelete);
        let expiration = d.registration_expiration_time;
        let resource = Resource::Domain(d);
        let projected = project(&resource, expiration + Duration::days(3)).unwrap();
        assert_eq!(
            projected.as_domain().unwrap().registration_expiration_time,
            expiration
        );
    }
}
