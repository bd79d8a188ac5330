//! The shared validation pipeline.
//!
//! Checks run in a fixed order — cheap existence checks before business
//! rules — and the first failure aborts the flow with its typed error.
//! Everything here reads through the store handles that the commit will
//! later re-verify, so validation and commit see the same versions.

use chrono::{DateTime, Utc};

use epp_registry_proto::command::{Period, PeriodUnit};
use epp_registry_proto::{ResourceKind, StatusValue};

use crate::error::{FlowError, FlowResult};
use crate::flows::FlowContext;
use crate::model::{Domain, Resource, Tld};
use crate::projection::project;
use crate::store::VersionedResource;

/// Upper bound on targets in one check command.
pub const MAX_CHECK_TARGETS: usize = 50;

/// Builds the audit record for a mutating flow, with a freshly allocated id.
pub async fn make_history(
    ctx: &FlowContext,
    parent: crate::model::RepoId,
    history_type: crate::model::HistoryType,
    registrar: &str,
    now: DateTime<Utc>,
    cl_trid: Option<&str>,
) -> crate::model::HistoryEntry {
    crate::model::HistoryEntry {
        id: ctx.store.allocate_id().await,
        parent,
        history_type,
        registrar_id: registrar.to_string(),
        modification_time: now,
        other_registrar_id: None,
        client_trid: cl_trid.map(str::to_string),
        reason: None,
    }
}

/// Loads a resource by foreign key, projected to `now`, failing with the
/// typed existence error when absent.
pub async fn load_and_verify_existence(
    ctx: &FlowContext,
    kind: ResourceKind,
    foreign_key: &str,
    now: DateTime<Utc>,
) -> FlowResult<VersionedResource> {
    let versioned = ctx
        .store
        .find_by_foreign_key(kind, foreign_key, now)
        .await?
        .ok_or_else(|| FlowError::does_not_exist(kind, foreign_key))?;
    let projected = project(&versioned.resource, now)
        .ok_or_else(|| FlowError::does_not_exist(kind, foreign_key))?;
    Ok(VersionedResource {
        resource: projected,
        version: versioned.version,
    })
}

/// Fails with `ResourceAlreadyExists` when the foreign key is actively
/// claimed at `now`.
pub async fn verify_resource_does_not_exist(
    ctx: &FlowContext,
    kind: ResourceKind,
    foreign_key: &str,
    now: DateTime<Utc>,
) -> FlowResult<()> {
    if ctx
        .store
        .find_by_foreign_key(kind, foreign_key, now)
        .await?
        .is_some()
    {
        return Err(FlowError::ResourceAlreadyExists(foreign_key.to_string()));
    }
    Ok(())
}

/// Fails with the first disallowed status present on the resource.
pub fn verify_no_disallowed_statuses(
    resource: &Resource,
    disallowed: &[StatusValue],
) -> FlowResult<()> {
    for status in disallowed {
        if resource.common().has_status(*status) {
            return Err(FlowError::StatusProhibitsOperation(*status));
        }
    }
    Ok(())
}

/// The acting registrar must be the current (projected) sponsor.
pub fn verify_resource_ownership(registrar_id: &str, resource: &Resource) -> FlowResult<()> {
    if resource.common().sponsor_registrar != registrar_id {
        return Err(FlowError::ResourceNotOwned);
    }
    Ok(())
}

/// Clients may only add or remove client-settable statuses.
pub fn verify_statuses_client_settable(statuses: &[StatusValue]) -> FlowResult<()> {
    for status in statuses {
        if !status.is_client_settable() {
            return Err(FlowError::StatusNotClientSettable(*status));
        }
    }
    Ok(())
}

/// Add and remove lists for the same field must be disjoint.
pub fn verify_add_remove_disjoint<T: PartialEq>(add: &[T], rem: &[T]) -> FlowResult<()> {
    if add.iter().any(|value| rem.contains(value)) {
        return Err(FlowError::AddRemoveSameValue);
    }
    Ok(())
}

/// clientUpdateProhibited blocks the update unless the update itself
/// removes the status (or the session is superuser, checked by callers).
pub fn verify_no_client_update_prohibited(
    resource: &Resource,
    removed_statuses: &[StatusValue],
) -> FlowResult<()> {
    if resource
        .common()
        .has_status(StatusValue::ClientUpdateProhibited)
        && !removed_statuses.contains(&StatusValue::ClientUpdateProhibited)
    {
        return Err(FlowError::ClientUpdateProhibited);
    }
    Ok(())
}

/// Registration periods must be expressed in years.
pub fn verify_period_in_years(period: Period) -> FlowResult<u32> {
    if period.unit != PeriodUnit::Years {
        return Err(FlowError::ValuePolicy(
            "Periods for domain registrations must be specified in years".to_string(),
        ));
    }
    Ok(period.value)
}

// ── Name validation ────────────────────────────────────────

/// Validates a fully-qualified host name, returning it unchanged when it is
/// already canonical. The checks run syntax-first so a garbled name never
/// reaches the policy checks.
pub fn validate_host_name(name: &str, tld: Option<&Tld>) -> FlowResult<()> {
    if name.is_empty() {
        return Err(FlowError::NameSyntax("Invalid host name".to_string()));
    }
    if name.len() > 253 {
        return Err(FlowError::ValueRange(
            "Host names are limited to 253 characters".to_string(),
        ));
    }
    let lowered = name.to_ascii_lowercase();
    if name != lowered {
        return Err(FlowError::NameSyntax(format!(
            "Host names must be in lower-case; expected {lowered}"
        )));
    }
    let ascii = idna::domain_to_ascii(name)
        .map_err(|_| FlowError::NameSyntax("Invalid host name".to_string()))?;
    if name != ascii {
        return Err(FlowError::NameSyntax(format!(
            "Host names must be puny-coded; expected {ascii}"
        )));
    }
    let labels: Vec<&str> = name.split('.').collect();
    if labels.iter().any(|label| label.is_empty()) {
        let normalized = labels
            .iter()
            .filter(|label| !label.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(".");
        return Err(FlowError::NameSyntax(format!(
            "Host names must be in normalized format; expected {normalized}"
        )));
    }
    for label in &labels {
        if label.len() > 63 || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(FlowError::NameSyntax("Invalid host name".to_string()));
        }
    }
    // Policy depth: a host must sit at least two levels below its public
    // suffix. For names under a managed TLD the suffix length is known;
    // otherwise assume a single-label suffix.
    let suffix_labels = tld.map_or(1, Tld::label_count);
    if labels.len() < suffix_labels + 2 {
        return Err(FlowError::ValuePolicy(
            "Host names must be at least two levels below the public suffix".to_string(),
        ));
    }
    Ok(())
}

/// Validates a domain name against a managed TLD; returns the matched TLD.
pub async fn validate_domain_name(ctx: &FlowContext, name: &str) -> FlowResult<Tld> {
    let lowered = name.to_ascii_lowercase();
    if name != lowered {
        return Err(FlowError::NameSyntax(format!(
            "Domain names must be in lower-case; expected {lowered}"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
    {
        return Err(FlowError::ValuePolicy(
            "Domain names can only contain a-z, 0-9, '.' and '-'".to_string(),
        ));
    }
    let labels: Vec<&str> = name.split('.').collect();
    for label in &labels {
        if label.is_empty() {
            return Err(FlowError::ValuePolicy(
                "No part of a domain name can be empty".to_string(),
            ));
        }
        if label.len() > 63 {
            return Err(FlowError::ValuePolicy(
                "Domain labels cannot be longer than 63 characters".to_string(),
            ));
        }
        if label.starts_with('-') {
            return Err(FlowError::ValuePolicy(
                "Domain labels cannot begin with a dash".to_string(),
            ));
        }
        if label.ends_with('-') {
            return Err(FlowError::ValuePolicy(
                "Domain labels cannot end with a dash".to_string(),
            ));
        }
    }
    let Some(tld) = ctx.tlds.find_tld_for_name(name).await? else {
        let assumed_tld = labels.last().copied().unwrap_or_default();
        return Err(FlowError::ValueRange(format!(
            "Domain name is under tld {assumed_tld} which doesn't exist"
        )));
    };
    if labels.len() != tld.label_count() + 1 {
        return Err(FlowError::NameSyntax(
            "Domain name must have exactly one part above the TLD".to_string(),
        ));
    }
    Ok(tld)
}

// ── Host/superordinate helpers ─────────────────────────────

/// Resolves the superordinate domain a hostname would fall under, or `None`
/// for external hosts (names outside every managed TLD).
///
/// The domain must exist and be active; a hostname under a managed TLD with
/// no registered parent domain is an error, not an external host.
pub async fn lookup_superordinate_domain(
    ctx: &FlowContext,
    host_name: &str,
    now: DateTime<Utc>,
) -> FlowResult<Option<(Domain, u64)>> {
    let Some(tld) = ctx.tlds.find_tld_for_name(host_name).await? else {
        return Ok(None);
    };
    let labels: Vec<&str> = host_name.split('.').collect();
    let domain_label_count = tld.label_count() + 1;
    let domain_name = labels[labels.len() - domain_label_count..].join(".");
    let versioned = load_and_verify_existence(ctx, ResourceKind::Domain, &domain_name, now)
        .await
        .map_err(|_| FlowError::does_not_exist(ResourceKind::Domain, &domain_name))?;
    let version = versioned.version;
    match versioned.resource {
        Resource::Domain(domain) => Ok(Some((domain, version))),
        _ => Err(FlowError::does_not_exist(ResourceKind::Domain, &domain_name)),
    }
}

/// The superordinate domain of a new/renamed host must not be pending
/// delete.
pub fn verify_superordinate_not_pending_delete(domain: Option<&Domain>) -> FlowResult<()> {
    if let Some(domain) = domain {
        if domain.common.has_status(StatusValue::PendingDelete) {
            return Err(FlowError::SuperordinateDomainInPendingDelete);
        }
    }
    Ok(())
}

/// The superordinate domain must be sponsored by the acting registrar.
pub fn verify_superordinate_ownership(
    registrar_id: &str,
    domain: Option<&Domain>,
) -> FlowResult<()> {
    if let Some(domain) = domain {
        if domain.common.sponsor_registrar != registrar_id {
            return Err(FlowError::HostDomainNotOwned);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_name_syntax_errors() {
        let tld = Tld::new("tld");
        assert!(validate_host_name("ns1.example.tld", Some(&tld)).is_ok());
        assert!(matches!(
            validate_host_name("NS1.example.tld", Some(&tld)),
            Err(FlowError::NameSyntax(msg)) if msg.contains("lower-case")
        ));
        assert!(matches!(
            validate_host_name(&format!("{}.example.tld", "a".repeat(250)), Some(&tld)),
            Err(FlowError::ValueRange(_))
        ));
        assert!(matches!(
            validate_host_name("ns1..example.tld", Some(&tld)),
            Err(FlowError::NameSyntax(msg)) if msg.contains("normalized")
        ));
        assert!(matches!(
            validate_host_name("ns1.example.tld.", Some(&tld)),
            Err(FlowError::NameSyntax(_))
        ));
        assert!(matches!(
            validate_host_name("ns_1.example.tld", Some(&tld)),
            Err(FlowError::NameSyntax(msg)) if msg == "Invalid host name"
        ));
    }

    #[test]
    fn host_name_depth_policy() {
        let tld = Tld::new("tld");
        // Directly under the TLD: too shallow to be a host.
        assert!(matches!(
            validate_host_name("example.tld", Some(&tld)),
            Err(FlowError::ValuePolicy(msg)) if msg.contains("two levels")
        ));
        // External host on an unmanaged suffix needs three labels.
        assert!(validate_host_name("ns1.example.foo", None).is_ok());
        assert!(matches!(
            validate_host_name("example.foo", None),
            Err(FlowError::ValuePolicy(_))
        ));
        // Multi-part managed TLD requires four.
        let co = Tld::new("co.test");
        assert!(matches!(
            validate_host_name("ns1.co.test", Some(&co)),
            Err(FlowError::ValuePolicy(_))
        ));
        assert!(validate_host_name("ns1.example.co.test", Some(&co)).is_ok());
    }

    #[test]
    fn add_remove_same_value_is_rejected() {
        assert!(verify_add_remove_disjoint(&["a", "b"], &["c"]).is_ok());
        assert!(matches!(
            verify_add_remove_disjoint(&["a", "b"], &["b"]),
            Err(FlowError::AddRemoveSameValue)
        ));
    }

    #[test]
    fn client_settable_statuses() {
        assert!(verify_statuses_client_settable(&[StatusValue::ClientHold]).is_ok());
        assert!(matches!(
            verify_statuses_client_settable(&[StatusValue::ServerUpdateProhibited]),
            Err(FlowError::StatusNotClientSettable(StatusValue::ServerUpdateProhibited))
        ));
    }
}
