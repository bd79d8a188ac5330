//! Host flows.
//!
//! Hosts are "subordinate" (in bailiwick) when their name falls under a
//! domain on a managed TLD, "external" otherwise. Subordinate hosts must
//! carry at least one glue address and external hosts none; renames can
//! move a host between the two worlds and across superordinate domains,
//! which is where most of the bookkeeping below lives.

use std::collections::BTreeSet;
use std::net::IpAddr;

use chrono::{DateTime, Utc};

use epp_registry_proto::command::{HostCreate, HostUpdate};
use epp_registry_proto::response::HostInfoData;
use epp_registry_proto::{CheckItem, ResData, ResourceKind, StatusValue};

use crate::commit::{commit, StagedMutation};
use crate::error::{FlowError, FlowResult};
use crate::flows::checks::{
    load_and_verify_existence, lookup_superordinate_domain, make_history, validate_host_name,
    verify_add_remove_disjoint, verify_no_client_update_prohibited, verify_no_disallowed_statuses,
    verify_resource_does_not_exist, verify_resource_ownership, verify_statuses_client_settable,
    verify_superordinate_not_pending_delete, verify_superordinate_ownership, MAX_CHECK_TARGETS,
};
use crate::flows::{FlowContext, FlowOutput, SessionContext};
use crate::model::{HistoryType, Host, RepoId, Resource, ResourceCommon};
use crate::store::VersionedWrite;
use crate::tasks::{AsyncTask, DnsRefreshRequest, DnsTargetKind};

/// Statuses that block a host delete outright.
const DELETE_DISALLOWED: &[StatusValue] = &[
    StatusValue::ClientDeleteProhibited,
    StatusValue::PendingDelete,
    StatusValue::ServerDeleteProhibited,
];

/// Statuses that block a host update for non-superusers.
const UPDATE_DISALLOWED: &[StatusValue] =
    &[StatusValue::PendingDelete, StatusValue::ServerUpdateProhibited];

fn parse_ip_addresses(addresses: &[String]) -> FlowResult<BTreeSet<IpAddr>> {
    addresses
        .iter()
        .map(|a| {
            a.parse()
                .map_err(|_| FlowError::NameSyntax(format!("Invalid ip address: {a}")))
        })
        .collect()
}

fn dns_refresh(name: &str, tld: &str) -> DnsRefreshRequest {
    DnsRefreshRequest {
        name: name.to_string(),
        kind: DnsTargetKind::Host,
        tld: tld.to_string(),
    }
}

/// Creates a host, linking it under its superordinate domain when the name
/// is in bailiwick.
pub async fn create(
    ctx: &FlowContext,
    session: &SessionContext,
    command: &HostCreate,
    cl_trid: Option<&str>,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    let registrar = session.registrar()?.to_string();
    verify_resource_does_not_exist(ctx, ResourceKind::Host, &command.name, now).await?;
    let tld = ctx.tlds.find_tld_for_name(&command.name).await?;
    validate_host_name(&command.name, tld.as_ref())?;
    // Resolved before building anything so bad superordinate conditions
    // surface early.
    let superordinate = lookup_superordinate_domain(ctx, &command.name, now).await?;
    verify_superordinate_not_pending_delete(superordinate.as_ref().map(|(d, _)| d))?;
    verify_superordinate_ownership(&registrar, superordinate.as_ref().map(|(d, _)| d))?;

    let addresses = parse_ip_addresses(&command.addresses)?;
    let will_be_subordinate = superordinate.is_some();
    if will_be_subordinate && addresses.is_empty() {
        return Err(FlowError::SubordinateHostMustHaveIp);
    }
    if !will_be_subordinate && !addresses.is_empty() {
        return Err(FlowError::UnexpectedExternalHostIp);
    }

    let roid_suffix = tld
        .as_ref()
        .map_or_else(|| "ROID".to_string(), |t| t.roid_suffix.clone());
    let host = Host {
        common: ResourceCommon::create(
            RepoId::new(ctx.store.allocate_id().await, &roid_suffix),
            &command.name,
            &registrar,
            now,
        ),
        addresses,
        superordinate_domain: superordinate
            .as_ref()
            .map(|(d, _)| d.common.foreign_key.clone()),
        last_superordinate_change: None,
    };
    let repo_id = host.common.repo_id.clone();

    let mut staged = StagedMutation::default();
    if let Some((domain, version)) = superordinate {
        let mut updated = domain;
        updated.subordinate_hosts.insert(command.name.clone());
        let tld_name = updated.tld.clone();
        staged.updates.push(VersionedWrite {
            resource: Resource::Domain(updated),
            expected_version: version,
        });
        // Only subordinate hosts have glue to publish; external hosts are
        // written as NS records from the referencing domain.
        staged.stage_dns_refresh(dns_refresh(&command.name, &tld_name));
    }
    staged.creates.push(Resource::Host(host));
    staged.history.push(
        make_history(ctx, repo_id, HistoryType::HostCreate, &registrar, now, cl_trid).await,
    );

    commit(&ctx.store, &ctx.dns_queue, &ctx.async_queue, now, staged).await?;
    Ok(FlowOutput::ok_with(ResData::HostCreate {
        name: command.name.clone(),
        creation_time: now,
    }))
}

/// Reports the stored state of a host.
pub async fn info(
    ctx: &FlowContext,
    session: &SessionContext,
    name: &str,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    session.registrar()?;
    let tld = ctx.tlds.find_tld_for_name(name).await?;
    validate_host_name(name, tld.as_ref())?;
    let versioned = load_and_verify_existence(ctx, ResourceKind::Host, name, now).await?;
    let Resource::Host(host) = versioned.resource else {
        return Err(FlowError::does_not_exist(ResourceKind::Host, name));
    };

    let mut statuses: Vec<StatusValue> = host.common.statuses.iter().copied().collect();
    if !ctx
        .store
        .query_domains_by_nameserver(name, now, 1)
        .await?
        .is_empty()
    {
        statuses.insert(0, StatusValue::Linked);
    }
    if statuses.is_empty() {
        statuses.push(StatusValue::Ok);
    }
    Ok(FlowOutput::ok_with(ResData::HostInfo(Box::new(
        HostInfoData {
            name: host.common.foreign_key.clone(),
            repo_id: host.common.repo_id.to_string(),
            statuses,
            addresses: host.addresses.iter().map(ToString::to_string).collect(),
            sponsor_registrar: host.common.sponsor_registrar.clone(),
            creation_registrar: host.common.creation_registrar.clone(),
            creation_time: host.common.creation_time,
            last_update_time: host.common.last_update_time,
            last_transfer_time: host.common.last_transfer_time,
        },
    ))))
}

/// Reports availability for up to [`MAX_CHECK_TARGETS`] host names.
pub async fn check(
    ctx: &FlowContext,
    session: &SessionContext,
    names: &[String],
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    session.registrar()?;
    if names.len() > MAX_CHECK_TARGETS {
        return Err(FlowError::TooManyResourceChecks);
    }
    let mut items = Vec::with_capacity(names.len());
    for name in names {
        let tld = ctx.tlds.find_tld_for_name(name).await?;
        validate_host_name(name, tld.as_ref())?;
        let taken = ctx
            .store
            .find_by_foreign_key(ResourceKind::Host, name, now)
            .await?
            .is_some();
        items.push(if taken {
            CheckItem::taken(name.clone())
        } else {
            CheckItem::available(name.clone())
        });
    }
    Ok(FlowOutput::ok_with(ResData::HostCheck(items)))
}

/// Updates a host: address/status changes, renames and re-parenting.
pub async fn update(
    ctx: &FlowContext,
    session: &SessionContext,
    command: &HostUpdate,
    cl_trid: Option<&str>,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    let registrar = session.registrar()?.to_string();
    let old_name = command.name.as_str();
    let old_tld = ctx.tlds.find_tld_for_name(old_name).await?;
    validate_host_name(old_name, old_tld.as_ref())?;
    let versioned = load_and_verify_existence(ctx, ResourceKind::Host, old_name, now).await?;
    let host_version = versioned.version;
    let Resource::Host(existing) = versioned.resource else {
        return Err(FlowError::does_not_exist(ResourceKind::Host, old_name));
    };

    let add_addresses = parse_ip_addresses(&command.add.values)?;
    let rem_addresses = parse_ip_addresses(&command.rem.values)?;
    let add_values: Vec<IpAddr> = add_addresses.iter().copied().collect();
    let rem_values: Vec<IpAddr> = rem_addresses.iter().copied().collect();
    verify_add_remove_disjoint(&add_values, &rem_values)?;
    verify_add_remove_disjoint(&command.add.statuses, &command.rem.statuses)?;

    let existing_resource = Resource::Host(existing.clone());
    if !session.is_superuser {
        verify_statuses_client_settable(&command.add.statuses)?;
        verify_statuses_client_settable(&command.rem.statuses)?;
        verify_no_client_update_prohibited(&existing_resource, &command.rem.statuses)?;
        verify_no_disallowed_statuses(&existing_resource, UPDATE_DISALLOWED)?;
    }

    // Hosts transfer with their superordinate domain, so ownership of a
    // subordinate host is read off the domain.
    let old_superordinate = match existing.superordinate_domain.as_deref() {
        Some(domain_name) => {
            let versioned =
                load_and_verify_existence(ctx, ResourceKind::Domain, domain_name, now).await?;
            let version = versioned.version;
            match versioned.resource {
                Resource::Domain(domain) => Some((domain, version)),
                _ => None,
            }
        }
        None => None,
    };
    if !session.is_superuser {
        match &old_superordinate {
            Some((domain, _)) => {
                verify_resource_ownership(&registrar, &Resource::Domain(domain.clone()))?;
            }
            None => verify_resource_ownership(&registrar, &existing_resource)?,
        }
    }

    let new_name = command.new_name.clone().unwrap_or_else(|| old_name.to_string());
    let is_rename = new_name != old_name;
    if is_rename {
        let new_tld = ctx.tlds.find_tld_for_name(&new_name).await?;
        validate_host_name(&new_name, new_tld.as_ref())?;
        if ctx
            .store
            .find_by_foreign_key(ResourceKind::Host, &new_name, now)
            .await?
            .is_some()
        {
            return Err(FlowError::HostAlreadyExists(new_name));
        }
        if existing.superordinate_domain.is_none() && !session.is_superuser {
            return Err(FlowError::CannotRenameExternalHost);
        }
    }

    let new_superordinate = lookup_superordinate_domain(ctx, &new_name, now).await?;
    verify_superordinate_not_pending_delete(new_superordinate.as_ref().map(|(d, _)| d))?;
    if !session.is_superuser {
        verify_superordinate_ownership(&registrar, new_superordinate.as_ref().map(|(d, _)| d))?;
    }
    let will_be_subordinate = new_superordinate.is_some();

    let mut new_addresses = existing.addresses.clone();
    new_addresses.extend(add_addresses.iter());
    for addr in &rem_addresses {
        new_addresses.remove(addr);
    }
    if !will_be_subordinate {
        if is_rename && existing.superordinate_domain.is_some() && !new_addresses.is_empty() {
            return Err(FlowError::RenameHostToExternalRemoveIp);
        }
        if !add_addresses.is_empty() {
            return Err(FlowError::CannotAddIpToExternalHost);
        }
    } else if new_addresses.is_empty() {
        return Err(FlowError::CannotRemoveSubordinateHostLastIp);
    }

    let mut new_statuses = existing.common.statuses.clone();
    new_statuses.extend(command.add.statuses.iter());
    for status in &command.rem.statuses {
        new_statuses.remove(status);
    }

    let old_superordinate_name = existing.superordinate_domain.clone();
    let new_superordinate_name = new_superordinate
        .as_ref()
        .map(|(d, _)| d.common.foreign_key.clone());
    let superordinate_changed = old_superordinate_name != new_superordinate_name;

    let mut updated = existing.clone();
    updated.common.foreign_key.clone_from(&new_name);
    updated.addresses = new_addresses;
    updated.common.statuses = new_statuses;
    updated.superordinate_domain.clone_from(&new_superordinate_name);
    updated.common.touch(&registrar, now);
    if superordinate_changed {
        // Freeze the inherited transfer time against the *old* superordinate
        // as read in this transaction; later transfers of either domain must
        // not leak in.
        updated.common.last_transfer_time = existing.compute_last_transfer_time(
            old_superordinate.as_ref().and_then(|(d, _)| d.common.last_transfer_time),
        );
        updated.last_superordinate_change = Some(now);
    }

    let mut staged = StagedMutation::default();

    // Subordinate-host bookkeeping on the affected domains.
    match (&old_superordinate, &new_superordinate) {
        (Some((old_domain, old_version)), Some((new_domain, _)))
            if old_domain.common.foreign_key == new_domain.common.foreign_key =>
        {
            if is_rename {
                let mut domain = old_domain.clone();
                domain.subordinate_hosts.remove(old_name);
                domain.subordinate_hosts.insert(new_name.clone());
                staged.updates.push(VersionedWrite {
                    resource: Resource::Domain(domain),
                    expected_version: *old_version,
                });
            }
        }
        (old, new) => {
            if let Some((old_domain, old_version)) = old {
                let mut domain = old_domain.clone();
                domain.subordinate_hosts.remove(old_name);
                staged.updates.push(VersionedWrite {
                    resource: Resource::Domain(domain),
                    expected_version: *old_version,
                });
            }
            if let Some((new_domain, new_version)) = new {
                let mut domain = new_domain.clone();
                domain.subordinate_hosts.insert(new_name.clone());
                staged.updates.push(VersionedWrite {
                    resource: Resource::Domain(domain),
                    expected_version: *new_version,
                });
            }
        }
    }

    // One refresh per affected published name.
    if let Some((old_domain, _)) = &old_superordinate {
        staged.stage_dns_refresh(dns_refresh(old_name, &old_domain.tld));
    }
    if let Some((new_domain, _)) = &new_superordinate {
        staged.stage_dns_refresh(dns_refresh(&new_name, &new_domain.tld));
    }

    // Domains elsewhere still point at the old name; their NS records are
    // re-published asynchronously.
    if is_rename
        && !ctx
            .store
            .query_domains_by_nameserver(old_name, now, 1)
            .await?
            .is_empty()
    {
        staged.async_tasks.push(AsyncTask::HostRename {
            repo_id: existing.common.repo_id.clone(),
            old_name: old_name.to_string(),
            requested_time: now,
        });
    }

    staged.history.push(
        make_history(
            ctx,
            existing.common.repo_id.clone(),
            HistoryType::HostUpdate,
            &registrar,
            now,
            cl_trid,
        )
        .await,
    );
    staged.updates.push(VersionedWrite {
        resource: Resource::Host(updated),
        expected_version: host_version,
    });

    commit(&ctx.store, &ctx.dns_queue, &ctx.async_queue, now, staged).await?;
    Ok(FlowOutput::ok())
}

/// Marks a host for asynchronous deletion.
///
/// A successful delete is always asynchronous: every domain must be
/// scanned for references before the host can actually go away, so the
/// flow marks the host pendingDelete and the async worker finishes (or
/// reports a conflict) later. A quick smoke check still fails fast when a
/// reference is already visible.
pub async fn delete(
    ctx: &FlowContext,
    session: &SessionContext,
    name: &str,
    cl_trid: Option<&str>,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    let registrar = session.registrar()?.to_string();
    let tld = ctx.tlds.find_tld_for_name(name).await?;
    validate_host_name(name, tld.as_ref())?;
    if !ctx
        .store
        .query_domains_by_nameserver(name, now, 1)
        .await?
        .is_empty()
    {
        return Err(FlowError::ResourceToDeleteIsReferenced);
    }
    let versioned = load_and_verify_existence(ctx, ResourceKind::Host, name, now).await?;
    let Resource::Host(existing) = versioned.resource else {
        return Err(FlowError::does_not_exist(ResourceKind::Host, name));
    };
    verify_no_disallowed_statuses(&Resource::Host(existing.clone()), DELETE_DISALLOWED)?;
    if !session.is_superuser {
        match existing.superordinate_domain.as_deref() {
            Some(domain_name) => {
                let domain =
                    load_and_verify_existence(ctx, ResourceKind::Domain, domain_name, now).await?;
                verify_resource_ownership(&registrar, &domain.resource)?;
            }
            None => verify_resource_ownership(&registrar, &Resource::Host(existing.clone()))?,
        }
    }

    let mut marked = existing.clone();
    marked.common.statuses.insert(StatusValue::PendingDelete);
    marked.common.touch(&registrar, now);

    let mut staged = StagedMutation::default();
    staged.history.push(
        make_history(
            ctx,
            existing.common.repo_id.clone(),
            HistoryType::HostPendingDelete,
            &registrar,
            now,
            cl_trid,
        )
        .await,
    );
    staged.updates.push(VersionedWrite {
        resource: Resource::Host(marked),
        expected_version: versioned.version,
    });
    staged.async_tasks.push(AsyncTask::ResourceDeletion {
        kind: ResourceKind::Host,
        repo_id: existing.common.repo_id.clone(),
        requesting_registrar: registrar,
        client_trid: cl_trid.map(str::to_string),
        is_superuser: session.is_superuser,
        requested_time: now,
    });

    commit(&ctx.store, &ctx.dns_queue, &ctx.async_queue, now, staged).await?;
    Ok(FlowOutput::pending())
}
