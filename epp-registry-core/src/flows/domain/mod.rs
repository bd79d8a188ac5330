//! Domain flows.

pub mod transfer;

use chrono::{DateTime, Utc};

use epp_registry_proto::command::{DomainCreate, DomainUpdate};
use epp_registry_proto::response::DomainInfoData;
use epp_registry_proto::{CheckItem, ResData, ResourceKind, ResultCode, StatusValue};

use crate::commit::{commit, StagedMutation};
use crate::error::{FlowError, FlowResult};
use crate::flows::checks::{
    load_and_verify_existence, make_history, validate_domain_name, verify_add_remove_disjoint,
    verify_no_client_update_prohibited, verify_no_disallowed_statuses, verify_period_in_years,
    verify_resource_does_not_exist, verify_resource_ownership, verify_statuses_client_settable,
    MAX_CHECK_TARGETS,
};
use crate::flows::{FlowContext, FlowOutput, SessionContext};
use crate::model::{
    end_of_time, BillingEvent, BillingKind, BillingReason, Domain, HistoryType, PollMessage,
    PollMessageKind, RepoId, Resource, ResourceCommon, Tld, TransferStatus, MAX_NAMESERVERS,
};
use crate::store::VersionedWrite;
use crate::tasks::{DnsRefreshRequest, DnsTargetKind};

const DELETE_DISALLOWED: &[StatusValue] = &[
    StatusValue::ClientDeleteProhibited,
    StatusValue::PendingDelete,
    StatusValue::ServerDeleteProhibited,
];

const RENEW_DISALLOWED: &[StatusValue] = &[
    StatusValue::ClientRenewProhibited,
    StatusValue::PendingDelete,
    StatusValue::PendingTransfer,
    StatusValue::ServerRenewProhibited,
];

const UPDATE_DISALLOWED: &[StatusValue] =
    &[StatusValue::PendingDelete, StatusValue::ServerUpdateProhibited];

fn dns_refresh(name: &str, tld: &str) -> DnsRefreshRequest {
    DnsRefreshRequest {
        name: name.to_string(),
        kind: DnsTargetKind::Domain,
        tld: tld.to_string(),
    }
}

/// Loads a domain (projected at `now`) with its read version.
pub(crate) async fn load_domain(
    ctx: &FlowContext,
    name: &str,
    now: DateTime<Utc>,
) -> FlowResult<(Domain, u64)> {
    let versioned = load_and_verify_existence(ctx, ResourceKind::Domain, name, now).await?;
    let version = versioned.version;
    match versioned.resource {
        Resource::Domain(domain) => Ok((domain, version)),
        _ => Err(FlowError::does_not_exist(ResourceKind::Domain, name)),
    }
}

/// Verifies that every referenced contact id and nameserver host exists.
async fn verify_linked_resources(
    ctx: &FlowContext,
    contact_ids: &[String],
    host_names: &[String],
    now: DateTime<Utc>,
) -> FlowResult<()> {
    let mut missing = Vec::new();
    for id in contact_ids {
        if ctx
            .store
            .find_by_foreign_key(ResourceKind::Contact, id, now)
            .await?
            .is_none()
        {
            missing.push(id.clone());
        }
    }
    for name in host_names {
        if ctx
            .store
            .find_by_foreign_key(ResourceKind::Host, name, now)
            .await?
            .is_none()
        {
            missing.push(name.clone());
        }
    }
    if !missing.is_empty() {
        return Err(FlowError::LinkedResourcesDoNotExist { ids: missing });
    }
    Ok(())
}

fn verify_registration_period(tld: &Tld, years: u32) -> FlowResult<u32> {
    if years < 1 {
        return Err(FlowError::ValueRange(
            "New registration period must be at least one year".to_string(),
        ));
    }
    if years > tld.max_registration_years {
        return Err(FlowError::ValueRange(
            "New registration period exceeds maximum number of years".to_string(),
        ));
    }
    Ok(years)
}

/// Creates a domain with its autorenew billing/poll bookkeeping.
pub async fn create(
    ctx: &FlowContext,
    session: &SessionContext,
    command: &DomainCreate,
    cl_trid: Option<&str>,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    let registrar = session.registrar()?.to_string();
    verify_resource_does_not_exist(ctx, ResourceKind::Domain, &command.name, now).await?;
    let tld = validate_domain_name(ctx, &command.name).await?;
    let years = verify_registration_period(&tld, verify_period_in_years(command.period)?)?;

    if command.registrant.is_empty() {
        return Err(FlowError::MissingParameter("Registrant is required".to_string()));
    }
    if !command.contacts.iter().any(|(t, _)| t == "admin") {
        return Err(FlowError::MissingParameter("Admin contact is required".to_string()));
    }
    if !command.contacts.iter().any(|(t, _)| t == "tech") {
        return Err(FlowError::MissingParameter(
            "Technical contact is required".to_string(),
        ));
    }
    if command.nameservers.len() > MAX_NAMESERVERS {
        return Err(FlowError::TooManyNameservers);
    }
    let mut contact_ids: Vec<String> = vec![command.registrant.clone()];
    contact_ids.extend(command.contacts.iter().map(|(_, id)| id.clone()));
    verify_linked_resources(ctx, &contact_ids, &command.nameservers, now).await?;

    let expiration = Domain::extend_registration_with_cap(now, now, years);
    let repo_id = RepoId::new(ctx.store.allocate_id().await, &tld.roid_suffix);
    let autorenew_billing_id = ctx.store.allocate_id().await;
    let autorenew_poll_id = ctx.store.allocate_id().await;

    let domain = Domain {
        common: ResourceCommon::create(repo_id.clone(), &command.name, &registrar, now),
        tld: tld.tld.clone(),
        registrant: command.registrant.clone(),
        contacts: command.contacts.clone(),
        nameservers: command.nameservers.iter().cloned().collect(),
        subordinate_hosts: Default::default(),
        registration_expiration_time: expiration,
        transfer_data: Default::default(),
        auth_info: command.auth_info.clone(),
        autorenew_billing_id: Some(autorenew_billing_id),
        autorenew_poll_id: Some(autorenew_poll_id),
    };

    let mut staged = StagedMutation::default();
    staged.billing.push(BillingEvent {
        id: ctx.store.allocate_id().await,
        registrar_id: registrar.clone(),
        parent: repo_id.clone(),
        event_time: now,
        kind: BillingKind::OneTime {
            reason: BillingReason::Create,
            period_years: years,
            billing_time: now + tld.add_grace_period(),
        },
    });
    staged.billing.push(BillingEvent {
        id: autorenew_billing_id,
        registrar_id: registrar.clone(),
        parent: repo_id.clone(),
        event_time: expiration,
        kind: BillingKind::Recurring {
            recurrence_end: end_of_time(),
        },
    });
    staged.polls.push(PollMessage {
        id: autorenew_poll_id,
        registrar_id: registrar.clone(),
        parent: repo_id.clone(),
        event_time: expiration,
        message: format!("Domain was auto-renewed: {}", command.name),
        kind: PollMessageKind::Autorenew {
            recurrence_end: end_of_time(),
        },
    });
    staged.history.push(
        make_history(ctx, repo_id, HistoryType::DomainCreate, &registrar, now, cl_trid).await,
    );
    staged.stage_dns_refresh(dns_refresh(&command.name, &tld.tld));
    staged.creates.push(Resource::Domain(domain));

    commit(&ctx.store, &ctx.dns_queue, &ctx.async_queue, now, staged).await?;
    Ok(FlowOutput::ok_with(ResData::DomainCreate {
        name: command.name.clone(),
        creation_time: now,
        expiration_time: expiration,
    }))
}

/// Reports the stored state of a domain. Auth info is disclosed only to the
/// sponsoring registrar or a caller presenting the correct auth info.
pub async fn info(
    ctx: &FlowContext,
    session: &SessionContext,
    name: &str,
    auth_info: Option<&str>,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    let registrar = session.registrar()?.to_string();
    let (domain, _) = load_domain(ctx, name, now).await?;

    if let Some(presented) = auth_info {
        if presented != domain.auth_info {
            return Err(FlowError::BadAuthInfo);
        }
    }
    let disclose_auth = session.is_superuser
        || domain.common.sponsor_registrar == registrar
        || auth_info.is_some();

    let mut statuses: Vec<StatusValue> = domain.common.statuses.iter().copied().collect();
    if domain.nameservers.is_empty() {
        statuses.insert(0, StatusValue::Inactive);
    }
    if statuses.is_empty() {
        statuses.push(StatusValue::Ok);
    }
    Ok(FlowOutput::ok_with(ResData::DomainInfo(Box::new(
        DomainInfoData {
            name: domain.common.foreign_key.clone(),
            repo_id: domain.common.repo_id.to_string(),
            statuses,
            registrant: domain.registrant.clone(),
            contacts: domain.contacts.clone(),
            nameservers: domain.nameservers.iter().cloned().collect(),
            subordinate_hosts: domain.subordinate_hosts.iter().cloned().collect(),
            sponsor_registrar: domain.common.sponsor_registrar.clone(),
            creation_registrar: domain.common.creation_registrar.clone(),
            creation_time: domain.common.creation_time,
            expiration_time: domain.registration_expiration_time,
            last_update_time: domain.common.last_update_time,
            last_transfer_time: domain.common.last_transfer_time,
            auth_info: disclose_auth.then(|| domain.auth_info.clone()),
        },
    ))))
}

/// Reports availability for up to [`MAX_CHECK_TARGETS`] domain names.
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
        validate_domain_name(ctx, name).await?;
        let taken = ctx
            .store
            .find_by_foreign_key(ResourceKind::Domain, name, now)
            .await?
            .is_some();
        items.push(if taken {
            CheckItem::taken(name.clone())
        } else {
            CheckItem::available(name.clone())
        });
    }
    Ok(FlowOutput::ok_with(ResData::DomainCheck(items)))
}

/// Deletes a domain: immediately within the add grace period, otherwise by
/// scheduling the redemption + pending-delete window.
pub async fn delete(
    ctx: &FlowContext,
    session: &SessionContext,
    name: &str,
    cl_trid: Option<&str>,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    let registrar = session.registrar()?.to_string();
    let (domain, version) = load_domain(ctx, name, now).await?;
    let tld = tld_config(ctx, &domain).await?;
    verify_no_disallowed_statuses(&Resource::Domain(domain.clone()), DELETE_DISALLOWED)?;
    if !session.is_superuser {
        verify_resource_ownership(&registrar, &Resource::Domain(domain.clone()))?;
    }
    if !domain.subordinate_hosts.is_empty() {
        return Err(FlowError::DomainToDeleteHasHosts);
    }

    let mut staged = StagedMutation::default();
    let mut updated = domain.clone();

    // A pending transfer dies with the domain: server-cancel it, withdraw
    // the staged approval entities, and tell the gaining registrar.
    if domain.transfer_data.is_pending() {
        staged
            .poll_deletes
            .extend(domain.transfer_data.server_approve_poll_ids.iter().copied());
        staged
            .billing_deletes
            .extend(domain.transfer_data.server_approve_billing_id);
        staged
            .billing_deletes
            .extend(domain.transfer_data.server_approve_autorenew_billing_id);
        updated.transfer_data = domain.transfer_data.resolve(TransferStatus::ServerCancelled);
        updated.common.statuses.remove(&StatusValue::PendingTransfer);
        if let Some(gaining) = domain.transfer_data.gaining_registrar.clone() {
            staged.polls.push(PollMessage {
                id: ctx.store.allocate_id().await,
                registrar_id: gaining,
                parent: domain.common.repo_id.clone(),
                event_time: now,
                message: format!(
                    "The transfer was cancelled because the domain {name} was deleted"
                ),
                kind: PollMessageKind::OneTime,
            });
        }
    }

    // Close the open-ended autorenew entities.
    if let Some(billing_id) = domain.autorenew_billing_id {
        if let Some(mut event) = find_billing(ctx, &domain.common.repo_id, billing_id).await? {
            staged.billing_deletes.push(billing_id);
            event.kind = BillingKind::Recurring {
                recurrence_end: now,
            };
            staged.billing.push(event);
        }
        updated.autorenew_billing_id = None;
    }
    if let Some(poll_id) = domain.autorenew_poll_id {
        staged.poll_deletes.push(poll_id);
        updated.autorenew_poll_id = None;
    }

    let in_add_grace = now <= domain.common.creation_time + tld.add_grace_period()
        && domain.common.sponsor_registrar == domain.common.creation_registrar;
    let code = if in_add_grace {
        // Inside the add grace period the deletion is immediate and the
        // create charge is refunded.
        updated.common.deletion_time = now;
        updated.common.statuses.clear();
        if let Some(create_event) =
            find_billing_by_reason(ctx, &domain.common.repo_id, BillingReason::Create).await?
        {
            staged.billing.push(BillingEvent {
                id: ctx.store.allocate_id().await,
                registrar_id: registrar.clone(),
                parent: domain.common.repo_id.clone(),
                event_time: now,
                kind: BillingKind::Cancellation {
                    cancelled_event_id: create_event.id,
                },
            });
        }
        ResultCode::Success
    } else {
        let deletion_time = now + tld.redemption_grace_period() + tld.pending_delete_length();
        updated.common.deletion_time = deletion_time;
        updated.common.statuses.clear();
        updated.common.statuses.insert(StatusValue::PendingDelete);
        staged.polls.push(PollMessage {
            id: ctx.store.allocate_id().await,
            registrar_id: domain.common.sponsor_registrar.clone(),
            parent: domain.common.repo_id.clone(),
            event_time: deletion_time,
            message: "Domain deleted.".to_string(),
            kind: PollMessageKind::OneTime,
        });
        ResultCode::SuccessWithActionPending
    };
    updated.common.touch(&registrar, now);

    staged.history.push(
        make_history(
            ctx,
            domain.common.repo_id.clone(),
            HistoryType::DomainDelete,
            &registrar,
            now,
            cl_trid,
        )
        .await,
    );
    staged.stage_dns_refresh(dns_refresh(name, &domain.tld));
    staged.updates.push(VersionedWrite {
        resource: Resource::Domain(updated),
        expected_version: version,
    });

    commit(&ctx.store, &ctx.dns_queue, &ctx.async_queue, now, staged).await?;
    Ok(FlowOutput::with_code(code))
}

/// Extends a registration, keeping the autorenew reminder in step.
pub async fn renew(
    ctx: &FlowContext,
    session: &SessionContext,
    name: &str,
    current_expiration_date: chrono::NaiveDate,
    period: epp_registry_proto::command::Period,
    cl_trid: Option<&str>,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    let registrar = session.registrar()?.to_string();
    let (domain, version) = load_domain(ctx, name, now).await?;
    let tld = tld_config(ctx, &domain).await?;
    verify_no_disallowed_statuses(&Resource::Domain(domain.clone()), RENEW_DISALLOWED)?;
    if !session.is_superuser {
        verify_resource_ownership(&registrar, &Resource::Domain(domain.clone()))?;
    }
    if current_expiration_date != domain.registration_expiration_time.date_naive() {
        return Err(FlowError::ValuePolicy(
            "The current expiration date is incorrect".to_string(),
        ));
    }
    let years = verify_registration_period(&tld, verify_period_in_years(period)?)?;
    let new_expiration =
        Domain::extend_registration_with_cap(now, domain.registration_expiration_time, years);

    let mut updated = domain.clone();
    updated.registration_expiration_time = new_expiration;
    updated.common.touch(&registrar, now);

    let mut staged = StagedMutation::default();
    staged.billing.push(BillingEvent {
        id: ctx.store.allocate_id().await,
        registrar_id: registrar.clone(),
        parent: domain.common.repo_id.clone(),
        event_time: now,
        kind: BillingKind::OneTime {
            reason: BillingReason::Renew,
            period_years: years,
            billing_time: now + tld.renew_grace_period(),
        },
    });
    // The autorenew reminder rides the expiration forward.
    if let Some(poll_id) = domain.autorenew_poll_id {
        if let Some(mut poll) = find_poll(
            ctx,
            &domain.common.sponsor_registrar,
            &domain.common.repo_id,
            poll_id,
        )
        .await?
        {
            staged.poll_deletes.push(poll_id);
            poll.event_time = new_expiration;
            staged.polls.push(poll);
        }
    }
    staged.history.push(
        make_history(
            ctx,
            domain.common.repo_id.clone(),
            HistoryType::DomainRenew,
            &registrar,
            now,
            cl_trid,
        )
        .await,
    );
    staged.updates.push(VersionedWrite {
        resource: Resource::Domain(updated),
        expected_version: version,
    });

    commit(&ctx.store, &ctx.dns_queue, &ctx.async_queue, now, staged).await?;
    Ok(FlowOutput::ok_with(ResData::DomainRenew {
        name: name.to_string(),
        expiration_time: new_expiration,
    }))
}

/// Updates nameservers, contacts, statuses, registrant and auth info.
pub async fn update(
    ctx: &FlowContext,
    session: &SessionContext,
    command: &DomainUpdate,
    cl_trid: Option<&str>,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    let registrar = session.registrar()?.to_string();
    let (domain, version) = load_domain(ctx, &command.name, now).await?;

    verify_add_remove_disjoint(&command.add.values, &command.rem.values)?;
    verify_add_remove_disjoint(&command.add.statuses, &command.rem.statuses)?;
    verify_add_remove_disjoint(&command.add_contacts, &command.rem_contacts)?;
    let resource = Resource::Domain(domain.clone());
    if !session.is_superuser {
        verify_statuses_client_settable(&command.add.statuses)?;
        verify_statuses_client_settable(&command.rem.statuses)?;
        verify_no_client_update_prohibited(&resource, &command.rem.statuses)?;
        verify_no_disallowed_statuses(&resource, UPDATE_DISALLOWED)?;
        verify_resource_ownership(&registrar, &resource)?;
    }

    let mut nameservers = domain.nameservers.clone();
    nameservers.extend(command.add.values.iter().cloned());
    for ns in &command.rem.values {
        nameservers.remove(ns);
    }
    if nameservers.len() > MAX_NAMESERVERS {
        return Err(FlowError::TooManyNameservers);
    }
    let mut contact_ids: Vec<String> =
        command.add_contacts.iter().map(|(_, id)| id.clone()).collect();
    if let Some(new_registrant) = &command.new_registrant {
        contact_ids.push(new_registrant.clone());
    }
    verify_linked_resources(ctx, &contact_ids, &command.add.values, now).await?;

    let mut updated = domain.clone();
    updated.nameservers = nameservers;
    for pair in &command.rem_contacts {
        updated.contacts.retain(|existing| existing != pair);
    }
    for pair in &command.add_contacts {
        if !updated.contacts.contains(pair) {
            updated.contacts.push(pair.clone());
        }
    }
    for status in &command.add.statuses {
        updated.common.statuses.insert(*status);
    }
    for status in &command.rem.statuses {
        updated.common.statuses.remove(status);
    }
    if let Some(new_registrant) = &command.new_registrant {
        updated.registrant.clone_from(new_registrant);
    }
    if let Some(new_auth_info) = &command.new_auth_info {
        updated.auth_info.clone_from(new_auth_info);
    }
    updated.common.touch(&registrar, now);

    let mut staged = StagedMutation::default();
    staged.history.push(
        make_history(
            ctx,
            domain.common.repo_id.clone(),
            HistoryType::DomainUpdate,
            &registrar,
            now,
            cl_trid,
        )
        .await,
    );
    staged.stage_dns_refresh(dns_refresh(&command.name, &domain.tld));
    staged.updates.push(VersionedWrite {
        resource: Resource::Domain(updated),
        expected_version: version,
    });

    commit(&ctx.store, &ctx.dns_queue, &ctx.async_queue, now, staged).await?;
    Ok(FlowOutput::ok())
}

async fn find_billing(
    ctx: &FlowContext,
    parent: &RepoId,
    id: u64,
) -> FlowResult<Option<BillingEvent>> {
    Ok(ctx
        .store
        .billing_events_of(parent)
        .await?
        .into_iter()
        .find(|b| b.id == id))
}

async fn find_billing_by_reason(
    ctx: &FlowContext,
    parent: &RepoId,
    reason: BillingReason,
) -> FlowResult<Option<BillingEvent>> {
    Ok(ctx
        .store
        .billing_events_of(parent)
        .await?
        .into_iter()
        .find(|b| matches!(b.kind, BillingKind::OneTime { reason: r, .. } if r == reason)))
}

async fn find_poll(
    ctx: &FlowContext,
    registrar: &str,
    parent: &RepoId,
    id: u64,
) -> FlowResult<Option<PollMessage>> {
    Ok(ctx
        .store
        .poll_messages_for(registrar)
        .await?
        .into_iter()
        .find(|p| p.id == id && &p.parent == parent))
}

/// The TLD config a domain lives under; its absence is a server bug, not a
/// client error.
pub(crate) async fn tld_config(ctx: &FlowContext, domain: &Domain) -> FlowResult<Tld> {
    ctx.tlds.get(&domain.tld).await?.ok_or_else(|| FlowError::Internal {
        detail: format!("no configuration for tld {}", domain.tld),
    })
}
