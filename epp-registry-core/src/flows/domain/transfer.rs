//! Domain transfer flows.
//!
//! The gaining registrar requests a transfer from the losing (current)
//! registrar, who then has the TLD's automatic-transfer window to respond;
//! silence means server approval. The request flow writes the
//! server-approval entities *speculatively* with event times in the future
//! and records their ids in the domain's transfer data — explicit
//! approve/reject/cancel withdraws them again, and the temporal projection
//! makes the auto-approval observable without any commit ever running.

use chrono::{DateTime, Utc};

use epp_registry_proto::command::Period;
use epp_registry_proto::response::TransferView;
use epp_registry_proto::{ResData, StatusValue};

use crate::commit::{commit, StagedMutation};
use crate::error::{FlowError, FlowResult};
use crate::flows::checks::{make_history, verify_no_disallowed_statuses, verify_period_in_years};
use crate::flows::domain::{load_domain, tld_config};
use crate::flows::{FlowContext, FlowOutput, SessionContext};
use crate::model::{
    BillingEvent, BillingKind, BillingReason, Domain, HistoryType, PollMessage, PollMessageKind,
    Resource, TransferData, TransferStatus,
};
use crate::projection::project;
use crate::store::VersionedWrite;
use crate::tasks::{DnsRefreshRequest, DnsTargetKind};

const TRANSFER_DISALLOWED: &[StatusValue] = &[
    StatusValue::ClientTransferProhibited,
    StatusValue::PendingDelete,
    StatusValue::ServerTransferProhibited,
];

fn transfer_view(domain: &Domain) -> FlowResult<TransferView> {
    let transfer = &domain.transfer_data;
    let status = transfer.status.ok_or(FlowError::NoTransferHistory)?;
    Ok(TransferView {
        name: domain.common.foreign_key.clone(),
        status: status.wire_name().to_string(),
        gaining_registrar: transfer.gaining_registrar.clone().unwrap_or_default(),
        request_time: transfer.request_time.unwrap_or_default(),
        losing_registrar: transfer.losing_registrar.clone().unwrap_or_default(),
        action_time: transfer.pending_expiration_time.unwrap_or_default(),
        expiration_time: transfer.server_approve_new_expiration,
    })
}

fn verify_transfer_auth(domain: &Domain, auth_info: Option<&str>) -> FlowResult<()> {
    let presented = auth_info.ok_or(FlowError::MissingTransferAuthInfo)?;
    if presented != domain.auth_info {
        return Err(FlowError::BadAuthInfo);
    }
    Ok(())
}

/// Requests a transfer to the logged-in (gaining) registrar.
pub async fn request(
    ctx: &FlowContext,
    session: &SessionContext,
    name: &str,
    period: Option<Period>,
    auth_info: Option<&str>,
    cl_trid: Option<&str>,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    let gaining = session.registrar()?.to_string();
    let (domain, version) = load_domain(ctx, name, now).await?;
    verify_no_disallowed_statuses(&Resource::Domain(domain.clone()), TRANSFER_DISALLOWED)?;
    verify_transfer_auth(&domain, auth_info)?;
    if domain.transfer_data.is_pending() {
        return Err(FlowError::AlreadyPendingTransfer(name.to_string()));
    }
    let losing = domain.common.sponsor_registrar.clone();
    if gaining == losing {
        return Err(FlowError::ObjectAlreadySponsored);
    }
    let years = verify_period_in_years(period.unwrap_or_default())?;
    if years != 1 {
        return Err(FlowError::TransferPeriodMustBeOneYear);
    }

    let tld = tld_config(ctx, &domain).await?;
    let automatic_transfer_time = now + tld.automatic_transfer_length();
    // Expiration as it will stand at the moment of automatic approval; the
    // transfer then adds its year on top, capped at ten years out.
    let expiration_at_transfer = project(
        &Resource::Domain(domain.clone()),
        automatic_transfer_time,
    )
    .and_then(|r| r.as_domain().map(|d| d.registration_expiration_time))
    .unwrap_or(domain.registration_expiration_time);
    let server_approve_new_expiration =
        Domain::extend_registration_with_cap(automatic_transfer_time, expiration_at_transfer, years);

    let billing_id = ctx.store.allocate_id().await;
    let gaining_poll_id = ctx.store.allocate_id().await;
    let losing_poll_id = ctx.store.allocate_id().await;

    let mut staged = StagedMutation::default();
    // Immediate notification that a transfer was requested.
    staged.polls.push(PollMessage {
        id: ctx.store.allocate_id().await,
        registrar_id: losing.clone(),
        parent: domain.common.repo_id.clone(),
        event_time: now,
        message: format!("Transfer requested for {name}."),
        kind: PollMessageKind::OneTime,
    });
    // Speculative server-approval entities, visible only once the window
    // elapses, withdrawn by any explicit resolution.
    staged.polls.push(PollMessage {
        id: gaining_poll_id,
        registrar_id: gaining.clone(),
        parent: domain.common.repo_id.clone(),
        event_time: automatic_transfer_time,
        message: format!("Transfer of {name} was approved automatically."),
        kind: PollMessageKind::OneTime,
    });
    staged.polls.push(PollMessage {
        id: losing_poll_id,
        registrar_id: losing.clone(),
        parent: domain.common.repo_id.clone(),
        event_time: automatic_transfer_time,
        message: format!("Transfer of {name} was approved automatically."),
        kind: PollMessageKind::OneTime,
    });
    staged.billing.push(BillingEvent {
        id: billing_id,
        registrar_id: gaining.clone(),
        parent: domain.common.repo_id.clone(),
        event_time: automatic_transfer_time,
        kind: BillingKind::OneTime {
            reason: BillingReason::Transfer,
            period_years: years,
            billing_time: automatic_transfer_time + tld.transfer_grace_period(),
        },
    });

    let mut updated = domain.clone();
    updated.common.statuses.insert(StatusValue::PendingTransfer);
    updated.transfer_data = TransferData {
        status: Some(TransferStatus::Pending),
        gaining_registrar: Some(gaining.clone()),
        losing_registrar: Some(losing.clone()),
        request_time: Some(now),
        request_trid: cl_trid.map(str::to_string),
        pending_expiration_time: Some(automatic_transfer_time),
        period_years: years,
        server_approve_new_expiration: Some(server_approve_new_expiration),
        server_approve_billing_id: Some(billing_id),
        server_approve_autorenew_billing_id: None,
        server_approve_poll_ids: vec![gaining_poll_id, losing_poll_id],
    };

    let mut history = make_history(
        ctx,
        domain.common.repo_id.clone(),
        HistoryType::DomainTransferRequest,
        &gaining,
        now,
        cl_trid,
    )
    .await;
    history.other_registrar_id = Some(losing);
    staged.history.push(history);
    let view = transfer_view(&updated)?;
    staged.updates.push(VersionedWrite {
        resource: Resource::Domain(updated),
        expected_version: version,
    });

    commit(&ctx.store, &ctx.dns_queue, &ctx.async_queue, now, staged).await?;
    Ok(FlowOutput::pending_with(ResData::DomainTransfer(view)))
}

/// Reports the state of the most recent transfer.
pub async fn query(
    ctx: &FlowContext,
    session: &SessionContext,
    name: &str,
    auth_info: Option<&str>,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    let registrar = session.registrar()?.to_string();
    let (domain, _) = load_domain(ctx, name, now).await?;
    let transfer = &domain.transfer_data;
    if transfer.status.is_none() {
        return Err(FlowError::NoTransferHistory);
    }
    let involved = domain.common.sponsor_registrar == registrar
        || transfer.gaining_registrar.as_deref() == Some(registrar.as_str())
        || transfer.losing_registrar.as_deref() == Some(registrar.as_str());
    if !involved && !session.is_superuser {
        match auth_info {
            Some(presented) if presented == domain.auth_info => {}
            _ => return Err(FlowError::NotAuthorizedToViewTransfer),
        }
    }
    Ok(FlowOutput::ok_with(ResData::DomainTransfer(transfer_view(
        &domain,
    )?)))
}

/// Explicit approval by the losing registrar.
pub async fn approve(
    ctx: &FlowContext,
    session: &SessionContext,
    name: &str,
    auth_info: Option<&str>,
    cl_trid: Option<&str>,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    let registrar = session.registrar()?.to_string();
    let (domain, version) = load_domain(ctx, name, now).await?;
    verify_optional_auth(&domain, auth_info)?;
    if !domain.transfer_data.is_pending() {
        return Err(FlowError::NotPendingTransfer(name.to_string()));
    }
    if !session.is_superuser && domain.common.sponsor_registrar != registrar {
        return Err(FlowError::ResourceNotOwned);
    }
    let gaining = domain
        .transfer_data
        .gaining_registrar
        .clone()
        .unwrap_or_default();
    let tld = tld_config(ctx, &domain).await?;

    let mut staged = StagedMutation::default();
    withdraw_staged_entities(&domain, &mut staged);

    let mut updated = domain.clone();
    updated.common.statuses.remove(&StatusValue::PendingTransfer);
    updated.transfer_data = domain.transfer_data.resolve(TransferStatus::ClientApproved);
    updated.transfer_data.pending_expiration_time = Some(now);
    updated.common.sponsor_registrar.clone_from(&gaining);
    updated.common.last_transfer_time = Some(now);
    updated.registration_expiration_time = Domain::extend_registration_with_cap(
        now,
        domain.registration_expiration_time,
        domain.transfer_data.period_years,
    );
    updated.transfer_data.server_approve_new_expiration = None;

    // The autorenew entities follow the new sponsor.
    reassign_autorenew_entities(ctx, &domain, &gaining, &mut staged).await?;

    staged.billing.push(BillingEvent {
        id: ctx.store.allocate_id().await,
        registrar_id: gaining.clone(),
        parent: domain.common.repo_id.clone(),
        event_time: now,
        kind: BillingKind::OneTime {
            reason: BillingReason::Transfer,
            period_years: domain.transfer_data.period_years,
            billing_time: now + tld.transfer_grace_period(),
        },
    });
    staged.polls.push(PollMessage {
        id: ctx.store.allocate_id().await,
        registrar_id: gaining.clone(),
        parent: domain.common.repo_id.clone(),
        event_time: now,
        message: format!("Transfer of {name} was approved."),
        kind: PollMessageKind::OneTime,
    });

    let mut history = make_history(
        ctx,
        domain.common.repo_id.clone(),
        HistoryType::DomainTransferApprove,
        &registrar,
        now,
        cl_trid,
    )
    .await;
    history.other_registrar_id = Some(gaining);
    staged.history.push(history);
    staged.stage_dns_refresh(DnsRefreshRequest {
        name: name.to_string(),
        kind: DnsTargetKind::Domain,
        tld: domain.tld.clone(),
    });
    let view = transfer_view(&updated)?;
    staged.updates.push(VersionedWrite {
        resource: Resource::Domain(updated),
        expected_version: version,
    });

    commit(&ctx.store, &ctx.dns_queue, &ctx.async_queue, now, staged).await?;
    Ok(FlowOutput::ok_with(ResData::DomainTransfer(view)))
}

/// Explicit rejection by the losing registrar.
pub async fn reject(
    ctx: &FlowContext,
    session: &SessionContext,
    name: &str,
    auth_info: Option<&str>,
    cl_trid: Option<&str>,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    let registrar = session.registrar()?.to_string();
    let (domain, version) = load_domain(ctx, name, now).await?;
    verify_optional_auth(&domain, auth_info)?;
    if !domain.transfer_data.is_pending() {
        return Err(FlowError::NotPendingTransfer(name.to_string()));
    }
    if !session.is_superuser && domain.common.sponsor_registrar != registrar {
        return Err(FlowError::ResourceNotOwned);
    }
    resolve_pending(
        ctx,
        session,
        domain,
        version,
        TransferStatus::ClientRejected,
        HistoryType::DomainTransferReject,
        cl_trid,
        now,
    )
    .await
}

/// Cancellation by the gaining registrar that made the request.
pub async fn cancel(
    ctx: &FlowContext,
    session: &SessionContext,
    name: &str,
    auth_info: Option<&str>,
    cl_trid: Option<&str>,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    let registrar = session.registrar()?.to_string();
    let (domain, version) = load_domain(ctx, name, now).await?;
    verify_optional_auth(&domain, auth_info)?;
    if !domain.transfer_data.is_pending() {
        return Err(FlowError::NotPendingTransfer(name.to_string()));
    }
    if !session.is_superuser
        && domain.transfer_data.gaining_registrar.as_deref() != Some(registrar.as_str())
    {
        return Err(FlowError::NotTransferInitiator);
    }
    resolve_pending(
        ctx,
        session,
        domain,
        version,
        TransferStatus::ClientCancelled,
        HistoryType::DomainTransferCancel,
        cl_trid,
        now,
    )
    .await
}

/// Auth info on resolution commands is optional, but when present it must
/// match.
fn verify_optional_auth(domain: &Domain, auth_info: Option<&str>) -> FlowResult<()> {
    if let Some(presented) = auth_info {
        if presented != domain.auth_info {
            return Err(FlowError::BadAuthInfo);
        }
    }
    Ok(())
}

fn withdraw_staged_entities(domain: &Domain, staged: &mut StagedMutation) {
    staged
        .poll_deletes
        .extend(domain.transfer_data.server_approve_poll_ids.iter().copied());
    staged
        .billing_deletes
        .extend(domain.transfer_data.server_approve_billing_id);
    staged
        .billing_deletes
        .extend(domain.transfer_data.server_approve_autorenew_billing_id);
}

/// Rewrites the open-ended autorenew billing/poll entities under the new
/// sponsor, keeping their ids.
async fn reassign_autorenew_entities(
    ctx: &FlowContext,
    domain: &Domain,
    new_sponsor: &str,
    staged: &mut StagedMutation,
) -> FlowResult<()> {
    if let Some(billing_id) = domain.autorenew_billing_id {
        let events = ctx.store.billing_events_of(&domain.common.repo_id).await?;
        if let Some(mut event) = events.into_iter().find(|b| b.id == billing_id) {
            staged.billing_deletes.push(billing_id);
            event.registrar_id = new_sponsor.to_string();
            staged.billing.push(event);
        }
    }
    if let Some(poll_id) = domain.autorenew_poll_id {
        let polls = ctx
            .store
            .poll_messages_for(&domain.common.sponsor_registrar)
            .await?;
        if let Some(mut poll) = polls.into_iter().find(|p| p.id == poll_id) {
            staged.poll_deletes.push(poll_id);
            poll.registrar_id = new_sponsor.to_string();
            staged.polls.push(poll);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn resolve_pending(
    ctx: &FlowContext,
    session: &SessionContext,
    domain: Domain,
    version: u64,
    status: TransferStatus,
    history_type: HistoryType,
    cl_trid: Option<&str>,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    let registrar = session.registrar()?.to_string();
    let mut staged = StagedMutation::default();
    withdraw_staged_entities(&domain, &mut staged);

    let mut updated = domain.clone();
    updated.common.statuses.remove(&StatusValue::PendingTransfer);
    updated.transfer_data = domain.transfer_data.resolve(status);
    updated.transfer_data.pending_expiration_time = Some(now);

    // Tell the other side what happened.
    let (recipient, outcome) = match status {
        TransferStatus::ClientRejected => (
            domain.transfer_data.gaining_registrar.clone(),
            "rejected",
        ),
        TransferStatus::ClientCancelled => (
            domain.transfer_data.losing_registrar.clone(),
            "cancelled",
        ),
        _ => (None, ""),
    };
    if let Some(recipient) = recipient {
        staged.polls.push(PollMessage {
            id: ctx.store.allocate_id().await,
            registrar_id: recipient,
            parent: domain.common.repo_id.clone(),
            event_time: now,
            message: format!(
                "Transfer of {} was {outcome}.",
                domain.common.foreign_key
            ),
            kind: PollMessageKind::OneTime,
        });
    }

    staged.history.push(
        make_history(
            ctx,
            domain.common.repo_id.clone(),
            history_type,
            &registrar,
            now,
            cl_trid,
        )
        .await,
    );
    let view = transfer_view(&updated)?;
    staged.updates.push(VersionedWrite {
        resource: Resource::Domain(updated),
        expected_version: version,
    });

    commit(&ctx.store, &ctx.dns_queue, &ctx.async_queue, now, staged).await?;
    Ok(FlowOutput::ok_with(ResData::DomainTransfer(view)))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::store::ResourceStore;
    use crate::test_utils::{TestHarness, OTHER_REGISTRAR, REGISTRAR};

    use super::*;

    fn gaining_session() -> SessionContext {
        SessionContext::logged_in(OTHER_REGISTRAR)
    }

    fn losing_session() -> SessionContext {
        SessionContext::logged_in(REGISTRAR)
    }

    async fn request_transfer(h: &TestHarness) {
        h.persist_active_domain("example.tld").await;
        request(
            &h.ctx,
            &gaining_session(),
            "example.tld",
            None,
            Some("2fooBAR"),
            Some("ABC-1"),
            h.now(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn request_stages_speculative_approval_entities() {
        let h = TestHarness::new().await;
        request_transfer(&h).await;

        let domain = h.load_domain("example.tld").await.unwrap();
        assert!(domain.common.has_status(StatusValue::PendingTransfer));
        let transfer = &domain.transfer_data;
        assert_eq!(transfer.status, Some(TransferStatus::Pending));
        assert_eq!(transfer.gaining_registrar.as_deref(), Some(OTHER_REGISTRAR));
        assert_eq!(transfer.losing_registrar.as_deref(), Some(REGISTRAR));
        assert_eq!(
            transfer.pending_expiration_time,
            Some(h.now() + Duration::days(5))
        );
        assert_eq!(transfer.server_approve_poll_ids.len(), 2);
        assert!(transfer.server_approve_billing_id.is_some());

        // The losing registrar sees the request immediately; the staged
        // approval messages carry future event times.
        let losing_polls = h.store.poll_messages_for(REGISTRAR).await.unwrap();
        assert!(losing_polls
            .iter()
            .any(|p| p.message.contains("Transfer requested") && p.event_time == h.now()));
        assert!(losing_polls
            .iter()
            .any(|p| p.event_time == h.now() + Duration::days(5)));
    }

    #[tokio::test]
    async fn request_validations() {
        let h = TestHarness::new().await;
        h.persist_active_domain("example.tld").await;

        let result = request(
            &h.ctx,
            &gaining_session(),
            "example.tld",
            None,
            None,
            None,
            h.now(),
        )
        .await;
        assert!(matches!(result, Err(FlowError::MissingTransferAuthInfo)));

        let result = request(
            &h.ctx,
            &gaining_session(),
            "example.tld",
            None,
            Some("wrong"),
            None,
            h.now(),
        )
        .await;
        assert!(matches!(result, Err(FlowError::BadAuthInfo)));

        let result = request(
            &h.ctx,
            &losing_session(),
            "example.tld",
            None,
            Some("2fooBAR"),
            None,
            h.now(),
        )
        .await;
        assert!(matches!(result, Err(FlowError::ObjectAlreadySponsored)));

        let result = request(
            &h.ctx,
            &gaining_session(),
            "example.tld",
            Some(Period {
                value: 2,
                unit: epp_registry_proto::command::PeriodUnit::Years,
            }),
            Some("2fooBAR"),
            None,
            h.now(),
        )
        .await;
        assert!(matches!(result, Err(FlowError::TransferPeriodMustBeOneYear)));

        request(
            &h.ctx,
            &gaining_session(),
            "example.tld",
            None,
            Some("2fooBAR"),
            None,
            h.now(),
        )
        .await
        .unwrap();
        let result = request(
            &h.ctx,
            &gaining_session(),
            "example.tld",
            None,
            Some("2fooBAR"),
            None,
            h.now(),
        )
        .await;
        assert!(matches!(result, Err(FlowError::AlreadyPendingTransfer(_))));
    }

    #[tokio::test]
    async fn automatic_approval_is_observable_through_projection() {
        let h = TestHarness::new().await;
        request_transfer(&h).await;
        h.clock.advance(Duration::days(6));

        let stored = h
            .store
            .find_by_foreign_key(
                epp_registry_proto::ResourceKind::Domain,
                "example.tld",
                h.now(),
            )
            .await
            .unwrap()
            .unwrap();
        let projected = project(&stored.resource, h.now()).unwrap();
        assert_eq!(projected.common().sponsor_registrar, OTHER_REGISTRAR);
        assert!(!projected.common().has_status(StatusValue::PendingTransfer));
        // The stored form still says pending: no commit ran.
        assert!(stored
            .resource
            .common()
            .has_status(StatusValue::PendingTransfer));
    }

    #[tokio::test]
    async fn approve_transfers_sponsorship_and_withdraws_staged_entities() {
        let h = TestHarness::new().await;
        request_transfer(&h).await;
        let before = h.load_domain("example.tld").await.unwrap();
        let staged_poll_ids = before.transfer_data.server_approve_poll_ids.clone();
        h.clock.advance(Duration::days(1));

        let output = approve(
            &h.ctx,
            &losing_session(),
            "example.tld",
            None,
            None,
            h.now(),
        )
        .await
        .unwrap();
        assert_eq!(output.code.value(), 1000);

        let domain = h.load_domain("example.tld").await.unwrap();
        assert_eq!(domain.common.sponsor_registrar, OTHER_REGISTRAR);
        assert_eq!(
            domain.transfer_data.status,
            Some(TransferStatus::ClientApproved)
        );
        assert_eq!(domain.common.last_transfer_time, Some(h.now()));
        assert!(!domain.common.has_status(StatusValue::PendingTransfer));
        assert_eq!(
            domain.registration_expiration_time,
            crate::model::add_years(before.registration_expiration_time, 1)
        );

        // Staged auto-approval messages are gone; the explicit approval
        // notification replaced them.
        let gaining_polls = h.store.poll_messages_for(OTHER_REGISTRAR).await.unwrap();
        assert!(gaining_polls.iter().all(|p| !staged_poll_ids.contains(&p.id)));
        assert!(gaining_polls
            .iter()
            .any(|p| p.message.contains("was approved")));
        assert_eq!(h.dns.drain().await.len(), 1);
    }

    #[tokio::test]
    async fn reject_keeps_sponsorship() {
        let h = TestHarness::new().await;
        request_transfer(&h).await;
        reject(
            &h.ctx,
            &losing_session(),
            "example.tld",
            None,
            None,
            h.now(),
        )
        .await
        .unwrap();
        let domain = h.load_domain("example.tld").await.unwrap();
        assert_eq!(domain.common.sponsor_registrar, REGISTRAR);
        assert_eq!(
            domain.transfer_data.status,
            Some(TransferStatus::ClientRejected)
        );
        let gaining_polls = h.store.poll_messages_for(OTHER_REGISTRAR).await.unwrap();
        assert!(gaining_polls
            .iter()
            .any(|p| p.message.contains("was rejected")));
    }

    #[tokio::test]
    async fn cancel_only_by_the_gaining_registrar() {
        let h = TestHarness::new().await;
        request_transfer(&h).await;
        let result = cancel(
            &h.ctx,
            &losing_session(),
            "example.tld",
            None,
            None,
            h.now(),
        )
        .await;
        assert!(matches!(result, Err(FlowError::NotTransferInitiator)));

        cancel(
            &h.ctx,
            &gaining_session(),
            "example.tld",
            None,
            None,
            h.now(),
        )
        .await
        .unwrap();
        let domain = h.load_domain("example.tld").await.unwrap();
        assert_eq!(
            domain.transfer_data.status,
            Some(TransferStatus::ClientCancelled)
        );
    }

    #[tokio::test]
    async fn approve_by_non_sponsor_fails() {
        let h = TestHarness::new().await;
        request_transfer(&h).await;
        let result = approve(
            &h.ctx,
            &gaining_session(),
            "example.tld",
            None,
            None,
            h.now(),
        )
        .await;
        assert!(matches!(result, Err(FlowError::ResourceNotOwned)));
    }

    #[tokio::test]
    async fn query_requires_involvement_or_auth() {
        let h = TestHarness::new().await;
        h.persist_active_domain("example.tld").await;
        let result = query(&h.ctx, &losing_session(), "example.tld", None, h.now()).await;
        assert!(matches!(result, Err(FlowError::NoTransferHistory)));

        request(
            &h.ctx,
            &gaining_session(),
            "example.tld",
            None,
            Some("2fooBAR"),
            None,
            h.now(),
        )
        .await
        .unwrap();
        let output = query(&h.ctx, &gaining_session(), "example.tld", None, h.now())
            .await
            .unwrap();
        match output.res_data {
            Some(ResData::DomainTransfer(view)) => assert_eq!(view.status, "pending"),
            other => panic!("unexpected res data: {other:?}"),
        }
    }
}
