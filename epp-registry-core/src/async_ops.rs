//! Workers for deferred tasks the flow engine enqueued.
//!
//! Delete flows optimistically mark a resource pendingDelete and enqueue a
//! [`AsyncTask::ResourceDeletion`]; the worker here performs the real
//! referential-safety scan and either finishes the deletion or reverts the
//! mark and reports the conflict by poll message. Reverts notify by poll
//! only; DNS refreshes already published are harmless re-publications and
//! are not retracted.

use epp_registry_proto::{ResourceKind, StatusValue};

use crate::clock::Clock;
use crate::commit::{commit, StagedMutation};
use crate::error::{FlowError, FlowResult};
use crate::flows::checks::make_history;
use crate::flows::FlowContext;
use crate::model::{HistoryType, PollMessage, PollMessageKind, Resource};
use crate::store::VersionedWrite;
use crate::tasks::{AsyncTask, DnsRefreshRequest, DnsTargetKind};

/// Upper bound on referencing domains rewritten by one rename task.
const RENAME_SCAN_LIMIT: usize = 10_000;

/// Runs one dequeued task to completion.
pub async fn run_async_task(ctx: &FlowContext, task: AsyncTask) -> FlowResult<()> {
    match task {
        AsyncTask::ResourceDeletion {
            kind,
            repo_id,
            requesting_registrar,
            client_trid,
            is_superuser: _,
            requested_time: _,
        } => {
            run_resource_deletion(ctx, kind, &repo_id, &requesting_registrar, client_trid.as_deref())
                .await
        }
        AsyncTask::HostRename {
            repo_id, old_name, ..
        } => run_host_rename(ctx, &repo_id, &old_name).await,
    }
}

async fn run_resource_deletion(
    ctx: &FlowContext,
    kind: ResourceKind,
    repo_id: &crate::model::RepoId,
    requesting_registrar: &str,
    client_trid: Option<&str>,
) -> FlowResult<()> {
    let now = ctx.clock.now();
    let Some(versioned) = ctx.store.load(repo_id).await? else {
        log::warn!("async deletion: {repo_id} vanished, nothing to do");
        return Ok(());
    };
    let resource = versioned.resource.clone();
    if !resource.common().has_status(StatusValue::PendingDelete) {
        // Someone reverted or completed the deletion already.
        return Ok(());
    }
    let foreign_key = resource.foreign_key().to_string();

    let referenced = match kind {
        ResourceKind::Host => !ctx
            .store
            .query_domains_by_nameserver(&foreign_key, now, 1)
            .await?
            .is_empty(),
        ResourceKind::Contact => !ctx
            .store
            .query_domains_by_contact(&foreign_key, now, 1)
            .await?
            .is_empty(),
        ResourceKind::Domain => {
            return Err(FlowError::Internal {
                detail: "domains are not deleted asynchronously".to_string(),
            })
        }
    };

    let mut staged = StagedMutation::default();
    let mut updated = resource.clone();
    let kind_name = kind.display_name();

    if referenced {
        updated
            .common_mut()
            .statuses
            .remove(&StatusValue::PendingDelete);
        let history_type = match kind {
            ResourceKind::Host => HistoryType::HostDeleteFailure,
            _ => HistoryType::ContactDeleteFailure,
        };
        staged.history.push(
            make_history(ctx, repo_id.clone(), history_type, requesting_registrar, now, client_trid)
                .await,
        );
        staged.polls.push(PollMessage {
            id: ctx.store.allocate_id().await,
            registrar_id: requesting_registrar.to_string(),
            parent: repo_id.clone(),
            event_time: now,
            message: format!(
                "Can't delete {kind_name} {foreign_key} because it is referenced by a domain."
            ),
            kind: PollMessageKind::OneTime,
        });
        log::info!("async deletion of {kind_name} {foreign_key} reverted: still referenced");
    } else {
        updated
            .common_mut()
            .statuses
            .remove(&StatusValue::PendingDelete);
        updated.common_mut().deletion_time = now;
        let history_type = match kind {
            ResourceKind::Host => HistoryType::HostDelete,
            _ => HistoryType::ContactDelete,
        };
        staged.history.push(
            make_history(ctx, repo_id.clone(), history_type, requesting_registrar, now, client_trid)
                .await,
        );
        staged.polls.push(PollMessage {
            id: ctx.store.allocate_id().await,
            registrar_id: requesting_registrar.to_string(),
            parent: repo_id.clone(),
            event_time: now,
            message: format!("Deleted {kind_name} {foreign_key}."),
            kind: PollMessageKind::OneTime,
        });

        // A subordinate host leaves its superordinate domain's subordinate
        // set and has its glue withdrawn.
        if let Resource::Host(host) = &resource {
            if let Some(domain_name) = host.superordinate_domain.as_deref() {
                if let Some(domain_versioned) = ctx
                    .store
                    .find_by_foreign_key(ResourceKind::Domain, domain_name, now)
                    .await?
                {
                    let mut domain_updated = domain_versioned.resource.clone();
                    if let Resource::Domain(d) = &mut domain_updated {
                        d.subordinate_hosts.remove(&foreign_key);
                        staged.stage_dns_refresh(DnsRefreshRequest {
                            name: foreign_key.clone(),
                            kind: DnsTargetKind::Host,
                            tld: d.tld.clone(),
                        });
                    }
                    staged.updates.push(VersionedWrite {
                        resource: domain_updated,
                        expected_version: domain_versioned.version,
                    });
                }
            }
        }
        log::info!("async deletion of {kind_name} {foreign_key} completed");
    }

    staged.updates.push(VersionedWrite {
        resource: updated,
        expected_version: versioned.version,
    });
    commit(&ctx.store, &ctx.dns_queue, &ctx.async_queue, now, staged).await?;
    Ok(())
}

/// Rewrites nameserver references on domains still pointing at a renamed
/// host's old name, refreshing DNS for each.
async fn run_host_rename(
    ctx: &FlowContext,
    repo_id: &crate::model::RepoId,
    old_name: &str,
) -> FlowResult<()> {
    let now = ctx.clock.now();
    let Some(host_versioned) = ctx.store.load(repo_id).await? else {
        return Ok(());
    };
    let new_name = host_versioned.resource.foreign_key().to_string();

    let referencing = ctx
        .store
        .query_domains_by_nameserver(old_name, now, RENAME_SCAN_LIMIT)
        .await?;
    if referencing.is_empty() {
        return Ok(());
    }
    let mut staged = StagedMutation::default();
    for domain in referencing {
        let Some(domain_versioned) = ctx
            .store
            .find_by_foreign_key(ResourceKind::Domain, &domain.common.foreign_key, now)
            .await?
        else {
            continue;
        };
        let mut updated = domain_versioned.resource.clone();
        if let Resource::Domain(d) = &mut updated {
            d.nameservers.remove(old_name);
            d.nameservers.insert(new_name.clone());
            staged.stage_dns_refresh(DnsRefreshRequest {
                name: d.common.foreign_key.clone(),
                kind: DnsTargetKind::Domain,
                tld: d.tld.clone(),
            });
        }
        staged.updates.push(VersionedWrite {
            resource: updated,
            expected_version: domain_versioned.version,
        });
    }
    commit(&ctx.store, &ctx.dns_queue, &ctx.async_queue, now, staged).await?;
    log::info!("host rename {old_name} -> {new_name} propagated to referencing domains");
    Ok(())
}
