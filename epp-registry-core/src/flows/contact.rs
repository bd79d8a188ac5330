//! Contact flows.

use chrono::{DateTime, Utc};

use epp_registry_proto::command::{ContactCreate, ContactUpdate};
use epp_registry_proto::response::ContactInfoData;
use epp_registry_proto::{CheckItem, ResData, ResourceKind, StatusValue};

use crate::commit::{commit, StagedMutation};
use crate::error::{FlowError, FlowResult};
use crate::flows::checks::{
    load_and_verify_existence, make_history, verify_add_remove_disjoint,
    verify_no_client_update_prohibited, verify_no_disallowed_statuses,
    verify_resource_does_not_exist, verify_resource_ownership, verify_statuses_client_settable,
    MAX_CHECK_TARGETS,
};
use crate::flows::{FlowContext, FlowOutput, SessionContext};
use crate::model::{Contact, HistoryType, RepoId, Resource, ResourceCommon};
use crate::store::VersionedWrite;
use crate::tasks::AsyncTask;

const DELETE_DISALLOWED: &[StatusValue] = &[
    StatusValue::ClientDeleteProhibited,
    StatusValue::PendingDelete,
    StatusValue::ServerDeleteProhibited,
];

const UPDATE_DISALLOWED: &[StatusValue] =
    &[StatusValue::PendingDelete, StatusValue::ServerUpdateProhibited];

/// Contact ids are free-form tokens, bounded by the EPP clIDType (3–16
/// octets).
fn validate_contact_id(id: &str) -> FlowResult<()> {
    if id.len() < 3 || id.len() > 16 {
        return Err(FlowError::NameSyntax(
            "Contact ids must be between 3 and 16 characters".to_string(),
        ));
    }
    Ok(())
}

async fn load_contact(
    ctx: &FlowContext,
    id: &str,
    now: DateTime<Utc>,
) -> FlowResult<(Contact, u64)> {
    let versioned = load_and_verify_existence(ctx, ResourceKind::Contact, id, now).await?;
    let version = versioned.version;
    match versioned.resource {
        Resource::Contact(contact) => Ok((contact, version)),
        _ => Err(FlowError::does_not_exist(ResourceKind::Contact, id)),
    }
}

/// Creates a contact.
pub async fn create(
    ctx: &FlowContext,
    session: &SessionContext,
    command: &ContactCreate,
    cl_trid: Option<&str>,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    let registrar = session.registrar()?.to_string();
    verify_resource_does_not_exist(ctx, ResourceKind::Contact, &command.id, now).await?;
    validate_contact_id(&command.id)?;

    let contact = Contact {
        common: ResourceCommon::create(
            RepoId::new(ctx.store.allocate_id().await, "CONTACT"),
            &command.id,
            &registrar,
            now,
        ),
        postal_info: command.postal_info.clone(),
        voice: command.voice.clone(),
        fax: command.fax.clone(),
        email: command.email.clone(),
        auth_info: command.auth_info.clone(),
        transfer_data: Default::default(),
    };
    let repo_id = contact.common.repo_id.clone();

    let mut staged = StagedMutation::default();
    staged.history.push(
        make_history(
            ctx,
            repo_id,
            HistoryType::ContactCreate,
            &registrar,
            now,
            cl_trid,
        )
        .await,
    );
    staged.creates.push(Resource::Contact(contact));

    commit(&ctx.store, &ctx.dns_queue, &ctx.async_queue, now, staged).await?;
    Ok(FlowOutput::ok_with(ResData::ContactCreate {
        id: command.id.clone(),
        creation_time: now,
    }))
}

/// Reports the stored state of a contact.
pub async fn info(
    ctx: &FlowContext,
    session: &SessionContext,
    id: &str,
    auth_info: Option<&str>,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    session.registrar()?;
    let (contact, _) = load_contact(ctx, id, now).await?;
    if let Some(presented) = auth_info {
        if presented != contact.auth_info {
            return Err(FlowError::BadAuthInfo);
        }
    }

    let mut statuses: Vec<StatusValue> = contact.common.statuses.iter().copied().collect();
    if !ctx
        .store
        .query_domains_by_contact(id, now, 1)
        .await?
        .is_empty()
    {
        statuses.insert(0, StatusValue::Linked);
    }
    if statuses.is_empty() {
        statuses.push(StatusValue::Ok);
    }
    Ok(FlowOutput::ok_with(ResData::ContactInfo(Box::new(
        ContactInfoData {
            id: contact.common.foreign_key.clone(),
            repo_id: contact.common.repo_id.to_string(),
            statuses,
            name: contact.postal_info.name.clone(),
            email: contact.email.clone(),
            sponsor_registrar: contact.common.sponsor_registrar.clone(),
            creation_registrar: contact.common.creation_registrar.clone(),
            creation_time: contact.common.creation_time,
            last_update_time: contact.common.last_update_time,
            last_transfer_time: contact.common.last_transfer_time,
        },
    ))))
}

/// Reports availability for up to [`MAX_CHECK_TARGETS`] contact ids.
pub async fn check(
    ctx: &FlowContext,
    session: &SessionContext,
    ids: &[String],
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    session.registrar()?;
    if ids.len() > MAX_CHECK_TARGETS {
        return Err(FlowError::TooManyResourceChecks);
    }
    let mut items = Vec::with_capacity(ids.len());
    for id in ids {
        validate_contact_id(id)?;
        let taken = ctx
            .store
            .find_by_foreign_key(ResourceKind::Contact, id, now)
            .await?
            .is_some();
        items.push(if taken {
            CheckItem::taken(id.clone())
        } else {
            CheckItem::available(id.clone())
        });
    }
    Ok(FlowOutput::ok_with(ResData::ContactCheck(items)))
}

/// Updates contact data and client-settable statuses.
pub async fn update(
    ctx: &FlowContext,
    session: &SessionContext,
    command: &ContactUpdate,
    cl_trid: Option<&str>,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    let registrar = session.registrar()?.to_string();
    let (contact, version) = load_contact(ctx, &command.id, now).await?;

    verify_add_remove_disjoint(&command.add_statuses, &command.rem_statuses)?;
    let resource = Resource::Contact(contact.clone());
    if !session.is_superuser {
        verify_statuses_client_settable(&command.add_statuses)?;
        verify_statuses_client_settable(&command.rem_statuses)?;
        verify_no_client_update_prohibited(&resource, &command.rem_statuses)?;
        verify_no_disallowed_statuses(&resource, UPDATE_DISALLOWED)?;
        verify_resource_ownership(&registrar, &resource)?;
    }

    let mut updated = contact.clone();
    for status in &command.add_statuses {
        updated.common.statuses.insert(*status);
    }
    for status in &command.rem_statuses {
        updated.common.statuses.remove(status);
    }
    if let Some(postal_info) = &command.new_postal_info {
        updated.postal_info = postal_info.clone();
    }
    if let Some(voice) = &command.new_voice {
        updated.voice = Some(voice.clone());
    }
    if let Some(fax) = &command.new_fax {
        updated.fax = Some(fax.clone());
    }
    if let Some(email) = &command.new_email {
        updated.email.clone_from(email);
    }
    if let Some(auth_info) = &command.new_auth_info {
        updated.auth_info.clone_from(auth_info);
    }
    updated.common.touch(&registrar, now);

    let mut staged = StagedMutation::default();
    staged.history.push(
        make_history(
            ctx,
            contact.common.repo_id.clone(),
            HistoryType::ContactUpdate,
            &registrar,
            now,
            cl_trid,
        )
        .await,
    );
    staged.updates.push(VersionedWrite {
        resource: Resource::Contact(updated),
        expected_version: version,
    });

    commit(&ctx.store, &ctx.dns_queue, &ctx.async_queue, now, staged).await?;
    Ok(FlowOutput::ok())
}

/// Marks a contact for asynchronous deletion, mirroring the host delete:
/// the real referential-safety scan happens in the async worker.
pub async fn delete(
    ctx: &FlowContext,
    session: &SessionContext,
    id: &str,
    cl_trid: Option<&str>,
    now: DateTime<Utc>,
) -> FlowResult<FlowOutput> {
    let registrar = session.registrar()?.to_string();
    if !ctx
        .store
        .query_domains_by_contact(id, now, 1)
        .await?
        .is_empty()
    {
        return Err(FlowError::ResourceToDeleteIsReferenced);
    }
    let (contact, version) = load_contact(ctx, id, now).await?;
    verify_no_disallowed_statuses(&Resource::Contact(contact.clone()), DELETE_DISALLOWED)?;
    if !session.is_superuser {
        verify_resource_ownership(&registrar, &Resource::Contact(contact.clone()))?;
    }

    let mut marked = contact.clone();
    marked.common.statuses.insert(StatusValue::PendingDelete);
    marked.common.touch(&registrar, now);

    let mut staged = StagedMutation::default();
    staged.history.push(
        make_history(
            ctx,
            contact.common.repo_id.clone(),
            HistoryType::ContactPendingDelete,
            &registrar,
            now,
            cl_trid,
        )
        .await,
    );
    staged.updates.push(VersionedWrite {
        resource: Resource::Contact(marked),
        expected_version: version,
    });
    staged.async_tasks.push(AsyncTask::ResourceDeletion {
        kind: ResourceKind::Contact,
        repo_id: contact.common.repo_id.clone(),
        requesting_registrar: registrar,
        client_trid: cl_trid.map(str::to_string),
        is_superuser: session.is_superuser,
        requested_time: now,
    });

    commit(&ctx.store, &ctx.dns_queue, &ctx.async_queue, now, staged).await?;
    Ok(FlowOutput::pending())
}

#[cfg(test)]
mod tests {
    use epp_registry_proto::command::PostalInfo;
    use epp_registry_proto::ResultCode;

    use crate::test_utils::{TestHarness, OTHER_REGISTRAR, REGISTRAR};

    use super::*;

    fn session() -> SessionContext {
        SessionContext::logged_in(REGISTRAR)
    }

    fn contact_create(id: &str) -> ContactCreate {
        ContactCreate {
            id: id.to_string(),
            postal_info: PostalInfo {
                name: "John Doe".to_string(),
                org: None,
                street: vec!["123 Example Dr.".to_string()],
                city: "Dulles".to_string(),
                state_or_province: Some("VA".to_string()),
                postal_code: Some("20166-6503".to_string()),
                country_code: "US".to_string(),
            },
            voice: Some("+1.7035555555".to_string()),
            fax: None,
            email: "jdoe@example.com".to_string(),
            auth_info: "2fooBAR".to_string(),
        }
    }

    #[tokio::test]
    async fn create_info_round_trip() {
        let h = TestHarness::new().await;
        let output = create(&h.ctx, &session(), &contact_create("sh8013"), None, h.now())
            .await
            .unwrap();
        assert_eq!(output.code, ResultCode::Success);

        let output = info(&h.ctx, &session(), "sh8013", None, h.now())
            .await
            .unwrap();
        match output.res_data {
            Some(ResData::ContactInfo(data)) => {
                assert_eq!(data.id, "sh8013");
                assert_eq!(data.email, "jdoe@example.com");
                assert_eq!(data.statuses, vec![StatusValue::Ok]);
            }
            other => panic!("unexpected res data: {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_rejects_bad_ids_and_duplicates() {
        let h = TestHarness::new().await;
        let result = create(&h.ctx, &session(), &contact_create("ab"), None, h.now()).await;
        assert!(matches!(result, Err(FlowError::NameSyntax(_))));

        create(&h.ctx, &session(), &contact_create("sh8013"), None, h.now())
            .await
            .unwrap();
        let result = create(&h.ctx, &session(), &contact_create("sh8013"), None, h.now()).await;
        assert!(matches!(result, Err(FlowError::ResourceAlreadyExists(_))));
    }

    #[tokio::test]
    async fn update_applies_changes() {
        let h = TestHarness::new().await;
        h.persist_active_contact("sh8013").await;
        let command = ContactUpdate {
            id: "sh8013".to_string(),
            new_email: Some("new@example.com".to_string()),
            add_statuses: vec![StatusValue::ClientDeleteProhibited],
            ..ContactUpdate::default()
        };
        update(&h.ctx, &session(), &command, None, h.now())
            .await
            .unwrap();
        let output = info(&h.ctx, &session(), "sh8013", None, h.now())
            .await
            .unwrap();
        match output.res_data {
            Some(ResData::ContactInfo(data)) => {
                assert_eq!(data.email, "new@example.com");
                assert!(data.statuses.contains(&StatusValue::ClientDeleteProhibited));
            }
            other => panic!("unexpected res data: {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_of_referenced_contact_fails_fast() {
        let h = TestHarness::new().await;
        h.persist_active_contact("jd1234").await;
        h.persist_active_domain("example.tld").await;
        let result = delete(&h.ctx, &session(), "jd1234", None, h.now()).await;
        assert!(matches!(
            result,
            Err(FlowError::ResourceToDeleteIsReferenced)
        ));
    }

    #[tokio::test]
    async fn delete_marks_pending_and_enqueues_task() {
        let h = TestHarness::new().await;
        let contact = h.persist_active_contact("sh9999").await;
        let output = delete(&h.ctx, &session(), "sh9999", None, h.now())
            .await
            .unwrap();
        assert_eq!(output.code, ResultCode::SuccessWithActionPending);
        let tasks = h.async_queue.drain().await;
        assert!(matches!(
            tasks.as_slice(),
            [AsyncTask::ResourceDeletion {
                kind: ResourceKind::Contact,
                repo_id,
                ..
            }] if *repo_id == contact.common.repo_id
        ));
    }

    #[tokio::test]
    async fn unauthorized_update_fails() {
        let h = TestHarness::new().await;
        h.persist_active_contact("sh8013").await;
        let command = ContactUpdate {
            id: "sh8013".to_string(),
            new_email: Some("evil@example.com".to_string()),
            ..ContactUpdate::default()
        };
        let result = update(
            &h.ctx,
            &SessionContext::logged_in(OTHER_REGISTRAR),
            &command,
            None,
            h.now(),
        )
        .await;
        assert!(matches!(result, Err(FlowError::ResourceNotOwned)));
    }
}
