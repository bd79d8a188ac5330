//! The flow dispatcher: one inbound command in, one response out.
//!
//! Maps (verb, object kind) onto the concrete flow, drives it through
//! validate → build → commit, and converts the typed failure of whichever
//! check fired into the protocol-level negative response. Nothing beyond
//! the documented message ever leaks to the wire.

use epp_registry_proto::command::{EppCommand, ResourceCommand, TransferOp};
use epp_registry_proto::{EppResponse, TrId};

use crate::clock::Clock;
use crate::error::FlowError;
use crate::flows::{contact, domain, host, session, FlowContext, FlowOutput, SessionContext};

/// Dispatches a parsed command, returning the response to render.
pub async fn dispatch(
    ctx: &FlowContext,
    session_ctx: &mut SessionContext,
    command: &EppCommand,
    sv_trid: String,
) -> EppResponse {
    let tr_id = TrId {
        cl_trid: command.cl_trid().map(str::to_string),
        sv_trid,
    };
    let result = match command {
        // The transport layer answers hello with a fresh greeting; one that
        // reaches the dispatcher is a client error.
        EppCommand::Hello => Err(FlowError::ValuePolicy(
            "Hello is only valid at the start of a session".to_string(),
        )),
        EppCommand::Login(login) => session::login(ctx, session_ctx, login),
        EppCommand::Logout { .. } => Ok(session::logout(session_ctx)),
        EppCommand::Resource { command, cl_trid } => {
            run_resource_flow(ctx, session_ctx, command, cl_trid.as_deref()).await
        }
    };
    let label = match command {
        EppCommand::Resource { command, .. } => command.verb_name(),
        EppCommand::Login(_) => "login",
        EppCommand::Logout { .. } => "logout",
        EppCommand::Hello => "hello",
    };
    render(result, tr_id, label)
}

async fn run_resource_flow(
    ctx: &FlowContext,
    session_ctx: &SessionContext,
    command: &ResourceCommand,
    cl_trid: Option<&str>,
) -> Result<FlowOutput, FlowError> {
    let now = ctx.clock.now();
    match command {
        ResourceCommand::DomainCheck { names } => {
            domain::check(ctx, session_ctx, names, now).await
        }
        ResourceCommand::DomainInfo { name, auth_info } => {
            domain::info(ctx, session_ctx, name, auth_info.as_deref(), now).await
        }
        ResourceCommand::DomainCreate(create) => {
            domain::create(ctx, session_ctx, create, cl_trid, now).await
        }
        ResourceCommand::DomainDelete { name } => {
            domain::delete(ctx, session_ctx, name, cl_trid, now).await
        }
        ResourceCommand::DomainRenew {
            name,
            current_expiration_date,
            period,
        } => {
            domain::renew(
                ctx,
                session_ctx,
                name,
                *current_expiration_date,
                *period,
                cl_trid,
                now,
            )
            .await
        }
        ResourceCommand::DomainTransfer {
            op,
            name,
            period,
            auth_info,
        } => {
            let auth = auth_info.as_deref();
            match op {
                TransferOp::Request => {
                    domain::transfer::request(ctx, session_ctx, name, *period, auth, cl_trid, now)
                        .await
                }
                TransferOp::Query => {
                    domain::transfer::query(ctx, session_ctx, name, auth, now).await
                }
                TransferOp::Approve => {
                    domain::transfer::approve(ctx, session_ctx, name, auth, cl_trid, now).await
                }
                TransferOp::Reject => {
                    domain::transfer::reject(ctx, session_ctx, name, auth, cl_trid, now).await
                }
                TransferOp::Cancel => {
                    domain::transfer::cancel(ctx, session_ctx, name, auth, cl_trid, now).await
                }
            }
        }
        ResourceCommand::DomainUpdate(update) => {
            domain::update(ctx, session_ctx, update, cl_trid, now).await
        }
        ResourceCommand::HostCheck { names } => host::check(ctx, session_ctx, names, now).await,
        ResourceCommand::HostInfo { name } => host::info(ctx, session_ctx, name, now).await,
        ResourceCommand::HostCreate(create) => {
            host::create(ctx, session_ctx, create, cl_trid, now).await
        }
        ResourceCommand::HostDelete { name } => {
            host::delete(ctx, session_ctx, name, cl_trid, now).await
        }
        ResourceCommand::HostUpdate(update) => {
            host::update(ctx, session_ctx, update, cl_trid, now).await
        }
        ResourceCommand::ContactCheck { ids } => contact::check(ctx, session_ctx, ids, now).await,
        ResourceCommand::ContactInfo { id, auth_info } => {
            contact::info(ctx, session_ctx, id, auth_info.as_deref(), now).await
        }
        ResourceCommand::ContactCreate(create) => {
            contact::create(ctx, session_ctx, create, cl_trid, now).await
        }
        ResourceCommand::ContactDelete { id } => {
            contact::delete(ctx, session_ctx, id, cl_trid, now).await
        }
        ResourceCommand::ContactUpdate(update) => {
            contact::update(ctx, session_ctx, update, cl_trid, now).await
        }
    }
}

fn render(result: Result<FlowOutput, FlowError>, tr_id: TrId, label: &str) -> EppResponse {
    match result {
        Ok(output) => {
            log::info!("{label} completed with {}", output.code.value());
            let mut response = EppResponse::with_code(output.code, tr_id);
            response.res_data = output.res_data;
            response
        }
        Err(e) => {
            if e.is_expected() {
                log::warn!("{label} rejected: {e}");
            } else {
                log::error!("{label} failed: {e}");
            }
            EppResponse::failure(e.code(), e.to_string(), tr_id)
        }
    }
}
