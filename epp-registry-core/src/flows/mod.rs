//! The EPP flow engine.
//!
//! A flow is one command execution: an ordered validation pipeline, a pure
//! mutation builder, and a single atomic commit. Flows are instantiated
//! fresh per request and hold no state between requests; concurrent flows
//! against the same resource are serialized only by the store's optimistic
//! version check.

pub mod checks;
pub mod contact;
mod dispatch;
pub mod domain;
pub mod host;
pub mod session;

pub use dispatch::dispatch;

use std::collections::BTreeSet;
use std::sync::Arc;

use epp_registry_proto::{ResData, ResultCode};

use crate::clock::Clock;
use crate::config::TldCache;
use crate::error::{FlowError, FlowResult};
use crate::store::ResourceStore;
use crate::tasks::{AsyncTaskQueue, DnsTaskQueue};

/// Injected collaborators shared by all flows.
///
/// Everything here is read-through or append-only from a flow's point of
/// view; per-request state lives in [`SessionContext`] and on the stack.
pub struct FlowContext {
    pub store: Arc<dyn ResourceStore>,
    pub dns_queue: Arc<dyn DnsTaskQueue>,
    pub async_queue: Arc<dyn AsyncTaskQueue>,
    pub tlds: Arc<TldCache>,
    pub clock: Arc<dyn Clock>,
    /// Registrar ids allowed to log in. Credential verification is handled
    /// by the transport layer; the flow engine only checks identity.
    pub registrars: Arc<BTreeSet<String>>,
}

/// Per-connection session state.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    /// Set by a successful login flow.
    pub registrar_id: Option<String>,
    /// Superuser sessions bypass ownership and most status checks, never
    /// existence or syntax checks.
    pub is_superuser: bool,
}

impl SessionContext {
    #[must_use]
    pub fn logged_in(registrar_id: impl Into<String>) -> Self {
        Self {
            registrar_id: Some(registrar_id.into()),
            is_superuser: false,
        }
    }

    #[must_use]
    pub fn superuser(registrar_id: impl Into<String>) -> Self {
        Self {
            registrar_id: Some(registrar_id.into()),
            is_superuser: true,
        }
    }

    /// The acting registrar, or `NotLoggedIn`.
    pub fn registrar(&self) -> FlowResult<&str> {
        self.registrar_id.as_deref().ok_or(FlowError::NotLoggedIn)
    }
}

/// What a successful flow hands back to the response renderer.
#[derive(Debug, Clone)]
pub struct FlowOutput {
    pub code: ResultCode,
    pub res_data: Option<ResData>,
}

impl FlowOutput {
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            code: ResultCode::Success,
            res_data: None,
        }
    }

    #[must_use]
    pub const fn ok_with(res_data: ResData) -> Self {
        Self {
            code: ResultCode::Success,
            res_data: Some(res_data),
        }
    }

    #[must_use]
    pub const fn pending() -> Self {
        Self {
            code: ResultCode::SuccessWithActionPending,
            res_data: None,
        }
    }

    #[must_use]
    pub const fn pending_with(res_data: ResData) -> Self {
        Self {
            code: ResultCode::SuccessWithActionPending,
            res_data: Some(res_data),
        }
    }

    #[must_use]
    pub const fn with_code(code: ResultCode) -> Self {
        Self {
            code,
            res_data: None,
        }
    }
}
