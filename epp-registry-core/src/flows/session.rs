//! Session flows: login and logout.
//!
//! Credential verification (certificates, passwords) belongs to the
//! transport layer; the flow engine checks identity and session state only.

use epp_registry_proto::command::Login;
use epp_registry_proto::ResultCode;

use crate::error::{FlowError, FlowResult};
use crate::flows::{FlowContext, FlowOutput, SessionContext};

/// Establishes a session for a known registrar.
pub fn login(
    ctx: &FlowContext,
    session: &mut SessionContext,
    login: &Login,
) -> FlowResult<FlowOutput> {
    if session.registrar_id.is_some() {
        return Err(FlowError::AlreadyLoggedIn);
    }
    if !ctx.registrars.contains(&login.registrar_id) {
        return Err(FlowError::UnknownRegistrar(login.registrar_id.clone()));
    }
    session.registrar_id = Some(login.registrar_id.clone());
    log::info!("registrar {} logged in", login.registrar_id);
    Ok(FlowOutput::ok())
}

/// Ends the session. Always succeeds with 1500, even when not logged in —
/// the connection closes either way.
pub fn logout(session: &mut SessionContext) -> FlowOutput {
    if let Some(registrar) = session.registrar_id.take() {
        log::info!("registrar {registrar} logged out");
    }
    FlowOutput::with_code(ResultCode::SuccessAndClose)
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{TestHarness, REGISTRAR};

    use super::*;

    fn login_command(registrar: &str) -> Login {
        Login {
            registrar_id: registrar.to_string(),
            password: "password".to_string(),
            new_password: None,
            cl_trid: None,
        }
    }

    #[tokio::test]
    async fn login_establishes_session() {
        let h = TestHarness::new().await;
        let mut session = SessionContext::default();
        let output = login(&h.ctx, &mut session, &login_command(REGISTRAR)).unwrap();
        assert_eq!(output.code, ResultCode::Success);
        assert_eq!(session.registrar_id.as_deref(), Some(REGISTRAR));
    }

    #[tokio::test]
    async fn unknown_registrar_is_rejected() {
        let h = TestHarness::new().await;
        let mut session = SessionContext::default();
        let result = login(&h.ctx, &mut session, &login_command("EvilRegistrar"));
        assert!(matches!(result, Err(FlowError::UnknownRegistrar(_))));
        assert!(session.registrar_id.is_none());
    }

    #[tokio::test]
    async fn double_login_is_a_command_use_error() {
        let h = TestHarness::new().await;
        let mut session = SessionContext::default();
        login(&h.ctx, &mut session, &login_command(REGISTRAR)).unwrap();
        let result = login(&h.ctx, &mut session, &login_command(REGISTRAR));
        assert!(matches!(result, Err(FlowError::AlreadyLoggedIn)));
    }

    #[test]
    fn logout_clears_session_and_closes() {
        let mut session = SessionContext::logged_in(REGISTRAR);
        let output = logout(&mut session);
        assert_eq!(output.code, ResultCode::SuccessAndClose);
        assert!(session.registrar_id.is_none());
    }
}
