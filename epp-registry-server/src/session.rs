//! Per-connection EPP session loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::SecondsFormat;
use tokio::io::{AsyncRead, AsyncWrite};

use epp_registry_core::flows::{dispatch, SessionContext};
use epp_registry_core::{Clock, FlowContext};
use epp_registry_proto::xml::{parse_command, render_greeting, render_response};
use epp_registry_proto::{EppCommand, EppResponse, TrId};

use crate::frame::{read_frame, write_frame};

/// Shared immutable server state handed to every connection task.
pub struct ServerState {
    pub ctx: FlowContext,
    pub server_id: String,
    pub max_frame_bytes: usize,
    trid_counter: AtomicU64,
}

impl ServerState {
    #[must_use]
    pub fn new(ctx: FlowContext, server_id: String, max_frame_bytes: usize) -> Self {
        Self {
            ctx,
            server_id,
            max_frame_bytes,
            trid_counter: AtomicU64::new(1),
        }
    }

    /// Server transaction ids are unique per processed command.
    fn next_sv_trid(&self) -> String {
        let n = self.trid_counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n}", self.server_id)
    }

    fn greeting(&self) -> String {
        let sv_date = self
            .ctx
            .clock
            .now()
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        render_greeting(&self.server_id, &sv_date)
    }
}

/// Drives one client connection: greeting, then a command/response loop
/// until logout, a closing result code, or EOF.
pub async fn serve_connection<S>(mut stream: S, state: Arc<ServerState>) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_frame(&mut stream, state.greeting().as_bytes()).await?;

    let mut session = SessionContext::default();
    loop {
        let Some(frame) = read_frame(&mut stream, state.max_frame_bytes).await? else {
            tracing::debug!("connection closed by peer");
            return Ok(());
        };
        let sv_trid = state.next_sv_trid();
        let response_xml = match parse_command(&frame) {
            Ok(EppCommand::Hello) => state.greeting(),
            Ok(command) => {
                let response = dispatch(&state.ctx, &mut session, &command, sv_trid).await;
                let close = response.code.closes_connection();
                let rendered = render_response(&response);
                if close {
                    write_frame(&mut stream, rendered.as_bytes()).await?;
                    return Ok(());
                }
                rendered
            }
            Err(e) => {
                // Malformed documents get a negative response, not a
                // dropped connection.
                tracing::warn!("unparseable command: {e}");
                let response = EppResponse::failure(
                    e.code(),
                    e.to_string(),
                    TrId {
                        cl_trid: None,
                        sv_trid,
                    },
                );
                render_response(&response)
            }
        };
        write_frame(&mut stream, response_xml.as_bytes()).await?;
    }
}
