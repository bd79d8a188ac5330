//! Server bootstrap: store/queue wiring, accept loop, background worker.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use epp_registry_core::async_ops::run_async_task;
use epp_registry_core::model::Tld;
use epp_registry_core::{
    FlowContext, InMemoryAsyncQueue, InMemoryDnsQueue, InMemoryStore, ResourceStore, SystemClock,
    TldCache,
};

use crate::config::ServerConfig;
use crate::session::{serve_connection, ServerState};

/// A bound, ready-to-run server.
pub struct Server {
    state: Arc<ServerState>,
    listener: TcpListener,
    dns_queue: Arc<InMemoryDnsQueue>,
    async_queue: Arc<InMemoryAsyncQueue>,
    worker_interval: std::time::Duration,
}

impl Server {
    /// Builds the in-memory backend from config and binds the listener.
    pub async fn bind(config: &ServerConfig) -> anyhow::Result<Self> {
        let store = Arc::new(InMemoryStore::new());
        for tld in &config.tlds {
            store
                .put_tld(Tld::new(tld.clone()))
                .await
                .map_err(|e| anyhow::anyhow!("seeding tld {tld}: {e}"))?;
        }
        let tlds = Arc::new(TldCache::new(store.clone()));
        let dns_queue = Arc::new(InMemoryDnsQueue::new());
        let async_queue = Arc::new(InMemoryAsyncQueue::new());
        let registrars: BTreeSet<String> = config.registrars.iter().cloned().collect();

        let ctx = FlowContext {
            store,
            dns_queue: dns_queue.clone(),
            async_queue: async_queue.clone(),
            tlds,
            clock: Arc::new(SystemClock),
            registrars: Arc::new(registrars),
        };
        let state = Arc::new(ServerState::new(
            ctx,
            config.server_id.clone(),
            config.max_frame_bytes,
        ));
        let listener = TcpListener::bind(&config.listen_addr).await?;
        tracing::info!("listening on {}", listener.local_addr()?);
        Ok(Self {
            state,
            listener,
            dns_queue,
            async_queue,
            worker_interval: std::time::Duration::from_millis(config.worker_interval_ms),
        })
    }

    /// The actual bound address (useful with port 0 in tests).
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections forever, with a background task draining the
    /// deferred-work queues.
    pub async fn run(self) -> anyhow::Result<()> {
        let worker_state = self.state.clone();
        let dns_queue = self.dns_queue;
        let async_queue = self.async_queue;
        let worker_interval = self.worker_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(worker_interval);
            loop {
                ticker.tick().await;
                for task in async_queue.drain().await {
                    if let Err(e) = run_async_task(&worker_state.ctx, task).await {
                        tracing::error!("async task failed: {e}");
                    }
                }
                // The DNS writer is an external collaborator; the frontend
                // just surfaces what would be handed to it.
                for refresh in dns_queue.drain().await {
                    tracing::info!(name = %refresh.name, tld = %refresh.tld, "dns refresh ready");
                }
            }
        });

        loop {
            let (stream, peer) = self.listener.accept().await?;
            tracing::debug!("connection from {peer}");
            let state = self.state.clone();
            tokio::spawn(async move {
                if let Err(e) = serve_connection(stream, state).await {
                    tracing::warn!("connection from {peer} ended with error: {e}");
                }
            });
        }
    }
}
