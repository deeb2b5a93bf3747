#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc};

use refine_daemon::{
    daemon_ipc::{DaemonServer, RemoteFacade, ShutdownHandle, ANY_FREE_PORT},
    CallResult, CompilationConfiguration, HandlerRegistry, LocalFacade, RefinementContext,
    ScriptSource,
};

/// Daemon running inside the test runtime on an ephemeral loopback port.
pub struct DaemonHarness {
    pub addr: SocketAddr,
    pub shutdown: ShutdownHandle,
    task: tokio::task::JoinHandle<()>,
}

impl DaemonHarness {
    pub async fn start(registry: HandlerRegistry) -> Self {
        let facade = Arc::new(LocalFacade::new(Arc::new(registry)));
        let server = DaemonServer::bind(ANY_FREE_PORT, facade)
            .await
            .expect("bind daemon");
        let addr = server.local_addr().expect("local addr");
        let shutdown = server.shutdown_handle();
        let task = tokio::spawn(async move {
            server.run().await.expect("daemon run");
        });
        Self {
            addr,
            shutdown,
            task,
        }
    }

    /// Connect a blocking client handle off the async runtime workers.
    pub async fn connect(&self) -> CallResult<RemoteFacade> {
        let addr = self.addr;
        tokio::task::spawn_blocking(move || RemoteFacade::connect(addr))
            .await
            .expect("connect task")
            .expect("connect")
    }

    /// Connect and unwrap the `Good` session.
    pub async fn client(&self) -> RemoteFacade {
        match self.connect().await {
            CallResult::Good(facade) => facade,
            CallResult::Ok => panic!("handshake answered Ok instead of a session"),
            CallResult::Dying => panic!("daemon is dying"),
            CallResult::Error(message) => panic!("daemon error: {message}"),
        }
    }

    pub async fn stop(self) {
        self.shutdown.shutdown();
        self.task.await.expect("daemon task");
    }
}

/// Context for a named script unit with an empty configuration.
pub fn context_for(unit: &str) -> RefinementContext {
    RefinementContext::new(
        CompilationConfiguration::new(),
        ScriptSource::new(format!("{unit}.kts"), format!("// {unit}")),
    )
}
