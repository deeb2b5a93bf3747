//! Accept loop dispatching remote refine calls onto blocking threads.
//!
//! Each connection runs on its own task and each refine call on its own
//! blocking thread, so calls for different script units proceed
//! concurrently with no ordering between them. Ordering of the three
//! stages for one script unit is the caller's job; the daemon keeps no
//! memory between calls.

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::Notify,
};

use super::{loopback, Request, Response, PROTOCOL_VERSION};
use crate::{
    error::Result,
    facade::{CallResult, RefinementFacade},
};

#[derive(Default)]
struct Lifecycle {
    draining: AtomicBool,
    stopped: AtomicBool,
    stop: Notify,
}

/// Asks a running daemon to drain and stop.
#[derive(Clone)]
pub struct ShutdownHandle {
    lifecycle: Arc<Lifecycle>,
}

impl ShutdownHandle {
    /// Stop taking on new sessions. Handshakes are answered `Dying` while
    /// in-flight work completes.
    pub fn drain(&self) {
        self.lifecycle.draining.store(true, Ordering::SeqCst);
    }

    /// Drain and stop the accept loop. Connections already established
    /// keep running until their peers hang up.
    pub fn shutdown(&self) {
        self.drain();
        self.lifecycle.stopped.store(true, Ordering::SeqCst);
        // notify_one stores a permit, so a shutdown landing between the
        // accept loop's flag check and its next await is not lost.
        self.lifecycle.stop.notify_one();
    }

    pub fn is_draining(&self) -> bool {
        self.lifecycle.draining.load(Ordering::SeqCst)
    }
}

/// Loopback daemon endpoint.
///
/// Holds the listener and the installed facade implementation; the facade
/// stays transport-free and is exposed over the wire by this dispatcher.
pub struct DaemonServer {
    listener: TcpListener,
    facade: Arc<dyn RefinementFacade + Send + Sync>,
    lifecycle: Arc<Lifecycle>,
}

impl DaemonServer {
    /// Bind the loopback listener. Port 0 picks any free port; read the
    /// actual one back with [`local_addr`](Self::local_addr).
    pub async fn bind(
        port: u16,
        facade: Arc<dyn RefinementFacade + Send + Sync>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(loopback(port)).await?;
        tracing::info!("listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            facade,
            lifecycle: Arc::new(Lifecycle::default()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            lifecycle: Arc::clone(&self.lifecycle),
        }
    }

    /// Serve until the shutdown handle fires.
    pub async fn run(self) -> Result<()> {
        loop {
            if self.lifecycle.stopped.load(Ordering::SeqCst) {
                break;
            }
            tokio::select! {
                () = self.lifecycle.stop.notified() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!("client connected from {peer}");
                        let facade = Arc::clone(&self.facade);
                        let lifecycle = Arc::clone(&self.lifecycle);
                        tokio::spawn(handle_connection(stream, facade, lifecycle));
                    }
                    Err(e) => tracing::error!("accept error: {e}"),
                }
            }
        }
        tracing::info!("refinement daemon stopped");
        Ok(())
    }
}

/// Serve one client connection: read a request line, write a reply line.
async fn handle_connection(
    stream: TcpStream,
    facade: Arc<dyn RefinementFacade + Send + Sync>,
    lifecycle: Arc<Lifecycle>,
) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("client read error: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => dispatch(request, &facade, &lifecycle).await,
            Err(e) => Response::Fault {
                message: format!("malformed request: {e}"),
            },
        };

        let Ok(json) = serde_json::to_string(&response) else {
            break;
        };
        if writer.write_all(format!("{json}\n").as_bytes()).await.is_err() {
            break;
        }
    }
}

async fn dispatch(
    request: Request,
    facade: &Arc<dyn RefinementFacade + Send + Sync>,
    lifecycle: &Lifecycle,
) -> Response {
    match request {
        Request::Handshake { version } => Response::Handshake {
            result: handshake(version, lifecycle),
        },
        Request::Refine { stage, context } => {
            tracing::debug!(stage = %stage, script = %context.script.name, "refine call");
            let facade = Arc::clone(facade);
            // The facade contract is blocking: one call, one thread.
            match tokio::task::spawn_blocking(move || facade.refine(stage, context)).await {
                Ok(Ok(result)) => Response::Refine { result },
                Ok(Err(e)) => Response::Fault {
                    message: e.to_string(),
                },
                Err(e) => Response::Fault {
                    message: format!("refine call aborted: {e}"),
                },
            }
        }
    }
}

fn handshake(version: u32, lifecycle: &Lifecycle) -> CallResult<u32> {
    if lifecycle.draining.load(Ordering::SeqCst) {
        return CallResult::Dying;
    }
    if version != PROTOCOL_VERSION {
        return CallResult::Error(format!(
            "unsupported protocol version {version}, daemon speaks {PROTOCOL_VERSION}"
        ));
    }
    CallResult::Good(PROTOCOL_VERSION)
}
