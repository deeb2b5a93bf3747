//! Blocking client handle to a running refinement daemon.

use std::{
    io::{BufRead, BufReader, Write},
    net::{SocketAddr, TcpStream},
    sync::Mutex,
};

use super::{Request, Response, PROTOCOL_VERSION};
use crate::{
    config::{RefinementContext, StageKey},
    error::{Error, Result, TransportError},
    facade::{CallResult, ConfigurationResult, RefinementFacade},
};

struct Conn {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Conn {
    fn open(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            reader,
            writer: stream,
        })
    }

    fn send(&mut self, request: &Request) -> Result<()> {
        let mut json = serde_json::to_string(request)?;
        json.push('\n');
        self.writer.write_all(json.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    fn recv(&mut self) -> Result<Response> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line)?;
        if read == 0 {
            return Err(Error::Transport(TransportError::ConnectionClosed));
        }
        serde_json::from_str(&line)
            .map_err(|e| Error::Transport(TransportError::MalformedFrame(e.to_string())))
    }
}

/// Blocking remote facade handle.
///
/// Owns one connection with one in-flight call at a time; concurrent
/// callers serialize on it. For independent concurrency, open one handle
/// per script unit.
pub struct RemoteFacade {
    conn: Mutex<Conn>,
    addr: SocketAddr,
}

impl RemoteFacade {
    /// Connect to a daemon and perform the handshake.
    ///
    /// Daemon health states pass through in the [`CallResult`] instead of
    /// becoming faults: a draining daemon answers `Dying`, a version
    /// mismatch `Error`. Only broken connections and malformed frames are
    /// `Err`.
    pub fn connect(addr: SocketAddr) -> Result<CallResult<Self>> {
        let mut conn = Conn::open(addr)?;
        conn.send(&Request::Handshake {
            version: PROTOCOL_VERSION,
        })?;
        match conn.recv()? {
            Response::Handshake { result } => Ok(result.map(move |_| {
                tracing::debug!("connected to refinement daemon at {addr}");
                Self {
                    conn: Mutex::new(conn),
                    addr,
                }
            })),
            Response::Fault { message } => {
                Err(Error::Transport(TransportError::RemoteFault(message)))
            }
            Response::Refine { .. } => Err(Error::Transport(TransportError::MalformedFrame(
                "refine reply to a handshake".into(),
            ))),
        }
    }

    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn call(&self, request: Request) -> Result<Response> {
        let mut conn = self.conn.lock().map_err(|_| {
            Error::Transport(TransportError::RemoteFault(
                "connection poisoned by an earlier panic".into(),
            ))
        })?;
        conn.send(&request)?;
        conn.recv()
    }
}

impl RefinementFacade for RemoteFacade {
    fn refine(&self, stage: StageKey, context: RefinementContext) -> Result<ConfigurationResult> {
        match self.call(Request::Refine { stage, context })? {
            Response::Refine { result } => Ok(result),
            Response::Fault { message } => {
                Err(Error::Transport(TransportError::RemoteFault(message)))
            }
            Response::Handshake { .. } => Err(Error::Transport(TransportError::MalformedFrame(
                "handshake reply to a refine call".into(),
            ))),
        }
    }
}
