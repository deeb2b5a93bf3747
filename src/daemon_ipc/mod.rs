//! Loopback wire protocol between clients and the refinement daemon.
//!
//! One JSON object per line in each direction. A connection carries one
//! handshake followed by any number of refine calls; every request gets
//! exactly one reply, in order. Refinement failures ride inside
//! [`Response::Refine`] as ordinary values; [`Response::Fault`] and broken
//! connections are the transport's own failure channel.

mod client;
mod server;

use std::net::{Ipv4Addr, SocketAddr};

pub use client::RemoteFacade;
use serde::{Deserialize, Serialize};
pub use server::{DaemonServer, ShutdownHandle};

use crate::{
    config::{RefinementContext, StageKey},
    facade::{CallResult, ConfigurationResult},
};

/// Wire protocol version spoken by both ends.
pub const PROTOCOL_VERSION: u32 = 1;

/// Port 0 asks the daemon to bind any free loopback port.
pub const ANY_FREE_PORT: u16 = 0;

/// Loopback-only address for the given port. The daemon never binds a
/// non-loopback interface.
pub fn loopback(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, port))
}

/// Client→daemon messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Opens a session; the daemon answers with its health state.
    Handshake { version: u32 },
    /// Runs one refinement stage against the supplied context.
    Refine {
        stage: StageKey,
        context: RefinementContext,
    },
}

/// Daemon→client messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Handshake { result: CallResult<u32> },
    Refine { result: ConfigurationResult },
    /// The daemon could not execute the call at all.
    Fault { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompilationConfiguration, RefinementStage, ScriptSource};

    #[test]
    fn requests_round_trip_as_single_json_lines() {
        let request = Request::Refine {
            stage: RefinementStage::BeforeParsing.into(),
            context: RefinementContext::new(
                CompilationConfiguration::new(),
                ScriptSource::new("unit.kts", "val x = 1"),
            ),
        };
        let json = serde_json::to_string(&request).expect("serialize");
        assert!(!json.contains('\n'));

        let parsed: Request = serde_json::from_str(&json).expect("parse");
        match parsed {
            Request::Refine { stage, context } => {
                assert_eq!(stage.stage(), Some(RefinementStage::BeforeParsing));
                assert_eq!(context.script.name, "unit.kts");
            }
            Request::Handshake { .. } => panic!("wrong variant"),
        }
    }

    #[test]
    fn handshake_reply_carries_daemon_health() {
        let response = Response::Handshake {
            result: CallResult::Dying,
        };
        let json = serde_json::to_string(&response).expect("serialize");
        let parsed: Response = serde_json::from_str(&json).expect("parse");
        assert!(matches!(
            parsed,
            Response::Handshake {
                result: CallResult::Dying
            }
        ));
    }
}
