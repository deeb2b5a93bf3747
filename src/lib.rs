//! Script-configuration refinement across a daemon process boundary.
//!
//! A client process asks a long-lived compiler daemon to run
//! script-configuration refinement chains. This crate provides:
//! - `facade`: the remote-callable contract in blocking and suspending
//!   form, with adapters between the two
//! - `refine`: the in-process handler-chain executor the daemon installs
//! - `daemon_ipc`: the newline-delimited JSON loopback transport
//! - `config` / `diagnostics`: the values marshalled across the boundary

pub mod config;
pub mod daemon_ipc;
pub mod diagnostics;
pub mod error;
pub mod facade;
pub mod refine;

pub use config::{
    Annotation, CompilationConfiguration, ConfigKey, RefinementContext, RefinementStage,
    ScriptSource, StageKey,
};
pub use diagnostics::{Diagnostic, ResultWithDiagnostics, Severity, SourceLocation, SourcePosition};
pub use error::{Error, Result, TransportError};
pub use facade::{
    AsyncFacadeWrapper, BlockingFacadeWrapper, CallResult, ConfigurationResult, RefinementFacade,
    RefinementFacadeAsync,
};
pub use refine::{HandlerRegistry, LocalFacade, RefineHandler};
