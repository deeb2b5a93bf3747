//! The remote-callable refinement contract and its calling-convention
//! adapters.
//!
//! The transport delivers calls blocking: one call, one thread, one reply.
//! [`RefinementFacade`] is that contract. [`RefinementFacadeAsync`] is the
//! same contract for cooperative callers; the two wrappers adapt between
//! them in either direction without changing what travels over the wire.

mod async_wrapper;
mod blocking_wrapper;

pub use async_wrapper::AsyncFacadeWrapper;
pub use blocking_wrapper::BlockingFacadeWrapper;
use serde::{Deserialize, Serialize};

use crate::{
    config::{CompilationConfiguration, RefinementContext, RefinementStage, StageKey},
    diagnostics::ResultWithDiagnostics,
    error::Result,
};

/// What a refinement call produces: a new configuration, or a failure with
/// diagnostics. Transport faults live in the surrounding [`Result`].
pub type ConfigurationResult = ResultWithDiagnostics<CompilationConfiguration>;

/// Blocking form of the contract, as the loopback transport dispatches it.
///
/// `refine` is the single wire operation; the per-stage methods are
/// conveniences that dispatch through it. A stage key the implementation
/// does not recognize yields a `Failure` value, never an `Err`.
pub trait RefinementFacade {
    fn refine(&self, stage: StageKey, context: RefinementContext) -> Result<ConfigurationResult>;

    fn refine_before_parsing(&self, context: RefinementContext) -> Result<ConfigurationResult> {
        self.refine(RefinementStage::BeforeParsing.into(), context)
    }

    fn refine_on_annotations(&self, context: RefinementContext) -> Result<ConfigurationResult> {
        self.refine(RefinementStage::OnAnnotations.into(), context)
    }

    fn refine_before_compiling(&self, context: RefinementContext) -> Result<ConfigurationResult> {
        self.refine(RefinementStage::BeforeCompiling.into(), context)
    }
}

/// Suspending form of the same contract for cooperative callers.
#[allow(async_fn_in_trait)]
pub trait RefinementFacadeAsync {
    async fn refine(
        &self,
        stage: StageKey,
        context: RefinementContext,
    ) -> Result<ConfigurationResult>;

    async fn refine_before_parsing(
        &self,
        context: RefinementContext,
    ) -> Result<ConfigurationResult> {
        self.refine(RefinementStage::BeforeParsing.into(), context).await
    }

    async fn refine_on_annotations(
        &self,
        context: RefinementContext,
    ) -> Result<ConfigurationResult> {
        self.refine(RefinementStage::OnAnnotations.into(), context).await
    }

    async fn refine_before_compiling(
        &self,
        context: RefinementContext,
    ) -> Result<ConfigurationResult> {
        self.refine(RefinementStage::BeforeCompiling.into(), context).await
    }
}

/// Outcome of a daemon call, independent of the payload being returned.
///
/// `Dying` and `Error` carry daemon health out to callers; they pass
/// through payload adaptations unchanged so a wrapper never hides the
/// daemon's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallResult<T> {
    /// The call completed and produced a value.
    Good(T),
    /// The call completed with nothing to return.
    Ok,
    /// The daemon is shutting down and takes no new work.
    Dying,
    /// The daemon reported a failure performing the call.
    Error(String),
}

impl<T> CallResult<T> {
    /// Transform the `Good` payload; the other variants pass through.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CallResult<U> {
        match self {
            Self::Good(value) => CallResult::Good(f(value)),
            Self::Ok => CallResult::Ok,
            Self::Dying => CallResult::Dying,
            Self::Error(message) => CallResult::Error(message),
        }
    }

    pub const fn is_good(&self) -> bool {
        matches!(self, Self::Good(_))
    }

    pub fn good(self) -> Option<T> {
        match self {
            Self::Good(value) => Some(value),
            _ => None,
        }
    }
}
