//! Adapts a blocking facade handle to the suspending calling convention.
//!
//! The remote call occupies a thread for its full duration, so each call is
//! moved onto the runtime's blocking-capable pool and the caller's logical
//! task suspends until the reply is back. The cooperative workers stay
//! free. No retries and no timeouts here; those belong to the transport.

use std::sync::Arc;

use super::{CallResult, ConfigurationResult, RefinementFacade, RefinementFacadeAsync};
use crate::{
    config::{RefinementContext, StageKey},
    error::{Error, Result, TransportError},
};

/// Suspending view over a blocking facade handle.
///
/// A 1:1 pass-through: the wrapped handle does all the work, one call at a
/// time per caller, so no concurrency control lives here.
pub struct AsyncFacadeWrapper<S> {
    inner: Arc<S>,
}

impl<S> AsyncFacadeWrapper<S>
where
    S: RefinementFacade + Send + Sync + 'static,
{
    pub fn new(inner: S) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn from_arc(inner: Arc<S>) -> Self {
        Self { inner }
    }
}

impl<S> Clone for AsyncFacadeWrapper<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> RefinementFacadeAsync for AsyncFacadeWrapper<S>
where
    S: RefinementFacade + Send + Sync + 'static,
{
    async fn refine(
        &self,
        stage: StageKey,
        context: RefinementContext,
    ) -> Result<ConfigurationResult> {
        let inner = Arc::clone(&self.inner);
        match tokio::task::spawn_blocking(move || inner.refine(stage, context)).await {
            Ok(result) => result,
            Err(e) => Err(Error::Transport(TransportError::RemoteFault(format!(
                "refine call aborted: {e}"
            )))),
        }
    }
}

impl<S> CallResult<S>
where
    S: RefinementFacade + Send + Sync + 'static,
{
    /// Wrap a leased facade for suspending callers. Health states pass
    /// through untouched.
    pub fn into_async(self) -> CallResult<AsyncFacadeWrapper<S>> {
        self.map(AsyncFacadeWrapper::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{CompilationConfiguration, ConfigKey, RefinementStage, ScriptSource},
        diagnostics::{Diagnostic, ResultWithDiagnostics},
        facade::BlockingFacadeWrapper,
    };

    const STAGE_SEEN: ConfigKey<String> = ConfigKey::new("test.stage");

    /// Records which stage it saw into the configuration; fails for the
    /// script named "bad".
    struct EchoFacade;

    impl RefinementFacade for EchoFacade {
        fn refine(
            &self,
            stage: StageKey,
            context: RefinementContext,
        ) -> Result<ConfigurationResult> {
            if context.script.name == "bad" {
                return Ok(ResultWithDiagnostics::failure(Diagnostic::error(
                    "bad script unit",
                )));
            }
            let mut config = context.configuration;
            config.set(STAGE_SEEN, stage.as_str().to_string())?;
            Ok(ResultWithDiagnostics::success(config))
        }
    }

    fn context(name: &str) -> RefinementContext {
        RefinementContext::new(
            CompilationConfiguration::new(),
            ScriptSource::new(name, "val x = 1"),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn wrapper_forwards_call_and_result() {
        let wrapper = AsyncFacadeWrapper::new(EchoFacade);
        let result = wrapper
            .refine_on_annotations(context("unit"))
            .await
            .expect("transport");
        let config = result.into_value().expect("success");
        assert_eq!(config.get(STAGE_SEEN), Some("onAnnotations".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn wrapper_passes_refinement_failure_through() {
        let wrapper = AsyncFacadeWrapper::new(EchoFacade);
        let result = wrapper
            .refine_before_parsing(context("bad"))
            .await
            .expect("transport");
        assert!(result.is_failure());
        assert_eq!(result.reports()[0].message, "bad script unit");
    }

    /// Wrapping async-over-blocking back into a blocking facade yields the
    /// same outcome as calling the unwrapped facade directly.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn double_wrap_matches_direct_call() {
        for stage in RefinementStage::ALL {
            let expected = EchoFacade
                .refine(stage.into(), context("unit"))
                .expect("direct");

            let rewrapped = BlockingFacadeWrapper::new(AsyncFacadeWrapper::new(EchoFacade));
            let actual = tokio::task::spawn_blocking(move || {
                rewrapped.refine(stage.into(), context("unit"))
            })
            .await
            .expect("join")
            .expect("transport");

            assert_eq!(expected, actual);
        }
    }

    #[test]
    fn call_result_conversion_wraps_good_only() {
        assert!(CallResult::Good(EchoFacade).into_async().is_good());
        assert!(matches!(
            CallResult::<EchoFacade>::Dying.into_async(),
            CallResult::Dying
        ));
        assert!(matches!(
            CallResult::<EchoFacade>::Ok.into_async(),
            CallResult::Ok
        ));
        let error = CallResult::<EchoFacade>::Error("stopping".into()).into_async();
        assert!(matches!(error, CallResult::Error(message) if message == "stopping"));
    }
}
