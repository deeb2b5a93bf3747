//! In-process execution of refinement handler chains.
//!
//! The daemon installs a [`LocalFacade`] behind the transport dispatcher.
//! Handlers are registered per stage before the daemon starts serving;
//! refinement reads take no lock.

use std::{collections::HashMap, sync::Arc};

use crate::{
    config::{CompilationConfiguration, RefinementContext, RefinementStage, StageKey},
    diagnostics::{Diagnostic, ResultWithDiagnostics},
    error::Result,
    facade::{ConfigurationResult, RefinementFacade},
};

/// One refinement step in a stage's chain.
///
/// Receives the configuration produced by the previous step and the context
/// as handed to the call; returns the next configuration or a failure.
pub trait RefineHandler: Send + Sync {
    fn refine(
        &self,
        current: &CompilationConfiguration,
        context: &RefinementContext,
    ) -> ConfigurationResult;
}

impl<F> RefineHandler for F
where
    F: Fn(&CompilationConfiguration, &RefinementContext) -> ConfigurationResult + Send + Sync,
{
    fn refine(
        &self,
        current: &CompilationConfiguration,
        context: &RefinementContext,
    ) -> ConfigurationResult {
        self(current, context)
    }
}

/// Ordered handler chains per stage.
///
/// Registration happens before any refinement call; afterwards the registry
/// is shared read-only between concurrent calls.
#[derive(Default)]
pub struct HandlerRegistry {
    chains: HashMap<RefinementStage, Vec<Arc<dyn RefineHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to the stage's chain. Chains run in registration
    /// order.
    pub fn register<H>(&mut self, stage: RefinementStage, handler: H)
    where
        H: RefineHandler + 'static,
    {
        self.register_arc(stage, Arc::new(handler));
    }

    pub fn register_arc(&mut self, stage: RefinementStage, handler: Arc<dyn RefineHandler>) {
        self.chains.entry(stage).or_default().push(handler);
    }

    pub fn handlers_for(&self, stage: RefinementStage) -> &[Arc<dyn RefineHandler>] {
        match self.chains.get(&stage) {
            Some(chain) => chain,
            None => &[],
        }
    }

    pub fn chain_len(&self, stage: RefinementStage) -> usize {
        self.handlers_for(stage).len()
    }
}

/// Fold the stage's handler chain over the configuration, left to right.
///
/// Each success threads its configuration to the next handler and keeps its
/// reports. The first failure stops the chain and is returned exactly as
/// the failing handler produced it; later handlers are not invoked. An
/// empty chain succeeds with the input configuration unchanged.
pub fn refine_all(
    registry: &HandlerRegistry,
    stage: RefinementStage,
    context: &RefinementContext,
) -> ConfigurationResult {
    let chain = registry.handlers_for(stage);
    tracing::debug!("running {} handlers for {stage}", chain.len());

    let mut current = context.configuration.clone();
    let mut reports = Vec::new();
    for handler in chain {
        match handler.refine(&current, context) {
            ResultWithDiagnostics::Success {
                value,
                reports: mut step_reports,
            } => {
                reports.append(&mut step_reports);
                current = value;
            }
            failure @ ResultWithDiagnostics::Failure { .. } => return failure,
        }
    }
    ResultWithDiagnostics::success_with(current, reports)
}

/// Executes refinement chains in-process.
///
/// This is the implementation the daemon registers with the transport
/// dispatcher; it also works standalone for embedders that skip the
/// process boundary.
pub struct LocalFacade {
    registry: Arc<HandlerRegistry>,
}

impl LocalFacade {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }
}

impl RefinementFacade for LocalFacade {
    fn refine(&self, stage: StageKey, context: RefinementContext) -> Result<ConfigurationResult> {
        let Some(stage) = stage.stage() else {
            return Ok(ResultWithDiagnostics::failure(Diagnostic::error(format!(
                "unknown refinement stage `{stage}`; known stages: beforeParsing, onAnnotations, beforeCompiling"
            ))));
        };
        Ok(refine_all(&self.registry, stage, &context))
    }
}
