//! Adapts an async-native implementation to the blocking contract the
//! transport dispatches into.
//!
//! Each call drives the inner future to completion on the calling thread;
//! that thread does no other work until the value is back. This collapses
//! concurrency in exchange for contract compatibility, so install it only
//! where the transport mandates a blocking return.

use super::{CallResult, ConfigurationResult, RefinementFacade, RefinementFacadeAsync};
use crate::{
    config::{RefinementContext, StageKey},
    error::Result,
};

/// Blocking view over an async-native facade implementation.
pub struct BlockingFacadeWrapper<A> {
    inner: A,
}

impl<A> BlockingFacadeWrapper<A>
where
    A: RefinementFacadeAsync,
{
    pub fn new(inner: A) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> A {
        self.inner
    }
}

impl<A> RefinementFacade for BlockingFacadeWrapper<A>
where
    A: RefinementFacadeAsync,
{
    fn refine(&self, stage: StageKey, context: RefinementContext) -> Result<ConfigurationResult> {
        futures::executor::block_on(self.inner.refine(stage, context))
    }
}

impl<A> CallResult<A>
where
    A: RefinementFacadeAsync,
{
    /// Wrap a leased async implementation for the blocking transport.
    /// Health states pass through untouched.
    pub fn into_blocking(self) -> CallResult<BlockingFacadeWrapper<A>> {
        self.map(BlockingFacadeWrapper::new)
    }
}
