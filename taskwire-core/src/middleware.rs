//! `Middleware`: the onion-pipeline wrapper around handler dispatch
//! (spec §4.5), generalized from the teacher's
//! `Interceptor::around(ctx, next)` shape.

use crate::context::TaskContext;
use crate::error::TaskError;
use crate::result::TaskResult;
use async_trait::async_trait;
use std::sync::Arc;

/// The remaining continuation of the middleware chain. Calling
/// `next.run(ctx)` advances to the next layer (spec §4.5 "chain
/// composition"). The bound `TaskEntry` (spec §3) is pushed onto the
/// end of the chain like any other middleware, so running off the end
/// of `remaining` is a no-op: by construction that only happens after
/// the entry itself has already run.
pub struct Next<'a> {
    remaining: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub fn new(remaining: &'a [Arc<dyn Middleware>]) -> Self {
        Self { remaining }
    }

    pub async fn run(self, ctx: &mut TaskContext) -> Result<TaskResult, TaskError> {
        match self.remaining.split_first() {
            Some((mw, rest)) => mw.handle(ctx, Next::new(rest)).await,
            None => Ok(TaskResult::no_content()),
        }
    }
}

/// A pipeline stage that runs before and/or after the rest of the
/// chain (spec §4.5 "Middleware onion/chain pipeline"). Mirrors the
/// teacher's `Interceptor<R, S>::around(ctx, next)`: a middleware that
/// does nothing but `next.run(ctx).await` is a no-op pass-through.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle<'a>(&'a self, ctx: &mut TaskContext, next: Next<'a>) -> Result<TaskResult, TaskError>;
}

/// Run a task through a middleware chain (spec §4.5, §2 data flow
/// step). `chain`'s last element is expected to be the matched
/// `TaskEntry` (spec §4.4): `Application::handle_task` appends it
/// before calling `dispatch`.
pub async fn dispatch(chain: &[Arc<dyn Middleware>], ctx: &mut TaskContext) -> Result<TaskResult, TaskError> {
    Next::new(chain).run(ctx).await
}
