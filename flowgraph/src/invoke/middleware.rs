//! Middleware around node handler invocation.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::graph::NodeDescriptor;
use crate::values::Values;

/// Future returned by the wrapped invocation.
pub type InvokeFuture = Pin<Box<dyn Future<Output = Result<Values, HandlerError>> + Send>>;

/// The wrapped invocation: call it with (possibly rewritten) inputs.
pub type InvokeFn = Box<dyn FnOnce(Values) -> InvokeFuture + Send>;

/// Wraps every handler invocation of a run.
///
/// **Interaction**: Attached with `RunController::with_middleware`; the invoker
/// calls `around_invoke` with the node, its inputs and the inner invocation.
/// Implementations may log, time, rewrite inputs or short-circuit.
#[async_trait]
pub trait NodeMiddleware: Send + Sync {
    async fn around_invoke(
        &self,
        node: &NodeDescriptor,
        inputs: Values,
        inner: InvokeFn,
    ) -> Result<Values, HandlerError>;
}
