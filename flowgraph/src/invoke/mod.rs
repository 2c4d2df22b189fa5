//! Node handlers, the handler registry and the invoker.
//!
//! The registry maps a node `type` to a [`NodeHandler`] and is read-only once
//! built. [`NodeInvoker`] resolves the handler for a node, runs it through any
//! middleware and converts a failure into `$error` outputs; it never touches
//! run state.

mod capability;
mod context;
mod middleware;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::graph::logging::log_handler_error;
use crate::graph::{GraphDescriptor, StructuralError};
use crate::values::{error_outputs, Values};

pub use capability::{inline_board_references, resolve_path, BoardCapability, BOARD_KIND};
pub(crate) use context::handler_channel;
pub use context::{HandlerRequest, InputRequester, NodeHandlerContext, OutputProvider};
pub use middleware::{InvokeFn, InvokeFuture, NodeMiddleware};

/// Node type that suspends the run until the caller supplies its outputs.
pub const INPUT_TYPE: &str = "input";

/// Node type that delivers its inputs to the caller.
pub const OUTPUT_TYPE: &str = "output";

/// Handler for one node type.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    async fn invoke(&self, inputs: Values, ctx: NodeHandlerContext) -> Result<Values, HandlerError>;
}

struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> NodeHandler for FnHandler<F>
where
    F: Fn(Values, NodeHandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Values, HandlerError>> + Send + 'static,
{
    async fn invoke(&self, inputs: Values, ctx: NodeHandlerContext) -> Result<Values, HandlerError> {
        (self.f)(inputs, ctx).await
    }
}

/// Wraps an async closure as a handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn NodeHandler>
where
    F: Fn(Values, NodeHandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Values, HandlerError>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

/// Node type → handler. `input` and `output` are handled by the run itself
/// and are always accepted.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn NodeHandler>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&String> = self.handlers.keys().collect();
        types.sort();
        f.debug_struct("HandlerRegistry").field("types", &types).finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `node_type` (builder style). A later
    /// registration for the same type replaces the earlier one.
    pub fn with_handler(mut self, node_type: impl Into<String>, handler: Arc<dyn NodeHandler>) -> Self {
        self.register(node_type, handler);
        self
    }

    pub fn register(&mut self, node_type: impl Into<String>, handler: Arc<dyn NodeHandler>) -> &mut Self {
        self.handlers.insert(node_type.into(), handler);
        self
    }

    /// Adds the built-in `invoke`, `map`, `lambda` and `passthrough` handlers.
    pub fn with_core_kit(mut self) -> Self {
        for (node_type, handler) in crate::kit::core_kit() {
            self.register(node_type, handler);
        }
        self
    }

    pub fn get(&self, node_type: &str) -> Option<Arc<dyn NodeHandler>> {
        self.handlers.get(node_type).cloned()
    }

    pub fn contains(&self, node_type: &str) -> bool {
        node_type == INPUT_TYPE || node_type == OUTPUT_TYPE || self.handlers.contains_key(node_type)
    }

    /// Checks that every node of `graph` and of its named subgraphs has a handler.
    pub fn validate(&self, graph: &GraphDescriptor) -> Result<(), StructuralError> {
        for node in &graph.nodes {
            if !self.contains(&node.node_type) {
                return Err(StructuralError::UnknownNodeType {
                    node_id: node.id.clone(),
                    node_type: node.node_type.clone(),
                });
            }
        }
        for subgraph in graph.graphs.values() {
            self.validate(subgraph)?;
        }
        Ok(())
    }
}

/// Resolves and calls node handlers.
#[derive(Clone)]
pub struct NodeInvoker {
    registry: Arc<HandlerRegistry>,
    middleware: Option<Arc<dyn NodeMiddleware>>,
}

impl NodeInvoker {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            middleware: None,
        }
    }

    pub fn with_middleware(mut self, middleware: Arc<dyn NodeMiddleware>) -> Self {
        self.middleware = Some(middleware);
        self
    }

    /// Invokes the handler of `ctx.descriptor` with `inputs`.
    ///
    /// A failure (unknown type, bad capability, handler error) comes back as
    /// `$error` outputs carrying the error message.
    pub async fn invoke(&self, inputs: Values, ctx: NodeHandlerContext) -> Values {
        let node_id = ctx.descriptor.id.clone();
        match self.try_invoke(inputs, ctx).await {
            Ok(outputs) => outputs,
            Err(e) => {
                let message = e.to_string();
                log_handler_error(&node_id, &message);
                error_outputs(message)
            }
        }
    }

    async fn try_invoke(&self, inputs: Values, ctx: NodeHandlerContext) -> Result<Values, HandlerError> {
        let handler = self.registry.get(&ctx.descriptor.node_type).ok_or_else(|| {
            StructuralError::UnknownNodeType {
                node_id: ctx.descriptor.id.clone(),
                node_type: ctx.descriptor.node_type.clone(),
            }
        })?;
        let inputs = inline_board_references(&inputs, &ctx.graph)?;
        match &self.middleware {
            Some(middleware) => {
                let descriptor = ctx.descriptor.clone();
                let inner: InvokeFn = Box::new(move |inputs| {
                    Box::pin(async move { handler.invoke(inputs, ctx).await }) as InvokeFuture
                });
                middleware.around_invoke(&descriptor, inputs, inner).await
            }
            None => handler.invoke(inputs, ctx).await,
        }
    }
}
