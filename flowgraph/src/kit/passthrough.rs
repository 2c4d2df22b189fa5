use async_trait::async_trait;

use crate::error::HandlerError;
use crate::invoke::{NodeHandler, NodeHandlerContext};
use crate::values::Values;

/// Returns its inputs unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughHandler;

#[async_trait]
impl NodeHandler for PassthroughHandler {
    async fn invoke(&self, inputs: Values, _ctx: NodeHandlerContext) -> Result<Values, HandlerError> {
        Ok(inputs)
    }
}
