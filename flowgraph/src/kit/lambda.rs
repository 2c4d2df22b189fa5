//! `lambda`: bind values into a board capability.

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::invoke::{BoardCapability, NodeHandler, NodeHandlerContext};
use crate::values::Values;

/// Closes a board over values: every input other than `board` becomes an
/// arg of the returned capability, emitted on the `board` port.
#[derive(Debug, Clone, Copy, Default)]
pub struct LambdaHandler;

#[async_trait]
impl NodeHandler for LambdaHandler {
    async fn invoke(&self, mut inputs: Values, _ctx: NodeHandlerContext) -> Result<Values, HandlerError> {
        let board = inputs
            .remove("board")
            .ok_or_else(|| HandlerError::InvalidInput("lambda needs a `board` input".to_string()))?;
        let capability = BoardCapability::from_value(&board)?.with_args(inputs);
        let mut outputs = Values::new();
        outputs.insert("board".to_string(), capability.to_value());
        Ok(outputs)
    }
}
