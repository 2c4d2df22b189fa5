//! Built-in node types.
//!
//! - `passthrough`: returns its inputs.
//! - `invoke`: runs a board capability (`board`) or named subgraph (`path`) once.
//! - `map`: runs a board for every element of `list`, concurrently, keeping order.
//! - `lambda`: binds its other inputs into a board capability as `args`.
//!
//! Register them with [`HandlerRegistry::with_core_kit`](crate::invoke::HandlerRegistry::with_core_kit).

mod invoke;
mod lambda;
mod map;
mod passthrough;

use std::sync::Arc;

use crate::invoke::NodeHandler;

pub use invoke::InvokeHandler;
pub use lambda::LambdaHandler;
pub use map::MapHandler;
pub use passthrough::PassthroughHandler;

pub const INVOKE_TYPE: &str = "invoke";
pub const MAP_TYPE: &str = "map";
pub const LAMBDA_TYPE: &str = "lambda";
pub const PASSTHROUGH_TYPE: &str = "passthrough";

/// The built-in handlers keyed by node type.
pub fn core_kit() -> Vec<(&'static str, Arc<dyn NodeHandler>)> {
    vec![
        (INVOKE_TYPE, Arc::new(InvokeHandler) as Arc<dyn NodeHandler>),
        (MAP_TYPE, Arc::new(MapHandler)),
        (LAMBDA_TYPE, Arc::new(LambdaHandler)),
        (PASSTHROUGH_TYPE, Arc::new(PassthroughHandler)),
    ]
}
