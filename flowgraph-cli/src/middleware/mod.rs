//! Node middleware used by the CLI.

mod logging;

pub use logging::LoggingMiddleware;
