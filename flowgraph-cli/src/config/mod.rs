//! CLI configuration: environment-backed [`CliConfig`] and command-line
//! [`RunOptions`] overrides.

mod cli_config;
mod run_options;

pub use cli_config::{CliConfig, Error};
pub use run_options::RunOptions;
