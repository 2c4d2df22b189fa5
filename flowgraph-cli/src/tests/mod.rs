//! Unit tests for flowgraph-cli, organized by module.
//!
//! Each submodule documents the behaviour under test.
