//! Shared definitions for the integration tests.

pub mod grammars;
