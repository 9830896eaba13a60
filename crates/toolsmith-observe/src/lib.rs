//! Observability setup for Toolsmith.

pub mod tracing_setup;
