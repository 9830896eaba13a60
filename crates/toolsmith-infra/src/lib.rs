//! Infrastructure adapters for Toolsmith.
//!
//! Concrete implementations of the core traits: the SQLite job store, the
//! OpenAI-compatible LLM provider, the LLM-backed construction agents, and
//! the configuration loader.

pub mod agents;
pub mod config;
pub mod llm;
pub mod sqlite;
