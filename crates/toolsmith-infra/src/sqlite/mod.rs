//! SQLite persistence.

pub mod job;
pub mod pool;

pub use job::SqliteJobRepository;
pub use pool::DatabasePool;
