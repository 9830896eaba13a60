//! The tool-construction pipeline.
//!
//! Layered bottom-up: the job record lifecycle helpers, the model resolver,
//! the agent invoker (one step, no retry), the retry controller (bounded,
//! adapting), the two sub-loops (design refinement and validate-then-fix),
//! the orchestrator driver, and the job manager that supervises background
//! construction tasks.

pub mod invoker;
pub mod manager;
pub mod orchestrator;
pub mod record;
pub mod refine;
pub mod repair;
pub mod resolver;
pub mod retry;

pub use invoker::AgentInvoker;
pub use manager::JobManager;
pub use orchestrator::{Orchestrator, PipelineError};
pub use record::{JobRecordExt, new_job};
pub use refine::{RefinementLoop, StabilityCheck};
pub use repair::RepairLoop;
pub use resolver::{ExecutionContext, ModelResolver, PolicyTable};
pub use retry::RetryController;
