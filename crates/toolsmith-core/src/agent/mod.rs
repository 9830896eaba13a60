//! The construction-agent contract and dispatch registry.
//!
//! Agents are opaque collaborators: each consumes the slice of the job
//! record it declares as dependencies plus an execution context, and returns
//! a typed outcome. Agents never trigger other agents and never make
//! orchestration decisions.
//!
//! Dispatch is a closed table keyed by [`AgentType`]: [`AgentRegistry::build`]
//! takes a factory that is called once per enum variant, so adding an agent
//! is a compile-time-checked addition rather than a string match.

pub mod scripted;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::json;
use toolsmith_types::agent::AgentType;
use toolsmith_types::error::AgentError;
use toolsmith_types::job::{
    AssembledComponent, ConstructionJob, FinalizedTool, FunctionSignaturePlan, LayoutDesign,
    StateLogicDesign, StylingSpec, ValidationReport,
};

use crate::pipeline::resolver::ExecutionContext;

// ---------------------------------------------------------------------------
// AgentOutcome
// ---------------------------------------------------------------------------

/// Typed result of one agent invocation; each variant is the payload its
/// agent attaches to the job record.
#[derive(Debug, Clone)]
pub enum AgentOutcome {
    FunctionPlan(FunctionSignaturePlan),
    StateDesign(StateLogicDesign),
    Layout(LayoutDesign),
    Styling(StylingSpec),
    Assembled(AssembledComponent),
    Validation(ValidationReport),
    Finalized(FinalizedTool),
}

impl AgentOutcome {
    /// The agent this outcome belongs to.
    pub fn agent(&self) -> AgentType {
        match self {
            AgentOutcome::FunctionPlan(_) => AgentType::FunctionPlanner,
            AgentOutcome::StateDesign(_) => AgentType::StateDesign,
            AgentOutcome::Layout(_) => AgentType::JsxLayout,
            AgentOutcome::Styling(_) => AgentType::TailwindStyling,
            AgentOutcome::Assembled(_) => AgentType::ComponentAssembler,
            AgentOutcome::Validation(_) => AgentType::CodeValidator,
            AgentOutcome::Finalized(_) => AgentType::ToolFinalizer,
        }
    }

    /// Attach this outcome's payload to the job record.
    pub fn apply_to(self, job: &mut ConstructionJob) {
        match self {
            AgentOutcome::FunctionPlan(p) => job.function_plan = Some(p),
            AgentOutcome::StateDesign(p) => job.state_design = Some(p),
            AgentOutcome::Layout(p) => job.layout = Some(p),
            AgentOutcome::Styling(p) => job.styling = Some(p),
            AgentOutcome::Assembled(p) => job.assembled = Some(p),
            AgentOutcome::Validation(p) => job.validation = Some(p),
            AgentOutcome::Finalized(p) => job.finalized = Some(p),
        }
    }

    /// Compact summary for progress events and logging.
    pub fn summary(&self) -> serde_json::Value {
        match self {
            AgentOutcome::FunctionPlan(p) => json!({ "signatures": p.signatures.len() }),
            AgentOutcome::StateDesign(p) => json!({
                "state_variables": p.state_variables.len(),
                "design_complete": p.design_complete,
            }),
            AgentOutcome::Layout(p) => json!({ "jsx_bytes": p.jsx.len() }),
            AgentOutcome::Styling(p) => json!({ "colors": p.color_scheme.len() }),
            AgentOutcome::Assembled(p) => json!({ "component_bytes": p.component_code.len() }),
            AgentOutcome::Validation(p) => json!({
                "valid": p.valid,
                "issues": p.issues.len(),
            }),
            AgentOutcome::Finalized(p) => json!({ "title": p.title }),
        }
    }
}

// ---------------------------------------------------------------------------
// ConstructionAgent trait
// ---------------------------------------------------------------------------

/// One unit of construction work.
///
/// Uses native async fn in traits (RPITIT); for dynamic dispatch inside the
/// registry, implementations are wrapped in [`BoxConstructionAgent`].
pub trait ConstructionAgent: Send + Sync {
    /// The agent identity this implementation fulfils.
    fn agent_type(&self) -> AgentType;

    /// Execute against the current job record.
    fn execute(
        &self,
        job: &ConstructionJob,
        ctx: &ExecutionContext,
    ) -> impl std::future::Future<Output = Result<AgentOutcome, AgentError>> + Send;
}

// ---------------------------------------------------------------------------
// Object-safe wrapper
// ---------------------------------------------------------------------------

/// Object-safe version of [`ConstructionAgent`] with boxed futures.
///
/// Exists solely to enable dynamic dispatch; a blanket implementation covers
/// every `ConstructionAgent`.
pub trait ConstructionAgentDyn: Send + Sync {
    fn agent_type(&self) -> AgentType;

    fn execute_boxed<'a>(
        &'a self,
        job: &'a ConstructionJob,
        ctx: &'a ExecutionContext,
    ) -> Pin<Box<dyn Future<Output = Result<AgentOutcome, AgentError>> + Send + 'a>>;
}

impl<T: ConstructionAgent> ConstructionAgentDyn for T {
    fn agent_type(&self) -> AgentType {
        ConstructionAgent::agent_type(self)
    }

    fn execute_boxed<'a>(
        &'a self,
        job: &'a ConstructionJob,
        ctx: &'a ExecutionContext,
    ) -> Pin<Box<dyn Future<Output = Result<AgentOutcome, AgentError>> + Send + 'a>> {
        Box::pin(self.execute(job, ctx))
    }
}

/// Type-erased construction agent.
pub struct BoxConstructionAgent {
    inner: Box<dyn ConstructionAgentDyn>,
}

impl BoxConstructionAgent {
    /// Wrap a concrete agent in a type-erased box.
    pub fn new<T: ConstructionAgent + 'static>(agent: T) -> Self {
        Self {
            inner: Box::new(agent),
        }
    }

    pub fn agent_type(&self) -> AgentType {
        self.inner.agent_type()
    }

    pub async fn execute(
        &self,
        job: &ConstructionJob,
        ctx: &ExecutionContext,
    ) -> Result<AgentOutcome, AgentError> {
        self.inner.execute_boxed(job, ctx).await
    }
}

impl std::fmt::Debug for BoxConstructionAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxConstructionAgent")
            .field("agent_type", &self.inner.agent_type())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AgentRegistry
// ---------------------------------------------------------------------------

/// Closed dispatch table over the seven agents.
#[derive(Debug)]
pub struct AgentRegistry {
    agents: HashMap<AgentType, BoxConstructionAgent>,
}

impl AgentRegistry {
    /// Build a registry by calling `factory` once for every [`AgentType`]
    /// variant, guaranteeing full coverage.
    pub fn build<F>(mut factory: F) -> Self
    where
        F: FnMut(AgentType) -> BoxConstructionAgent,
    {
        let agents = AgentType::ALL
            .into_iter()
            .map(|agent| (agent, factory(agent)))
            .collect();
        Self { agents }
    }

    /// Look up the implementation for an agent.
    pub fn get(&self, agent: AgentType) -> &BoxConstructionAgent {
        // `build` iterates AgentType::ALL, so every variant is present.
        self.agents
            .get(&agent)
            .expect("registry is built over every AgentType")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::scripted::ScriptedAgent;
    use super::*;

    #[test]
    fn test_outcome_agent_mapping() {
        let outcome = AgentOutcome::Validation(ValidationReport {
            valid: true,
            issues: Vec::new(),
        });
        assert_eq!(outcome.agent(), AgentType::CodeValidator);
    }

    #[test]
    fn test_registry_covers_every_agent() {
        let registry = AgentRegistry::build(|agent| BoxConstructionAgent::new(ScriptedAgent::new(agent)));
        for agent in AgentType::ALL {
            assert_eq!(registry.get(agent).agent_type(), agent);
        }
    }

    #[test]
    fn test_summary_shapes() {
        let outcome = AgentOutcome::FunctionPlan(FunctionSignaturePlan {
            signatures: Vec::new(),
        });
        assert_eq!(outcome.summary()["signatures"], 0);

        let outcome = AgentOutcome::Finalized(FinalizedTool {
            title: "ROI Calculator".to_string(),
            summary: String::new(),
            component_code: String::new(),
            metadata: Default::default(),
        });
        assert_eq!(outcome.summary()["title"], "ROI Calculator");
    }
}
