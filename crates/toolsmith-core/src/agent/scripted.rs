//! Deterministic scripted agents.
//!
//! Used by orchestrator tests and by the service's dry-run mode (no provider
//! API key configured). Each agent derives a plausible payload from the job
//! record alone, without any model call.

use toolsmith_types::agent::AgentType;
use toolsmith_types::error::AgentError;
use toolsmith_types::job::{
    AssembledComponent, ConstructionJob, FinalizedTool, FunctionSignature, FunctionSignaturePlan,
    LayoutDesign, StateLogicDesign, StateVariable, StylingSpec, ValidationReport,
};

use super::{AgentOutcome, AgentRegistry, BoxConstructionAgent, ConstructionAgent};
use crate::pipeline::resolver::ExecutionContext;

/// A construction agent that computes its payload locally.
#[derive(Debug, Clone, Copy)]
pub struct ScriptedAgent {
    agent: AgentType,
}

impl ScriptedAgent {
    pub fn new(agent: AgentType) -> Self {
        Self { agent }
    }

    fn function_plan(job: &ConstructionJob) -> FunctionSignaturePlan {
        let mut signatures: Vec<FunctionSignature> = job
            .request
            .features
            .iter()
            .map(|feature| FunctionSignature {
                name: camel_case(feature),
                parameters: vec!["input: number".to_string()],
                returns: "number".to_string(),
                description: format!("Computes the '{feature}' feature"),
            })
            .collect();
        if signatures.is_empty() {
            signatures.push(FunctionSignature {
                name: "computeResult".to_string(),
                parameters: vec!["input: number".to_string()],
                returns: "number".to_string(),
                description: "Computes the tool's primary result".to_string(),
            });
        }
        FunctionSignaturePlan { signatures }
    }

    fn state_design(job: &ConstructionJob) -> StateLogicDesign {
        let state_variables = job
            .function_plan
            .as_ref()
            .map(|plan| {
                plan.signatures
                    .iter()
                    .map(|sig| StateVariable {
                        name: format!("{}Input", sig.name),
                        var_type: "number".to_string(),
                        initial_value: Some(serde_json::json!(0)),
                        description: format!("Input feeding {}", sig.name),
                    })
                    .collect()
            })
            .unwrap_or_default();
        StateLogicDesign {
            state_variables,
            logic_description: format!(
                "Each input drives a recomputation for: {}",
                job.request.description
            ),
            design_complete: true,
        }
    }

    fn layout(job: &ConstructionJob) -> LayoutDesign {
        let inputs = job
            .state_design
            .as_ref()
            .map(|d| d.state_variables.len())
            .unwrap_or(1);
        LayoutDesign {
            jsx: format!(
                "<div><h1>{}</h1>{}</div>",
                job.request.description,
                "<input />".repeat(inputs.max(1))
            ),
            structure_notes: "Single column: heading, inputs, result".to_string(),
        }
    }

    fn styling(job: &ConstructionJob) -> StylingSpec {
        let jsx = job.layout.as_ref().map(|l| l.jsx.as_str()).unwrap_or("");
        StylingSpec {
            styled_jsx: jsx.replace("<div>", "<div className=\"p-6 max-w-md mx-auto\">"),
            color_scheme: vec!["slate".to_string(), "indigo".to_string()],
        }
    }

    fn assembled(job: &ConstructionJob) -> AssembledComponent {
        let styled = job
            .styling
            .as_ref()
            .map(|s| s.styled_jsx.as_str())
            .unwrap_or("");
        AssembledComponent {
            component_code: format!(
                "export default function Tool() {{\n  return ({styled});\n}}\n"
            ),
        }
    }

    fn validation() -> ValidationReport {
        ValidationReport {
            valid: true,
            issues: Vec::new(),
        }
    }

    fn finalized(job: &ConstructionJob) -> FinalizedTool {
        FinalizedTool {
            title: job.request.description.clone(),
            summary: format!(
                "Interactive tool generated from: {}",
                job.request.description
            ),
            component_code: job
                .assembled
                .as_ref()
                .map(|a| a.component_code.clone())
                .unwrap_or_default(),
            metadata: Default::default(),
        }
    }
}

impl ConstructionAgent for ScriptedAgent {
    fn agent_type(&self) -> AgentType {
        self.agent
    }

    async fn execute(
        &self,
        job: &ConstructionJob,
        _ctx: &ExecutionContext,
    ) -> Result<AgentOutcome, AgentError> {
        let outcome = match self.agent {
            AgentType::FunctionPlanner => AgentOutcome::FunctionPlan(Self::function_plan(job)),
            AgentType::StateDesign => AgentOutcome::StateDesign(Self::state_design(job)),
            AgentType::JsxLayout => AgentOutcome::Layout(Self::layout(job)),
            AgentType::TailwindStyling => AgentOutcome::Styling(Self::styling(job)),
            AgentType::ComponentAssembler => AgentOutcome::Assembled(Self::assembled(job)),
            AgentType::CodeValidator => AgentOutcome::Validation(Self::validation()),
            AgentType::ToolFinalizer => AgentOutcome::Finalized(Self::finalized(job)),
        };
        Ok(outcome)
    }
}

/// Build a registry of scripted agents for every agent type.
pub fn scripted_registry() -> AgentRegistry {
    AgentRegistry::build(|agent| BoxConstructionAgent::new(ScriptedAgent::new(agent)))
}

fn camel_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut upper_next = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if out.is_empty() {
                out.extend(ch.to_lowercase());
            } else if upper_next {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
            upper_next = false;
        } else {
            upper_next = true;
        }
    }
    if out.is_empty() {
        "compute".to_string()
    } else {
        out
    }
}
