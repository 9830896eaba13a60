//! The closed agent and pipeline-step enums.
//!
//! The seven construction agents and their seven pipeline steps form a fixed
//! sequence. Dispatch is keyed by these enums so that adding an agent is a
//! compile-time-checked change, never a string match.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AgentType
// ---------------------------------------------------------------------------

/// The seven construction agents, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentType {
    FunctionPlanner,
    StateDesign,
    JsxLayout,
    TailwindStyling,
    ComponentAssembler,
    CodeValidator,
    ToolFinalizer,
}

impl AgentType {
    /// All agents in execution order.
    pub const ALL: [AgentType; 7] = [
        AgentType::FunctionPlanner,
        AgentType::StateDesign,
        AgentType::JsxLayout,
        AgentType::TailwindStyling,
        AgentType::ComponentAssembler,
        AgentType::CodeValidator,
        AgentType::ToolFinalizer,
    ];

    /// The pipeline step this agent owns.
    pub fn step(self) -> PipelineStep {
        match self {
            AgentType::FunctionPlanner => PipelineStep::PlanningFunctionSignatures,
            AgentType::StateDesign => PipelineStep::DesigningStateLogic,
            AgentType::JsxLayout => PipelineStep::DesigningJsxLayout,
            AgentType::TailwindStyling => PipelineStep::ApplyingTailwindStyling,
            AgentType::ComponentAssembler => PipelineStep::AssemblingComponent,
            AgentType::CodeValidator => PipelineStep::ValidatingCode,
            AgentType::ToolFinalizer => PipelineStep::FinalizingTool,
        }
    }

    /// Steps whose payloads must be present on the job record before this
    /// agent may run. Invoking an agent with a missing dependency is a
    /// contract violation, not a retryable condition.
    pub fn required_payloads(self) -> &'static [PipelineStep] {
        match self {
            AgentType::FunctionPlanner => &[],
            AgentType::StateDesign => &[PipelineStep::PlanningFunctionSignatures],
            AgentType::JsxLayout => &[PipelineStep::DesigningStateLogic],
            AgentType::TailwindStyling => &[PipelineStep::DesigningJsxLayout],
            AgentType::ComponentAssembler => &[
                PipelineStep::PlanningFunctionSignatures,
                PipelineStep::DesigningStateLogic,
                PipelineStep::DesigningJsxLayout,
                PipelineStep::ApplyingTailwindStyling,
            ],
            AgentType::CodeValidator => &[PipelineStep::AssemblingComponent],
            AgentType::ToolFinalizer => &[
                PipelineStep::AssemblingComponent,
                PipelineStep::ValidatingCode,
            ],
        }
    }

    /// Stable kebab-case identifier (matches the serde representation).
    pub fn as_str(self) -> &'static str {
        match self {
            AgentType::FunctionPlanner => "function-planner",
            AgentType::StateDesign => "state-design",
            AgentType::JsxLayout => "jsx-layout",
            AgentType::TailwindStyling => "tailwind-styling",
            AgentType::ComponentAssembler => "component-assembler",
            AgentType::CodeValidator => "code-validator",
            AgentType::ToolFinalizer => "tool-finalizer",
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentType::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown agent type: '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// PipelineStep
// ---------------------------------------------------------------------------

/// The seven pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    PlanningFunctionSignatures,
    DesigningStateLogic,
    DesigningJsxLayout,
    ApplyingTailwindStyling,
    AssemblingComponent,
    ValidatingCode,
    FinalizingTool,
}

impl PipelineStep {
    /// The fixed execution sequence.
    pub const SEQUENCE: [PipelineStep; 7] = [
        PipelineStep::PlanningFunctionSignatures,
        PipelineStep::DesigningStateLogic,
        PipelineStep::DesigningJsxLayout,
        PipelineStep::ApplyingTailwindStyling,
        PipelineStep::AssemblingComponent,
        PipelineStep::ValidatingCode,
        PipelineStep::FinalizingTool,
    ];

    /// The agent that owns this step.
    pub fn agent(self) -> AgentType {
        match self {
            PipelineStep::PlanningFunctionSignatures => AgentType::FunctionPlanner,
            PipelineStep::DesigningStateLogic => AgentType::StateDesign,
            PipelineStep::DesigningJsxLayout => AgentType::JsxLayout,
            PipelineStep::ApplyingTailwindStyling => AgentType::TailwindStyling,
            PipelineStep::AssemblingComponent => AgentType::ComponentAssembler,
            PipelineStep::ValidatingCode => AgentType::CodeValidator,
            PipelineStep::FinalizingTool => AgentType::ToolFinalizer,
        }
    }

    /// 0-based position within the fixed sequence.
    pub fn position(self) -> usize {
        Self::SEQUENCE
            .iter()
            .position(|s| *s == self)
            .unwrap_or_default()
    }

    /// Human-readable label, used only for observability.
    pub fn display_name(self) -> &'static str {
        match self {
            PipelineStep::PlanningFunctionSignatures => "Planning function signatures",
            PipelineStep::DesigningStateLogic => "Designing state logic",
            PipelineStep::DesigningJsxLayout => "Designing JSX layout",
            PipelineStep::ApplyingTailwindStyling => "Applying Tailwind styling",
            PipelineStep::AssemblingComponent => "Assembling component",
            PipelineStep::ValidatingCode => "Validating code",
            PipelineStep::FinalizingTool => "Finalizing tool",
        }
    }

    /// Stable snake_case identifier (matches the serde representation).
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStep::PlanningFunctionSignatures => "planning_function_signatures",
            PipelineStep::DesigningStateLogic => "designing_state_logic",
            PipelineStep::DesigningJsxLayout => "designing_jsx_layout",
            PipelineStep::ApplyingTailwindStyling => "applying_tailwind_styling",
            PipelineStep::AssemblingComponent => "assembling_component",
            PipelineStep::ValidatingCode => "validating_code",
            PipelineStep::FinalizingTool => "finalizing_tool",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SEQUENCE
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| format!("unknown pipeline step: '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
