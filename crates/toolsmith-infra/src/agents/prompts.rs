//! Prompt templates for the LLM-backed construction agents.
//!
//! Each agent gets a short system prompt fixing its role and a user prompt
//! carrying exactly the job slices it declares as dependencies, followed by
//! the required JSON output shape. Adapted attempts append the adaptation
//! guidance so later retries tighten rather than repeat.

use toolsmith_core::pipeline::ExecutionContext;
use toolsmith_types::agent::AgentType;
use toolsmith_types::job::ConstructionJob;

/// System prompt fixing the agent's role.
pub fn system_prompt(agent: AgentType) -> String {
    let role = match agent {
        AgentType::FunctionPlanner => {
            "You plan the function signatures of a small interactive React tool."
        }
        AgentType::StateDesign => {
            "You design the state model and update logic of a small interactive React tool. \
             You may be shown your previous design; improve it and mark it complete when no \
             further changes are needed."
        }
        AgentType::JsxLayout => {
            "You design the JSX layout of a small interactive React tool, without styling."
        }
        AgentType::TailwindStyling => {
            "You apply Tailwind CSS classes to an existing JSX layout."
        }
        AgentType::ComponentAssembler => {
            "You assemble a complete React function component from the plan, state design, \
             layout and styling. When validation issues are listed, repair every one of them."
        }
        AgentType::CodeValidator => {
            "You validate a React component for structural problems. You report issues; \
             you never rewrite the code."
        }
        AgentType::ToolFinalizer => {
            "You package a finished React component into its final tool description."
        }
    };
    format!("{role} Respond with a single JSON object and nothing else.")
}

/// User prompt carrying the agent's input slices and output shape.
pub fn user_prompt(agent: AgentType, job: &ConstructionJob, ctx: &ExecutionContext) -> String {
    let mut prompt = match agent {
        AgentType::FunctionPlanner => planner_prompt(job),
        AgentType::StateDesign => state_design_prompt(job),
        AgentType::JsxLayout => layout_prompt(job),
        AgentType::TailwindStyling => styling_prompt(job),
        AgentType::ComponentAssembler => assembler_prompt(job),
        AgentType::CodeValidator => validator_prompt(job),
        AgentType::ToolFinalizer => finalizer_prompt(job),
    };

    let guidance = ctx.adaptation.guidance();
    if !guidance.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(guidance);
    }
    prompt
}

fn request_block(job: &ConstructionJob) -> String {
    let request = &job.request;
    let mut block = format!("Tool description: {}\n", request.description);
    if let Some(audience) = &request.target_audience {
        block.push_str(&format!("Audience: {audience}\n"));
    }
    if let Some(industry) = &request.industry {
        block.push_str(&format!("Industry: {industry}\n"));
    }
    if !request.features.is_empty() {
        block.push_str(&format!("Features: {}\n", request.features.join(", ")));
    }
    if let Some(brainstorm) = &request.brainstorm {
        block.push_str(&format!("Ideation notes: {brainstorm}\n"));
    }
    block
}

fn planner_prompt(job: &ConstructionJob) -> String {
    format!(
        "{}\nPlan the pure functions this tool needs.\n\n\
         Output shape:\n\
         {{\"signatures\": [{{\"name\": \"camelCaseName\", \"parameters\": [\"name: type\"], \
         \"returns\": \"type\", \"description\": \"one line\"}}]}}",
        request_block(job)
    )
}

fn state_design_prompt(job: &ConstructionJob) -> String {
    let plan = job
        .function_plan
        .as_ref()
        .map(|p| serde_json::to_string(p).unwrap_or_default())
        .unwrap_or_default();
    let previous = job
        .state_design
        .as_ref()
        .map(|d| {
            format!(
                "\nYour previous design (refine it):\n{}\n",
                serde_json::to_string(d).unwrap_or_default()
            )
        })
        .unwrap_or_default();
    format!(
        "{}\nFunction plan:\n{plan}\n{previous}\n\
         Design the component state and its update logic. Set \"design_complete\" to true \
         only when another pass would change nothing.\n\n\
         Output shape:\n\
         {{\"state_variables\": [{{\"name\": \"...\", \"var_type\": \"...\", \
         \"initial_value\": null, \"description\": \"...\"}}], \
         \"logic_description\": \"...\", \"design_complete\": false}}",
        request_block(job)
    )
}

fn layout_prompt(job: &ConstructionJob) -> String {
    let design = job
        .state_design
        .as_ref()
        .map(|d| serde_json::to_string(d).unwrap_or_default())
        .unwrap_or_default();
    format!(
        "{}\nState design:\n{design}\n\n\
         Produce the unstyled JSX layout.\n\n\
         Output shape:\n{{\"jsx\": \"...\", \"structure_notes\": \"...\"}}",
        request_block(job)
    )
}

fn styling_prompt(job: &ConstructionJob) -> String {
    let jsx = job.layout.as_ref().map(|l| l.jsx.as_str()).unwrap_or("");
    format!(
        "Layout JSX:\n{jsx}\n\n\
         Apply Tailwind classes. Keep the element structure unchanged.\n\n\
         Output shape:\n{{\"styled_jsx\": \"...\", \"color_scheme\": [\"slate\", \"indigo\"]}}"
    )
}

fn assembler_prompt(job: &ConstructionJob) -> String {
    let plan = job
        .function_plan
        .as_ref()
        .map(|p| serde_json::to_string(p).unwrap_or_default())
        .unwrap_or_default();
    let design = job
        .state_design
        .as_ref()
        .map(|d| serde_json::to_string(d).unwrap_or_default())
        .unwrap_or_default();
    let styled = job
        .styling
        .as_ref()
        .map(|s| s.styled_jsx.as_str())
        .unwrap_or("");

    let repair_block = match (&job.assembled, &job.validation) {
        (Some(assembled), Some(report)) if !report.valid => {
            let issues = serde_json::to_string(&report.issues).unwrap_or_default();
            format!(
                "\nPrevious component (repair cycle {}):\n{}\n\
                 Validation issues to fix, all of them:\n{issues}\n",
                job.retry_count(AgentType::CodeValidator) + 1,
                assembled.component_code,
            )
        }
        _ => String::new(),
    };

    format!(
        "{}\nFunction plan:\n{plan}\nState design:\n{design}\nStyled JSX:\n{styled}\n{repair_block}\n\
         Assemble one complete React function component with hooks.\n\n\
         Output shape:\n{{\"component_code\": \"...\"}}",
        request_block(job)
    )
}

fn validator_prompt(job: &ConstructionJob) -> String {
    let code = job
        .assembled
        .as_ref()
        .map(|a| a.component_code.as_str())
        .unwrap_or("");
    format!(
        "Component code:\n{code}\n\n\
         Check syntax, state management, event bindings, accessibility and structure. \
         Set \"valid\" to true only with zero error-severity issues.\n\n\
         Output shape:\n\
         {{\"valid\": false, \"issues\": [{{\"category\": \"syntax|state_management|\
         event_binding|accessibility|structure\", \"severity\": \"error|warning\", \
         \"description\": \"...\", \"code_excerpt\": null}}]}}"
    )
}

fn finalizer_prompt(job: &ConstructionJob) -> String {
    let code = job
        .assembled
        .as_ref()
        .map(|a| a.component_code.as_str())
        .unwrap_or("");
    format!(
        "{}\nValidated component code:\n{code}\n\n\
         Produce the final tool description.\n\n\
         Output shape:\n\
         {{\"title\": \"...\", \"summary\": \"one sentence\", \
         \"component_code\": \"the code, unchanged\", \"metadata\": {{}}}}",
        request_block(job)
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
