//! LLM-backed construction agents.
//!
//! Each of the seven agents is an [`LlmConstructionAgent`] sharing one
//! provider: it renders its prompt from the job record, requests a
//! completion, and parses the JSON reply into its typed payload. Parsing
//! failures surface as `MalformedOutput`, which the retry controller treats
//! as transient.

pub mod llm_agent;
pub mod prompts;

use std::sync::Arc;

use toolsmith_core::agent::{AgentOutcome, AgentRegistry, BoxConstructionAgent};
use toolsmith_core::llm::LlmProvider;
use toolsmith_types::agent::AgentType;
use toolsmith_types::error::AgentError;

pub use llm_agent::LlmConstructionAgent;

/// Build the full agent registry over one shared provider.
pub fn build_registry<P: LlmProvider + 'static>(provider: Arc<P>) -> AgentRegistry {
    AgentRegistry::build(|agent| {
        BoxConstructionAgent::new(LlmConstructionAgent::new(agent, Arc::clone(&provider)))
    })
}

/// Extract the JSON object from a model reply.
///
/// Accepts a bare object, or one wrapped in a fenced code block, or
/// surrounded by prose; the outermost `{...}` span is taken.
pub fn extract_json(text: &str) -> Result<&str, AgentError> {
    let start = text
        .find('{')
        .ok_or_else(|| AgentError::MalformedOutput("no JSON object in reply".to_string()))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| AgentError::MalformedOutput("unterminated JSON object".to_string()))?;
    if end < start {
        return Err(AgentError::MalformedOutput(
            "unterminated JSON object".to_string(),
        ));
    }
    Ok(&text[start..=end])
}

/// Parse a model reply into the typed outcome for `agent`.
pub fn parse_outcome(agent: AgentType, reply: &str) -> Result<AgentOutcome, AgentError> {
    let json = extract_json(reply)?;
    let malformed = |e: serde_json::Error| {
        AgentError::MalformedOutput(format!("{agent} reply does not match its shape: {e}"))
    };

    let outcome = match agent {
        AgentType::FunctionPlanner => {
            AgentOutcome::FunctionPlan(serde_json::from_str(json).map_err(malformed)?)
        }
        AgentType::StateDesign => {
            AgentOutcome::StateDesign(serde_json::from_str(json).map_err(malformed)?)
        }
        AgentType::JsxLayout => {
            AgentOutcome::Layout(serde_json::from_str(json).map_err(malformed)?)
        }
        AgentType::TailwindStyling => {
            AgentOutcome::Styling(serde_json::from_str(json).map_err(malformed)?)
        }
        AgentType::ComponentAssembler => {
            AgentOutcome::Assembled(serde_json::from_str(json).map_err(malformed)?)
        }
        AgentType::CodeValidator => {
            AgentOutcome::Validation(serde_json::from_str(json).map_err(malformed)?)
        }
        AgentType::ToolFinalizer => {
            AgentOutcome::Finalized(serde_json::from_str(json).map_err(malformed)?)
        }
    };
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_accepts_bare_object() {
        assert_eq!(extract_json(r#"{"a": 1}"#).unwrap(), r#"{"a": 1}"#);
    }

    #[test]
    fn extract_json_strips_fences_and_prose() {
        let reply = "Here you go:\n```json\n{\"valid\": true, \"issues\": []}\n```\nDone.";
        assert_eq!(
            extract_json(reply).unwrap(),
            r#"{"valid": true, "issues": []}"#
        );
    }

    #[test]
    fn extract_json_rejects_empty_reply() {
        assert!(matches!(
            extract_json("I could not produce anything."),
            Err(AgentError::MalformedOutput(_))
        ));
    }

    #[test]
    fn parse_outcome_validator() {
        let reply = r#"{"valid": false, "issues": [{"category": "syntax", "severity": "error", "description": "bad tag"}]}"#;
        match parse_outcome(AgentType::CodeValidator, reply).unwrap() {
            AgentOutcome::Validation(report) => {
                assert!(!report.valid);
                assert_eq!(report.issues.len(), 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn parse_outcome_planner() {
        let reply = r#"{"signatures": [{"name": "computeRoi", "parameters": ["spend: number"], "returns": "number", "description": "roi"}]}"#;
        match parse_outcome(AgentType::FunctionPlanner, reply).unwrap() {
            AgentOutcome::FunctionPlan(plan) => {
                assert_eq!(plan.signatures[0].name, "computeRoi");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn parse_outcome_rejects_shape_mismatch() {
        // Planner shape handed to the state-design parser: missing fields.
        let reply = r#"{"signatures": []}"#;
        assert!(matches!(
            parse_outcome(AgentType::StateDesign, reply),
            Err(AgentError::MalformedOutput(_))
        ));
    }
}
