//! Project plan parsing.
//!
//! A planning call asks the model for a JSON description of every file a
//! project needs. Models frequently wrap that JSON in prose or markdown
//! fences, so parsing is strict first and then retries on the substring
//! between the first `{` and the last `}`. No regeneration happens at this
//! layer; retrying the planning call is the caller's decision.

use serde::{Deserialize, Serialize};

/// One file the plan wants created, with a short description of its purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFile {
    /// Relative path, forward slashes.
    pub path: String,
    /// What this file does, used verbatim in the per-file generation prompt.
    pub description: String,
}

/// A multi-file project plan produced by a single planning call.
///
/// Immutable once parsed; workers read it as shared context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPlan {
    pub project_name: String,
    #[serde(default)]
    pub description: String,
    pub files: Vec<PlanFile>,
    #[serde(default)]
    pub setup_commands: Vec<String>,
}

/// A planning response that could not be parsed as a plan.
///
/// Carries the raw response text so the user can see what the model actually
/// returned.
#[derive(Debug, thiserror::Error)]
#[error("could not parse project plan: {reason}")]
pub struct PlanParseError {
    pub reason: String,
    pub raw: String,
}

/// Parse a raw planning response into a [`ProjectPlan`].
pub fn parse_plan(text: &str) -> Result<ProjectPlan, PlanParseError> {
    let strict_err = match serde_json::from_str::<ProjectPlan>(text) {
        Ok(plan) => return Ok(plan),
        Err(err) => err,
    };

    // Models like to surround the JSON with commentary or fences. Retry on
    // the first-brace..last-brace substring before giving up.
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            return serde_json::from_str::<ProjectPlan>(&text[start..=end]).map_err(|err| {
                PlanParseError {
                    reason: err.to_string(),
                    raw: text.to_string(),
                }
            });
        }
    }

    Err(PlanParseError {
        reason: strict_err.to_string(),
        raw: text.to_string(),
    })
}
