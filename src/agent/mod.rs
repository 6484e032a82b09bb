//! Analyst agent runs: request/response shapes, the console state machine,
//! and the reduction of a response into renderable sections.

pub mod console;
pub mod view;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub use console::{AgentConsole, PendingRun, RunState, Submission, RUN_FAILED_MESSAGE};
pub use view::{artifact_link, ActionLine, ArtifactEntry, RunView};

/// Preset bundled with the backend: the full daily operations walkthrough
pub const DAILY_OPS_PRESET: &str = "daily_ops_demo";

/// Goal sent for a custom run whose goal text is blank
pub const DEFAULT_GOAL: &str = "Run daily operations demo.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    #[default]
    Demo,
    Interactive,
}

impl AgentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentMode::Demo => "demo",
            AgentMode::Interactive => "interactive",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            AgentMode::Demo => AgentMode::Interactive,
            AgentMode::Interactive => AgentMode::Demo,
        }
    }
}

impl fmt::Display for AgentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "demo" => Ok(AgentMode::Demo),
            "interactive" => Ok(AgentMode::Interactive),
            other => Err(format!("unknown agent mode '{}'", other)),
        }
    }
}

/// Body of `POST /agent/run`
///
/// `preset` is always serialized, as `null` for custom runs: the backend
/// falls back to its default preset when the field is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRunRequest {
    pub goal: String,
    pub mode: AgentMode,
    pub dry_run: bool,
    pub preset: Option<String>,
}

impl AgentRunRequest {
    /// Preset run: goal is empty and mode is always demo
    pub fn preset(name: impl Into<String>, dry_run: bool) -> Self {
        Self {
            goal: String::new(),
            mode: AgentMode::Demo,
            dry_run,
            preset: Some(name.into()),
        }
    }

    /// Custom run; blank goal text falls back to [`DEFAULT_GOAL`]
    pub fn custom(goal: &str, mode: AgentMode, dry_run: bool) -> Self {
        let goal = if goal.trim().is_empty() {
            DEFAULT_GOAL.to_string()
        } else {
            goal.to_string()
        };
        Self {
            goal,
            mode,
            dry_run,
            preset: None,
        }
    }
}

/// One tool invocation, in server execution order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub tool: String,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default)]
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRunResponse {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub actions_taken: Vec<ActionRecord>,
    #[serde(default)]
    pub artifact_paths: Vec<String>,
    pub dry_run: bool,
}
