//! Reduction of an [`AgentRunResponse`] into the sections the console shows

use serde_json::Value;

use super::{ActionRecord, AgentRunResponse};

pub const DRY_RUN_NOTICE: &str = "Dry run: no changes were made.";
pub const NO_SUMMARY: &str = "No summary.";

/// Artifacts under this prefix are server-generated reports
pub const REPORTS_PREFIX: &str = "reports/";
/// Only report artifacts carrying this marker get a link
pub const PDF_MARKER: &str = ".pdf";

/// Link for a report artifact, `{reports_base}/{period}/pdf`.
///
/// Requires both the report prefix and the PDF marker.
pub fn artifact_link(path: &str, reports_base: &str) -> Option<String> {
    let rest = path.strip_prefix(REPORTS_PREFIX)?;
    if !path.contains(PDF_MARKER) {
        return None;
    }
    let segment = rest.split('/').next().unwrap_or_default();
    Some(format!("{}/{}/pdf", reports_base, segment))
}

/// Rendering of a tool result: structured values pretty-printed, scalars as text
pub fn render_result(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionLine {
    pub tool: String,
    /// Compact JSON of the arguments, absent when there were none
    pub args: Option<String>,
    pub result: String,
}

impl From<&ActionRecord> for ActionLine {
    fn from(action: &ActionRecord) -> Self {
        let args = (!action.args.is_empty())
            .then(|| serde_json::to_string(&action.args).unwrap_or_default());
        Self {
            tool: action.tool.clone(),
            args,
            result: render_result(&action.result),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactEntry {
    pub path: String,
    pub link: Option<String>,
}

/// Everything the result panel renders, in display order
#[derive(Debug, Clone, PartialEq)]
pub struct RunView {
    pub dry_run_notice: Option<&'static str>,
    pub summary: String,
    pub actions: Vec<ActionLine>,
    pub artifacts: Vec<ArtifactEntry>,
}

impl RunView {
    pub fn from_response(response: &AgentRunResponse, reports_base: &str) -> Self {
        let summary = if response.summary.is_empty() {
            NO_SUMMARY.to_string()
        } else {
            response.summary.clone()
        };

        Self {
            dry_run_notice: response.dry_run.then_some(DRY_RUN_NOTICE),
            summary,
            actions: response.actions_taken.iter().map(ActionLine::from).collect(),
            artifacts: response
                .artifact_paths
                .iter()
                .map(|path| ArtifactEntry {
                    path: path.clone(),
                    link: artifact_link(path, reports_base),
                })
                .collect(),
        }
    }

    /// Plain-text rendering; empty sections are omitted entirely
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(notice) = self.dry_run_notice {
            lines.push(notice.to_string());
        }
        lines.extend(self.summary.lines().map(str::to_string));

        if !self.actions.is_empty() {
            lines.push(String::new());
            lines.push("Actions taken".to_string());
            for action in &self.actions {
                lines.push(format!("- {}", action.tool));
                if let Some(args) = &action.args {
                    lines.push(format!("    {}", args));
                }
                for line in action.result.lines() {
                    lines.push(format!("    {}", line));
                }
            }
        }

        if !self.artifacts.is_empty() {
            lines.push(String::new());
            lines.push("Artifacts".to_string());
            for artifact in &self.artifacts {
                match &artifact.link {
                    Some(link) => lines.push(format!("- {} <{}>", artifact.path, link)),
                    None => lines.push(format!("- {}", artifact.path)),
                }
            }
        }
        lines
    }
}
