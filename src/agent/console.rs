//! Agent console state machine
//!
//! `Idle -> Running -> Settled | Failed`, and back to `Running` on the next
//! submission. Submitting is synchronous and clears the previous result
//! and error before any request goes out; the request itself is issued by
//! the caller with the returned [`PendingRun`] and its outcome handed back
//! through [`AgentConsole::settle`].

use tracing::{debug, warn};

use super::view::RunView;
use super::{AgentMode, AgentRunRequest, AgentRunResponse, DAILY_OPS_PRESET};
use crate::api::ApiClient;
use crate::config::AgentConfig;
use crate::error::ClientError;

/// Shown for any failed run, whatever the cause
pub const RUN_FAILED_MESSAGE: &str =
    "Run failed. Ensure you are logged in and the backend is running.";

#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Idle,
    Running,
    Settled(AgentRunResponse),
    Failed(String),
}

/// What the operator asked for
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Preset(String),
    Custom,
}

/// A submitted run waiting for its response
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRun {
    pub seq: u64,
    pub request: AgentRunRequest,
}

#[derive(Debug, Clone)]
pub struct AgentConsole {
    pub goal: String,
    pub mode: AgentMode,
    pub dry_run: bool,
    pub preset: String,
    state: RunState,
    issued: u64,
}

impl Default for AgentConsole {
    fn default() -> Self {
        Self::new(AgentMode::Demo, true)
    }
}

impl AgentConsole {
    pub fn new(mode: AgentMode, dry_run: bool) -> Self {
        Self {
            goal: String::new(),
            mode,
            dry_run,
            preset: DAILY_OPS_PRESET.to_string(),
            state: RunState::Idle,
            issued: 0,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            preset: config.preset.clone(),
            ..Self::new(config.mode, config.dry_run)
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, RunState::Running)
    }

    pub fn result(&self) -> Option<&AgentRunResponse> {
        match &self.state {
            RunState::Settled(response) => Some(response),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            RunState::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Sequence number of the most recently submitted run
    pub fn latest_seq(&self) -> u64 {
        self.issued
    }

    /// Build the request for `submission` from the current selections
    pub fn build_request(&self, submission: &Submission) -> AgentRunRequest {
        match submission {
            Submission::Preset(name) => AgentRunRequest::preset(name.clone(), self.dry_run),
            Submission::Custom => AgentRunRequest::custom(&self.goal, self.mode, self.dry_run),
        }
    }

    /// Enter `Running`, dropping any displayed result or error
    pub fn submit(&mut self, submission: Submission) -> PendingRun {
        let request = self.build_request(&submission);
        self.issued += 1;
        self.state = RunState::Running;
        debug!(
            "Agent run #{} submitted (preset={:?}, mode={}, dry_run={})",
            self.issued, request.preset, request.mode, request.dry_run
        );
        PendingRun {
            seq: self.issued,
            request,
        }
    }

    /// Submit the configured preset
    pub fn submit_preset(&mut self) -> PendingRun {
        let preset = self.preset.clone();
        self.submit(Submission::Preset(preset))
    }

    /// Record the outcome of run `seq`.
    ///
    /// Returns false, leaving the state untouched, when a newer run has
    /// been submitted since.
    pub fn settle(&mut self, seq: u64, outcome: Result<AgentRunResponse, ClientError>) -> bool {
        if seq != self.issued {
            debug!(
                "Discarding outcome of agent run #{} (latest is #{})",
                seq, self.issued
            );
            return false;
        }

        self.state = match outcome {
            Ok(response) => RunState::Settled(response),
            Err(e) => {
                warn!("Agent run #{} failed: {}", seq, e);
                RunState::Failed(RUN_FAILED_MESSAGE.to_string())
            }
        };
        true
    }

    /// Submit, wait for the backend, and settle
    pub async fn run(&mut self, client: &ApiClient, submission: Submission) -> &RunState {
        let pending = self.submit(submission);
        let outcome = client.run_agent(&pending.request).await;
        self.settle(pending.seq, outcome);
        &self.state
    }

    /// Renderable sections of the settled result
    pub fn view(&self, reports_base: &str) -> Option<RunView> {
        self.result()
            .map(|response| RunView::from_response(response, reports_base))
    }
}
