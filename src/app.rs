use tracing::warn;

use courtops::agent::{AgentConsole, AgentRunResponse, PendingRun, RunView, Submission};
use courtops::api::models::AgentStatus;
use courtops::config::Config;
use courtops::ClientError;

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

/// Console state
pub struct App {
    pub console: AgentConsole,
    pub editing: bool,
    pub should_quit: bool,
    pub show_help: bool,
    pub status_message: Option<String>,
    pub agent_status: Option<AgentStatus>,
    pub signed_in: bool,
    pub scroll: u16,
    spinner: usize,
    reports_base: String,
}

impl App {
    pub fn new(config: &Config, reports_base: impl Into<String>, signed_in: bool) -> Self {
        Self {
            console: AgentConsole::from_config(&config.agent),
            editing: false,
            should_quit: false,
            show_help: false,
            status_message: None,
            agent_status: None,
            signed_in,
            scroll: 0,
            spinner: 0,
            reports_base: reports_base.into(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.console.is_running()
    }

    /// Goal editing and every toggle are locked while a run is in flight
    fn guard_running(&mut self) -> bool {
        if self.is_running() {
            self.set_status("A run is in progress");
            return true;
        }
        false
    }

    pub fn start_editing(&mut self) {
        if !self.guard_running() {
            self.editing = true;
        }
    }

    pub fn stop_editing(&mut self) {
        self.editing = false;
    }

    pub fn push_char(&mut self, c: char) {
        if self.editing && !self.is_running() {
            self.console.goal.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        if self.editing && !self.is_running() {
            self.console.goal.pop();
        }
    }

    pub fn toggle_mode(&mut self) {
        if !self.guard_running() {
            self.console.mode = self.console.mode.toggled();
        }
    }

    pub fn toggle_dry_run(&mut self) {
        if !self.guard_running() {
            self.console.dry_run = !self.console.dry_run;
        }
    }

    /// Start the configured preset; `None` while another run is in flight
    pub fn submit_preset(&mut self) -> Option<PendingRun> {
        if self.guard_running() {
            return None;
        }
        self.editing = false;
        self.scroll = 0;
        Some(self.console.submit_preset())
    }

    /// Start a custom run from the goal editor
    pub fn submit_custom(&mut self) -> Option<PendingRun> {
        if self.guard_running() {
            return None;
        }
        self.editing = false;
        self.scroll = 0;
        Some(self.console.submit(Submission::Custom))
    }

    pub fn finish_run(&mut self, seq: u64, outcome: Result<AgentRunResponse, ClientError>) {
        if let Err(e) = &outcome {
            self.note_rejected_session(e);
        }
        if self.console.settle(seq, outcome) {
            self.scroll = 0;
        }
    }

    pub fn set_agent_status(&mut self, status: Result<AgentStatus, ClientError>) {
        match status {
            Ok(status) => self.agent_status = Some(status),
            Err(e) => {
                warn!("Agent status unavailable: {}", e);
                self.note_rejected_session(&e);
                self.agent_status = None;
                self.set_status(e.user_message());
            }
        }
    }

    /// A 401/403 means the stored token no longer works
    fn note_rejected_session(&mut self, err: &ClientError) {
        if err.is_unauthorized() && self.signed_in {
            warn!("Backend rejected the session token; run `courtops login`");
            self.signed_in = false;
        }
    }

    /// Renderable result of the last settled run
    pub fn result_view(&self) -> Option<RunView> {
        self.console.view(&self.reports_base)
    }

    pub fn tick(&mut self) {
        if self.is_running() {
            self.spinner = (self.spinner + 1) % SPINNER.len();
        }
    }

    pub fn spinner_frame(&self) -> char {
        SPINNER[self.spinner]
    }

    pub fn scroll_down(&mut self) {
        self.scroll = self.scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    /// Set status message
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
    }

    /// Clear status message
    pub fn clear_status(&mut self) {
        self.status_message = None;
    }
}
