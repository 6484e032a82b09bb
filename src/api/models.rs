//! Request and response shapes of the court operations backend

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One month of case backlog metrics
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaseMetrics {
    pub month: String,
    pub total_cases: i64,
    pub disposed_cases: i64,
    pub non_disposed_cases: i64,
    pub disposed_pct: f64,
    pub avg_case_age_days: f64,
    #[serde(default)]
    pub avg_time_to_disposition_days: Option<f64>,
}

/// Case row as listed by `/cases/`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaseRow {
    pub id: i64,
    pub case_number: String,
    pub defendant_name: String,
    pub charge_type: String,
    pub status: String,
    pub court: String,
    #[serde(default)]
    pub courtroom: Option<String>,
    #[serde(default)]
    pub judge: Option<String>,
    pub filing_date: NaiveDate,
    #[serde(default)]
    pub hearing_date: Option<NaiveDate>,
    #[serde(default)]
    pub disposition_date: Option<NaiveDate>,
    pub fine_amount: f64,
    pub amount_paid: f64,
}

impl CaseRow {
    pub fn outstanding(&self) -> f64 {
        (self.fine_amount - self.amount_paid).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    Application,
    Hardware,
    Access,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

/// Help desk ticket
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: String,
    pub status: String,
    #[serde(default)]
    pub requester_id: Option<i64>,
    #[serde(default)]
    pub assignee_id: Option<i64>,
    pub created_at: String,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<String>,
}

/// Body of `POST /tickets`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
}

/// Body of `PATCH /tickets/{id}`; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TicketUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<TicketCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TicketPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<i64>,
}

impl TicketUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SlaSummary {
    pub total: i64,
    pub open: i64,
    pub overdue: i64,
}

/// Inventory device
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Device {
    pub id: i64,
    pub asset_tag: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub location: String,
    #[serde(default)]
    pub assigned_user: Option<String>,
    #[serde(default)]
    pub warranty_end: Option<NaiveDate>,
    #[serde(default)]
    pub last_patch_date: Option<NaiveDate>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Patch {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub patch_type: String,
    pub status: String,
    #[serde(default)]
    pub target_version: Option<String>,
    #[serde(default)]
    pub device_asset_tag: Option<String>,
    pub requested_date: NaiveDate,
    #[serde(default)]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub deployed_date: Option<NaiveDate>,
    #[serde(default)]
    pub verified_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChangeRequest {
    pub id: i64,
    pub title: String,
    pub requested_by: String,
    pub current_process: String,
    pub proposed_change: String,
    pub impact_users: String,
    pub impact_data: String,
    pub impact_security: String,
    pub status: String,
    pub created_at: String,
}

/// Body of `POST /change-requests`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewChangeRequest {
    pub title: String,
    pub requested_by: String,
    pub current_process: String,
    pub proposed_change: String,
    pub impact_users: String,
    pub impact_data: String,
    pub impact_security: String,
    pub status: String,
}

impl NewChangeRequest {
    /// Draft request with impact fields left for the reviewer
    pub fn draft(
        title: impl Into<String>,
        requested_by: impl Into<String>,
        proposed_change: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            requested_by: requested_by.into(),
            current_process: String::new(),
            proposed_change: proposed_change.into(),
            impact_users: String::new(),
            impact_data: String::new(),
            impact_security: String::new(),
            status: "draft".to_string(),
        }
    }
}

/// Monthly bundle discovered under reports/YYYY-MM
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MonthlyReport {
    pub period: String,
    #[serde(default)]
    pub pdf_files: Vec<String>,
}

/// Acknowledgement of a report generation request
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportGenerated {
    pub period: String,
    pub message: String,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentStatus {
    pub status: String,
    #[serde(default)]
    pub llm_provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Entities the custom query export understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportEntity {
    Cases,
    Tickets,
    Devices,
}

macro_rules! str_enum {
    ($ty:ty, $what:literal, { $($variant:path => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn name(&self) -> &'static str {
                match self {
                    $($variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    other => Err(format!("unknown {} '{}'", $what, other)),
                }
            }
        }
    };
}

str_enum!(TicketCategory, "ticket category", {
    TicketCategory::Application => "application",
    TicketCategory::Hardware => "hardware",
    TicketCategory::Access => "access",
});

str_enum!(TicketPriority, "ticket priority", {
    TicketPriority::Low => "low",
    TicketPriority::Medium => "medium",
    TicketPriority::High => "high",
    TicketPriority::Critical => "critical",
});

str_enum!(TicketStatus, "ticket status", {
    TicketStatus::Open => "open",
    TicketStatus::InProgress => "in_progress",
    TicketStatus::Resolved => "resolved",
    TicketStatus::Closed => "closed",
});

str_enum!(ReportEntity, "report entity", {
    ReportEntity::Cases => "cases",
    ReportEntity::Tickets => "tickets",
    ReportEntity::Devices => "devices",
});
