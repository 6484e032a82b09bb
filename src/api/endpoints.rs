//! Typed wrappers over the backend's REST surface

use std::collections::BTreeMap;

use super::models::*;
use super::{ApiClient, RequestSpec};
use crate::agent::{AgentRunRequest, AgentRunResponse};
use crate::error::ClientError;

impl ApiClient {
    /// GET /cases/metrics/monthly
    pub async fn monthly_case_metrics(&self) -> Result<Vec<CaseMetrics>, ClientError> {
        self.get("/cases/metrics/monthly").await
    }

    /// GET /cases/
    pub async fn list_cases(&self) -> Result<Vec<CaseRow>, ClientError> {
        self.get("/cases/").await
    }

    /// GET /tickets
    pub async fn list_tickets(&self) -> Result<Vec<Ticket>, ClientError> {
        self.get("/tickets").await
    }

    /// POST /tickets
    pub async fn create_ticket(&self, ticket: &NewTicket) -> Result<Ticket, ClientError> {
        self.post("/tickets", Some(ticket)).await
    }

    /// PATCH /tickets/{id}
    pub async fn update_ticket(&self, id: i64, update: &TicketUpdate) -> Result<Ticket, ClientError> {
        let spec = RequestSpec::patch(format!("/tickets/{}", id)).json(update)?;
        self.request(spec).await
    }

    /// GET /tickets/sla/summary (supervisors only)
    pub async fn ticket_sla_summary(&self) -> Result<SlaSummary, ClientError> {
        self.get("/tickets/sla/summary").await
    }

    /// GET /inventory
    pub async fn list_devices(&self) -> Result<Vec<Device>, ClientError> {
        self.get("/inventory").await
    }

    /// GET /patches
    pub async fn list_patches(&self) -> Result<Vec<Patch>, ClientError> {
        self.get("/patches").await
    }

    /// GET /change-requests
    pub async fn list_change_requests(&self) -> Result<Vec<ChangeRequest>, ClientError> {
        self.get("/change-requests").await
    }

    /// POST /change-requests
    pub async fn create_change_request(
        &self,
        request: &NewChangeRequest,
    ) -> Result<ChangeRequest, ClientError> {
        self.post("/change-requests", Some(request)).await
    }

    /// POST /change-requests/{id}/generate-docs
    ///
    /// Returns document name to backend-relative path.
    pub async fn generate_change_request_docs(
        &self,
        id: i64,
    ) -> Result<BTreeMap<String, String>, ClientError> {
        self.post::<_, ()>(&format!("/change-requests/{}/generate-docs", id), None)
            .await
    }

    /// GET /reports/monthly
    pub async fn list_monthly_reports(&self) -> Result<Vec<MonthlyReport>, ClientError> {
        self.get("/reports/monthly").await
    }

    /// POST /reports/monthly/generate
    pub async fn generate_monthly_report(&self) -> Result<ReportGenerated, ClientError> {
        self.post::<_, ()>("/reports/monthly/generate", None).await
    }

    /// POST /reports/revenue-at-risk/generate
    pub async fn generate_revenue_at_risk_report(&self) -> Result<ReportGenerated, ClientError> {
        self.post::<_, ()>("/reports/revenue-at-risk/generate", None)
            .await
    }

    /// GET /agent/status
    pub async fn agent_status(&self) -> Result<AgentStatus, ClientError> {
        self.get("/agent/status").await
    }

    /// POST /agent/run
    pub async fn run_agent(&self, request: &AgentRunRequest) -> Result<AgentRunResponse, ClientError> {
        self.post("/agent/run", Some(request)).await
    }
}
