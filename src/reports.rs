//! Report exports: PDF bundles and CSV snapshots saved through [`DownloadClient`]

use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::api::models::ReportEntity;
use crate::download::DownloadClient;
use crate::error::ClientError;

/// Reporting period, `YYYY-MM`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period(String);

impl Period {
    pub fn parse(raw: &str) -> Option<Self> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").expect("period pattern is valid")
        });
        let raw = raw.trim();
        re.is_match(raw).then(|| Self(raw.to_string()))
    }

    /// Period containing `date`
    pub fn of(date: NaiveDate) -> Self {
        Self(format!("{:04}-{:02}", date.year(), date.month()))
    }

    pub fn current() -> Self {
        Self::of(chrono::Local::now().date_naive())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn monthly_pdf_filename(period: &Period) -> String {
    format!("monthly_operations_{}.pdf", period)
}

pub fn revenue_at_risk_pdf_filename(period: &Period) -> String {
    format!("revenue_at_risk_fta_{}.pdf", period)
}

pub const REVENUE_AT_RISK_CSV_FILENAME: &str = "revenue_at_risk_fta.csv";

pub fn custom_query_filename(entity: ReportEntity) -> String {
    format!("{}_report.csv", entity)
}

impl DownloadClient {
    /// GET /reports/monthly/{period}/pdf
    pub async fn monthly_report_pdf(&self, period: &Period) -> Result<PathBuf, ClientError> {
        self.download(
            &format!("/reports/monthly/{}/pdf", period),
            &monthly_pdf_filename(period),
        )
        .await
    }

    /// GET /reports/custom-query.csv?entity={entity}
    pub async fn custom_query_csv(&self, entity: ReportEntity) -> Result<PathBuf, ClientError> {
        self.download(
            &format!("/reports/custom-query.csv?entity={}", entity),
            &custom_query_filename(entity),
        )
        .await
    }

    /// GET /reports/revenue-at-risk/{period}/pdf
    pub async fn revenue_at_risk_pdf(&self, period: &Period) -> Result<PathBuf, ClientError> {
        self.download(
            &format!("/reports/revenue-at-risk/{}/pdf", period),
            &revenue_at_risk_pdf_filename(period),
        )
        .await
    }

    /// GET /reports/revenue-at-risk.csv
    pub async fn revenue_at_risk_csv(&self) -> Result<PathBuf, ClientError> {
        self.download("/reports/revenue-at-risk.csv", REVENUE_AT_RISK_CSV_FILENAME)
            .await
    }
}
