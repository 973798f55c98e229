use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountContact, PageMeta, PageQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ReportReason {
    InappropriateContent,
    Harassment,
    Spam,
    Fraud,
    FakeAccount,
    HateSpeech,
    Violence,
    Impersonation,
    IntellectualProperty,
    Other,
}

impl ReportReason {
    /// Human-readable label shown to moderators.
    pub fn display(&self) -> &'static str {
        match self {
            ReportReason::InappropriateContent => "Inappropriate Content",
            ReportReason::Harassment => "Harassment or Bullying",
            ReportReason::Spam => "Spam or Misleading",
            ReportReason::Fraud => "Fraud or Scam",
            ReportReason::FakeAccount => "Fake Account",
            ReportReason::HateSpeech => "Hate Speech",
            ReportReason::Violence => "Violence or Threats",
            ReportReason::Impersonation => "Impersonation",
            ReportReason::IntellectualProperty => "Intellectual Property Violation",
            ReportReason::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Resolved,
    Dismissed,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserReport {
    pub id: i64,
    pub reporter_id: i64,
    pub reported_id: i64,
    pub reason_type: ReportReason,
    pub description: Option<String>,
    pub evidence: Option<String>,
    pub status: ReportStatus,
    pub reviewer_id: Option<i64>,
    pub reviewer_comments: Option<String>,
    pub action_taken: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Party of a report as shown to moderators.
#[derive(Debug, Clone, Serialize)]
pub struct ReportParty {
    pub id: i64,
    pub full_name: String,
    pub email: String,
}

impl From<&AccountContact> for ReportParty {
    fn from(a: &AccountContact) -> Self {
        Self {
            id: a.id,
            full_name: a.full_name(),
            email: a.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportDetails {
    pub id: i64,
    pub reporter_id: i64,
    pub reported_id: i64,
    pub reason_type: ReportReason,
    pub reason_display: &'static str,
    pub description: Option<String>,
    pub evidence: Option<String>,
    pub status: ReportStatus,
    pub reviewer_id: Option<i64>,
    pub reviewer_comments: Option<String>,
    pub action_taken: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub reporter: Option<ReportParty>,
    pub reported_user: Option<ReportParty>,
    pub reviewer: Option<ReportParty>,
}

impl ReportDetails {
    pub fn new(
        report: UserReport,
        reporter: Option<ReportParty>,
        reported_user: Option<ReportParty>,
        reviewer: Option<ReportParty>,
    ) -> Self {
        Self {
            id: report.id,
            reporter_id: report.reporter_id,
            reported_id: report.reported_id,
            reason_type: report.reason_type,
            reason_display: report.reason_type.display(),
            description: report.description,
            evidence: report.evidence,
            status: report.status,
            reviewer_id: report.reviewer_id,
            reviewer_comments: report.reviewer_comments,
            action_taken: report.action_taken,
            created_at: report.created_at,
            updated_at: report.updated_at,
            reporter,
            reported_user,
            reviewer,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReportPage {
    pub reports: Vec<ReportDetails>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub reported_id: i64,
    pub reason_type: ReportReason,
    pub description: Option<String>,
    pub evidence: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<ReportStatus>,
    pub reason_type: Option<ReportReason>,
}

impl ReportsQuery {
    pub fn paging(&self) -> PageQuery {
        PageQuery::new(self.page, self.limit)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateReportStatusRequest {
    pub status: ReportStatus,
}

#[derive(Debug, Deserialize)]
pub struct ReviewReportRequest {
    pub status: ReportStatus,
    pub reviewer_comments: Option<String>,
    pub action_taken: Option<String>,
}
