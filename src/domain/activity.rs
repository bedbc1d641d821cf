//! Malicious-activity audit records.
//!
//! Records are append-only; the only mutable part is the review state an admin
//! moves through `pending -> reviewed -> resolved | dismissed`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    FailedDelivery,
    RejectedConfirmation,
    MultipleFailures,
    SuspiciousBehavior,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::FailedDelivery => "failed_delivery",
            ActivityType::RejectedConfirmation => "rejected_confirmation",
            ActivityType::MultipleFailures => "multiple_failures",
            ActivityType::SuspiciousBehavior => "suspicious_behavior",
        }
    }
}

impl FromStr for ActivityType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "failed_delivery" => Ok(ActivityType::FailedDelivery),
            "rejected_confirmation" => Ok(ActivityType::RejectedConfirmation),
            "multiple_failures" => Ok(ActivityType::MultipleFailures),
            "suspicious_behavior" => Ok(ActivityType::SuspiciousBehavior),
            other => Err(DomainError::InvalidInput(format!(
                "unknown activity type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(DomainError::InvalidInput(format!(
                "unknown severity '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Reviewed,
    Resolved,
    Dismissed,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Reviewed => "reviewed",
            ReviewStatus::Resolved => "resolved",
            ReviewStatus::Dismissed => "dismissed",
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, ReviewStatus::Resolved | ReviewStatus::Dismissed)
    }

    /// Checks an admin review move. Final states stay final and nothing moves
    /// back to `pending`.
    pub fn ensure_can_move_to(&self, next: ReviewStatus) -> Result<(), DomainError> {
        if next == ReviewStatus::Pending {
            return Err(DomainError::InvalidInput(
                "an activity cannot be moved back to pending".to_string(),
            ));
        }
        if self.is_final() {
            return Err(DomainError::Conflict(format!(
                "activity is already {}",
                self
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "reviewed" => Ok(ReviewStatus::Reviewed),
            "resolved" => Ok(ReviewStatus::Resolved),
            "dismissed" => Ok(ReviewStatus::Dismissed),
            other => Err(DomainError::InvalidInput(format!(
                "unknown review status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaliciousActivity {
    pub id: Uuid,
    pub delivery_partner_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub order_id: Uuid,
    pub activity_type: ActivityType,
    pub severity: Severity,
    pub description: String,
    pub status: ReviewStatus,
    pub resolution_notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub delivery_partner_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub order_id: Uuid,
    pub activity_type: ActivityType,
    pub severity: Severity,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct ActivityReview {
    pub status: ReviewStatus,
    pub notes: Option<String>,
    pub reviewer: Uuid,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub status: Option<ReviewStatus>,
    pub severity: Option<Severity>,
}

impl ActivityFilter {
    pub fn matches(&self, activity: &MaliciousActivity) -> bool {
        self.status.map_or(true, |s| activity.status == s)
            && self.severity.map_or(true, |s| activity.severity == s)
    }
}

/// Classifies a rejected delivery given how many earlier records the same
/// partner already has.
pub fn classify_rejection(prior_partner_records: i64) -> (ActivityType, Severity) {
    match prior_partner_records {
        0 => (ActivityType::RejectedConfirmation, Severity::Medium),
        1 | 2 => (ActivityType::MultipleFailures, Severity::High),
        _ => (ActivityType::MultipleFailures, Severity::Critical),
    }
}
