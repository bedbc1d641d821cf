use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartnerStatus {
    Pending,
    Approved,
    Paused,
    Deleted,
}

impl PartnerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartnerStatus::Pending => "pending",
            PartnerStatus::Approved => "approved",
            PartnerStatus::Paused => "paused",
            PartnerStatus::Deleted => "deleted",
        }
    }

    /// The `allowed` flag that goes with each administrative status.
    pub fn allowed(&self) -> bool {
        matches!(self, PartnerStatus::Approved)
    }
}

impl fmt::Display for PartnerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartnerStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PartnerStatus::Pending),
            "approved" => Ok(PartnerStatus::Approved),
            "paused" => Ok(PartnerStatus::Paused),
            "deleted" => Ok(PartnerStatus::Deleted),
            other => Err(DomainError::InvalidInput(format!(
                "unknown partner status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPartner {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: PartnerStatus,
    pub allowed: bool,
    pub created_at: DateTime<Utc>,
}

impl DeliveryPartner {
    pub fn is_eligible(&self) -> bool {
        self.allowed && self.status == PartnerStatus::Approved
    }
}
