use std::str::FromStr;

use uuid::Uuid;

use super::errors::DomainError;
use super::partner::DeliveryPartner;

pub const AUTO_ASSIGN_SETTING: &str = "auto_assign_orders";
pub const CURSOR_SETTING: &str = "auto_assign_cursor";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentPolicy {
    /// Always the eligible partner with the oldest record.
    OldestEligible,
    /// Cycle through eligible partners in record order, starting after the
    /// partner that received the previous automatic assignment.
    RoundRobin,
}

impl FromStr for AssignmentPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oldest" | "oldest_eligible" => Ok(AssignmentPolicy::OldestEligible),
            "round_robin" => Ok(AssignmentPolicy::RoundRobin),
            other => Err(DomainError::InvalidInput(format!(
                "unknown assignment policy '{other}'"
            ))),
        }
    }
}

/// Picks a partner from `eligible`, which must be ordered oldest record first.
pub fn select_partner<'a>(
    policy: AssignmentPolicy,
    eligible: &'a [DeliveryPartner],
    last_assigned: Option<Uuid>,
) -> Option<&'a DeliveryPartner> {
    let first = eligible.first()?;
    match policy {
        AssignmentPolicy::OldestEligible => Some(first),
        AssignmentPolicy::RoundRobin => {
            let Some(last) = last_assigned else {
                return Some(first);
            };
            // A cursor pointing at a partner that left the pool restarts the
            // cycle.
            let next = eligible
                .iter()
                .position(|p| p.id == last)
                .and_then(|idx| eligible.get(idx + 1));
            next.or(Some(first))
        }
    }
}
