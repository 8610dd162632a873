//! Requests to hand a session over to another technician.

pub mod workflow;

pub use workflow::SubstitutionAction;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a substitution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubstitutionStatus {
    PendingApproval,
    PendingTechAcceptance,
    Approved,
    Rejected,
}

impl SubstitutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubstitutionStatus::Approved | SubstitutionStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubstitutionStatus::PendingApproval => "PENDING_APPROVAL",
            SubstitutionStatus::PendingTechAcceptance => "PENDING_TECH_ACCEPTANCE",
            SubstitutionStatus::Approved => "APPROVED",
            SubstitutionStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "PENDING_APPROVAL" => Some(SubstitutionStatus::PendingApproval),
            "PENDING_TECH_ACCEPTANCE" => Some(SubstitutionStatus::PendingTechAcceptance),
            "APPROVED" => Some(SubstitutionStatus::Approved),
            "REJECTED" => Some(SubstitutionStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubstitutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A technician asking for someone else to cover one of their sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionRequest {
    pub id: String,
    pub session_id: String,
    pub origin_technician_id: String,
    pub substitute_technician_id: String,
    pub status: SubstitutionStatus,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubstitutionRequest {
    /// Only the designated substitute may accept or decline once approved.
    pub fn is_substitute(&self, user_id: &str) -> bool {
        self.substitute_technician_id == user_id
    }
}

/// Caller input for opening a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubstitution {
    pub session_id: String,
    pub origin_technician_id: String,
    pub substitute_technician_id: String,
    pub reason: String,
}
