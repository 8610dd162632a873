//! Concrete dated sessions materialized from recurring slots.

pub mod machine;

pub use machine::{audit_action_for, SessionTransition};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::schedule::RecurringSlot;

/// Deterministic id of the session a slot produces on `date`.
///
/// The date suffix is always ten characters wide, so two different slot ids
/// can never map to the same key.
pub fn session_key(slot_id: &str, date: NaiveDate) -> String {
    format!("{slot_id}_{}", date.format("%Y-%m-%d"))
}

/// Status of a session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Planned,
    Completed,
    TechnicianAbsent,
    Substituted,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Planned => "PLANNED",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::TechnicianAbsent => "TECHNICIAN_ABSENT",
            SessionStatus::Substituted => "SUBSTITUTED",
            SessionStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "PLANNED" => Some(SessionStatus::Planned),
            "COMPLETED" => Some(SessionStatus::Completed),
            "TECHNICIAN_ABSENT" => Some(SessionStatus::TechnicianAbsent),
            "SUBSTITUTED" => Some(SessionStatus::Substituted),
            "CANCELLED" => Some(SessionStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One concrete occurrence of a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    /// Weak reference: the slot may have been deleted since.
    pub slot_id: String,
    pub date: NaiveDate,
    pub status: SessionStatus,
    pub assigned_technician_id: String,
    pub attendee_count: Option<u32>,
    pub summary: Option<String>,
    pub incidents: Option<String>,
    pub signed_off: bool,
}

impl SessionRecord {
    /// A new PLANNED record for `slot` on `date`, assigned to the slot's technician.
    pub fn planned(slot: &RecurringSlot, date: NaiveDate) -> Self {
        Self {
            id: session_key(&slot.id, date),
            slot_id: slot.id.clone(),
            date,
            status: SessionStatus::Planned,
            assigned_technician_id: slot.technician_id.clone(),
            attendee_count: None,
            summary: None,
            incidents: None,
            signed_off: false,
        }
    }
}

/// What a technician reports after running a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceReport {
    pub attendee_count: u32,
    pub summary: String,
    pub incidents: String,
    /// A sign-off is authoritative and closes the session as COMPLETED.
    pub sign_off: bool,
}
