//! Session state machine.
//!
//! ## State Transitions
//!
//! ```text
//! PLANNED -> COMPLETED | TECHNICIAN_ABSENT | SUBSTITUTED | CANCELLED
//! TECHNICIAN_ABSENT -> SUBSTITUTED
//! *       -> COMPLETED   (sign-off, forced)
//! ```
//!
//! Every transition is a named rule. The sign-off rule is the only one that
//! ignores the current status: a technician's sign-off is authoritative.

use serde::{Deserialize, Serialize};

use super::{AttendanceReport, SessionRecord, SessionStatus};
use crate::audit::AuditAction;
use crate::error::CoreError;

/// A named transition of the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionTransition {
    /// Technician signs the attendance sheet: any -> COMPLETED
    SignOff,
    /// Technician did not show up: PLANNED -> TECHNICIAN_ABSENT
    MarkAbsent,
    /// Session will not happen: PLANNED -> CANCELLED
    Cancel,
    /// Substitute takes over: PLANNED | TECHNICIAN_ABSENT -> SUBSTITUTED
    Substitute,
}

impl SessionTransition {
    pub fn target(&self) -> SessionStatus {
        match self {
            SessionTransition::SignOff => SessionStatus::Completed,
            SessionTransition::MarkAbsent => SessionStatus::TechnicianAbsent,
            SessionTransition::Cancel => SessionStatus::Cancelled,
            SessionTransition::Substitute => SessionStatus::Substituted,
        }
    }

    /// Whether this rule may fire from `from`.
    pub fn allowed_from(&self, from: SessionStatus) -> bool {
        match self {
            SessionTransition::SignOff => true,
            SessionTransition::MarkAbsent | SessionTransition::Cancel => {
                from == SessionStatus::Planned
            }
            SessionTransition::Substitute => {
                matches!(from, SessionStatus::Planned | SessionStatus::TechnicianAbsent)
            }
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            SessionTransition::SignOff => "sign off",
            SessionTransition::MarkAbsent => "mark absent",
            SessionTransition::Cancel => "cancel",
            SessionTransition::Substitute => "reassign",
        }
    }

    /// Check the rule against the record without changing it.
    pub fn check(&self, record: &SessionRecord) -> Result<(), CoreError> {
        if self.allowed_from(record.status) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                entity: "session",
                id: record.id.clone(),
                from: record.status.to_string(),
                operation: self.verb(),
            })
        }
    }

    /// Apply the rule to `record`, returning the status it had before.
    pub fn apply(&self, record: &mut SessionRecord) -> Result<SessionStatus, CoreError> {
        self.check(record)?;
        let previous = record.status;
        record.status = self.target();
        if *self == SessionTransition::SignOff {
            record.signed_off = true;
        }
        Ok(previous)
    }
}

/// Copy an attendance report onto `record`, signing off if requested.
///
/// Returns the status the record had before.
pub fn register_attendance(
    record: &mut SessionRecord,
    report: &AttendanceReport,
) -> SessionStatus {
    let previous = record.status;
    record.attendee_count = Some(report.attendee_count);
    record.summary = Some(report.summary.clone());
    record.incidents = Some(report.incidents.clone());
    if report.sign_off {
        // SignOff is legal from every status
        record.status = SessionTransition::SignOff.target();
        record.signed_off = true;
    }
    previous
}

/// Point `record` at a new technician and mark it SUBSTITUTED.
pub fn reassign(record: &mut SessionRecord, technician_id: &str) -> Result<SessionStatus, CoreError> {
    let previous = SessionTransition::Substitute.apply(record)?;
    record.assigned_technician_id = technician_id.to_string();
    Ok(previous)
}

/// Audit tag for a session write, derived from what actually changed.
pub fn audit_action_for(previous: SessionStatus, current: SessionStatus) -> AuditAction {
    if previous == current {
        return AuditAction::RecordAttendance;
    }
    match current {
        SessionStatus::Completed => AuditAction::MarkSessionCompleted,
        SessionStatus::TechnicianAbsent => AuditAction::MarkSessionTechnicianAbsent,
        SessionStatus::Cancelled => AuditAction::MarkSessionCancelled,
        SessionStatus::Substituted => AuditAction::AssignSessionSubstitute,
        // No rule leads back to PLANNED
        SessionStatus::Planned => AuditAction::RecordAttendance,
    }
}
