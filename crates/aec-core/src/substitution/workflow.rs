//! Substitution approval protocol.
//!
//! ```text
//! PENDING_APPROVAL --approve--> PENDING_TECH_ACCEPTANCE --accept--> APPROVED
//!        |                              |
//!        +--reject--> REJECTED <--reject+  (declined by the substitute)
//! ```
//!
//! APPROVED and REJECTED are terminal. An action whose source state does not
//! match fails with `InvalidTransition` and leaves the request as it was.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{NewSubstitution, SubstitutionRequest, SubstitutionStatus};
use crate::audit::AuditAction;
use crate::error::{CoreError, Result};
use crate::session::{SessionRecord, SessionStatus};

/// Action that moves a request along the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubstitutionAction {
    /// Administrator/coordinator approves: PENDING_APPROVAL -> PENDING_TECH_ACCEPTANCE
    Approve,
    /// Approver rejects or substitute declines: pending -> REJECTED
    Reject,
    /// Substitute accepts: PENDING_TECH_ACCEPTANCE -> APPROVED
    Accept,
}

impl SubstitutionAction {
    /// Status this action leads to from `from`, if it is legal there.
    pub fn next_status(&self, from: SubstitutionStatus) -> Option<SubstitutionStatus> {
        use SubstitutionStatus::*;
        match (self, from) {
            (SubstitutionAction::Approve, PendingApproval) => Some(PendingTechAcceptance),
            (SubstitutionAction::Reject, PendingApproval | PendingTechAcceptance) => Some(Rejected),
            (SubstitutionAction::Accept, PendingTechAcceptance) => Some(Approved),
            _ => None,
        }
    }

    /// Audit tag for this action fired from `from`.
    ///
    /// Rejection is tagged by who did it, which follows from the source state.
    pub fn audit_action(&self, from: SubstitutionStatus) -> AuditAction {
        match self {
            SubstitutionAction::Approve => AuditAction::ApproveSubstitutionRequest,
            SubstitutionAction::Accept => AuditAction::AcceptSubstitutionRequest,
            SubstitutionAction::Reject => {
                if from == SubstitutionStatus::PendingTechAcceptance {
                    AuditAction::DeclineSubstitutionRequest
                } else {
                    AuditAction::RejectSubstitutionRequest
                }
            }
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            SubstitutionAction::Approve => "approve",
            SubstitutionAction::Reject => "reject",
            SubstitutionAction::Accept => "accept",
        }
    }

    /// Apply the action, stamping `updated_at`. Returns the previous status.
    pub fn apply(
        &self,
        request: &mut SubstitutionRequest,
        now: DateTime<Utc>,
    ) -> Result<SubstitutionStatus> {
        let previous = request.status;
        let next = self.next_status(previous).ok_or_else(|| CoreError::InvalidTransition {
            entity: "substitution request",
            id: request.id.clone(),
            from: previous.to_string(),
            operation: self.verb(),
        })?;
        request.status = next;
        request.updated_at = now;
        Ok(previous)
    }
}

/// Check that `session` can be covered by the request described in `new`.
///
/// The session must still be PLANNED and dated `today` or later.
pub fn validate_new(session: &SessionRecord, new: &NewSubstitution, today: NaiveDate) -> Result<()> {
    if session.status != SessionStatus::Planned {
        return Err(CoreError::precondition(format!(
            "session '{}' is {}, only PLANNED sessions can be substituted",
            session.id, session.status
        )));
    }
    if session.date < today {
        return Err(CoreError::precondition(format!(
            "session '{}' took place on {}, substitutions are only possible for upcoming sessions",
            session.id, session.date
        )));
    }
    if new.substitute_technician_id.trim().is_empty() {
        return Err(CoreError::precondition("a substitute technician is required"));
    }
    if new.substitute_technician_id == new.origin_technician_id {
        return Err(CoreError::precondition(
            "substitute technician must differ from the requesting technician",
        ));
    }
    if new.reason.trim().is_empty() {
        return Err(CoreError::precondition("a reason is required"));
    }
    Ok(())
}

/// Build a PENDING_APPROVAL request.
pub fn open(id: impl Into<String>, new: NewSubstitution, now: DateTime<Utc>) -> SubstitutionRequest {
    SubstitutionRequest {
        id: id.into(),
        session_id: new.session_id,
        origin_technician_id: new.origin_technician_id,
        substitute_technician_id: new.substitute_technician_id,
        status: SubstitutionStatus::PendingApproval,
        reason: new.reason,
        created_at: now,
        updated_at: now,
    }
}
