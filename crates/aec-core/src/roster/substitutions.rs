use chrono::NaiveDate;
use uuid::Uuid;

use super::Roster;
use crate::actor::Actor;
use crate::audit::{AuditAction, EntityType};
use crate::error::{CoreError, Result};
use crate::session::SessionTransition;
use crate::storage::RecordStore;
use crate::substitution::workflow::{self, SubstitutionAction};
use crate::substitution::{NewSubstitution, SubstitutionRequest, SubstitutionStatus};

impl<S: RecordStore> Roster<S> {
    /// Open a request to cover an upcoming PLANNED session.
    pub fn create_request(
        &self,
        actor: &Actor,
        new: NewSubstitution,
        today: NaiveDate,
    ) -> Result<SubstitutionRequest> {
        let session = self
            .store
            .session(&new.session_id)?
            .ok_or_else(|| CoreError::not_found("session", &new.session_id))?;
        workflow::validate_new(&session, &new, today)?;

        let request = workflow::open(Uuid::new_v4().to_string(), new, self.now());
        self.store.insert_request(&request)?;
        tracing::debug!(
            request_id = %request.id,
            session_id = %request.session_id,
            substitute = %request.substitute_technician_id,
            "substitution requested"
        );

        self.audit().record(
            actor,
            AuditAction::CreateSubstitutionRequest,
            EntityType::SubstitutionRequest,
            &request.id,
            format!(
                "Substitution requested for session {}: {} -> {} ({})",
                request.session_id,
                request.origin_technician_id,
                request.substitute_technician_id,
                request.reason
            ),
            self.now(),
        )?;
        Ok(request)
    }

    /// PENDING_APPROVAL -> PENDING_TECH_ACCEPTANCE.
    pub fn approve(&self, actor: &Actor, request_id: &str) -> Result<SubstitutionRequest> {
        let (request, previous) = self.advance(request_id, SubstitutionAction::Approve)?;
        self.audit_request(actor, &request, SubstitutionAction::Approve, previous)?;
        Ok(request)
    }

    /// Pending -> REJECTED. From PENDING_TECH_ACCEPTANCE this is the
    /// substitute declining and is audited as such.
    pub fn reject(&self, actor: &Actor, request_id: &str) -> Result<SubstitutionRequest> {
        let (request, previous) = self.advance(request_id, SubstitutionAction::Reject)?;
        self.audit_request(actor, &request, SubstitutionAction::Reject, previous)?;
        Ok(request)
    }

    /// PENDING_TECH_ACCEPTANCE -> APPROVED, handing the session to the substitute.
    ///
    /// Writes two audit entries: the acceptance, then the reassignment. If the
    /// session cannot be written the request is put back to
    /// PENDING_TECH_ACCEPTANCE and the session error is returned.
    pub fn accept(&self, actor: &Actor, request_id: &str) -> Result<SubstitutionRequest> {
        let pending = self.load_request(request_id)?;
        let mut accepted = pending.clone();
        SubstitutionAction::Accept.apply(&mut accepted, self.now())?;

        let session = self
            .store
            .session(&pending.session_id)?
            .ok_or_else(|| CoreError::not_found("session", &pending.session_id))?;
        SessionTransition::Substitute.check(&session)?;

        self.compare_and_set(&accepted, pending.status, SubstitutionAction::Accept)?;
        let mut audit_failure = self
            .audit_request(actor, &accepted, SubstitutionAction::Accept, pending.status)
            .err();

        match self.reassign_technician(actor, &accepted.session_id, &accepted.substitute_technician_id) {
            Ok(_) => {}
            Err(e @ CoreError::AuditWriteFailed { .. }) => {
                audit_failure.get_or_insert(e);
            }
            Err(e) => {
                self.restore_pending(actor, &pending, &e);
                return Err(e);
            }
        }

        tracing::info!(
            request_id,
            session_id = %accepted.session_id,
            technician = %accepted.substitute_technician_id,
            "substitution accepted"
        );
        match audit_failure {
            Some(e) => Err(e),
            None => Ok(accepted),
        }
    }

    pub fn list_requests(&self) -> Result<Vec<SubstitutionRequest>> {
        Ok(self.store.requests()?)
    }

    pub fn request(&self, request_id: &str) -> Result<Option<SubstitutionRequest>> {
        Ok(self.store.request(request_id)?)
    }

    fn load_request(&self, request_id: &str) -> Result<SubstitutionRequest> {
        self.store
            .request(request_id)?
            .ok_or_else(|| CoreError::not_found("substitution request", request_id))
    }

    fn advance(
        &self,
        request_id: &str,
        action: SubstitutionAction,
    ) -> Result<(SubstitutionRequest, SubstitutionStatus)> {
        let mut request = self.load_request(request_id)?;
        let previous = action.apply(&mut request, self.now())?;
        self.compare_and_set(&request, previous, action)?;
        tracing::debug!(request_id, from = %previous, to = %request.status, "substitution request updated");
        Ok((request, previous))
    }

    fn compare_and_set(
        &self,
        request: &SubstitutionRequest,
        expected: SubstitutionStatus,
        action: SubstitutionAction,
    ) -> Result<()> {
        if self.store.update_request(request, expected)? {
            return Ok(());
        }
        let current = self.load_request(&request.id)?;
        Err(CoreError::InvalidTransition {
            entity: "substitution request",
            id: request.id.clone(),
            from: current.status.to_string(),
            operation: action.verb(),
        })
    }

    fn audit_request(
        &self,
        actor: &Actor,
        request: &SubstitutionRequest,
        action: SubstitutionAction,
        previous: SubstitutionStatus,
    ) -> Result<()> {
        let tag = action.audit_action(previous);
        let description = match tag {
            AuditAction::ApproveSubstitutionRequest => {
                format!("Substitution request {} approved", request.id)
            }
            AuditAction::RejectSubstitutionRequest => {
                format!("Substitution request {} rejected by approver", request.id)
            }
            AuditAction::DeclineSubstitutionRequest => {
                format!("Substitution request {} declined by substitute", request.id)
            }
            _ => format!(
                "Substitution request {} accepted by technician {}",
                request.id, request.substitute_technician_id
            ),
        };
        self.audit().record(
            actor,
            tag,
            EntityType::SubstitutionRequest,
            &request.id,
            description,
            self.now(),
        )?;
        Ok(())
    }

    /// Undo an acceptance whose session write failed.
    ///
    /// The restore is audited on the request. A failure of that entry is
    /// logged by the recorder and does not replace the session error.
    fn restore_pending(&self, actor: &Actor, pending: &SubstitutionRequest, cause: &CoreError) {
        match self.store.update_request(pending, SubstitutionStatus::Approved) {
            Ok(true) => {
                tracing::warn!(
                    target: "aec_core::audit",
                    request_id = %pending.id,
                    "session reassignment failed; request restored to PENDING_TECH_ACCEPTANCE"
                );
                let _ = self.audit().record(
                    actor,
                    AuditAction::RevertSubstitutionAcceptance,
                    EntityType::SubstitutionRequest,
                    &pending.id,
                    format!(
                        "Acceptance of substitution request {} reverted: session write failed ({cause})",
                        pending.id
                    ),
                    self.now(),
                );
            }
            Ok(false) => tracing::error!(
                target: "aec_core::audit",
                request_id = %pending.id,
                "session reassignment failed and the request changed before it could be restored"
            ),
            Err(e) => tracing::error!(
                target: "aec_core::audit",
                request_id = %pending.id,
                error = %e,
                "session reassignment failed and the request could not be restored"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::test_support::{coordinator, roster, technician};
    use crate::schedule::test_support::{date, draft};
    use crate::session::SessionStatus;
    use crate::storage::MemoryStore;

    /// Roster with one session on Tuesday 2024-01-09, assigned to technician 3.
    fn setup() -> (Roster<MemoryStore>, String) {
        let roster = roster();
        let slot = roster
            .create_slot(&coordinator(), draft(2, "2024-01-01", "2024-01-31"))
            .unwrap();
        let session = roster
            .get_or_create_session(&coordinator(), &slot.id, date("2024-01-09"))
            .unwrap();
        (roster, session.id)
    }

    fn new_request(session_id: &str) -> NewSubstitution {
        NewSubstitution {
            session_id: session_id.into(),
            origin_technician_id: "3".into(),
            substitute_technician_id: "4".into(),
            reason: "training day".into(),
        }
    }

    fn audit_len(roster: &Roster<MemoryStore>) -> usize {
        roster.list_audit_entries().unwrap().len()
    }

    #[test]
    fn full_protocol_reassigns_the_session() {
        let (roster, session_id) = setup();
        let request = roster
            .create_request(&technician("3"), new_request(&session_id), date("2024-01-01"))
            .unwrap();
        assert_eq!(request.status, SubstitutionStatus::PendingApproval);

        roster.approve(&coordinator(), &request.id).unwrap();
        let before_accept = audit_len(&roster);
        let accepted = roster.accept(&technician("4"), &request.id).unwrap();
        assert_eq!(accepted.status, SubstitutionStatus::Approved);

        let session = roster.session(&session_id).unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Substituted);
        assert_eq!(session.assigned_technician_id, "4");

        let entries = roster.list_audit_entries().unwrap();
        assert_eq!(entries.len(), before_accept + 2);
        assert_eq!(entries[before_accept].action, AuditAction::AcceptSubstitutionRequest);
        assert_eq!(entries[before_accept + 1].action, AuditAction::AssignSessionSubstitute);
        assert_eq!(entries[before_accept + 1].entity_id, session_id);
    }

    #[test]
    fn create_rejects_past_and_non_planned_sessions() {
        let (roster, session_id) = setup();
        let tech = technician("3");

        // same day is still upcoming
        assert!(roster
            .create_request(&tech, new_request(&session_id), date("2024-01-09"))
            .is_ok());
        assert!(matches!(
            roster.create_request(&tech, new_request(&session_id), date("2024-01-10")),
            Err(CoreError::PreconditionViolation(_))
        ));

        roster.cancel_session(&coordinator(), &session_id).unwrap();
        assert!(matches!(
            roster.create_request(&tech, new_request(&session_id), date("2024-01-01")),
            Err(CoreError::PreconditionViolation(_))
        ));
        assert!(matches!(
            roster.create_request(&tech, new_request("nope"), date("2024-01-01")),
            Err(CoreError::NotFound { entity: "session", .. })
        ));
    }

    #[test]
    fn reject_then_decline_tags() {
        let (roster, session_id) = setup();
        let tech = technician("3");
        let today = date("2024-01-01");

        let first = roster.create_request(&tech, new_request(&session_id), today).unwrap();
        roster.reject(&coordinator(), &first.id).unwrap();

        let second = roster.create_request(&tech, new_request(&session_id), today).unwrap();
        roster.approve(&coordinator(), &second.id).unwrap();
        let declined = roster.reject(&technician("4"), &second.id).unwrap();
        assert_eq!(declined.status, SubstitutionStatus::Rejected);

        let actions: Vec<AuditAction> = roster
            .list_audit_entries()
            .unwrap()
            .into_iter()
            .filter(|e| e.entity_type == EntityType::SubstitutionRequest)
            .map(|e| e.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::CreateSubstitutionRequest,
                AuditAction::RejectSubstitutionRequest,
                AuditAction::CreateSubstitutionRequest,
                AuditAction::ApproveSubstitutionRequest,
                AuditAction::DeclineSubstitutionRequest,
            ]
        );
        // session untouched by rejected requests
        assert_eq!(
            roster.session(&session_id).unwrap().unwrap().status,
            SessionStatus::Planned
        );
    }

    #[test]
    fn reject_after_approval_is_invalid() {
        let (roster, session_id) = setup();
        let request = roster
            .create_request(&technician("3"), new_request(&session_id), date("2024-01-01"))
            .unwrap();
        roster.approve(&coordinator(), &request.id).unwrap();
        roster.accept(&technician("4"), &request.id).unwrap();

        let before = roster.request(&request.id).unwrap().unwrap();
        let entries_before = audit_len(&roster);
        let err = roster.reject(&coordinator(), &request.id).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { operation: "reject", .. }));
        assert_eq!(roster.request(&request.id).unwrap().unwrap(), before);
        assert_eq!(audit_len(&roster), entries_before);
    }

    #[test]
    fn accept_before_approval_is_invalid() {
        let (roster, session_id) = setup();
        let request = roster
            .create_request(&technician("3"), new_request(&session_id), date("2024-01-01"))
            .unwrap();
        assert!(matches!(
            roster.accept(&technician("4"), &request.id),
            Err(CoreError::InvalidTransition { operation: "accept", .. })
        ));
    }

    #[test]
    fn accept_checks_the_session_before_writing() {
        let (roster, session_id) = setup();
        let request = roster
            .create_request(&technician("3"), new_request(&session_id), date("2024-01-01"))
            .unwrap();
        roster.approve(&coordinator(), &request.id).unwrap();
        roster.cancel_session(&coordinator(), &session_id).unwrap();

        let entries_before = audit_len(&roster);
        let err = roster.accept(&technician("4"), &request.id).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { entity: "session", .. }));
        assert_eq!(
            roster.request(&request.id).unwrap().unwrap().status,
            SubstitutionStatus::PendingTechAcceptance
        );
        assert_eq!(audit_len(&roster), entries_before);
    }

    #[test]
    fn failed_session_write_restores_the_request() {
        let (roster, session_id) = setup();
        let request = roster
            .create_request(&technician("3"), new_request(&session_id), date("2024-01-01"))
            .unwrap();
        roster.approve(&coordinator(), &request.id).unwrap();

        roster.store().fail_session_writes(true);
        let err = roster.accept(&technician("4"), &request.id).unwrap_err();
        assert!(matches!(err, CoreError::StoreUnavailable(_)));
        roster.store().fail_session_writes(false);

        assert_eq!(
            roster.request(&request.id).unwrap().unwrap().status,
            SubstitutionStatus::PendingTechAcceptance
        );
        let session = roster.session(&session_id).unwrap().unwrap();
        assert_eq!(session.assigned_technician_id, "3");

        let trail = || -> Vec<AuditAction> {
            roster
                .list_audit_entries()
                .unwrap()
                .into_iter()
                .filter(|e| e.entity_id == request.id)
                .map(|e| e.action)
                .collect()
        };
        assert_eq!(
            trail(),
            vec![
                AuditAction::CreateSubstitutionRequest,
                AuditAction::ApproveSubstitutionRequest,
                AuditAction::AcceptSubstitutionRequest,
                AuditAction::RevertSubstitutionAcceptance,
            ]
        );
        let revert = roster.list_audit_entries().unwrap().pop().unwrap();
        assert_eq!(revert.actor_user_id, "4");
        assert!(revert.description.contains("reverted"));

        // a retry goes through, and the trail reads accept, revert, accept
        roster.accept(&technician("4"), &request.id).unwrap();
        assert_eq!(
            roster.session(&session_id).unwrap().unwrap().assigned_technician_id,
            "4"
        );
        assert_eq!(
            trail()[3..],
            [
                AuditAction::RevertSubstitutionAcceptance,
                AuditAction::AcceptSubstitutionRequest,
            ]
        );
    }

    #[test]
    fn audit_failure_on_accept_still_reassigns() {
        let (roster, session_id) = setup();
        let request = roster
            .create_request(&technician("3"), new_request(&session_id), date("2024-01-01"))
            .unwrap();
        roster.approve(&coordinator(), &request.id).unwrap();

        roster.store().fail_audit_appends(true);
        let err = roster.accept(&technician("4"), &request.id).unwrap_err();
        assert!(matches!(
            err,
            CoreError::AuditWriteFailed { action: AuditAction::AcceptSubstitutionRequest, .. }
        ));
        assert_eq!(
            roster.request(&request.id).unwrap().unwrap().status,
            SubstitutionStatus::Approved
        );
        assert_eq!(
            roster.session(&session_id).unwrap().unwrap().status,
            SessionStatus::Substituted
        );
    }
}
