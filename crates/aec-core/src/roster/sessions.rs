use chrono::{Days, NaiveDate};

use super::Roster;
use crate::actor::Actor;
use crate::audit::{AuditAction, EntityType};
use crate::error::{CoreError, Result};
use crate::schedule::expand_slot;
use crate::session::machine::{self, SessionTransition};
use crate::session::{audit_action_for, session_key, AttendanceReport, SessionRecord, SessionStatus};
use crate::storage::RecordStore;

fn describe(record: &SessionRecord, action: AuditAction) -> String {
    match action {
        AuditAction::MarkSessionCompleted => format!(
            "Session {} signed off as COMPLETED ({} attendees)",
            record.id,
            record.attendee_count.unwrap_or(0)
        ),
        AuditAction::MarkSessionTechnicianAbsent => {
            format!("Session {} marked TECHNICIAN_ABSENT", record.id)
        }
        AuditAction::MarkSessionCancelled => format!("Session {} cancelled", record.id),
        AuditAction::AssignSessionSubstitute => format!(
            "Session {} reassigned to technician {}",
            record.id, record.assigned_technician_id
        ),
        _ => format!(
            "Attendance recorded for session {}: {} attendees",
            record.id,
            record.attendee_count.unwrap_or(0)
        ),
    }
}

impl<S: RecordStore> Roster<S> {
    /// Create the missing session records of every active slot in
    /// `[window_start, window_end]`.
    ///
    /// Returns only the records this call created. Existing records are left
    /// alone, so running it again over the same window returns nothing.
    pub fn materialize(
        &self,
        actor: &Actor,
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> Result<Vec<SessionRecord>> {
        let mut created = Vec::new();
        let mut audit_failure = None;

        for slot in self.store.slots()?.iter().filter(|s| s.active) {
            for record in expand_slot(slot, window_start, window_end) {
                if !self.store.insert_session_if_absent(&record)? {
                    continue;
                }
                let audited = self.audit().record(
                    actor,
                    AuditAction::CreateSessionRecord,
                    EntityType::SessionRecord,
                    &record.id,
                    format!("Session created: {} on {}", slot.label(), record.date),
                    self.now(),
                );
                if let Err(e) = audited {
                    audit_failure.get_or_insert(e);
                }
                created.push(record);
            }
        }

        tracing::info!(
            %window_start,
            %window_end,
            created = created.len(),
            "materialized sessions"
        );
        match audit_failure {
            Some(e) => Err(e),
            None => Ok(created),
        }
    }

    /// Materialize the rolling look-ahead window starting at `today`.
    pub fn materialize_ahead(&self, actor: &Actor, today: NaiveDate) -> Result<Vec<SessionRecord>> {
        let days = u64::from(self.config.materialization.lookahead_days);
        let window_end = today.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);
        self.materialize(actor, today, window_end)
    }

    /// The record for `slot_id` on `date`, created on demand.
    pub fn get_or_create_session(
        &self,
        actor: &Actor,
        slot_id: &str,
        date: NaiveDate,
    ) -> Result<SessionRecord> {
        let slot = self
            .store
            .slot(slot_id)?
            .ok_or_else(|| CoreError::not_found("slot", slot_id))?;
        if !slot.occurs_on(date) {
            return Err(CoreError::precondition(format!(
                "slot '{slot_id}' has no session on {date}"
            )));
        }

        let key = session_key(slot_id, date);
        if let Some(existing) = self.store.session(&key)? {
            return Ok(existing);
        }

        let record = SessionRecord::planned(&slot, date);
        if !self.store.insert_session_if_absent(&record)? {
            // Lost the race to another writer; theirs wins.
            return self
                .store
                .session(&key)?
                .ok_or_else(|| CoreError::not_found("session", key));
        }
        tracing::debug!(session_id = %record.id, "session created on demand");

        self.audit().record(
            actor,
            AuditAction::CreateSessionRecord,
            EntityType::SessionRecord,
            &record.id,
            format!("Session created: {} on {}", slot.label(), date),
            self.now(),
        )?;
        Ok(record)
    }

    /// Store an attendance report. A sign-off closes the session as COMPLETED
    /// whatever its status was.
    pub fn register_attendance(
        &self,
        actor: &Actor,
        session_id: &str,
        report: &AttendanceReport,
    ) -> Result<SessionRecord> {
        let mut record = self.load_session(session_id)?;
        let previous = machine::register_attendance(&mut record, report);
        self.commit_session(actor, &record, previous, "record attendance on")?;
        Ok(record)
    }

    /// PLANNED -> TECHNICIAN_ABSENT.
    pub fn mark_absent(&self, actor: &Actor, session_id: &str) -> Result<SessionRecord> {
        self.apply_transition(actor, session_id, SessionTransition::MarkAbsent)
    }

    /// PLANNED -> CANCELLED.
    pub fn cancel_session(&self, actor: &Actor, session_id: &str) -> Result<SessionRecord> {
        self.apply_transition(actor, session_id, SessionTransition::Cancel)
    }

    /// Hand the session to `technician_id` and mark it SUBSTITUTED.
    ///
    /// Only reachable through an accepted substitution request.
    pub(crate) fn reassign_technician(
        &self,
        actor: &Actor,
        session_id: &str,
        technician_id: &str,
    ) -> Result<SessionRecord> {
        let mut record = self.load_session(session_id)?;
        let previous = machine::reassign(&mut record, technician_id)?;
        self.commit_session(actor, &record, previous, SessionTransition::Substitute.verb())?;
        Ok(record)
    }

    pub fn list_sessions(&self) -> Result<Vec<SessionRecord>> {
        Ok(self.store.sessions()?)
    }

    pub fn session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        Ok(self.store.session(session_id)?)
    }

    fn load_session(&self, session_id: &str) -> Result<SessionRecord> {
        self.store
            .session(session_id)?
            .ok_or_else(|| CoreError::not_found("session", session_id))
    }

    fn apply_transition(
        &self,
        actor: &Actor,
        session_id: &str,
        transition: SessionTransition,
    ) -> Result<SessionRecord> {
        let mut record = self.load_session(session_id)?;
        let previous = transition.apply(&mut record)?;
        self.commit_session(actor, &record, previous, transition.verb())?;
        Ok(record)
    }

    /// Compare-and-set `record` over `previous`, then audit the change.
    fn commit_session(
        &self,
        actor: &Actor,
        record: &SessionRecord,
        previous: SessionStatus,
        operation: &'static str,
    ) -> Result<()> {
        if !self.store.update_session(record, previous)? {
            let current = self.load_session(&record.id)?;
            tracing::debug!(
                session_id = %record.id,
                expected = %previous,
                found = %current.status,
                "session changed underneath us"
            );
            return Err(CoreError::InvalidTransition {
                entity: "session",
                id: record.id.clone(),
                from: current.status.to_string(),
                operation,
            });
        }

        let action = audit_action_for(previous, record.status);
        tracing::debug!(session_id = %record.id, from = %previous, to = %record.status, "session updated");
        self.audit().record(
            actor,
            action,
            EntityType::SessionRecord,
            &record.id,
            describe(record, action),
            self.now(),
        )?;
        Ok(())
    }
}
