//! Append-only audit trail.
//!
//! One [`AuditEntry`] is written immediately after every state-changing
//! operation, in the order the mutations happen. Entries are never updated or
//! removed. A failed append does not undo the mutation it describes; it is
//! logged under the `aec_core::audit` target and surfaced as
//! [`CoreError::AuditWriteFailed`].

mod identity;

pub use identity::IdentityEvent;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::Actor;
use crate::error::{CoreError, StoreResult};
use crate::storage::RecordStore;

/// Tag describing what an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Login,
    Logout,
    CreateUser,
    EditUser,
    ChangeRole,
    ActivateUser,
    DeactivateUser,
    ResetPassword,
    CreateSlot,
    EditSlot,
    DeleteSlot,
    CreateSessionRecord,
    RecordAttendance,
    MarkSessionCompleted,
    MarkSessionTechnicianAbsent,
    MarkSessionCancelled,
    AssignSessionSubstitute,
    CreateSubstitutionRequest,
    ApproveSubstitutionRequest,
    RejectSubstitutionRequest,
    AcceptSubstitutionRequest,
    DeclineSubstitutionRequest,
    RevertSubstitutionAcceptance,
}

impl AuditAction {
    pub const ALL: [AuditAction; 23] = [
        AuditAction::Login,
        AuditAction::Logout,
        AuditAction::CreateUser,
        AuditAction::EditUser,
        AuditAction::ChangeRole,
        AuditAction::ActivateUser,
        AuditAction::DeactivateUser,
        AuditAction::ResetPassword,
        AuditAction::CreateSlot,
        AuditAction::EditSlot,
        AuditAction::DeleteSlot,
        AuditAction::CreateSessionRecord,
        AuditAction::RecordAttendance,
        AuditAction::MarkSessionCompleted,
        AuditAction::MarkSessionTechnicianAbsent,
        AuditAction::MarkSessionCancelled,
        AuditAction::AssignSessionSubstitute,
        AuditAction::CreateSubstitutionRequest,
        AuditAction::ApproveSubstitutionRequest,
        AuditAction::RejectSubstitutionRequest,
        AuditAction::AcceptSubstitutionRequest,
        AuditAction::DeclineSubstitutionRequest,
        AuditAction::RevertSubstitutionAcceptance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::CreateUser => "CREATE_USER",
            AuditAction::EditUser => "EDIT_USER",
            AuditAction::ChangeRole => "CHANGE_ROLE",
            AuditAction::ActivateUser => "ACTIVATE_USER",
            AuditAction::DeactivateUser => "DEACTIVATE_USER",
            AuditAction::ResetPassword => "RESET_PASSWORD",
            AuditAction::CreateSlot => "CREATE_SLOT",
            AuditAction::EditSlot => "EDIT_SLOT",
            AuditAction::DeleteSlot => "DELETE_SLOT",
            AuditAction::CreateSessionRecord => "CREATE_SESSION_RECORD",
            AuditAction::RecordAttendance => "RECORD_ATTENDANCE",
            AuditAction::MarkSessionCompleted => "MARK_SESSION_COMPLETED",
            AuditAction::MarkSessionTechnicianAbsent => "MARK_SESSION_TECHNICIAN_ABSENT",
            AuditAction::MarkSessionCancelled => "MARK_SESSION_CANCELLED",
            AuditAction::AssignSessionSubstitute => "ASSIGN_SESSION_SUBSTITUTE",
            AuditAction::CreateSubstitutionRequest => "CREATE_SUBSTITUTION_REQUEST",
            AuditAction::ApproveSubstitutionRequest => "APPROVE_SUBSTITUTION_REQUEST",
            AuditAction::RejectSubstitutionRequest => "REJECT_SUBSTITUTION_REQUEST",
            AuditAction::AcceptSubstitutionRequest => "ACCEPT_SUBSTITUTION_REQUEST",
            AuditAction::DeclineSubstitutionRequest => "DECLINE_SUBSTITUTION_REQUEST",
            AuditAction::RevertSubstitutionAcceptance => "REVERT_SUBSTITUTION_ACCEPTANCE",
        }
    }

    /// Parse a stored tag back into an action.
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.as_str() == tag)
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of entity an audit entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    User,
    RecurringSlot,
    SessionRecord,
    SubstitutionRequest,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::User => "User",
            EntityType::RecurringSlot => "RecurringSlot",
            EntityType::SessionRecord => "SessionRecord",
            EntityType::SubstitutionRequest => "SubstitutionRequest",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "User" => Some(EntityType::User),
            "RecurringSlot" => Some(EntityType::RecurringSlot),
            "SessionRecord" => Some(EntityType::SessionRecord),
            "SubstitutionRequest" => Some(EntityType::SubstitutionRequest),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable row of the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub actor_user_id: String,
    pub actor_email: String,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// Writes audit entries into a record store.
pub struct AuditRecorder<'a, S: RecordStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> AuditRecorder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Append one entry. Fails only when the store does.
    pub fn append(
        &self,
        actor: &Actor,
        action: AuditAction,
        entity_type: EntityType,
        entity_id: &str,
        description: impl Into<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<AuditEntry> {
        let entry = AuditEntry {
            id: Uuid::new_v4().to_string(),
            actor_user_id: actor.id.clone(),
            actor_email: actor.email.clone(),
            action,
            entity_type,
            entity_id: entity_id.to_string(),
            description: description.into(),
            timestamp: at,
        };
        self.store.append_audit(&entry)?;
        Ok(entry)
    }

    /// Append the entry for a mutation that has already been applied.
    ///
    /// A store failure here is logged and mapped to `AuditWriteFailed`; the
    /// mutation itself stays in place.
    pub fn record(
        &self,
        actor: &Actor,
        action: AuditAction,
        entity_type: EntityType,
        entity_id: &str,
        description: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<AuditEntry, CoreError> {
        self.append(actor, action, entity_type, entity_id, description, at)
            .map_err(|source| {
                tracing::error!(
                    target: "aec_core::audit",
                    %action,
                    entity_type = %entity_type,
                    entity_id,
                    actor = %actor.id,
                    error = %source,
                    "mutation applied without audit entry; reconcile manually"
                );
                CoreError::AuditWriteFailed {
                    action,
                    entity_id: entity_id.to_string(),
                    source,
                }
            })
    }
}
