//! Identity events reported by the login/user-management collaborator.

use serde::{Deserialize, Serialize};

use super::AuditAction;
use crate::actor::Role;

/// A change to user identity that must land in the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdentityEvent {
    SignedIn,
    SignedOut,
    UserCreated {
        user_id: String,
        email: String,
        role: Role,
    },
    UserEdited {
        user_id: String,
    },
    RoleChanged {
        user_id: String,
        from: Role,
        to: Role,
    },
    UserActivated {
        user_id: String,
    },
    UserDeactivated {
        user_id: String,
    },
    PasswordReset {
        user_id: String,
    },
}

impl IdentityEvent {
    pub fn action(&self) -> AuditAction {
        match self {
            IdentityEvent::SignedIn => AuditAction::Login,
            IdentityEvent::SignedOut => AuditAction::Logout,
            IdentityEvent::UserCreated { .. } => AuditAction::CreateUser,
            IdentityEvent::UserEdited { .. } => AuditAction::EditUser,
            IdentityEvent::RoleChanged { .. } => AuditAction::ChangeRole,
            IdentityEvent::UserActivated { .. } => AuditAction::ActivateUser,
            IdentityEvent::UserDeactivated { .. } => AuditAction::DeactivateUser,
            IdentityEvent::PasswordReset { .. } => AuditAction::ResetPassword,
        }
    }

    /// The user the event is about. Sign-in and sign-out are about the actor.
    pub fn subject_id<'a>(&'a self, actor_id: &'a str) -> &'a str {
        match self {
            IdentityEvent::SignedIn | IdentityEvent::SignedOut => actor_id,
            IdentityEvent::UserCreated { user_id, .. }
            | IdentityEvent::UserEdited { user_id }
            | IdentityEvent::RoleChanged { user_id, .. }
            | IdentityEvent::UserActivated { user_id }
            | IdentityEvent::UserDeactivated { user_id }
            | IdentityEvent::PasswordReset { user_id } => user_id,
        }
    }

    pub fn description(&self, actor_email: &str) -> String {
        match self {
            IdentityEvent::SignedIn => format!("Signed in: {actor_email}"),
            IdentityEvent::SignedOut => format!("Signed out: {actor_email}"),
            IdentityEvent::UserCreated { user_id, email, role } => {
                format!("User created: {user_id} ({email}), role {role}")
            }
            IdentityEvent::UserEdited { user_id } => format!("User edited: {user_id}"),
            IdentityEvent::RoleChanged { user_id, from, to } => {
                format!("User {user_id}: role changed from {from} to {to}")
            }
            IdentityEvent::UserActivated { user_id } => format!("User {user_id} activated"),
            IdentityEvent::UserDeactivated { user_id } => format!("User {user_id} deactivated"),
            IdentityEvent::PasswordReset { user_id } => {
                format!("Password reset for user {user_id}")
            }
        }
    }
}
