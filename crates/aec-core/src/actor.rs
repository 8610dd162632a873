//! The acting user threaded through every core call.

use serde::{Deserialize, Serialize};

/// Profile of a user as reported by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Administrator,
    Coordinator,
    Technician,
}

impl Role {
    /// Administrators and coordinators approve or reject pending requests.
    pub fn can_approve_substitutions(&self) -> bool {
        matches!(self, Role::Administrator | Role::Coordinator)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "ADMINISTRATOR",
            Role::Coordinator => "COORDINATOR",
            Role::Technician => "TECHNICIAN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMINISTRATOR" | "ADMIN" => Ok(Role::Administrator),
            "COORDINATOR" => Ok(Role::Coordinator),
            "TECHNICIAN" | "TECH" => Ok(Role::Technician),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Who is performing an operation. Stamped on every audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role,
        }
    }
}
