//! Portal Authz - the authorization gate in front of the lifecycle engine
//!
//! Admins may trigger any transition on any student. Students may trigger
//! only self-service actions, and only on their own record. The service
//! facade is required to pass every mutation through [`AuthorizationGate`]
//! before it reaches the engine.

#![deny(unsafe_code)]

use portal_types::{LifecycleAction, Role, StudentId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The authenticated caller of a portal operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub role: Role,
    /// Present for student actors, absent for the admin.
    pub student_id: Option<StudentId>,
}

impl Actor {
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            student_id: None,
        }
    }

    pub fn student(id: StudentId) -> Self {
        Self {
            role: Role::Student,
            student_id: Some(id),
        }
    }
}

/// Permit/deny decisions for lifecycle actions.
pub struct AuthorizationGate;

impl AuthorizationGate {
    pub fn new() -> Self {
        Self
    }

    /// Require the admin role, for operations with no per-student target
    /// (roster listing, the proposal review queue).
    pub fn require_admin(&self, actor: &Actor) -> Result<(), AuthorizationError> {
        match actor.role {
            Role::Admin => Ok(()),
            Role::Student => Err(AuthorizationError::AdminOnly),
        }
    }

    /// Decide whether `actor` may read `target`'s record. Admins see every
    /// record; students see only their own (boards have no cross-student
    /// visibility).
    pub fn authorize_view(
        &self,
        actor: &Actor,
        target: &StudentId,
    ) -> Result<(), AuthorizationError> {
        match actor.role {
            Role::Admin => Ok(()),
            Role::Student => {
                let own_id = actor
                    .student_id
                    .as_ref()
                    .ok_or(AuthorizationError::MissingIdentity)?;
                if own_id != target {
                    return Err(AuthorizationError::NotOwner {
                        target: target.clone(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Decide whether `actor` may apply `action` to `target`.
    pub fn authorize(
        &self,
        actor: &Actor,
        target: &StudentId,
        action: &LifecycleAction,
    ) -> Result<(), AuthorizationError> {
        match actor.role {
            Role::Admin => Ok(()),
            Role::Student => {
                if !action.is_self_service() {
                    return Err(AuthorizationError::RoleDenied {
                        action: action.clone(),
                    });
                }
                let own_id = actor
                    .student_id
                    .as_ref()
                    .ok_or(AuthorizationError::MissingIdentity)?;
                if own_id != target {
                    return Err(AuthorizationError::NotOwner {
                        target: target.clone(),
                    });
                }
                Ok(())
            }
        }
    }
}

impl Default for AuthorizationGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Authorization-related errors.
#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("Action {action} is not available to students")]
    RoleDenied { action: LifecycleAction },

    #[error("Students may only act on their own record (target {target})")]
    NotOwner { target: StudentId },

    #[error("Student actor has no identity attached")]
    MissingIdentity,

    #[error("Admin role required")]
    AdminOnly,
}
