//! Identity gate.
//!
//! Authentication happens outside the ledger. Whatever scheme produced the
//! [`Principal`] is trusted verbatim; this module only answers "may this
//! principal perform this operation, and on whose behalf?".

use crate::error::{LedgerError, Result};
use crate::types::StudentId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role attached to an authenticated principal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Staff member: creates and cancels events, acts on behalf of students
    Admin,
    /// Student: registers, attends and rates events for itself
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::Student => f.write_str("student"),
        }
    }
}

/// The authenticated identity attached to a request.
///
/// A student principal always carries its student id and an admin principal
/// never does; the constructors make other combinations unrepresentable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Principal {
    role: Role,
    student_id: Option<StudentId>,
}

impl Principal {
    /// An administrator.
    #[must_use]
    pub const fn admin() -> Self {
        Self {
            role: Role::Admin,
            student_id: None,
        }
    }

    /// A student acting as itself.
    #[must_use]
    pub const fn student(student_id: StudentId) -> Self {
        Self {
            role: Role::Student,
            student_id: Some(student_id),
        }
    }

    /// Build a principal from an externally supplied descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] when a student descriptor has
    /// no student id, or an admin descriptor has one.
    pub fn from_descriptor(role: Role, student_id: Option<StudentId>) -> Result<Self> {
        match (role, student_id) {
            (Role::Admin, None) => Ok(Self::admin()),
            (Role::Student, Some(id)) => Ok(Self::student(id)),
            (Role::Student, None) => Err(LedgerError::invalid_argument(
                "a student principal requires a student_id",
            )),
            (Role::Admin, Some(_)) => Err(LedgerError::invalid_argument(
                "an admin principal cannot carry a student_id",
            )),
        }
    }

    /// Role of the principal.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Student id, present iff the role is [`Role::Student`].
    #[must_use]
    pub const fn student_id(&self) -> Option<StudentId> {
        self.student_id
    }

    /// Whether the principal is an administrator.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Require the admin role.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] for a student.
    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(LedgerError::unauthorized("admin role required"))
        }
    }

    /// Require the student role and return the student's id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] for an admin.
    pub fn require_student(&self) -> Result<StudentId> {
        match (self.role, self.student_id) {
            (Role::Student, Some(id)) => Ok(id),
            _ => Err(LedgerError::unauthorized("student role required")),
        }
    }

    /// Decide which student an operation acts on.
    ///
    /// Admins must name the student and may name anyone. Students act on
    /// themselves; naming another student is rejected.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidArgument`] if an admin names no student
    /// - [`LedgerError::Unauthorized`] if a student names someone else
    pub fn resolve_subject(&self, requested: Option<StudentId>) -> Result<StudentId> {
        match (self.role, self.student_id, requested) {
            (Role::Admin, _, Some(id)) => Ok(id),
            (Role::Admin, _, None) => Err(LedgerError::invalid_argument("student_id required")),
            (Role::Student, Some(own), None) => Ok(own),
            (Role::Student, Some(own), Some(id)) if id == own => Ok(own),
            (Role::Student, Some(_), Some(_)) => Err(LedgerError::unauthorized(
                "students may only act on their own behalf",
            )),
            (Role::Student, None, _) => Err(LedgerError::unauthorized("student identity missing")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_admin_acts_on_behalf() {
        let admin = Principal::admin();
        assert_eq!(
            admin.resolve_subject(Some(StudentId::new(7))).unwrap(),
            StudentId::new(7)
        );
        assert_eq!(
            admin.resolve_subject(None).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_student_acts_on_self_only() {
        let student = Principal::student(StudentId::new(3));
        assert_eq!(student.resolve_subject(None).unwrap(), StudentId::new(3));
        assert_eq!(
            student.resolve_subject(Some(StudentId::new(3))).unwrap(),
            StudentId::new(3)
        );
        assert_eq!(
            student
                .resolve_subject(Some(StudentId::new(4)))
                .unwrap_err()
                .kind(),
            ErrorKind::Unauthorized
        );
    }

    #[test]
    fn test_role_requirements() {
        assert!(Principal::admin().require_admin().is_ok());
        assert!(Principal::admin().require_student().is_err());
        let student = Principal::student(StudentId::new(1));
        assert_eq!(student.require_admin().unwrap_err().kind(), ErrorKind::Unauthorized);
        assert_eq!(student.require_student().unwrap(), StudentId::new(1));
    }

    #[test]
    fn test_descriptor_validation() {
        assert!(Principal::from_descriptor(Role::Student, None).is_err());
        assert!(Principal::from_descriptor(Role::Admin, Some(StudentId::new(1))).is_err());
        assert_eq!(
            Principal::from_descriptor(Role::Student, Some(StudentId::new(9))).unwrap(),
            Principal::student(StudentId::new(9))
        );
    }
}
