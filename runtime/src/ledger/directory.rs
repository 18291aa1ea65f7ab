//! Directory operations: colleges and students.

use super::EventLedger;
use campus_ledger_core::store::Scope;
use campus_ledger_core::types::normalize_name;
use campus_ledger_core::{College, CollegeId, Principal, Result, Student, StudentId};

/// Longest accepted college or student name.
pub const MAX_NAME_LEN: usize = 100;

impl EventLedger {
    /// Create a college. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for a non-admin and `InvalidArgument` for a
    /// blank name.
    #[tracing::instrument(skip(self))]
    pub async fn create_college(&self, principal: &Principal, name: &str) -> Result<College> {
        principal.require_admin()?;
        let name = normalize_name("name", name, MAX_NAME_LEN)?;
        let college = self.store.insert_college(name).await?;
        tracing::info!(college_id = %college.id, "College created");
        Ok(college)
    }

    /// All colleges ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store cannot be read.
    pub async fn list_colleges(&self) -> Result<Vec<College>> {
        self.read("list_colleges", || self.store.list_colleges()).await
    }

    /// Create a student in a college. Admin only.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` for a non-admin
    /// - `InvalidArgument` for a blank name
    /// - `NotFound` for an unknown college
    #[tracing::instrument(skip(self))]
    pub async fn create_student(
        &self,
        principal: &Principal,
        name: &str,
        college_id: CollegeId,
    ) -> Result<Student> {
        principal.require_admin()?;
        let name = normalize_name("name", name, MAX_NAME_LEN)?;
        let student = self.store.insert_student(name, college_id).await?;
        tracing::info!(student_id = %student.id, college_id = %college_id, "Student created");
        Ok(student)
    }

    /// Look up one student.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub async fn get_student(&self, student_id: StudentId) -> Result<Student> {
        self.existing_student(student_id).await
    }

    /// Students in scope ordered by id. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for a non-admin.
    pub async fn list_students(&self, principal: &Principal, scope: Scope) -> Result<Vec<Student>> {
        principal.require_admin()?;
        self.read("list_students", || self.store.list_students(scope)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::memory::InMemoryLedgerStore;
    use campus_ledger_core::ErrorKind;
    use campus_ledger_testing::test_clock;
    use std::sync::Arc;

    fn ledger() -> EventLedger {
        EventLedger::new(Arc::new(InMemoryLedgerStore::new()), Arc::new(test_clock()))
    }

    #[tokio::test]
    async fn test_directory_round() {
        let ledger = ledger();
        let admin = Principal::admin();
        let college = ledger.create_college(&admin, " Engineering ").await.unwrap();
        assert_eq!(college.name, "Engineering");

        let student = ledger.create_student(&admin, "Asha", college.id).await.unwrap();
        assert_eq!(student.college_id, college.id);

        let students = ledger.list_students(&admin, Scope::college(college.id)).await.unwrap();
        assert_eq!(ledger.get_student(student.id).await.unwrap(), student);
        assert_eq!(students, vec![student]);
        assert_eq!(ledger.list_colleges().await.unwrap(), vec![college]);
    }

    #[tokio::test]
    async fn test_directory_rejections() {
        let ledger = ledger();
        let admin = Principal::admin();
        let student = Principal::student(StudentId::new(1));

        assert_eq!(
            ledger.create_college(&student, "X").await.unwrap_err().kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            ledger.create_college(&admin, "   ").await.unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            ledger
                .create_student(&admin, "Ghost", CollegeId::new(9))
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ledger.list_students(&student, Scope::all()).await.unwrap_err().kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            ledger.get_student(StudentId::new(1)).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
