//! Seeding fixtures.

use campus_ledger_core::{College, LedgerStore, Result, Student};

/// A seeded college with its students.
#[derive(Clone, Debug)]
pub struct CampusFixture {
    /// The college
    pub college: College,
    /// Its students, in creation order
    pub students: Vec<Student>,
}

/// Insert one college named `college` and a student for each name.
///
/// # Errors
///
/// Propagates any store error.
pub async fn seed_campus(
    store: &dyn LedgerStore,
    college: &str,
    students: &[&str],
) -> Result<CampusFixture> {
    let college = store.insert_college(college.to_string()).await?;
    let mut seeded = Vec::with_capacity(students.len());
    for name in students {
        seeded.push(store.insert_student((*name).to_string(), college.id).await?);
    }
    Ok(CampusFixture {
        college,
        students: seeded,
    })
}
