use async_trait::async_trait;

use crate::error::{ReconcileStep, ReplaceError, StoreError};
use crate::model::{
    AttendanceRecord, ClassSession, NewAttendanceRecord, RecordScope, SessionId, Student,
};

/// Data-store boundary of the engine.
///
/// Academic entities are read-only here. Attendance records are only ever removed with
/// [`delete_records`](Self::delete_records) and added with
/// [`insert_records`](Self::insert_records), both reached through
/// [`replace_records`](Self::replace_records).
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Resolves a scheduled session with its course cohort and campus geofence.
    async fn class_session(&self, id: SessionId) -> Result<Option<ClassSession>, StoreError>;

    /// Students whose department AND batch both match.
    async fn students_in_cohort(
        &self,
        department_id: i64,
        batch_id: i64,
    ) -> Result<Vec<Student>, StoreError>;

    async fn records_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Returns the number of rows removed.
    async fn delete_records(
        &self,
        session_id: SessionId,
        scope: &RecordScope,
    ) -> Result<u64, StoreError>;

    /// Inserts every row and returns them as stored.
    async fn insert_records(
        &self,
        rows: Vec<NewAttendanceRecord>,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Deletes the scoped records of a session, then inserts `rows`.
    ///
    /// The default runs the two steps back to back: if the insert fails the scoped
    /// records are gone. Stores with transactions should override this and make the
    /// pair atomic.
    async fn replace_records(
        &self,
        session_id: SessionId,
        scope: &RecordScope,
        rows: Vec<NewAttendanceRecord>,
    ) -> Result<Vec<AttendanceRecord>, ReplaceError> {
        self.delete_records(session_id, scope)
            .await
            .map_err(|source| ReplaceError {
                step: ReconcileStep::Delete,
                source,
            })?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        self.insert_records(rows)
            .await
            .map_err(|source| ReplaceError {
                step: ReconcileStep::Insert,
                source,
            })
    }
}

#[async_trait]
impl<T: AttendanceStore + ?Sized> AttendanceStore for std::sync::Arc<T> {
    async fn class_session(&self, id: SessionId) -> Result<Option<ClassSession>, StoreError> {
        (**self).class_session(id).await
    }

    async fn students_in_cohort(
        &self,
        department_id: i64,
        batch_id: i64,
    ) -> Result<Vec<Student>, StoreError> {
        (**self).students_in_cohort(department_id, batch_id).await
    }

    async fn records_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        (**self).records_for_session(session_id).await
    }

    async fn delete_records(
        &self,
        session_id: SessionId,
        scope: &RecordScope,
    ) -> Result<u64, StoreError> {
        (**self).delete_records(session_id, scope).await
    }

    async fn insert_records(
        &self,
        rows: Vec<NewAttendanceRecord>,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        (**self).insert_records(rows).await
    }

    async fn replace_records(
        &self,
        session_id: SessionId,
        scope: &RecordScope,
        rows: Vec<NewAttendanceRecord>,
    ) -> Result<Vec<AttendanceRecord>, ReplaceError> {
        (**self).replace_records(session_id, scope, rows).await
    }
}
