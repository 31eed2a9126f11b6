use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{
    AttendanceRecord, ClassSession, NewAttendanceRecord, RecordId, RecordScope, SessionId,
    Student,
};
use crate::store::AttendanceStore;

/// Store calls that can be made to fail once with [`MemoryStore::fail_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    ClassSession,
    Students,
    Records,
    Delete,
    Insert,
}

/// An in-process [`AttendanceStore`].
///
/// Uses the trait's default, non-transactional `replace_records`, so a failed insert
/// leaves the deleted records gone.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    sessions: BTreeMap<SessionId, ClassSession>,
    students: Vec<Student>,
    records: BTreeMap<RecordId, AttendanceRecord>,
    next_record_id: RecordId,
    armed: HashSet<FailPoint>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_class_session(&self, session: ClassSession) {
        self.lock().sessions.insert(session.id, session);
    }

    pub fn add_student(&self, student: Student) {
        self.lock().students.push(student);
    }

    /// Stores a record directly, bypassing the reconciler.
    pub fn seed_record(&self, row: NewAttendanceRecord) -> AttendanceRecord {
        self.lock().insert(row)
    }

    /// Every record of a session, ordered by record id.
    pub fn snapshot(&self, session_id: SessionId) -> Vec<AttendanceRecord> {
        self.lock()
            .records
            .values()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect()
    }

    /// Makes the next call at `point` fail with a backend error.
    pub fn fail_next(&self, point: FailPoint) {
        self.lock().armed.insert(point);
    }
}

impl Inner {
    fn trip(&mut self, point: FailPoint) -> Result<(), StoreError> {
        if self.armed.remove(&point) {
            return Err(StoreError::Backend(format!("injected {point:?} failure")));
        }
        Ok(())
    }

    fn insert(&mut self, row: NewAttendanceRecord) -> AttendanceRecord {
        self.next_record_id += 1;
        let record = AttendanceRecord {
            id: self.next_record_id,
            session_id: row.session_id,
            student_id: row.student_id,
            status: row.status,
            recorded_at: row.recorded_at,
            location: row.location,
        };
        self.records.insert(record.id, record.clone());
        record
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn class_session(&self, id: SessionId) -> Result<Option<ClassSession>, StoreError> {
        let mut inner = self.lock();
        inner.trip(FailPoint::ClassSession)?;
        Ok(inner.sessions.get(&id).cloned())
    }

    async fn students_in_cohort(
        &self,
        department_id: i64,
        batch_id: i64,
    ) -> Result<Vec<Student>, StoreError> {
        let mut inner = self.lock();
        inner.trip(FailPoint::Students)?;
        Ok(inner
            .students
            .iter()
            .filter(|s| s.department_id == department_id && s.batch_id == batch_id)
            .cloned()
            .collect())
    }

    async fn records_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut inner = self.lock();
        inner.trip(FailPoint::Records)?;
        Ok(inner
            .records
            .values()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn delete_records(
        &self,
        session_id: SessionId,
        scope: &RecordScope,
    ) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        inner.trip(FailPoint::Delete)?;
        let before = inner.records.len();
        inner
            .records
            .retain(|_, r| !(r.session_id == session_id && scope.covers(r.student_id)));
        Ok((before - inner.records.len()) as u64)
    }

    async fn insert_records(
        &self,
        rows: Vec<NewAttendanceRecord>,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut inner = self.lock();
        inner.trip(FailPoint::Insert)?;
        Ok(rows.into_iter().map(|row| inner.insert(row)).collect())
    }
}
