//! Brings the persisted attendance of a session in line with a target set of marks.
//!
//! Every reconciliation is a delete of the affected records followed by an insert of
//! fresh ones, so running it twice with the same marks leaves the same content behind.
//! Both entry points take a [`VerifiedLocation`], which only a passed geofence check
//! can produce.

use std::collections::{BTreeMap, BTreeSet};

use time::OffsetDateTime;
use tracing::info;

use crate::error::ReplaceError;
use crate::geofence::VerifiedLocation;
use crate::model::{
    AttendanceRecord, AttendanceStatus, ClassSession, Mark, NewAttendanceRecord, RecordScope,
    StudentId,
};
use crate::store::AttendanceStore;

/// Rewrites every record of `session`.
///
/// `decisions` must cover the whole roster; records of students not in it are removed
/// with the rest. Returns the records as stored.
pub async fn reconcile_all<S>(
    store: &S,
    session: &ClassSession,
    decisions: &BTreeMap<StudentId, Mark>,
    location: &VerifiedLocation,
    at: OffsetDateTime,
) -> Result<Vec<AttendanceRecord>, ReplaceError>
where
    S: AttendanceStore + ?Sized,
{
    let rows = decisions
        .iter()
        .map(|(&student_id, &mark)| new_row(session, student_id, mark, location, at))
        .collect();

    let records = store
        .replace_records(session.id, &RecordScope::All, rows)
        .await?;

    info!(
        session_id = session.id,
        records = records.len(),
        present = records
            .iter()
            .filter(|r| r.status == AttendanceStatus::Present)
            .count(),
        "attendance reconciled"
    );
    Ok(records)
}

/// Rewrites the records of exactly `student_ids`, all with `mark`. Other students'
/// records are left alone.
pub async fn reconcile_partial<S>(
    store: &S,
    session: &ClassSession,
    student_ids: &[StudentId],
    mark: Mark,
    location: &VerifiedLocation,
    at: OffsetDateTime,
) -> Result<Vec<AttendanceRecord>, ReplaceError>
where
    S: AttendanceStore + ?Sized,
{
    let subset: BTreeSet<StudentId> = student_ids.iter().copied().collect();
    if subset.is_empty() {
        return Ok(Vec::new());
    }

    let rows = subset
        .iter()
        .map(|&student_id| new_row(session, student_id, mark, location, at))
        .collect();
    let scope = RecordScope::Students(subset.into_iter().collect());

    let records = store.replace_records(session.id, &scope, rows).await?;

    info!(
        session_id = session.id,
        records = records.len(),
        status = %AttendanceStatus::from(mark),
        "attendance partially reconciled"
    );
    Ok(records)
}

fn new_row(
    session: &ClassSession,
    student_id: StudentId,
    mark: Mark,
    location: &VerifiedLocation,
    at: OffsetDateTime,
) -> NewAttendanceRecord {
    NewAttendanceRecord {
        session_id: session.id,
        student_id,
        status: mark.into(),
        recorded_at: at,
        location: Some(location.point()),
    }
}
