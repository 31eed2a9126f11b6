//! Builds the roster a lecturer marks for one class session.

use std::collections::HashMap;

use tracing::debug;

use crate::error::StoreError;
use crate::model::{AttendanceRecord, ClassSession, RosterEntry, StudentId};
use crate::store::AttendanceStore;

/// Loads the cohort of `session` and overlays any attendance already recorded.
///
/// The result has exactly one entry per student whose department and batch both match
/// the session's course. Records for students outside that cohort are ignored. Any
/// store failure yields an error and no roster at all.
pub async fn load_roster<S>(store: &S, session: &ClassSession) -> Result<Vec<RosterEntry>, StoreError>
where
    S: AttendanceStore + ?Sized,
{
    let students = store
        .students_in_cohort(session.course.department_id, session.course.batch_id)
        .await?;
    let records = store.records_for_session(session.id).await?;

    let by_student = latest_by_student(records);

    let mut roster: Vec<RosterEntry> = students
        .into_iter()
        // The store filters too; this keeps a sloppy backend from widening the cohort.
        .filter(|s| {
            s.department_id == session.course.department_id && s.batch_id == session.course.batch_id
        })
        .map(|student| {
            let record = by_student.get(&student.id);
            let mut entry = RosterEntry::unset(student);
            if let Some(record) = record {
                entry.apply(record);
            }
            entry
        })
        .collect();

    sort_by_name(&mut roster);

    debug!(
        session_id = session.id,
        students = roster.len(),
        marked = roster.iter().filter(|e| e.status.is_some()).count(),
        "roster loaded"
    );

    Ok(roster)
}

/// Case-insensitive ascending by name; ties keep their input order.
pub(crate) fn sort_by_name(roster: &mut [RosterEntry]) {
    roster.sort_by_cached_key(|e| e.name.to_lowercase());
}

// At most one record per (session, student) should exist; if a concurrent writer left
// more, the most recent one wins.
fn latest_by_student(records: Vec<AttendanceRecord>) -> HashMap<StudentId, AttendanceRecord> {
    let mut map: HashMap<StudentId, AttendanceRecord> = HashMap::with_capacity(records.len());
    for record in records {
        let newer = map.get(&record.student_id).map_or(true, |existing| {
            (existing.recorded_at, existing.id) < (record.recorded_at, record.id)
        });
        if newer {
            map.insert(record.student_id, record);
        }
    }
    map
}
