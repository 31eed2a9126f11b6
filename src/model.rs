//! Domain types shared by the roster loader, the reconciler and the controller.
//!
//! These are plain values. They are produced by an [`AttendanceStore`](crate::AttendanceStore)
//! and never hold a database handle themselves.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::geofence::{GeoPoint, Geofence};

/// Identifier of a scheduled class session.
pub type SessionId = i64;
/// Identifier of a student.
pub type StudentId = i64;
/// Identifier of a persisted attendance record.
pub type RecordId = i64;

/// Course a class session belongs to, with the cohort it is taught to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseRef {
    pub id: i64,
    pub department_id: i64,
    pub batch_id: i64,
}

/// Campus hosting a class session. Its geofence is inherited by every session held there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampusRef {
    pub id: i64,
    pub geofence: Geofence,
}

/// One scheduled meeting of a course. Read-only for this crate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSession {
    pub id: SessionId,
    pub course: CourseRef,
    pub campus: CampusRef,
    pub lecturer_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub starts_at: OffsetDateTime,
    pub duration: Duration,
    pub room: Option<String>,
}

/// A student as listed for a cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub registration_number: String,
    pub department_id: i64,
    pub batch_id: i64,
}

/// Persisted attendance status. `Late` exists in the store but is never written by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two statuses a lecturer can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Present,
    Absent,
}

impl Mark {
    /// `Present` when selected, `Absent` otherwise.
    pub fn from_selected(selected: bool) -> Self {
        if selected {
            Mark::Present
        } else {
            Mark::Absent
        }
    }
}

impl From<Mark> for AttendanceStatus {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::Present => AttendanceStatus::Present,
            Mark::Absent => AttendanceStatus::Absent,
        }
    }
}

/// A persisted attendance row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub session_id: SessionId,
    pub student_id: StudentId,
    pub status: AttendanceStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
    pub location: Option<GeoPoint>,
}

/// Row shape handed to [`AttendanceStore::insert_records`](crate::AttendanceStore::insert_records).
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendanceRecord {
    pub session_id: SessionId,
    pub student_id: StudentId,
    pub status: AttendanceStatus,
    pub recorded_at: OffsetDateTime,
    pub location: Option<GeoPoint>,
}

/// Which records of a session a delete applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordScope {
    All,
    Students(Vec<StudentId>),
}

impl RecordScope {
    pub fn covers(&self, student_id: StudentId) -> bool {
        match self {
            RecordScope::All => true,
            RecordScope::Students(ids) => ids.contains(&student_id),
        }
    }
}

/// One roster row as shown to the lecturer.
///
/// `status == None` is the "unset" projection: no record exists for this student yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterEntry {
    pub student_id: StudentId,
    pub name: String,
    pub registration_number: String,
    pub status: Option<AttendanceStatus>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub recorded_at: Option<OffsetDateTime>,
    pub record_id: Option<RecordId>,
}

impl RosterEntry {
    pub(crate) fn unset(student: Student) -> Self {
        Self {
            student_id: student.id,
            name: student.name,
            registration_number: student.registration_number,
            status: None,
            recorded_at: None,
            record_id: None,
        }
    }

    /// Overlays a confirmed record onto this row.
    pub(crate) fn apply(&mut self, record: &AttendanceRecord) {
        self.status = Some(record.status);
        self.recorded_at = Some(record.recorded_at);
        self.record_id = Some(record.id);
    }

    /// Drops the projection back to unset.
    pub(crate) fn clear(&mut self) {
        self.status = None;
        self.recorded_at = None;
        self.record_id = None;
    }
}

/// Counts over the confirmed roster projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub unset: usize,
}

impl AttendanceSummary {
    pub fn of(roster: &[RosterEntry]) -> Self {
        roster.iter().fold(Self::default(), |mut acc, entry| {
            match entry.status {
                Some(AttendanceStatus::Present) => acc.present += 1,
                Some(AttendanceStatus::Absent) => acc.absent += 1,
                Some(AttendanceStatus::Late) => acc.late += 1,
                None => acc.unset += 1,
            }
            acc
        })
    }
}
