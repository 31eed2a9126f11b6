//! Database entity models for attendance-capture.
//!
//! This module contains the Sea-ORM entity definitions used by [`SeaOrmStore`](crate::SeaOrmStore).
//! Campuses, courses, class sessions and students are owned by the scheduling and
//! enrolment features of the wider application; this crate only reads them. The
//! `attendance_record` entity is the one table this crate writes.

/// Campus with its registered center and allowed reporting radius.
pub mod campus;

/// Course taught to one department and batch.
pub mod course;

/// Scheduled meeting of a course on a campus.
pub mod class_session;

/// Enrolled student.
pub mod student;

/// Attendance status of one student in one class session.
pub mod attendance_record;
