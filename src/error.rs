//! Error types raised at each boundary of the engine.
//!
//! Store and location failures never leave the controller raw: they are wrapped into
//! [`Error`] together with the session id and the [`Operation`] that was attempted.

use std::fmt;

use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{SessionId, StudentId};

/// Failure reported by an [`AttendanceStore`](crate::AttendanceStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Failure reported by a [`LocationProvider`](crate::LocationProvider).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable: {0}")]
    Unavailable(String),
    #[error("timed out waiting for a position fix")]
    Timeout,
}

/// Which half of a delete-then-insert failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStep {
    Delete,
    Insert,
}

impl fmt::Display for ReconcileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileStep::Delete => f.write_str("delete"),
            ReconcileStep::Insert => f.write_str("insert"),
        }
    }
}

/// A failed [`AttendanceStore::replace_records`](crate::AttendanceStore::replace_records).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{step} step failed: {source}")]
pub struct ReplaceError {
    pub step: ReconcileStep,
    #[source]
    pub source: StoreError,
}

/// Controller operations, named in error messages and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SubmitAll,
    MarkStudent,
    MarkSelectedPresent,
    MarkUnselectedAbsent,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::SubmitAll => "submit attendance",
            Operation::MarkStudent => "mark student",
            Operation::MarkSelectedPresent => "mark selected present",
            Operation::MarkUnselectedAbsent => "mark unselected absent",
        };
        f.write_str(name)
    }
}

/// The precondition that blocked a mutation. The remediation differs per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Move closer to campus or grant location access.
    Location,
    /// Leave and re-enter the session.
    EditWindow,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("no class session is selected")]
    NoSessionSelected,

    #[error("class session {session_id} was not found")]
    SessionNotFound { session_id: SessionId },

    #[error("student {student_id} is not on the roster of session {session_id}")]
    UnknownStudent {
        session_id: SessionId,
        student_id: StudentId,
    },

    #[error(
        "{operation} blocked for session {session_id}: reporter is {distance_m:.0} m from campus, allowed radius is {radius_m:.0} m"
    )]
    GeofenceViolation {
        session_id: SessionId,
        operation: Operation,
        distance_m: f64,
        radius_m: f64,
    },

    #[error("{operation} blocked for session {session_id}: {source}")]
    LocationUnavailable {
        session_id: SessionId,
        operation: Operation,
        #[source]
        source: LocationError,
    },

    #[error("{operation} blocked for session {session_id}: the edit window closed at {locked_at}")]
    EditWindowLocked {
        session_id: SessionId,
        operation: Operation,
        locked_at: OffsetDateTime,
    },

    #[error("roster for session {session_id} is unavailable: {source}")]
    RosterUnavailable {
        session_id: SessionId,
        #[source]
        source: StoreError,
    },

    #[error("{operation} failed for session {session_id} at the {step} step: {source}")]
    ReconciliationFailure {
        session_id: SessionId,
        operation: Operation,
        step: ReconcileStep,
        #[source]
        source: StoreError,
    },
}

impl Error {
    /// The precondition that blocked the operation, if that is why it failed.
    ///
    /// A missing position fix counts as a location failure: without a fix presence
    /// cannot be proven.
    pub fn blocked_by(&self) -> Option<Precondition> {
        match self {
            Error::GeofenceViolation { .. } | Error::LocationUnavailable { .. } => {
                Some(Precondition::Location)
            }
            Error::EditWindowLocked { .. } => Some(Precondition::EditWindow),
            _ => None,
        }
    }

    /// Whether repeating the same call may succeed without leaving the session.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::GeofenceViolation { .. }
                | Error::LocationUnavailable { .. }
                | Error::RosterUnavailable { .. }
                | Error::ReconciliationFailure { .. }
        )
    }

    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            Error::NoSessionSelected => None,
            Error::SessionNotFound { session_id }
            | Error::UnknownStudent { session_id, .. }
            | Error::GeofenceViolation { session_id, .. }
            | Error::LocationUnavailable { session_id, .. }
            | Error::EditWindowLocked { session_id, .. }
            | Error::RosterUnavailable { session_id, .. }
            | Error::ReconciliationFailure { session_id, .. } => Some(*session_id),
        }
    }
}

/// A bad value in the environment-driven configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{name} is {value}, the maximum is {max}")]
    OutOfRange {
        name: &'static str,
        value: u64,
        max: u64,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
