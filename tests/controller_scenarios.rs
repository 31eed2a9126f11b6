mod common;

use attendance_capture::{
    AttendanceStatus, ControllerConfig, EditWindowDisplay, Error, FailPoint, LocationError, Mark,
    Operation, Precondition, ReconcileStep,
};
use common::{harness, north_of_center, ASHA, BIMAL, CHEN, SESSION_ID, T0};
use time::Duration;

fn statuses(h: &common::Harness) -> Vec<(i64, AttendanceStatus)> {
    let mut v: Vec<_> = h
        .store
        .snapshot(SESSION_ID)
        .into_iter()
        .map(|r| (r.student_id, r.status))
        .collect();
    v.sort_by_key(|(student_id, _)| *student_id);
    v
}

fn status_of(h: &common::Harness, student_id: i64) -> Option<AttendanceStatus> {
    h.controller
        .roster()
        .iter()
        .find(|e| e.student_id == student_id)
        .and_then(|e| e.status)
}

#[tokio::test]
async fn selecting_a_session_loads_the_cohort_and_selects_everyone() {
    let mut h = harness();
    let roster = h.controller.select_session_by_id(SESSION_ID).await.unwrap();

    let names: Vec<_> = roster.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Asha", "Bimal", "chen"]);
    assert!(roster.iter().all(|e| e.status.is_none()));

    let mut selected: Vec<_> = h.controller.selected_ids().collect();
    selected.sort();
    assert_eq!(selected, vec![ASHA, BIMAL, CHEN]);
    assert_eq!(h.controller.edit_window_display(), EditWindowDisplay::Idle);
}

#[tokio::test]
async fn scenario_a_submit_within_geofence() {
    let mut h = harness();
    h.controller.select_session_by_id(SESSION_ID).await.unwrap();
    assert!(!h.controller.toggle_student(CHEN).unwrap());

    let records = h.controller.submit_all().await.unwrap();
    assert_eq!(records.len(), 3);

    assert_eq!(
        statuses(&h),
        vec![
            (ASHA, AttendanceStatus::Present),
            (BIMAL, AttendanceStatus::Present),
            (CHEN, AttendanceStatus::Absent),
        ]
    );
    assert_eq!(
        h.controller.edit_window_display(),
        EditWindowDisplay::Editable {
            remaining_seconds: 900
        }
    );

    // The roster shows what the store confirmed.
    assert_eq!(status_of(&h, CHEN), Some(AttendanceStatus::Absent));
    let summary = h.controller.summary();
    assert_eq!((summary.present, summary.absent, summary.unset), (2, 1, 0));
    assert!(h
        .controller
        .roster()
        .iter()
        .all(|e| e.record_id.is_some() && e.recorded_at == Some(T0)));
}

#[tokio::test]
async fn scenario_b_mark_after_the_window_closes() {
    let mut h = harness();
    h.controller.select_session_by_id(SESSION_ID).await.unwrap();
    h.controller.submit_all().await.unwrap();
    let before = statuses(&h);

    h.clock.advance(Duration::minutes(16));
    let err = h
        .controller
        .mark_student(ASHA, Mark::Absent)
        .await
        .unwrap_err();

    match &err {
        Error::EditWindowLocked {
            session_id,
            operation,
            locked_at,
        } => {
            assert_eq!(*session_id, SESSION_ID);
            assert_eq!(*operation, Operation::MarkStudent);
            assert_eq!(*locked_at, T0 + Duration::minutes(15));
        }
        other => panic!("expected EditWindowLocked, got {other:?}"),
    }
    assert_eq!(err.blocked_by(), Some(Precondition::EditWindow));
    assert_eq!(err.session_id(), Some(SESSION_ID));
    assert!(!err.is_retryable());
    assert_eq!(statuses(&h), before);
    assert_eq!(h.controller.edit_window_display(), EditWindowDisplay::Locked);
}

#[tokio::test]
async fn scenario_c_submit_from_outside_the_geofence() {
    let mut h = harness();
    h.controller.select_session_by_id(SESSION_ID).await.unwrap();
    h.location.move_to(north_of_center(150.0));

    let err = h.controller.submit_all().await.unwrap_err();
    match &err {
        Error::GeofenceViolation {
            distance_m,
            radius_m,
            operation,
            ..
        } => {
            assert!((distance_m - 150.0).abs() < 1.0, "got {distance_m}");
            assert_eq!(*radius_m, 100.0);
            assert_eq!(*operation, Operation::SubmitAll);
        }
        other => panic!("expected GeofenceViolation, got {other:?}"),
    }
    assert_eq!(err.blocked_by(), Some(Precondition::Location));
    assert!(h.store.snapshot(SESSION_ID).is_empty());
    assert_eq!(h.controller.edit_window_display(), EditWindowDisplay::Idle);
    assert!(h.controller.roster().iter().all(|e| e.status.is_none()));
}

#[tokio::test]
async fn scenario_d_single_correction_keeps_the_timer() {
    let mut h = harness();
    h.controller.select_session_by_id(SESSION_ID).await.unwrap();
    h.controller.submit_all().await.unwrap();
    let before = h.store.snapshot(SESSION_ID);

    h.clock.advance(Duration::minutes(5));
    let changed = h
        .controller
        .mark_student(ASHA, Mark::Absent)
        .await
        .unwrap();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].student_id, ASHA);

    let after = h.store.snapshot(SESSION_ID);
    for student in [BIMAL, CHEN] {
        let old = before.iter().find(|r| r.student_id == student).unwrap();
        let new = after.iter().find(|r| r.student_id == student).unwrap();
        assert_eq!(old, new);
    }
    let asha = after.iter().find(|r| r.student_id == ASHA).unwrap();
    assert_eq!(asha.status, AttendanceStatus::Absent);
    assert_eq!(asha.recorded_at, T0 + Duration::minutes(5));

    assert_eq!(h.controller.edit_window().submitted_at(), Some(T0));
    assert_eq!(
        h.controller.edit_window_display(),
        EditWindowDisplay::Editable {
            remaining_seconds: 600
        }
    );
    assert_eq!(status_of(&h, ASHA), Some(AttendanceStatus::Absent));
}

#[tokio::test]
async fn lock_blocks_every_mutation_until_the_session_is_reentered() {
    let mut h = harness();
    h.controller.select_session_by_id(SESSION_ID).await.unwrap();
    h.controller.submit_all().await.unwrap();
    h.clock.advance(Duration::minutes(15));

    assert!(matches!(
        h.controller.submit_all().await,
        Err(Error::EditWindowLocked { .. })
    ));
    assert!(matches!(
        h.controller.mark_selected_present().await,
        Err(Error::EditWindowLocked { .. })
    ));
    assert!(matches!(
        h.controller.mark_unselected_absent().await,
        Err(Error::EditWindowLocked { .. })
    ));

    // Selecting stays free.
    assert!(!h.controller.toggle_student(BIMAL).unwrap());

    // Re-entering the session starts over from idle.
    h.controller.leave_session();
    assert!(h.controller.session().is_none());
    h.controller.select_session_by_id(SESSION_ID).await.unwrap();
    assert_eq!(h.controller.edit_window_display(), EditWindowDisplay::Idle);
    h.controller.submit_all().await.unwrap();
    assert_eq!(
        h.controller.edit_window_display(),
        EditWindowDisplay::Editable {
            remaining_seconds: 900
        }
    );
}

#[tokio::test]
async fn lock_is_reported_even_without_a_position() {
    let mut h = harness();
    h.controller.select_session_by_id(SESSION_ID).await.unwrap();
    h.controller.submit_all().await.unwrap();
    h.clock.advance(Duration::minutes(20));
    h.location.fail_with(LocationError::PermissionDenied);

    let err = h
        .controller
        .mark_student(BIMAL, Mark::Absent)
        .await
        .unwrap_err();
    assert_eq!(err.blocked_by(), Some(Precondition::EditWindow));
}

#[tokio::test]
async fn missing_position_counts_as_a_location_failure() {
    let mut h = harness();
    h.controller.select_session_by_id(SESSION_ID).await.unwrap();
    h.location
        .fail_with(LocationError::Unavailable("no GPS fix".into()));

    let err = h.controller.submit_all().await.unwrap_err();
    assert!(matches!(
        err,
        Error::LocationUnavailable {
            operation: Operation::SubmitAll,
            source: LocationError::Unavailable(_),
            ..
        }
    ));
    assert_eq!(err.blocked_by(), Some(Precondition::Location));
    assert!(err.is_retryable());
    assert!(h.store.snapshot(SESSION_ID).is_empty());

    // Moving back in range is enough; the position is asked for again.
    h.location.move_to(north_of_center(40.0));
    h.controller.submit_all().await.unwrap();
    assert_eq!(h.store.snapshot(SESSION_ID).len(), 3);
}

#[tokio::test]
async fn resubmission_restarts_the_window() {
    let mut h = harness();
    h.controller.select_session_by_id(SESSION_ID).await.unwrap();
    h.controller.submit_all().await.unwrap();

    h.clock.advance(Duration::minutes(10));
    h.controller.toggle_student(ASHA).unwrap();
    h.controller.submit_all().await.unwrap();

    assert_eq!(
        h.controller.edit_window().submitted_at(),
        Some(T0 + Duration::minutes(10))
    );
    h.clock.advance(Duration::minutes(14));
    assert_eq!(
        h.controller.edit_window_display(),
        EditWindowDisplay::Editable {
            remaining_seconds: 60
        }
    );
    assert_eq!(h.store.snapshot(SESSION_ID).len(), 3);
    assert_eq!(status_of(&h, ASHA), Some(AttendanceStatus::Absent));
}

#[tokio::test]
async fn shortcuts_touch_only_their_subset() {
    let mut h = harness();
    h.controller.select_session_by_id(SESSION_ID).await.unwrap();
    h.controller.toggle_student(CHEN).unwrap();

    let present = h.controller.mark_selected_present().await.unwrap();
    assert_eq!(present.len(), 2);
    assert_eq!(
        statuses(&h),
        vec![
            (ASHA, AttendanceStatus::Present),
            (BIMAL, AttendanceStatus::Present),
        ]
    );
    assert_eq!(status_of(&h, CHEN), None);
    // The first write of the view opens the window.
    assert_eq!(h.controller.edit_window().submitted_at(), Some(T0));

    h.clock.advance(Duration::minutes(3));
    let absent = h.controller.mark_unselected_absent().await.unwrap();
    assert_eq!(absent.len(), 1);
    assert_eq!(
        statuses(&h),
        vec![
            (ASHA, AttendanceStatus::Present),
            (BIMAL, AttendanceStatus::Present),
            (CHEN, AttendanceStatus::Absent),
        ]
    );
    // Later partial writes do not extend it.
    assert_eq!(h.controller.edit_window().submitted_at(), Some(T0));
}

#[tokio::test]
async fn empty_shortcut_writes_nothing_and_keeps_the_window_idle() {
    let mut h = harness();
    h.controller.select_session_by_id(SESSION_ID).await.unwrap();

    let records = h.controller.mark_unselected_absent().await.unwrap();
    assert!(records.is_empty());
    assert!(h.store.snapshot(SESSION_ID).is_empty());
    assert_eq!(h.controller.edit_window_display(), EditWindowDisplay::Idle);
}

#[tokio::test]
async fn toggle_all_flips_between_everyone_and_nobody() {
    let mut h = harness();
    h.controller.select_session_by_id(SESSION_ID).await.unwrap();

    assert!(!h.controller.toggle_all().unwrap());
    assert_eq!(h.controller.selected_ids().count(), 0);
    assert!(h.controller.toggle_all().unwrap());
    assert_eq!(h.controller.selected_ids().count(), 3);

    h.controller.toggle_student(ASHA).unwrap();
    assert!(h.controller.toggle_all().unwrap());
    assert!(h.controller.is_selected(ASHA));
}

#[tokio::test]
async fn unknown_students_and_missing_sessions_are_reported() {
    let mut h = harness();
    assert!(matches!(
        h.controller.toggle_student(ASHA),
        Err(Error::NoSessionSelected)
    ));
    assert!(matches!(
        h.controller.submit_all().await,
        Err(Error::NoSessionSelected)
    ));
    assert!(matches!(
        h.controller.select_session_by_id(99).await,
        Err(Error::SessionNotFound { session_id: 99 })
    ));

    h.controller.select_session_by_id(SESSION_ID).await.unwrap();
    // Dilan is in another batch.
    assert!(matches!(
        h.controller.toggle_student(4),
        Err(Error::UnknownStudent { student_id: 4, .. })
    ));
    assert!(matches!(
        h.controller.mark_student(4, Mark::Present).await,
        Err(Error::UnknownStudent { student_id: 4, .. })
    ));
}

#[tokio::test]
async fn roster_failure_blocks_writes_until_reloaded() {
    let mut h = harness();
    h.store.fail_next(FailPoint::Students);

    let err = h
        .controller
        .select_session_by_id(SESSION_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RosterUnavailable { session_id: SESSION_ID, .. }));
    assert!(err.is_retryable());
    assert!(h.controller.roster().is_empty());
    assert_eq!(h.controller.selected_ids().count(), 0);

    assert!(matches!(
        h.controller.submit_all().await,
        Err(Error::RosterUnavailable { .. })
    ));
    assert!(h.store.snapshot(SESSION_ID).is_empty());

    let roster = h.controller.reload_roster().await.unwrap();
    assert_eq!(roster.len(), 3);
    assert_eq!(h.controller.selected_ids().count(), 3);
    h.controller.submit_all().await.unwrap();
}

#[tokio::test]
async fn failed_write_shows_only_confirmed_state() {
    let mut h = harness();
    h.controller.select_session_by_id(SESSION_ID).await.unwrap();
    h.controller.submit_all().await.unwrap();

    h.store.fail_next(FailPoint::Insert);
    let err = h
        .controller
        .mark_student(BIMAL, Mark::Absent)
        .await
        .unwrap_err();
    match &err {
        Error::ReconciliationFailure {
            operation, step, ..
        } => {
            assert_eq!(*operation, Operation::MarkStudent);
            assert_eq!(*step, ReconcileStep::Insert);
        }
        other => panic!("expected ReconciliationFailure, got {other:?}"),
    }
    assert!(err.is_retryable());

    // The memory store is not transactional: Bimal's record is gone, and the roster
    // says so instead of pretending the correction happened.
    assert_eq!(status_of(&h, BIMAL), None);
    assert_eq!(status_of(&h, ASHA), Some(AttendanceStatus::Present));

    h.controller
        .mark_student(BIMAL, Mark::Absent)
        .await
        .unwrap();
    assert_eq!(status_of(&h, BIMAL), Some(AttendanceStatus::Absent));
    assert_eq!(h.store.snapshot(SESSION_ID).len(), 3);
}

#[tokio::test]
async fn failed_delete_leaves_the_roster_untouched() {
    let mut h = harness();
    h.controller.select_session_by_id(SESSION_ID).await.unwrap();
    h.controller.submit_all().await.unwrap();
    let before = h.controller.roster().to_vec();

    h.store.fail_next(FailPoint::Delete);
    h.controller.toggle_all().unwrap();
    let err = h.controller.submit_all().await.unwrap_err();
    assert!(matches!(
        err,
        Error::ReconciliationFailure {
            step: ReconcileStep::Delete,
            ..
        }
    ));
    assert_eq!(h.controller.roster(), before.as_slice());
    // No confirmed write, so the window keeps its original start.
    assert_eq!(h.controller.edit_window().submitted_at(), Some(T0));
}

#[tokio::test]
async fn existing_attendance_is_shown_on_selection() {
    let mut h = harness();
    h.controller.select_session_by_id(SESSION_ID).await.unwrap();
    h.controller.toggle_student(ASHA).unwrap();
    h.controller.submit_all().await.unwrap();

    // A fresh view of the same session sees the stored marks, all pre-selected again.
    h.controller.leave_session();
    h.controller.select_session_by_id(SESSION_ID).await.unwrap();
    assert_eq!(status_of(&h, ASHA), Some(AttendanceStatus::Absent));
    assert_eq!(status_of(&h, BIMAL), Some(AttendanceStatus::Present));
    assert!(h.controller.is_selected(ASHA));
}

#[tokio::test(start_paused = true)]
async fn countdown_follows_submissions_and_stops_on_leave() {
    let mut h = harness();
    h.controller.select_session_by_id(SESSION_ID).await.unwrap();
    let mut display = h.controller.start_countdown();
    assert_eq!(*display.borrow_and_update(), EditWindowDisplay::Idle);

    h.controller.submit_all().await.unwrap();
    display.changed().await.unwrap();
    assert_eq!(
        *display.borrow_and_update(),
        EditWindowDisplay::Editable {
            remaining_seconds: 900
        }
    );

    h.clock.advance(Duration::minutes(15));
    display.changed().await.unwrap();
    assert_eq!(*display.borrow_and_update(), EditWindowDisplay::Locked);

    h.controller.leave_session();
    assert!(display.changed().await.is_err());
}

#[tokio::test]
async fn oversized_edit_window_never_locks() {
    let common::Harness {
        clock, controller, ..
    } = harness();
    let mut controller = controller
        .with_config(ControllerConfig::default().with_edit_window(Duration::MAX));

    controller.select_session_by_id(SESSION_ID).await.unwrap();
    controller.submit_all().await.unwrap();
    assert!(matches!(
        controller.edit_window_display(),
        EditWindowDisplay::Editable { .. }
    ));

    clock.advance(Duration::days(365 * 50));
    controller.mark_student(ASHA, Mark::Absent).await.unwrap();
}
