//! The attendance session controller.
//!
//! Owns which session is open, its roster, the provisional selection and the edit
//! window. Selecting students is free; every write goes through the same gate: the
//! edit window must not be locked and the reporter must be inside the campus geofence.
//! The roster only ever reflects what the store confirmed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::ControllerConfig;
use crate::countdown::Countdown;
use crate::edit_window::{EditWindow, EditWindowDisplay, EditWindowPhase};
use crate::error::{Error, Operation, ReplaceError, Result, StoreError};
use crate::geofence::VerifiedLocation;
use crate::location::LocationProvider;
use crate::model::{
    AttendanceRecord, AttendanceSummary, ClassSession, Mark, RecordScope, RosterEntry, SessionId,
    StudentId,
};
use crate::reconciler::{reconcile_all, reconcile_partial};
use crate::roster::load_roster;
use crate::store::AttendanceStore;

struct SessionView {
    session: ClassSession,
    roster: std::result::Result<Vec<RosterEntry>, StoreError>,
    selection: BTreeSet<StudentId>,
}

impl SessionView {
    fn new(session: ClassSession, roster: std::result::Result<Vec<RosterEntry>, StoreError>) -> Self {
        let mut view = Self {
            session,
            roster,
            selection: BTreeSet::new(),
        };
        view.select_everyone();
        view
    }

    fn entries(&self) -> &[RosterEntry] {
        self.roster.as_deref().unwrap_or(&[])
    }

    fn select_everyone(&mut self) {
        self.selection = self.entries().iter().map(|e| e.student_id).collect();
    }

    fn contains(&self, student_id: StudentId) -> bool {
        self.entries().iter().any(|e| e.student_id == student_id)
    }

    fn loaded_roster(&self) -> Result<&[RosterEntry]> {
        match &self.roster {
            Ok(entries) => Ok(entries),
            Err(source) => Err(Error::RosterUnavailable {
                session_id: self.session.id,
                source: source.clone(),
            }),
        }
    }

    /// Replaces the projection of every student in `scope` with the confirmed records.
    fn apply_confirmed(&mut self, scope: &RecordScope, records: &[AttendanceRecord]) {
        let Ok(entries) = self.roster.as_mut() else {
            return;
        };
        let by_student: BTreeMap<StudentId, &AttendanceRecord> =
            records.iter().map(|r| (r.student_id, r)).collect();
        for entry in entries.iter_mut().filter(|e| scope.covers(e.student_id)) {
            match by_student.get(&entry.student_id) {
                Some(record) => entry.apply(record),
                None => entry.clear(),
            }
        }
    }
}

/// Drives attendance capture for one lecturer's view.
///
/// Mutations take `&mut self`, so a controller never has two writes in flight. Share
/// one behind a `tokio::sync::Mutex` when several tasks need it.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use attendance_capture::{AttendanceController, FixedLocation, GeoPoint, MemoryStore};
///
/// # async fn example() -> Result<(), attendance_capture::Error> {
/// let store = Arc::new(MemoryStore::new());
/// let location = FixedLocation::at(GeoPoint::new(6.9271, 79.8612));
/// let mut controller = AttendanceController::new(store, location);
///
/// controller.select_session_by_id(7).await?;
/// controller.toggle_student(3)?;
/// controller.submit_all().await?;
/// println!("{:?}", controller.edit_window_display());
/// # Ok(())
/// # }
/// ```
pub struct AttendanceController<S, L> {
    store: S,
    location: L,
    clock: Arc<dyn Clock>,
    config: ControllerConfig,
    view: Option<SessionView>,
    window: watch::Sender<EditWindow>,
    countdown: Option<Countdown>,
}

impl<S, L> AttendanceController<S, L>
where
    S: AttendanceStore,
    L: LocationProvider,
{
    /// Creates a controller with the system clock and [`ControllerConfig::default`].
    ///
    /// No session is open and the edit window is idle.
    ///
    /// # Parameters
    ///
    /// * `store` - Where sessions, students and attendance records live.
    /// * `location` - Asked for the reporter's position once per write attempt.
    ///
    /// # Examples
    ///
    /// ```
    /// use attendance_capture::{AttendanceController, FixedLocation, GeoPoint, MemoryStore};
    ///
    /// let controller = AttendanceController::new(
    ///     MemoryStore::new(),
    ///     FixedLocation::at(GeoPoint::new(6.9271, 79.8612)),
    /// );
    /// assert!(controller.session().is_none());
    /// ```
    pub fn new(store: S, location: L) -> Self {
        let config = ControllerConfig::default();
        let (window, _) = watch::channel(EditWindow::new(config.edit_window));
        Self {
            store,
            location,
            clock: Arc::new(SystemClock),
            config,
            view: None,
            window,
            countdown: None,
        }
    }

    /// Replaces the wall clock every edit-window decision reads.
    ///
    /// # Parameters
    ///
    /// * `clock` - Any [`Clock`]; tests pass a [`ManualClock`](crate::ManualClock) and
    ///   keep a clone to move time forward.
    ///
    /// # Returns
    ///
    /// The controller, using `clock` from now on.
    ///
    /// # Examples
    ///
    /// ```
    /// use attendance_capture::{
    ///     AttendanceController, FixedLocation, GeoPoint, ManualClock, MemoryStore,
    /// };
    /// use time::macros::datetime;
    ///
    /// let clock = ManualClock::new(datetime!(2025-03-01 09:00 UTC));
    /// let controller = AttendanceController::new(
    ///     MemoryStore::new(),
    ///     FixedLocation::at(GeoPoint::new(6.9271, 79.8612)),
    /// )
    /// .with_clock(clock.clone());
    ///
    /// clock.advance(time::Duration::minutes(5));
    /// ```
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Applies `config` and puts the edit window back to idle with the new length.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use attendance_capture::{
    ///     AttendanceController, ControllerConfig, FixedLocation, GeoPoint, MemoryStore,
    /// };
    ///
    /// # fn example() -> Result<(), attendance_capture::ConfigError> {
    /// let controller = AttendanceController::new(
    ///     MemoryStore::new(),
    ///     FixedLocation::at(GeoPoint::new(6.9271, 79.8612)),
    /// )
    /// .with_config(ControllerConfig::from_env()?);
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.window.send_replace(EditWindow::new(config.edit_window));
        self.config = config;
        self
    }

    /// The store this controller writes to.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ---- session lifecycle -------------------------------------------------

    /// Opens `session`: loads its roster, pre-selects every student and puts the edit
    /// window back to idle.
    ///
    /// On a failed fetch the session stays open with no roster and
    /// [`Error::RosterUnavailable`] is returned; [`reload_roster`](Self::reload_roster)
    /// retries.
    ///
    /// # Parameters
    ///
    /// * `session` - The class session to open, with its cohort and campus geofence.
    ///
    /// # Returns
    ///
    /// * `Ok(&[RosterEntry])` - The roster, sorted by name, with existing attendance.
    /// * `Err(Error::RosterUnavailable)` - The students or records could not be read.
    pub async fn select_session(&mut self, session: ClassSession) -> Result<&[RosterEntry]> {
        let session_id = session.id;
        self.reset_window();

        let roster = load_roster(&self.store, &session).await;
        let view = self.view.insert(SessionView::new(session, roster));

        match &view.roster {
            Ok(entries) => {
                info!(session_id, students = entries.len(), "session selected");
                Ok(entries)
            }
            Err(source) => {
                warn!(session_id, error = %source, "roster unavailable");
                Err(Error::RosterUnavailable {
                    session_id,
                    source: source.clone(),
                })
            }
        }
    }

    /// Looks `session_id` up in the store and opens it.
    ///
    /// # Returns
    ///
    /// * `Ok(&[RosterEntry])` - As for [`select_session`](Self::select_session).
    /// * `Err(Error::SessionNotFound)` - No session has this id; the current view is kept.
    /// * `Err(Error::RosterUnavailable)` - The lookup or the roster fetch failed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use attendance_capture::{AttendanceController, Error, FixedLocation, SeaOrmStore};
    ///
    /// # async fn example(mut controller: AttendanceController<SeaOrmStore, FixedLocation>) {
    /// match controller.select_session_by_id(7).await {
    ///     Ok(roster) => println!("{} students", roster.len()),
    ///     Err(Error::SessionNotFound { session_id }) => println!("no session {session_id}"),
    ///     Err(e) => println!("try again: {e}"),
    /// }
    /// # }
    /// ```
    pub async fn select_session_by_id(&mut self, session_id: SessionId) -> Result<&[RosterEntry]> {
        let session = self
            .store
            .class_session(session_id)
            .await
            .map_err(|source| Error::RosterUnavailable { session_id, source })?
            .ok_or(Error::SessionNotFound { session_id })?;
        self.select_session(session).await
    }

    /// Fetches the roster of the open session again and re-selects everyone. The edit
    /// window is left as it is.
    pub async fn reload_roster(&mut self) -> Result<&[RosterEntry]> {
        let view = self.view.as_ref().ok_or(Error::NoSessionSelected)?;
        let session_id = view.session.id;
        let roster = load_roster(&self.store, &view.session).await;

        let view = self.view.as_mut().ok_or(Error::NoSessionSelected)?;
        view.roster = roster;
        view.select_everyone();

        if let Err(source) = &view.roster {
            warn!(session_id, error = %source, "roster still unavailable");
        }
        view.loaded_roster()
    }

    /// Closes the open session, resets the edit window and stops the countdown task.
    pub fn leave_session(&mut self) {
        if let Some(view) = self.view.take() {
            info!(session_id = view.session.id, "session left");
        }
        self.countdown = None;
        self.reset_window();
    }

    // ---- provisional selection --------------------------------------------

    /// Flips one student's provisional selection. Returns whether they are now selected.
    ///
    /// Selection is never persisted and stays available after the edit window locks.
    ///
    /// # Errors
    ///
    /// * [`Error::NoSessionSelected`] - No session is open.
    /// * [`Error::UnknownStudent`] - `student_id` is not on the roster.
    pub fn toggle_student(&mut self, student_id: StudentId) -> Result<bool> {
        let view = self.view.as_mut().ok_or(Error::NoSessionSelected)?;
        if !view.contains(student_id) {
            return Err(Error::UnknownStudent {
                session_id: view.session.id,
                student_id,
            });
        }
        if view.selection.remove(&student_id) {
            Ok(false)
        } else {
            view.selection.insert(student_id);
            Ok(true)
        }
    }

    /// Selects everyone, or nobody if everyone was already selected. Returns whether
    /// everyone is now selected.
    pub fn toggle_all(&mut self) -> Result<bool> {
        let view = self.view.as_mut().ok_or(Error::NoSessionSelected)?;
        let everyone = view.entries().len();
        if everyone > 0 && view.selection.len() == everyone {
            view.selection.clear();
            Ok(false)
        } else {
            view.select_everyone();
            Ok(everyone > 0)
        }
    }

    // ---- gated mutations --------------------------------------------------

    /// Records the whole roster: selected students present, everyone else absent.
    /// Restarts the edit window.
    ///
    /// Records of the session that belong to students outside the roster are removed.
    /// The roster is updated from the records the store returns.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<AttendanceRecord>)` - One stored record per roster entry.
    /// * `Err(Error::EditWindowLocked)` - The window has closed.
    /// * `Err(Error::LocationUnavailable)` / `Err(Error::GeofenceViolation)` - No position,
    ///   or the position is outside the campus geofence.
    /// * `Err(Error::RosterUnavailable)` - The roster was never loaded.
    /// * `Err(Error::ReconciliationFailure)` - The store failed; the roster now shows what
    ///   it holds.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use attendance_capture::{AttendanceController, FixedLocation, MemoryStore};
    ///
    /// # async fn example(
    /// #     mut controller: AttendanceController<MemoryStore, FixedLocation>,
    /// # ) -> Result<(), attendance_capture::Error> {
    /// controller.select_session_by_id(7).await?;
    /// // Student 3 did not turn up
    /// controller.toggle_student(3)?;
    /// let records = controller.submit_all().await?;
    /// println!("{} records, window: {:?}", records.len(), controller.edit_window_display());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn submit_all(&mut self) -> Result<Vec<AttendanceRecord>> {
        let op = Operation::SubmitAll;
        let (location, at) = self.authorize(op).await?;

        let view = self.view.as_ref().ok_or(Error::NoSessionSelected)?;
        let decisions: BTreeMap<StudentId, Mark> = view
            .loaded_roster()?
            .iter()
            .map(|e| {
                let selected = view.selection.contains(&e.student_id);
                (e.student_id, Mark::from_selected(selected))
            })
            .collect();

        let outcome = reconcile_all(&self.store, &view.session, &decisions, &location, at).await;
        let records = self.confirm(op, RecordScope::All, outcome).await?;

        self.window.send_modify(|w| w.restart(at));
        Ok(records)
    }

    /// Corrects a single student without touching anyone else's record. Opens the edit
    /// window if nothing was submitted yet, but never extends it.
    ///
    /// # Parameters
    ///
    /// * `student_id` - A student on the open roster.
    /// * `mark` - The status to record.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<AttendanceRecord>)` - The single stored record.
    /// * `Err(Error::UnknownStudent)` - `student_id` is not on the roster.
    /// * Otherwise the same errors as [`submit_all`](Self::submit_all).
    pub async fn mark_student(&mut self, student_id: StudentId, mark: Mark) -> Result<Vec<AttendanceRecord>> {
        let view = self.view.as_ref().ok_or(Error::NoSessionSelected)?;
        view.loaded_roster()?;
        if !view.contains(student_id) {
            return Err(Error::UnknownStudent {
                session_id: view.session.id,
                student_id,
            });
        }
        self.mark_subset(Operation::MarkStudent, vec![student_id], mark)
            .await
    }

    /// Records every selected student as present.
    pub async fn mark_selected_present(&mut self) -> Result<Vec<AttendanceRecord>> {
        let ids = self.subset(true)?;
        self.mark_subset(Operation::MarkSelectedPresent, ids, Mark::Present)
            .await
    }

    /// Records every unselected student as absent.
    pub async fn mark_unselected_absent(&mut self) -> Result<Vec<AttendanceRecord>> {
        let ids = self.subset(false)?;
        self.mark_subset(Operation::MarkUnselectedAbsent, ids, Mark::Absent)
            .await
    }

    async fn mark_subset(
        &mut self,
        op: Operation,
        ids: Vec<StudentId>,
        mark: Mark,
    ) -> Result<Vec<AttendanceRecord>> {
        let (location, at) = self.authorize(op).await?;

        let view = self.view.as_ref().ok_or(Error::NoSessionSelected)?;
        let outcome = reconcile_partial(&self.store, &view.session, &ids, mark, &location, at).await;
        let records = self
            .confirm(op, RecordScope::Students(ids), outcome)
            .await?;

        if !records.is_empty() {
            self.window.send_modify(|w| w.start_if_idle(at));
        }
        Ok(records)
    }

    fn subset(&self, selected: bool) -> Result<Vec<StudentId>> {
        let view = self.view.as_ref().ok_or(Error::NoSessionSelected)?;
        Ok(view
            .loaded_roster()?
            .iter()
            .map(|e| e.student_id)
            .filter(|id| view.selection.contains(id) == selected)
            .collect())
    }

    /// Checks the edit window, then the reporter's position. Returns the verified
    /// position and the instant the write is stamped with.
    async fn authorize(&self, op: Operation) -> Result<(VerifiedLocation, OffsetDateTime)> {
        let view = self.view.as_ref().ok_or(Error::NoSessionSelected)?;
        let session_id = view.session.id;
        view.loaded_roster()?;

        // The lock is checked before asking for a position, and again once the fix
        // arrives in case the deadline passed while waiting.
        self.ensure_unlocked(op, session_id, self.clock.now())?;

        let position = self.location.current_position().await.map_err(|source| {
            warn!(session_id, operation = %op, error = %source, "location unavailable");
            Error::LocationUnavailable {
                session_id,
                operation: op,
                source,
            }
        })?;

        let location = view.session.campus.geofence.verify(position).map_err(|outside| {
            warn!(
                session_id,
                operation = %op,
                distance_m = outside.distance_m,
                radius_m = outside.radius_m,
                "reporter outside geofence"
            );
            Error::GeofenceViolation {
                session_id,
                operation: op,
                distance_m: outside.distance_m,
                radius_m: outside.radius_m,
            }
        })?;

        let at = self.clock.now();
        self.ensure_unlocked(op, session_id, at)?;
        Ok((location, at))
    }

    fn ensure_unlocked(&self, op: Operation, session_id: SessionId, now: OffsetDateTime) -> Result<()> {
        if let EditWindowPhase::Locked { locked_at } = self.window.borrow().phase(now) {
            warn!(session_id, operation = %op, %locked_at, "edit window locked");
            return Err(Error::EditWindowLocked {
                session_id,
                operation: op,
                locked_at,
            });
        }
        Ok(())
    }

    /// Applies a confirmed write to the roster, or resynchronises it from the store
    /// after a failed one.
    async fn confirm(
        &mut self,
        op: Operation,
        scope: RecordScope,
        outcome: std::result::Result<Vec<AttendanceRecord>, ReplaceError>,
    ) -> Result<Vec<AttendanceRecord>> {
        let session_id = self
            .view
            .as_ref()
            .map(|v| v.session.id)
            .ok_or(Error::NoSessionSelected)?;

        match outcome {
            Ok(records) => {
                if let Some(view) = self.view.as_mut() {
                    view.apply_confirmed(&scope, &records);
                }
                Ok(records)
            }
            Err(ReplaceError { step, source }) => {
                warn!(session_id, operation = %op, %step, error = %source, "reconciliation failed");
                self.resync().await;
                Err(Error::ReconciliationFailure {
                    session_id,
                    operation: op,
                    step,
                    source,
                })
            }
        }
    }

    // What is stored after a failed write depends on the store, so read it back
    // rather than guess.
    async fn resync(&mut self) {
        let Some(view) = self.view.as_ref() else {
            return;
        };
        let session_id = view.session.id;
        match self.store.records_for_session(session_id).await {
            Ok(records) => {
                if let Some(view) = self.view.as_mut() {
                    view.apply_confirmed(&RecordScope::All, &records);
                }
            }
            Err(error) => {
                warn!(session_id, %error, "could not re-read attendance after a failed write");
            }
        }
    }

    fn reset_window(&mut self) {
        self.window
            .send_replace(EditWindow::new(self.config.edit_window));
    }

    // ---- read accessors ---------------------------------------------------

    /// The open class session, if any.
    pub fn session(&self) -> Option<&ClassSession> {
        self.view.as_ref().map(|v| &v.session)
    }

    /// The confirmed roster of the open session; empty if none is open or it failed to load.
    pub fn roster(&self) -> &[RosterEntry] {
        self.view.as_ref().map(SessionView::entries).unwrap_or(&[])
    }

    /// Whether `student_id` is currently selected. False when no session is open.
    pub fn is_selected(&self, student_id: StudentId) -> bool {
        self.view
            .as_ref()
            .is_some_and(|v| v.selection.contains(&student_id))
    }

    /// Ids of the selected students, ascending.
    pub fn selected_ids(&self) -> impl Iterator<Item = StudentId> + '_ {
        self.view
            .iter()
            .flat_map(|v| v.selection.iter().copied())
    }

    /// Counts of present, absent, late and unmarked students on the confirmed roster.
    pub fn summary(&self) -> AttendanceSummary {
        AttendanceSummary::of(self.roster())
    }

    /// A copy of the current edit-window state.
    pub fn edit_window(&self) -> EditWindow {
        *self.window.borrow()
    }

    /// The edit window as of now, read from the controller's clock.
    pub fn edit_window_display(&self) -> EditWindowDisplay {
        self.window.borrow().display(self.clock.now())
    }

    /// Spawns (or reuses) the countdown task for this controller and returns a
    /// receiver of display updates. Must be called from within a tokio runtime.
    ///
    /// The task runs until [`leave_session`](Self::leave_session) or until the
    /// controller is dropped, after which the receiver reports the sender as closed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use attendance_capture::{AttendanceController, FixedLocation, MemoryStore};
    ///
    /// # async fn example(mut controller: AttendanceController<MemoryStore, FixedLocation>) {
    /// let mut display = controller.start_countdown();
    /// while display.changed().await.is_ok() {
    ///     println!("{:?}", *display.borrow_and_update());
    /// }
    /// # }
    /// ```
    pub fn start_countdown(&mut self) -> watch::Receiver<EditWindowDisplay> {
        let countdown = self.countdown.get_or_insert_with(|| {
            Countdown::spawn(
                self.window.subscribe(),
                Arc::clone(&self.clock),
                self.config.tick_interval,
            )
        });
        countdown.subscribe()
    }
}
