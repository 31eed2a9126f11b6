//! Background tick that publishes the edit-window display.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::clock::Clock;
use crate::config::MIN_TICK_INTERVAL;
use crate::edit_window::{EditWindow, EditWindowDisplay};

/// A spawned task that recomputes [`EditWindowDisplay`] on every tick.
///
/// The task only reads the window it is given; it never counts down on its own. It is
/// aborted when the handle is dropped.
#[derive(Debug)]
pub struct Countdown {
    handle: JoinHandle<()>,
    display: watch::Receiver<EditWindowDisplay>,
}

impl Countdown {
    /// Must be called from within a tokio runtime. `tick` is raised to
    /// [`MIN_TICK_INTERVAL`] if shorter.
    pub fn spawn(
        mut window: watch::Receiver<EditWindow>,
        clock: Arc<dyn Clock>,
        tick: std::time::Duration,
    ) -> Self {
        let initial = window.borrow_and_update().display(clock.now());
        let (tx, display) = watch::channel(initial);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick.max(MIN_TICK_INTERVAL));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    changed = window.changed() => {
                        if changed.is_err() {
                            debug!("edit window dropped, countdown stopping");
                            break;
                        }
                    }
                }

                let next = window.borrow_and_update().display(clock.now());
                tx.send_if_modified(|current| {
                    if *current == next {
                        return false;
                    }
                    debug!(from = ?*current, to = ?next, "edit window display changed");
                    *current = next;
                    true
                });
            }
        });

        Self { handle, display }
    }

    pub fn subscribe(&self) -> watch::Receiver<EditWindowDisplay> {
        self.display.clone()
    }

    pub fn current(&self) -> EditWindowDisplay {
        *self.display.borrow()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
