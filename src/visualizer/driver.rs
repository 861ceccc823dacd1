//! Frame scheduling for the visualizer.
//!
//! The driver runs a callback once per frame on the current `LocalSet` until
//! it is stopped. Stopping is idempotent and also happens when the handle is
//! dropped, so a view cannot leak a running loop.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Frame interval for a target frame rate.
pub fn frame_interval(frame_rate: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(frame_rate.max(1)))
}

pub struct AnimationDriver;

impl AnimationDriver {
    /// Schedules `on_frame` once per `interval`.
    ///
    /// The first frame runs immediately. Late frames are skipped rather
    /// than bunched up. Must be called from within a `tokio::task::LocalSet`.
    pub fn start<F>(interval: Duration, mut on_frame: F) -> DriverHandle
    where
        F: FnMut() + 'static,
    {
        let cancelled = Rc::new(Cell::new(false));
        let flag = Rc::clone(&cancelled);

        let task = tokio::task::spawn_local(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if flag.get() {
                    break;
                }
                on_frame();
            }
            tracing::debug!("Animation loop finished");
        });

        tracing::debug!("Animation loop started ({:?} per frame)", interval);

        DriverHandle {
            cancelled,
            task: Some(task),
        }
    }
}

/// Handle to a running animation loop.
pub struct DriverHandle {
    cancelled: Rc<Cell<bool>>,
    task: Option<JoinHandle<()>>,
}

impl DriverHandle {
    /// Cancels the loop. No frame callback runs after this returns.
    pub fn stop(&mut self) {
        self.cancelled.set(true);
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Animation loop stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
