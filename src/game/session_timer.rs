use std::rc::Rc;
use std::time::Duration;

use log::trace;

use super::scheduler::{Scheduler, TaskId};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// One-second play clock. At most one tick task exists at a time; starting again
/// replaces the previous one.
pub struct SessionTimer {
    scheduler: Rc<dyn Scheduler>,
    task: Option<TaskId>,
    game_id: Option<u64>,
}

impl SessionTimer {
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            task: None,
            game_id: None,
        }
    }

    pub fn start<F>(&mut self, game_id: u64, on_tick: F)
    where
        F: FnMut() + 'static,
    {
        self.stop();
        trace!(target: "session_timer", "Starting timer for game {}", game_id);
        self.task = Some(
            self.scheduler
                .schedule_repeating(TICK_PERIOD, Box::new(on_tick)),
        );
        self.game_id = Some(game_id);
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            trace!(target: "session_timer", "Stopping timer for game {:?}", self.game_id);
            self.scheduler.cancel(task);
        }
        self.game_id = None;
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Game the running timer belongs to.
    pub fn game_id(&self) -> Option<u64> {
        self.game_id
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
