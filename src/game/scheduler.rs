//! Deferred and repeating callbacks on the thread that owns the game.
//!
//! `GlibScheduler` runs them from the glib main context; `ManualScheduler` runs them
//! only when its virtual clock is advanced, which keeps timing tests deterministic.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use log::trace;

pub type TaskId = u64;

pub trait Scheduler {
    fn schedule_repeating(&self, period: Duration, callback: Box<dyn FnMut()>) -> TaskId;

    fn schedule_once(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TaskId;

    /// Returns `false` when the task already finished or was cancelled before.
    fn cancel(&self, task: TaskId) -> bool;
}

pub struct GlibScheduler {
    next_id: Cell<TaskId>,
    sources: Rc<RefCell<HashMap<TaskId, glib::SourceId>>>,
}

impl Default for GlibScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl GlibScheduler {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            sources: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    fn allocate_id(&self) -> TaskId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    pub fn active_tasks(&self) -> usize {
        self.sources.borrow().len()
    }
}

impl Scheduler for GlibScheduler {
    fn schedule_repeating(&self, period: Duration, mut callback: Box<dyn FnMut()>) -> TaskId {
        let id = self.allocate_id();
        let source = glib::timeout_add_local(period, move || {
            callback();
            glib::ControlFlow::Continue
        });
        self.sources.borrow_mut().insert(id, source);
        id
    }

    fn schedule_once(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TaskId {
        let id = self.allocate_id();
        let sources = Rc::clone(&self.sources);
        let source = glib::timeout_add_local_once(delay, move || {
            // glib drops the source itself once this returns
            sources.borrow_mut().remove(&id);
            callback();
        });
        self.sources.borrow_mut().insert(id, source);
        id
    }

    fn cancel(&self, task: TaskId) -> bool {
        let source = self.sources.borrow_mut().remove(&task);
        match source {
            Some(source) => {
                source.remove();
                true
            }
            None => false,
        }
    }
}

impl Drop for GlibScheduler {
    fn drop(&mut self) {
        let sources: Vec<glib::SourceId> = self
            .sources
            .borrow_mut()
            .drain()
            .map(|(_, source)| source)
            .collect();
        for source in sources {
            source.remove();
        }
    }
}

enum TaskCallback {
    Once(Box<dyn FnOnce()>),
    Repeating(Rc<RefCell<Box<dyn FnMut()>>>),
}

struct ManualTask {
    id: TaskId,
    due: Duration,
    period: Option<Duration>,
    callback: TaskCallback,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: TaskId,
    tasks: Vec<ManualTask>,
}

/// Virtual-time scheduler. Nothing runs until `advance` is called.
#[derive(Default)]
pub struct ManualScheduler {
    state: RefCell<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    pub fn pending_tasks(&self) -> usize {
        self.state.borrow().tasks.len()
    }

    /// Moves the clock forward, running every task that falls due on the way in
    /// deadline order.
    pub fn advance(&self, by: Duration) {
        let target = self.state.borrow().now + by;
        while let Some(callback) = self.take_next_due(target) {
            match callback {
                TaskCallback::Once(callback) => callback(),
                TaskCallback::Repeating(callback) => {
                    let mut callback = callback.borrow_mut();
                    (&mut **callback)()
                }
            }
        }
        self.state.borrow_mut().now = target;
    }

    fn take_next_due(&self, target: Duration) -> Option<TaskCallback> {
        let mut state = self.state.borrow_mut();
        let position = state
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.due <= target)
            .min_by_key(|(_, task)| (task.due, task.id))
            .map(|(position, _)| position)?;

        let due = state.tasks[position].due;
        state.now = due;
        trace!(target: "scheduler", "Running task {} at {:?}", state.tasks[position].id, due);

        match state.tasks[position].period {
            Some(period) => {
                let task = &mut state.tasks[position];
                task.due += period;
                match &task.callback {
                    TaskCallback::Repeating(callback) => {
                        Some(TaskCallback::Repeating(Rc::clone(callback)))
                    }
                    TaskCallback::Once(_) => None,
                }
            }
            None => Some(state.tasks.remove(position).callback),
        }
    }

    fn insert(&self, delay: Duration, period: Option<Duration>, callback: TaskCallback) -> TaskId {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now + delay;
        state.tasks.push(ManualTask {
            id,
            due,
            period,
            callback,
        });
        id
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&self, period: Duration, callback: Box<dyn FnMut()>) -> TaskId {
        let period = period.max(Duration::from_millis(1));
        self.insert(
            period,
            Some(period),
            TaskCallback::Repeating(Rc::new(RefCell::new(callback))),
        )
    }

    fn schedule_once(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TaskId {
        self.insert(delay, None, TaskCallback::Once(callback))
    }

    fn cancel(&self, task: TaskId) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.tasks.len();
        state.tasks.retain(|scheduled| scheduled.id != task);
        state.tasks.len() != before
    }
}
