//! UI update cycle: deferred work.
//!
//! Everything in this crate runs on one UI thread. Work that must not happen
//! mid-update (for example a chrome correction discovered while a screen is
//! refreshing) is queued with [`UiCycle::defer`] and runs when the host calls
//! [`UiCycle::run_pending`] at the start of the next cycle.

use std::sync::Arc;

use parking_lot::Mutex;

type DeferredTask = Box<dyn FnOnce() + Send>;

/// Queue of tasks for the next UI cycle.
#[derive(Clone, Default)]
pub struct UiCycle {
    queue: Arc<Mutex<Vec<DeferredTask>>>,
}

impl UiCycle {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` at the start of the next cycle.
    pub fn defer(&self, task: impl FnOnce() + Send + 'static) {
        self.queue.lock().push(Box::new(task));
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run every task queued so far and return how many ran.
    ///
    /// Tasks deferred while this runs land in the following cycle.
    pub fn run_pending(&self) -> usize {
        let tasks = std::mem::take(&mut *self.queue.lock());
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::UiCycle;

    #[test]
    fn tasks_deferred_while_running_wait_a_cycle() {
        let cycle = UiCycle::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let inner_cycle = cycle.clone();
        let inner_ran = ran.clone();
        cycle.defer(move || {
            inner_ran.fetch_add(1, Ordering::SeqCst);
            let again = inner_ran.clone();
            inner_cycle.defer(move || {
                again.fetch_add(10, Ordering::SeqCst);
            });
        });

        assert_eq!(cycle.pending(), 1);
        assert_eq!(cycle.run_pending(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(cycle.pending(), 1);
        assert_eq!(cycle.run_pending(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 11);
        assert_eq!(cycle.run_pending(), 0);
    }
}
