//! Task scheduling
//!
//! Two flavors, both owned by the object whose state the tasks mutate:
//!
//! - [`Tasks`]: recurring predicates, polled once per pass and removed the
//!   first time they report done.
//! - [`TimerTasks`]: delayed one-shots, fired once their remaining time has
//!   been consumed.
//!
//! Tasks frequently schedule further tasks on their owner while they run.
//! Both queues are therefore detached from the owner for the duration of a
//! pass; anything scheduled meanwhile lands in the owner's fresh queue and
//! first runs on the following pass.

use std::mem;

use crate::foundation::time::TIME_EPSILON;

/// Recurring task queue
#[derive(Debug)]
pub struct Tasks<T> {
    tasks: Vec<T>,
}

impl<T> Tasks<T> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Queue a task for the next pass
    pub fn add(&mut self, task: T) {
        self.tasks.push(task);
    }

    /// Run every queued task once, dropping those that return `true`
    pub fn poll(&mut self, mut run: impl FnMut(&mut T) -> bool) {
        self.tasks.retain_mut(|task| !run(task));
    }

    /// Number of queued tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no task is queued
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Drop every queued task
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    fn append(&mut self, later: &mut Self) {
        self.tasks.append(&mut later.tasks);
    }
}

impl<T> Default for Tasks<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll the recurring tasks stored inside `owner`
///
/// `queue` selects the owner's queue. Each task receives the owner mutably,
/// so it may add tasks; those are kept for the next pass.
pub fn run_tasks<O, T>(
    owner: &mut O,
    queue: fn(&mut O) -> &mut Tasks<T>,
    mut run: impl FnMut(&mut T, &mut O) -> bool,
) {
    let mut running = mem::take(queue(owner));
    running.poll(|task| run(task, owner));
    running.append(queue(owner));
    *queue(owner) = running;
}

#[derive(Debug)]
struct TimerTask<T> {
    remaining: f64,
    item: T,
}

/// Delayed one-shot task queue
#[derive(Debug)]
pub struct TimerTasks<T> {
    tasks: Vec<TimerTask<T>>,
}

impl<T> TimerTasks<T> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Queue `item` to fire once `delay` seconds have elapsed
    pub fn add(&mut self, delay: f64, item: T) {
        self.tasks.push(TimerTask {
            remaining: delay,
            item,
        });
    }

    /// Consume `delta_time` from every task and hand back those that are due
    ///
    /// Due tasks are removed and returned in insertion order.
    pub fn advance(&mut self, delta_time: f64) -> Vec<T> {
        let mut due = Vec::new();
        let mut index = 0;
        while index < self.tasks.len() {
            let task = &mut self.tasks[index];
            task.remaining -= delta_time;
            if task.remaining <= TIME_EPSILON {
                due.push(self.tasks.remove(index).item);
            } else {
                index += 1;
            }
        }
        due
    }

    /// Number of pending tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no task is pending
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Drop every pending task without firing it
    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

impl<T> Default for TimerTasks<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Advance the delayed tasks stored inside `owner` and fire the due ones
///
/// Tasks scheduled by a firing task have not been decremented this pass.
pub fn run_timer_tasks<O, T>(
    owner: &mut O,
    queue: fn(&mut O) -> &mut TimerTasks<T>,
    delta_time: f64,
    mut fire: impl FnMut(T, &mut O),
) {
    let due = queue(owner).advance(delta_time);
    for item in due {
        fire(item, owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Job = Box<dyn FnMut(&mut Owner) -> bool>;
    type Delayed = Box<dyn FnOnce(&mut Owner)>;

    #[derive(Default)]
    struct Owner {
        tasks: Tasks<Job>,
        timers: TimerTasks<Delayed>,
        log: Vec<&'static str>,
    }

    impl Owner {
        fn tick(&mut self, delta_time: f64) {
            run_timer_tasks(self, |o| &mut o.timers, delta_time, |task, o| task(o));
            run_tasks(self, |o| &mut o.tasks, |task, o| task(o));
        }
    }

    #[test]
    fn test_recurring_task_removed_when_done() {
        let mut owner = Owner::default();
        let mut remaining = 3;
        owner.tasks.add(Box::new(move |o: &mut Owner| {
            o.log.push("poll");
            remaining -= 1;
            remaining == 0
        }));

        for _ in 0..5 {
            owner.tick(0.1);
        }
        assert_eq!(owner.log, vec!["poll"; 3]);
        assert!(owner.tasks.is_empty());
    }

    #[test]
    fn test_task_added_during_pass_runs_next_pass() {
        let mut owner = Owner::default();
        owner.tasks.add(Box::new(|o: &mut Owner| {
            o.log.push("outer");
            o.tasks.add(Box::new(|o: &mut Owner| {
                o.log.push("inner");
                true
            }));
            true
        }));

        owner.tick(0.1);
        assert_eq!(owner.log, vec!["outer"]);
        owner.tick(0.1);
        assert_eq!(owner.log, vec!["outer", "inner"]);
        assert!(owner.tasks.is_empty());
    }

    #[test]
    fn test_recurring_order_is_stable() {
        let mut owner = Owner::default();
        owner.tasks.add(Box::new(|o: &mut Owner| {
            o.log.push("a");
            false
        }));
        owner.tasks.add(Box::new(|o: &mut Owner| {
            o.log.push("b");
            true
        }));
        owner.tasks.add(Box::new(|o: &mut Owner| {
            o.log.push("c");
            false
        }));
        owner.tick(0.1);
        owner.tick(0.1);
        assert_eq!(owner.log, vec!["a", "b", "c", "a", "c"]);
    }

    #[test]
    fn test_delayed_task_fires_once_at_deadline() {
        let mut owner = Owner::default();
        owner.timers.add(1.0, Box::new(|o: &mut Owner| o.log.push("fired")));

        for _ in 0..9 {
            owner.tick(0.1);
        }
        assert!(owner.log.is_empty());
        owner.tick(0.1);
        assert_eq!(owner.log, vec!["fired"]);
        for _ in 0..20 {
            owner.tick(0.1);
        }
        assert_eq!(owner.log.len(), 1);
    }

    #[test]
    fn test_simultaneous_delays_fire_in_insertion_order() {
        let mut owner = Owner::default();
        owner.timers.add(0.3, Box::new(|o: &mut Owner| o.log.push("long")));
        owner.timers.add(0.1, Box::new(|o: &mut Owner| o.log.push("short")));
        owner.timers.add(0.2, Box::new(|o: &mut Owner| o.log.push("mid")));

        owner.tick(0.5);
        assert_eq!(owner.log, vec!["long", "short", "mid"]);
    }

    #[test]
    fn test_delay_scheduled_by_firing_task_waits() {
        let mut owner = Owner::default();
        owner.timers.add(
            0.1,
            Box::new(|o: &mut Owner| {
                o.log.push("first");
                o.timers.add(0.1, Box::new(|o: &mut Owner| o.log.push("second")));
            }),
        );

        owner.tick(0.1);
        assert_eq!(owner.log, vec!["first"]);
        assert_eq!(owner.timers.len(), 1);
        owner.tick(0.1);
        assert_eq!(owner.log, vec!["first", "second"]);
    }

    #[test]
    fn test_zero_delay_fires_on_next_advance() {
        let mut timers: TimerTasks<u8> = TimerTasks::new();
        timers.add(0.0, 7);
        assert_eq!(timers.advance(0.0), vec![7]);
        assert!(timers.is_empty());
    }
}
