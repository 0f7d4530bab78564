//! Virtual-time deferred tasks
//!
//! Replaces wall-clock timers: the clock only moves when the frame loop
//! advances it, so tests can step time deterministically.

/// Handle for a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

#[derive(Debug, Clone)]
struct Pending<T> {
    id: TaskId,
    due_ms: f64,
    task: T,
}

/// Tasks ordered by due time, ties broken by scheduling order
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now_ms: f64,
    next_id: u64,
    pending: Vec<Pending<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now_ms: 0.0,
            next_id: 0,
            pending: Vec::new(),
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Run `task` once `delay_ms` of virtual time has passed
    pub fn schedule_in(&mut self, delay_ms: f64, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            id,
            due_ms: self.now_ms + delay_ms.max(0.0),
            task,
        });
        id
    }

    /// Move the clock forward and hand back every task that fell due
    pub fn advance(&mut self, dt_ms: f64) -> Vec<T> {
        self.now_ms += dt_ms.max(0.0);
        let now = self.now_ms;

        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|p| p.due_ms <= now);
        self.pending = rest;

        due.sort_by(|a, b| a.due_ms.total_cmp(&b.due_ms).then(a.id.0.cmp(&b.id.0)));
        due.into_iter().map(|p| p.task).collect()
    }

    pub fn cancel(&mut self, id: TaskId) {
        self.pending.retain(|p| p.id != id);
    }

    /// Drop every pending task
    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_fire_in_due_order() {
        let mut s = Scheduler::new();
        s.schedule_in(30.0, "c");
        s.schedule_in(10.0, "a");
        s.schedule_in(10.0, "b");

        assert!(s.advance(5.0).is_empty());
        assert_eq!(s.advance(5.0), vec!["a", "b"]);
        assert_eq!(s.advance(100.0), vec!["c"]);
        assert!(s.is_empty());
    }

    #[test]
    fn test_delay_is_relative_to_now() {
        let mut s = Scheduler::new();
        s.advance(100.0);
        s.schedule_in(16.0, 1);
        assert!(s.advance(15.0).is_empty());
        assert_eq!(s.advance(1.0), vec![1]);
        assert_eq!(s.now_ms(), 116.0);
    }

    #[test]
    fn test_cancel() {
        let mut s = Scheduler::new();
        s.schedule_in(1.0, 1);
        let dropped = s.schedule_in(1.0, 2);
        s.cancel(dropped);
        assert_eq!(s.len(), 1);
        assert_eq!(s.advance(1.0), vec![1]);

        s.schedule_in(1.0, 3);
        s.cancel_all();
        assert!(s.advance(10.0).is_empty());
    }
}
