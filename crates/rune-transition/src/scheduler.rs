//! Frame-boundary and timer scheduling on a virtual clock.
//!
//! The engine only ever yields at two kinds of suspension points: the next
//! rendering-frame boundary and a fixed-duration timer. `FrameScheduler`
//! queues both as plain data so the owning group can dispatch them against
//! its own state. Time is advanced explicitly by the host's frame loop.
//!
//! Deltas and delays are `f32` milliseconds; the absolute clock is kept in
//! `f64` so frame-sized steps still register after days of uptime.
//!
//! Cancellation is idempotent: cancelling an unknown, fired or already
//! cancelled task is always valid.

use serde::{Deserialize, Serialize};

/// Handle to a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

#[derive(Debug)]
struct Timer<T> {
    id: TaskId,
    due_ms: f64,
    task: T,
}

/// Queue of frame callbacks and timers.
#[derive(Debug)]
pub struct FrameScheduler<T> {
    now_ms: f64,
    next_id: u64,
    frames: Vec<(TaskId, T)>,
    /// Sorted by due time, then creation order.
    timers: Vec<Timer<T>>,
    frame_count: u64,
}

impl<T> Default for FrameScheduler<T> {
    fn default() -> Self {
        Self {
            now_ms: 0.0,
            next_id: 1,
            frames: Vec::new(),
            timers: Vec::new(),
            frame_count: 0,
        }
    }
}

impl<T> FrameScheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds.
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Number of frame boundaries crossed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn allocate_id(&mut self) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Run `task` at the next frame boundary.
    pub fn request_frame(&mut self, task: T) -> TaskId {
        let id = self.allocate_id();
        self.frames.push((id, task));
        id
    }

    /// Run `task` once `delay_ms` has elapsed.
    pub fn set_timeout(&mut self, delay_ms: f32, task: T) -> TaskId {
        let id = self.allocate_id();
        let due_ms = self.now_ms + f64::from(delay_ms.max(0.0));
        // Insert after every timer due at or before this one to keep FIFO order.
        let at = self.timers.partition_point(|t| t.due_ms <= due_ms);
        self.timers.insert(at, Timer { id, due_ms, task });
        id
    }

    /// Cancel a pending task. Returns true if something was removed.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        if let Some(pos) = self.frames.iter().position(|(fid, _)| *fid == id) {
            self.frames.remove(pos);
            return true;
        }
        if let Some(pos) = self.timers.iter().position(|t| t.id == id) {
            self.timers.remove(pos);
            return true;
        }
        false
    }

    /// Check whether a task is still pending.
    pub fn is_pending(&self, id: TaskId) -> bool {
        self.frames.iter().any(|(fid, _)| *fid == id) || self.timers.iter().any(|t| t.id == id)
    }

    /// Advance the virtual clock.
    pub fn advance(&mut self, delta_ms: f32) {
        self.now_ms += f64::from(delta_ms.max(0.0));
    }

    /// Remove and return every timer due at the current time, in order.
    pub fn take_due_timers(&mut self) -> Vec<(TaskId, T)> {
        let due = self.timers.partition_point(|t| t.due_ms <= self.now_ms);
        self.timers
            .drain(..due)
            .map(|t| (t.id, t.task))
            .collect()
    }

    /// Cross a frame boundary: remove and return the tasks requested before it.
    ///
    /// Tasks requested while dispatching the returned batch wait for the
    /// following boundary.
    pub fn take_frame_tasks(&mut self) -> Vec<(TaskId, T)> {
        self.frame_count += 1;
        std::mem::take(&mut self.frames)
    }

    /// Time until the next timer is due, if any.
    pub fn next_timer_in(&self) -> Option<f32> {
        self.timers
            .first()
            .map(|t| (t.due_ms - self.now_ms).max(0.0) as f32)
    }

    /// Number of pending frame tasks and timers.
    pub fn pending(&self) -> usize {
        self.frames.len() + self.timers.len()
    }

    pub fn is_idle(&self) -> bool {
        self.frames.is_empty() && self.timers.is_empty()
    }

    /// Drop every pending task.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.timers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tasks<T>(batch: Vec<(TaskId, T)>) -> Vec<T> {
        batch.into_iter().map(|(_, t)| t).collect()
    }

    #[test]
    fn test_frame_tasks_wait_for_boundary() {
        let mut scheduler = FrameScheduler::new();
        scheduler.request_frame("a");
        scheduler.request_frame("b");
        assert_eq!(scheduler.pending(), 2);

        assert_eq!(tasks(scheduler.take_frame_tasks()), vec!["a", "b"]);
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.frame_count(), 1);
    }

    #[test]
    fn test_timers_fire_in_due_order() {
        let mut scheduler = FrameScheduler::new();
        scheduler.set_timeout(100.0, "slow");
        scheduler.set_timeout(50.0, "fast");
        scheduler.set_timeout(50.0, "fast-second");

        scheduler.advance(40.0);
        assert!(scheduler.take_due_timers().is_empty());
        assert_eq!(scheduler.next_timer_in(), Some(10.0));

        scheduler.advance(10.0);
        assert_eq!(
            tasks(scheduler.take_due_timers()),
            vec!["fast", "fast-second"]
        );

        scheduler.advance(100.0);
        assert_eq!(tasks(scheduler.take_due_timers()), vec!["slow"]);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut scheduler = FrameScheduler::new();
        let frame = scheduler.request_frame(1);
        let timer = scheduler.set_timeout(10.0, 2);

        assert!(scheduler.cancel(frame));
        assert!(!scheduler.cancel(frame));
        assert!(scheduler.cancel(timer));
        assert!(!scheduler.cancel(timer));
        assert!(scheduler.is_idle());

        // Cancelling a fired timer is valid and does nothing.
        let fired = scheduler.set_timeout(0.0, 3);
        assert_eq!(tasks(scheduler.take_due_timers()), vec![3]);
        assert!(!scheduler.cancel(fired));
    }

    #[test]
    fn test_frame_steps_register_after_long_uptime() {
        let mut scheduler = FrameScheduler::new();
        // 2^29 ms, about six days.
        scheduler.advance(536_870_912.0);
        let start = scheduler.now_ms();
        scheduler.set_timeout(100.0, "exit");

        let mut fired = Vec::new();
        for _ in 0..6 {
            scheduler.advance(16.67);
            fired.extend(tasks(scheduler.take_due_timers()));
        }

        assert!(scheduler.now_ms() - start > 100.0);
        assert_eq!(fired, vec!["exit"]);
    }

    #[test]
    fn test_zero_delay_timer_is_immediately_due() {
        let mut scheduler = FrameScheduler::new();
        scheduler.advance(16.0);
        let id = scheduler.set_timeout(0.0, "now");
        assert!(scheduler.is_pending(id));
        assert_eq!(tasks(scheduler.take_due_timers()), vec!["now"]);
    }
}
