//! Background fetch jobs and refresh timers.
//!
//! All widget state lives on the UI thread. Fetch jobs may run on worker
//! threads; their results come back through a channel that the dashboard
//! drains with [`TaskQueue::drain`]. Refresh timers are plain deadlines kept by
//! the [`Scheduler`] and fired from the UI loop.

use crate::net::TransportError;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared flag flipped when the owning widget is destroyed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(pub u64);

pub type FetchResult = Result<Value, TransportError>;

/// Result of a fetch job, addressed to the widget that spawned it.
#[derive(Debug, Clone)]
pub struct Completion {
    pub widget: String,
    pub request: RequestId,
    pub result: FetchResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// One worker thread per job.
    Threaded,
    /// Run the job on the caller's thread; the completion is still delivered
    /// on the next drain.
    Inline,
}

pub struct TaskQueue {
    mode: ExecMode,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    next_request: AtomicU64,
}

impl TaskQueue {
    pub fn new(mode: ExecMode) -> Self {
        let (tx, rx) = channel();
        Self {
            mode,
            tx,
            rx,
            next_request: AtomicU64::new(1),
        }
    }

    pub fn threaded() -> Self {
        Self::new(ExecMode::Threaded)
    }

    pub fn inline() -> Self {
        Self::new(ExecMode::Inline)
    }

    pub fn mode(&self) -> ExecMode {
        self.mode
    }

    /// Run `job` for `widget`. Results of jobs whose token was cancelled in
    /// the meantime are dropped instead of being delivered.
    pub fn spawn<F>(&self, widget: &str, cancel: CancelToken, job: F) -> RequestId
    where
        F: FnOnce() -> FetchResult + Send + 'static,
    {
        let request = RequestId(self.next_request.fetch_add(1, Ordering::Relaxed));
        let tx = self.tx.clone();
        let widget = widget.to_string();
        let run = move || {
            let result = job();
            if cancel.is_cancelled() {
                tracing::debug!(widget = %widget, request = request.0, "dropping result of cancelled fetch");
                return;
            }
            let _ = tx.send(Completion {
                widget,
                request,
                result,
            });
        };
        match self.mode {
            ExecMode::Inline => run(),
            ExecMode::Threaded => {
                if let Err(e) = std::thread::Builder::new()
                    .name(format!("fetch-{}", request.0))
                    .spawn(run)
                {
                    tracing::error!("failed to spawn fetch worker: {e}");
                }
            }
        }
        request
    }

    /// Completions that arrived since the last call.
    pub fn drain(&self) -> Vec<Completion> {
        self.rx.try_iter().collect()
    }
}

struct Timer {
    handle: TaskHandle,
    owner: String,
    period: Duration,
    next_due: Instant,
}

/// Interval timers keyed by owner (widget id).
#[derive(Default)]
pub struct Scheduler {
    timers: Vec<Timer>,
    next_handle: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire every `period`, first at `now + period`.
    pub fn every(&mut self, owner: &str, period: Duration, now: Instant) -> TaskHandle {
        self.next_handle += 1;
        let handle = TaskHandle(self.next_handle);
        self.timers.push(Timer {
            handle,
            owner: owner.to_string(),
            period,
            next_due: now + period,
        });
        handle
    }

    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.handle != handle);
        before != self.timers.len()
    }

    pub fn cancel_owner(&mut self, owner: &str) -> usize {
        let before = self.timers.len();
        self.timers.retain(|t| t.owner != owner);
        before - self.timers.len()
    }

    pub fn active_for(&self, owner: &str) -> usize {
        self.timers.iter().filter(|t| t.owner == owner).count()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Timers due at `now`, each rescheduled one period after `now`. A timer
    /// that missed several periods fires once.
    pub fn due(&mut self, now: Instant) -> Vec<(String, TaskHandle)> {
        let mut fired = Vec::new();
        for timer in &mut self.timers {
            if timer.next_due <= now {
                timer.next_due = now + timer.period;
                fired.push((timer.owner.clone(), timer.handle));
            }
        }
        fired
    }

    /// Time until the earliest timer fires, if any.
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        self.timers
            .iter()
            .map(|t| t.next_due.saturating_duration_since(now))
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inline_jobs_are_delivered_on_drain() {
        let queue = TaskQueue::inline();
        let req = queue.spawn("w1", CancelToken::new(), || Ok(json!({"ok": true})));
        let done = queue.drain();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].request, req);
        assert_eq!(done[0].widget, "w1");
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn cancelled_jobs_are_dropped() {
        let queue = TaskQueue::inline();
        let token = CancelToken::new();
        let inner = token.clone();
        queue.spawn("w1", token, move || {
            inner.cancel();
            Ok(json!(null))
        });
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn threaded_jobs_eventually_arrive() {
        let queue = TaskQueue::threaded();
        queue.spawn("w1", CancelToken::new(), || Err(TransportError::Status(500)));
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut done = Vec::new();
        while done.is_empty() && Instant::now() < deadline {
            done = queue.drain();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].result, Err(TransportError::Status(500)));
    }

    #[test]
    fn request_ids_increase() {
        let queue = TaskQueue::inline();
        let a = queue.spawn("w", CancelToken::new(), || Ok(json!(1)));
        let b = queue.spawn("w", CancelToken::new(), || Ok(json!(2)));
        assert!(b > a);
    }

    #[test]
    fn scheduler_fires_and_reschedules() {
        let mut sched = Scheduler::new();
        let start = Instant::now();
        let h = sched.every("w1", Duration::from_secs(10), start);
        assert!(sched.due(start + Duration::from_secs(5)).is_empty());
        let fired = sched.due(start + Duration::from_secs(35));
        assert_eq!(fired, vec![("w1".to_string(), h)]);
        assert!(sched.due(start + Duration::from_secs(40)).is_empty());
        assert_eq!(sched.due(start + Duration::from_secs(45)).len(), 1);
    }

    #[test]
    fn cancel_owner_removes_all_timers_of_a_widget() {
        let mut sched = Scheduler::new();
        let now = Instant::now();
        sched.every("w1", Duration::from_secs(1), now);
        sched.every("w1", Duration::from_secs(2), now);
        let keep = sched.every("w2", Duration::from_secs(1), now);
        assert_eq!(sched.cancel_owner("w1"), 2);
        assert_eq!(sched.active_for("w1"), 0);
        assert!(sched.cancel(keep));
        assert!(!sched.cancel(keep));
        assert!(sched.is_empty());
    }
}
