//! Cancelable redraw scheduling
//!
//! Two kinds of deferred work drive the face: a one-shot timer that wakes up on the next
//! whole second, and a frame request that runs on the next display refresh boundary. Both
//! are addressed through a [`TaskHandle`] so they can be canceled before new work is armed.

use embassy_time::{Duration, Instant, Timer};

/// Kind of deferred work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskKind {
    /// One-shot delayed callback
    Timer,
    /// Callback aligned to the next display refresh
    Frame,
}

/// Handle to a scheduled timer or frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskHandle {
    id: u32,
    kind: TaskKind,
}

impl TaskHandle {
    pub fn new(id: u32, kind: TaskKind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }
}

pub trait Scheduler {
    /// Run once after `delay`
    fn set_timer(&mut self, delay: Duration) -> TaskHandle;

    /// Run on the next display refresh
    fn request_frame(&mut self) -> TaskHandle;

    /// Drop a pending task. Unknown or already fired handles are ignored.
    fn cancel(&mut self, handle: TaskHandle);
}

/// Display refresh rate used to align frame requests
pub const FRAME_RATE_HZ: u64 = 60;

/// Scheduler on top of `embassy-time`.
///
/// Holds at most one timer and one frame request; arming a second one of the same kind
/// replaces the first.
pub struct EmbassyScheduler {
    next_id: u32,
    frame_period: Duration,
    timer: Option<(TaskHandle, Instant)>,
    frame: Option<(TaskHandle, Instant)>,
}

impl Default for EmbassyScheduler {
    fn default() -> Self {
        Self::new(Duration::from_hz(FRAME_RATE_HZ))
    }
}

impl EmbassyScheduler {
    pub fn new(frame_period: Duration) -> Self {
        Self {
            next_id: 1,
            frame_period,
            timer: None,
            frame: None,
        }
    }

    fn allocate(&mut self, kind: TaskKind) -> TaskHandle {
        let handle = TaskHandle::new(self.next_id, kind);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        handle
    }

    /// First refresh boundary strictly after `now`
    fn next_frame_boundary(&self, now: Instant) -> Instant {
        let period = self.frame_period.as_ticks().max(1);
        Instant::from_ticks((now.as_ticks() / period + 1) * period)
    }

    /// Pending timer and frame request, in that order
    pub fn pending(&self) -> (Option<TaskHandle>, Option<TaskHandle>) {
        (
            self.timer.map(|(handle, _)| handle),
            self.frame.map(|(handle, _)| handle),
        )
    }

    /// Wait for the earliest pending task and return its handle.
    ///
    /// Pends forever when nothing is scheduled. Safe to drop mid-wait: a task is only
    /// removed once its deadline has passed.
    pub async fn next_fired(&mut self) -> TaskHandle {
        let next = match (self.timer, self.frame) {
            (Some(timer), Some(frame)) => Some(if frame.1 <= timer.1 { frame } else { timer }),
            (timer, frame) => timer.or(frame),
        };
        let Some((handle, deadline)) = next else {
            return core::future::pending().await;
        };

        Timer::at(deadline).await;

        match handle.kind() {
            TaskKind::Timer => self.timer = None,
            TaskKind::Frame => self.frame = None,
        }
        trace!("Task {} fired", handle.id());
        handle
    }
}

impl Scheduler for EmbassyScheduler {
    fn set_timer(&mut self, delay: Duration) -> TaskHandle {
        if let Some((old, _)) = self.timer {
            warn!("Replacing pending timer {}", old.id());
        }
        let handle = self.allocate(TaskKind::Timer);
        self.timer = Some((handle, Instant::now() + delay));
        handle
    }

    fn request_frame(&mut self) -> TaskHandle {
        if let Some((old, _)) = self.frame {
            warn!("Replacing pending frame request {}", old.id());
        }
        let handle = self.allocate(TaskKind::Frame);
        let deadline = self.next_frame_boundary(Instant::now());
        self.frame = Some((handle, deadline));
        handle
    }

    fn cancel(&mut self, handle: TaskHandle) {
        let slot = match handle.kind() {
            TaskKind::Timer => &mut self.timer,
            TaskKind::Frame => &mut self.frame,
        };
        if slot.map_or(false, |(pending, _)| pending == handle) {
            *slot = None;
        }
    }
}
