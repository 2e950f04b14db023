//! Watch face mode controller
//!
//! Owns everything one screen needs (surface, face, clock, scheduler) and decides when a frame
//! is painted. In [`Mode::Normal`] the face redraws itself on every second through a chain of
//! one timer and one frame request; in [`Mode::Ambient`] it is only painted on explicit
//! triggers.

use embassy_futures::select::{select, Either};
use embassy_sync::{blocking_mutex::raw::RawMutex, channel::Receiver};
use embassy_time::Duration;
use embedded_graphics::{pixelcolor::Rgb565, prelude::*};

use super::{
    scheduler::{EmbassyScheduler, Scheduler, TaskHandle},
    time::{ClockReading, ClockSource},
};
use crate::{
    ui::{Geometry, WatchFace, WatchFaceState},
    WatchError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Continuous once-per-second redraw
    Normal,
    /// Low-power display, redraw on explicit triggers only
    Ambient,
}

/// Device notifications the face reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LifecycleEvent {
    VisibilityChanged { hidden: bool },
    AmbientModeChanged { ambient: bool },
    /// Coarse periodic tick from the system
    TimeTick,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameStats {
    pub painted: u32,
    pub skipped: u32,
}

pub struct WatchFaceController<D, F, C, S> {
    surface: D,
    face: F,
    clock: C,
    scheduler: S,
    geometry: Geometry,
    mode: Mode,
    timer: Option<TaskHandle>,
    frame: Option<TaskHandle>,
    /// Last frame that made it onto the surface
    shown: Option<(ClockReading, Mode)>,
    stats: FrameStats,
}

impl<D, F, C, S> WatchFaceController<D, F, C, S>
where
    D: DrawTarget<Color = Rgb565>,
    F: WatchFace,
    C: ClockSource,
    S: Scheduler,
{
    /// Paint the first frame and start the once-per-second loop.
    ///
    /// Fails if the surface is empty or the clock cannot be read.
    pub fn start(surface: D, face: F, clock: C, scheduler: S) -> Result<Self, WatchError> {
        let geometry =
            Geometry::from_bounds(surface.bounding_box()).ok_or(WatchError::EmptySurface)?;
        ClockReading::sample(&clock)?;

        let mut controller = Self {
            surface,
            face,
            clock,
            scheduler,
            geometry,
            mode: Mode::Normal,
            timer: None,
            frame: None,
            shown: None,
            stats: FrameStats::default(),
        };
        info!(
            "Watch face started, center {}x{} radius {}",
            geometry.center.x,
            geometry.center.y,
            geometry.radius
        );

        controller.paint();
        controller.arm_continuous();
        Ok(controller)
    }

    pub fn handle_event(&mut self, event: LifecycleEvent) {
        debug!("Lifecycle event: {}", event);
        match event {
            LifecycleEvent::VisibilityChanged { hidden: true } => self.cancel_pending(),
            LifecycleEvent::VisibilityChanged { hidden: false } => {
                self.paint();
                self.apply_schedule();
            }
            LifecycleEvent::AmbientModeChanged { ambient } => self.activate(if ambient {
                Mode::Ambient
            } else {
                Mode::Normal
            }),
            LifecycleEvent::TimeTick => {
                self.paint();
            }
        }
    }

    /// Dispatch a task that came due. Handles that were canceled or replaced are ignored.
    pub fn on_fired(&mut self, handle: TaskHandle) {
        if self.timer == Some(handle) {
            self.timer = None;
            self.frame = Some(self.scheduler.request_frame());
        } else if self.frame == Some(handle) {
            self.frame = None;
            let delay = match self.paint() {
                Some(reading) => reading.until_next_second(),
                None => Duration::from_secs(1),
            };
            if self.mode == Mode::Normal {
                self.timer = Some(self.scheduler.set_timer(delay));
            }
        } else {
            debug!("Ignoring stale task {}", handle.id());
        }
    }

    fn activate(&mut self, mode: Mode) {
        if self.mode != mode {
            info!("Mode {} -> {}", self.mode, mode);
        }
        self.mode = mode;
        self.cancel_pending();
        self.paint();
        self.apply_schedule();
    }

    /// Scheduling half of the current mode's entry action
    fn apply_schedule(&mut self) {
        match self.mode {
            Mode::Normal => self.arm_continuous(),
            Mode::Ambient => self.cancel_pending(),
        }
    }

    fn arm_continuous(&mut self) {
        self.cancel_pending();
        self.frame = Some(self.scheduler.request_frame());
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.timer.take() {
            self.scheduler.cancel(handle);
        }
        if let Some(handle) = self.frame.take() {
            self.scheduler.cancel(handle);
        }
    }

    /// Render one frame from a fresh clock reading.
    ///
    /// Returns the reading, or `None` if the clock failed. Draw errors skip the frame only.
    fn paint(&mut self) -> Option<ClockReading> {
        let reading = match ClockReading::sample(&self.clock) {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Frame skipped: {}", e);
                self.stats.skipped += 1;
                return None;
            }
        };

        let state = WatchFaceState {
            reading,
            geometry: self.geometry,
            mode: self.mode,
            repaint: self.needs_repaint(&reading),
        };
        match self.face.draw(&mut self.surface, &state) {
            Ok(()) => {
                self.stats.painted += 1;
                self.shown = Some((reading, self.mode));
                trace!("Painted {}:{}:{}", reading.hour, reading.minute, reading.second);
            }
            Err(_) => {
                warn!("Frame skipped: draw failed");
                self.stats.skipped += 1;
                self.shown = None;
            }
        }
        Some(reading)
    }

    /// The surface can only be updated in place while the sector grows under the same label.
    fn needs_repaint(&self, reading: &ClockReading) -> bool {
        match self.shown {
            Some((shown, mode)) => {
                mode != self.mode
                    || shown.hour != reading.hour
                    || reading.sweep_fraction() < shown.sweep_fraction()
            }
            None => true,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Outstanding timer and frame request
    pub fn pending(&self) -> (Option<TaskHandle>, Option<TaskHandle>) {
        (self.timer, self.frame)
    }

    pub fn surface(&self) -> &D {
        &self.surface
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}

impl<D, F, C> WatchFaceController<D, F, C, EmbassyScheduler>
where
    D: DrawTarget<Color = Rgb565>,
    F: WatchFace,
    C: ClockSource,
{
    /// Serve lifecycle events and due redraws until the device powers down.
    pub async fn run<M: RawMutex, const N: usize>(
        &mut self,
        events: Receiver<'_, M, LifecycleEvent, N>,
    ) -> ! {
        loop {
            let next = select(events.receive(), self.scheduler.next_fired()).await;
            match next {
                Either::First(event) => self.handle_event(event),
                Either::Second(handle) => self.on_fired(handle),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{FixedClock, FlakyTarget, FrameBuffer, ManualScheduler};
    use crate::system::scheduler::TaskKind;
    use crate::ui::SweepWatchface;

    type TestController = WatchFaceController<FrameBuffer, SweepWatchface, FixedClock, ManualScheduler>;

    fn start_at(h: u32, m: u32, s: u32, ms: u32) -> TestController {
        WatchFaceController::start(
            FrameBuffer::new(Size::new(240, 240)),
            SweepWatchface::default(),
            FixedClock::at(h, m, s, ms),
            ManualScheduler::default(),
        )
        .unwrap()
    }

    fn fire(controller: &mut TestController, kind: TaskKind) {
        let handle = controller.scheduler_mut().take(kind).unwrap();
        controller.on_fired(handle);
    }

    fn assert_single_pending(controller: &TestController) {
        let scheduler = controller.scheduler();
        assert!(scheduler.pending(TaskKind::Timer).len() <= 1);
        assert!(scheduler.pending(TaskKind::Frame).len() <= 1);
    }

    #[test]
    fn startup_paints_and_arms_one_frame() {
        let controller = start_at(3, 15, 30, 0);
        assert_eq!(controller.mode(), Mode::Normal);
        assert_eq!(controller.stats().painted, 1);
        assert_eq!(controller.scheduler().pending(TaskKind::Frame).len(), 1);
        assert!(controller.scheduler().pending(TaskKind::Timer).is_empty());
        assert_eq!(controller.geometry().radius, 120);
    }

    #[test]
    fn startup_fails_without_clock() {
        let result = WatchFaceController::start(
            FrameBuffer::new(Size::new(240, 240)),
            SweepWatchface::default(),
            FixedClock::broken(),
            ManualScheduler::default(),
        );
        assert_eq!(result.err(), Some(WatchError::ClockUnavailable));
    }

    #[test]
    fn startup_fails_on_empty_surface() {
        let result = WatchFaceController::start(
            FrameBuffer::new(Size::new(0, 0)),
            SweepWatchface::default(),
            FixedClock::at(1, 2, 3, 0),
            ManualScheduler::default(),
        );
        assert_eq!(result.err(), Some(WatchError::EmptySurface));
    }

    #[test]
    fn frame_paints_then_waits_for_next_second() {
        let mut controller = start_at(3, 15, 30, 250);
        fire(&mut controller, TaskKind::Frame);

        assert_eq!(controller.stats().painted, 2);
        assert_eq!(controller.scheduler().pending(TaskKind::Timer).len(), 1);
        assert!(controller.scheduler().pending(TaskKind::Frame).is_empty());
        assert_eq!(controller.scheduler().last_delay(), Some(Duration::from_millis(750)));

        fire(&mut controller, TaskKind::Timer);
        assert_eq!(controller.stats().painted, 2);
        assert_eq!(controller.scheduler().pending(TaskKind::Frame).len(), 1);
        assert!(controller.scheduler().pending(TaskKind::Timer).is_empty());
    }

    #[test]
    fn entering_ambient_cancels_scheduled_frame() {
        let mut controller = start_at(3, 15, 30, 0);
        controller.handle_event(LifecycleEvent::AmbientModeChanged { ambient: true });

        assert_eq!(controller.mode(), Mode::Ambient);
        assert_eq!(controller.stats().painted, 2);
        assert_eq!(controller.scheduler().pending_count(), 0);
        assert_eq!(controller.scheduler().canceled(), 1);
        assert_eq!(controller.pending(), (None, None));
    }

    #[test]
    fn ambient_round_trip_leaves_one_loop() {
        let mut controller = start_at(3, 15, 30, 0);
        fire(&mut controller, TaskKind::Frame);
        controller.handle_event(LifecycleEvent::AmbientModeChanged { ambient: true });
        controller.handle_event(LifecycleEvent::AmbientModeChanged { ambient: false });

        assert_eq!(controller.mode(), Mode::Normal);
        assert_eq!(controller.scheduler().pending_count(), 1);
        assert_eq!(controller.scheduler().pending(TaskKind::Frame).len(), 1);
        assert_eq!(controller.stats().painted, 4);
    }

    #[test]
    fn waking_in_ambient_paints_once_without_loop() {
        let mut controller = start_at(3, 15, 30, 0);
        controller.handle_event(LifecycleEvent::AmbientModeChanged { ambient: true });
        let painted = controller.stats().painted;

        controller.handle_event(LifecycleEvent::VisibilityChanged { hidden: false });
        assert_eq!(controller.stats().painted, painted + 1);
        assert_eq!(controller.scheduler().pending_count(), 0);
        assert_eq!(controller.mode(), Mode::Ambient);
    }

    #[test]
    fn waking_in_normal_rearms_single_loop() {
        let mut controller = start_at(3, 15, 30, 0);
        fire(&mut controller, TaskKind::Frame);
        controller.handle_event(LifecycleEvent::VisibilityChanged { hidden: false });

        assert_eq!(controller.stats().painted, 3);
        assert!(controller.scheduler().pending(TaskKind::Timer).is_empty());
        assert_eq!(controller.scheduler().pending(TaskKind::Frame).len(), 1);
    }

    #[test]
    fn hiding_stops_the_loop() {
        let mut controller = start_at(3, 15, 30, 0);
        controller.handle_event(LifecycleEvent::VisibilityChanged { hidden: true });
        assert_eq!(controller.scheduler().pending_count(), 0);
        assert_eq!(controller.stats().painted, 1);
        assert_eq!(controller.mode(), Mode::Normal);
    }

    #[test]
    fn tick_paints_without_touching_schedule() {
        let mut controller = start_at(3, 15, 30, 0);
        let before = controller.pending();
        controller.handle_event(LifecycleEvent::TimeTick);
        assert_eq!(controller.stats().painted, 2);
        assert_eq!(controller.pending(), before);

        controller.handle_event(LifecycleEvent::AmbientModeChanged { ambient: true });
        controller.handle_event(LifecycleEvent::TimeTick);
        assert_eq!(controller.stats().painted, 4);
        assert_eq!(controller.scheduler().pending_count(), 0);
    }

    #[test]
    fn stale_handle_is_ignored() {
        let mut controller = start_at(3, 15, 30, 0);
        let (_, Some(stale)) = controller.pending() else {
            panic!("frame should be armed");
        };
        controller.handle_event(LifecycleEvent::AmbientModeChanged { ambient: true });
        controller.handle_event(LifecycleEvent::AmbientModeChanged { ambient: false });

        let painted = controller.stats().painted;
        controller.on_fired(stale);
        assert_eq!(controller.stats().painted, painted);
        assert_eq!(controller.scheduler().pending_count(), 1);
    }

    #[test]
    fn clock_failure_skips_frame_and_keeps_loop() {
        let mut controller = start_at(3, 15, 30, 400);
        controller.clock().fail();
        fire(&mut controller, TaskKind::Frame);

        assert_eq!(controller.stats().skipped, 1);
        assert_eq!(controller.scheduler().last_delay(), Some(Duration::from_secs(1)));
        assert_eq!(controller.scheduler().pending(TaskKind::Timer).len(), 1);

        controller.clock().set(3, 15, 32, 0);
        fire(&mut controller, TaskKind::Timer);
        fire(&mut controller, TaskKind::Frame);
        assert_eq!(controller.stats().painted, 2);
    }

    #[test]
    fn draw_failure_skips_frame_and_keeps_loop() {
        let mut controller = WatchFaceController::start(
            FlakyTarget::new(Size::new(240, 240), 1),
            SweepWatchface::default(),
            FixedClock::at(10, 0, 0, 0),
            ManualScheduler::default(),
        )
        .unwrap();
        assert_eq!(controller.stats(), FrameStats { painted: 0, skipped: 1 });

        let handle = controller.scheduler_mut().take(TaskKind::Frame).unwrap();
        controller.on_fired(handle);
        assert_eq!(controller.stats(), FrameStats { painted: 1, skipped: 1 });
        assert_eq!(controller.surface().inner().clears(), 1);
        assert_eq!(controller.scheduler().pending(TaskKind::Timer).len(), 1);
    }

    #[test]
    fn surface_is_cleared_only_when_the_frame_cannot_be_updated_in_place() {
        let mut controller = start_at(3, 15, 30, 0);
        assert_eq!(controller.surface().clears(), 1);

        controller.clock().set(3, 15, 31, 0);
        fire(&mut controller, TaskKind::Frame);
        assert_eq!(controller.surface().clears(), 1);

        // New hour label
        controller.clock().set(4, 0, 0, 0);
        fire(&mut controller, TaskKind::Timer);
        fire(&mut controller, TaskKind::Frame);
        assert_eq!(controller.surface().clears(), 2);

        // Clock set back within the hour
        controller.clock().set(4, 10, 0, 0);
        controller.handle_event(LifecycleEvent::TimeTick);
        assert_eq!(controller.surface().clears(), 2);
        controller.clock().set(4, 5, 0, 0);
        controller.handle_event(LifecycleEvent::TimeTick);
        assert_eq!(controller.surface().clears(), 3);

        // Skin change
        controller.handle_event(LifecycleEvent::AmbientModeChanged { ambient: true });
        assert_eq!(controller.surface().clears(), 4);
        controller.handle_event(LifecycleEvent::AmbientModeChanged { ambient: false });
        assert_eq!(controller.surface().clears(), 5);
        assert_eq!(controller.stats().skipped, 0);
    }

    #[test]
    fn repeated_ambient_signal_reapplies_entry() {
        let mut controller = start_at(3, 15, 30, 0);
        controller.handle_event(LifecycleEvent::AmbientModeChanged { ambient: true });
        controller.handle_event(LifecycleEvent::AmbientModeChanged { ambient: true });
        assert_eq!(controller.stats().painted, 3);
        assert_eq!(controller.scheduler().pending_count(), 0);
        assert_single_pending(&controller);
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(64))]

        /// Any event sequence leaves at most one timer and one frame request.
        #[test]
        fn never_more_than_one_pending_task(ops in proptest::collection::vec(0u8..7, 0..24)) {
            let mut controller = start_at(11, 42, 7, 120);
            let mut looping = true;
            for op in ops {
                match op {
                    0 => {
                        looping = false;
                        controller.handle_event(LifecycleEvent::AmbientModeChanged { ambient: true });
                    }
                    1 => {
                        looping = true;
                        controller.handle_event(LifecycleEvent::AmbientModeChanged { ambient: false });
                    }
                    2 => {
                        looping = controller.mode() == Mode::Normal;
                        controller.handle_event(LifecycleEvent::VisibilityChanged { hidden: false });
                    }
                    3 => {
                        looping = false;
                        controller.handle_event(LifecycleEvent::VisibilityChanged { hidden: true });
                    }
                    4 => controller.handle_event(LifecycleEvent::TimeTick),
                    5 => {
                        if let Some(handle) = controller.scheduler_mut().take(TaskKind::Timer) {
                            controller.on_fired(handle);
                        }
                    }
                    _ => {
                        if let Some(handle) = controller.scheduler_mut().take(TaskKind::Frame) {
                            controller.on_fired(handle);
                        }
                    }
                }
                assert_single_pending(&controller);
                assert_eq!(controller.scheduler().pending_count(), usize::from(looping));
            }
        }
    }
}
