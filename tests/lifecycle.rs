//! Drives the controller through its async event loop on the host.

use std::time::Duration as StdDuration;

use embassy_sync::{blocking_mutex::raw::NoopRawMutex, channel::Channel};
use embedded_graphics::{pixelcolor::Rgb565, prelude::*};
use pinetime_sweep::{
    EmbassyScheduler, LifecycleEvent, Mode, SweepWatchface, TimeManager, TimeReference,
    WatchFaceController,
};

/// Minimal in-memory LCD
struct Canvas {
    pixels: Vec<Rgb565>,
}

impl Canvas {
    fn new() -> Self {
        Self {
            pixels: vec![Rgb565::BLACK; 240 * 240],
        }
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(240, 240)
    }
}

impl DrawTarget for Canvas {
    type Color = Rgb565;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, color) in pixels {
            if (0..240).contains(&p.x) && (0..240).contains(&p.y) {
                self.pixels[p.y as usize * 240 + p.x as usize] = color;
            }
        }
        Ok(())
    }
}

fn clock() -> TimeManager {
    let mut clock = TimeManager::init();
    // 2024-03-03 03:15:30 UTC
    clock.set_time(TimeReference::from_timestamp(1_709_435_730, 0).unwrap());
    clock
}

#[tokio::test]
async fn ambient_event_stops_continuous_redraw() {
    let events = Channel::<NoopRawMutex, LifecycleEvent, 4>::new();
    let mut controller = WatchFaceController::start(
        Canvas::new(),
        SweepWatchface::default(),
        clock(),
        EmbassyScheduler::default(),
    )
    .unwrap();

    events
        .send(LifecycleEvent::AmbientModeChanged { ambient: true })
        .await;
    let _ = tokio::time::timeout(
        StdDuration::from_millis(100),
        controller.run(events.receiver()),
    )
    .await;

    assert_eq!(controller.mode(), Mode::Ambient);
    assert_eq!(controller.stats().painted, 2);
    assert_eq!(controller.pending(), (None, None));
    assert_eq!(controller.scheduler().pending(), (None, None));
}

#[tokio::test]
async fn normal_mode_keeps_redrawing() {
    let events = Channel::<NoopRawMutex, LifecycleEvent, 4>::new();
    let mut controller = WatchFaceController::start(
        Canvas::new(),
        SweepWatchface::default(),
        clock(),
        EmbassyScheduler::default(),
    )
    .unwrap();

    let _ = tokio::time::timeout(
        StdDuration::from_millis(1_200),
        controller.run(events.receiver()),
    )
    .await;

    let stats = controller.stats();
    assert!(stats.painted >= 3, "only {} frames painted", stats.painted);
    assert_eq!(stats.skipped, 0);

    let (timer, frame) = controller.pending();
    assert!(timer.is_some() ^ frame.is_some());
    assert_eq!(controller.scheduler().pending(), (timer, frame));
}

#[tokio::test]
async fn wake_after_sleep_rearms_loop() {
    let events = Channel::<NoopRawMutex, LifecycleEvent, 4>::new();
    let mut controller = WatchFaceController::start(
        Canvas::new(),
        SweepWatchface::default(),
        clock(),
        EmbassyScheduler::default(),
    )
    .unwrap();

    events
        .send(LifecycleEvent::VisibilityChanged { hidden: true })
        .await;
    let _ = tokio::time::timeout(
        StdDuration::from_millis(50),
        controller.run(events.receiver()),
    )
    .await;
    assert_eq!(controller.pending(), (None, None));
    assert_eq!(controller.stats().painted, 1);

    events
        .send(LifecycleEvent::VisibilityChanged { hidden: false })
        .await;
    let _ = tokio::time::timeout(
        StdDuration::from_millis(5),
        controller.run(events.receiver()),
    )
    .await;
    assert_eq!(controller.mode(), Mode::Normal);
    assert!(controller.stats().painted >= 2);
    let (timer, frame) = controller.pending();
    assert!(timer.is_some() ^ frame.is_some());
}
