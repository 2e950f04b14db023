//! Mock implementations for testing

#![cfg(test)]

use core::cell::Cell;
use std::vec::Vec;

use chrono::{NaiveDate, NaiveDateTime};
use embassy_time::Duration;
use embedded_graphics::{pixelcolor::Rgb565, prelude::*, primitives::Rectangle};

use crate::system::{
    scheduler::{Scheduler, TaskHandle, TaskKind},
    time::ClockSource,
};
use crate::WatchError;

/// In-memory RGB565 surface
pub struct FrameBuffer {
    size: Size,
    pixels: Vec<Rgb565>,
    clears: usize,
}

impl FrameBuffer {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            pixels: std::vec![Rgb565::BLACK; (size.width * size.height) as usize],
            clears: 0,
        }
    }

    fn index(&self, point: Point) -> Option<usize> {
        let (x, y) = (u32::try_from(point.x).ok()?, u32::try_from(point.y).ok()?);
        (x < self.size.width && y < self.size.height).then(|| (y * self.size.width + x) as usize)
    }

    pub fn pixel(&self, point: Point) -> Rgb565 {
        self.index(point).map_or(Rgb565::BLACK, |i| self.pixels[i])
    }

    /// Number of pixels with exactly this color
    pub fn count(&self, color: Rgb565) -> usize {
        self.pixels.iter().filter(|&&c| c == color).count()
    }

    /// Smallest rectangle holding every pixel of this color
    pub fn bounds_of(&self, color: Rgb565) -> Option<Rectangle> {
        let width = self.size.width as usize;
        let points = self
            .pixels
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == color)
            .map(|(i, _)| Point::new((i % width) as i32, (i / width) as i32));
        let (mut min, mut max) = (None::<Point>, None::<Point>);
        for p in points {
            min = Some(min.map_or(p, |m| m.component_min(p)));
            max = Some(max.map_or(p, |m| m.component_max(p)));
        }
        Some(Rectangle::with_corners(min?, max?))
    }

    pub fn clears(&self) -> usize {
        self.clears
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb565;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let Some(i) = self.index(point) {
                self.pixels[i] = color;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.clears += 1;
        self.pixels.fill(color);
        Ok(())
    }
}

/// Surface whose first `failures` clears fail
pub struct FlakyTarget {
    inner: FrameBuffer,
    failures: usize,
}

impl FlakyTarget {
    pub fn new(size: Size, failures: usize) -> Self {
        Self {
            inner: FrameBuffer::new(size),
            failures,
        }
    }

    pub fn inner(&self) -> &FrameBuffer {
        &self.inner
    }
}

impl OriginDimensions for FlakyTarget {
    fn size(&self) -> Size {
        self.inner.size
    }
}

impl DrawTarget for FlakyTarget {
    type Color = Rgb565;
    type Error = ();

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.inner.draw_iter(pixels).map_err(|never| match never {})
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(());
        }
        self.inner.clear(color).map_err(|never| match never {})
    }
}

/// Clock that can be set, or broken, from the test
pub struct FixedClock {
    now: Cell<Option<NaiveDateTime>>,
}

impl FixedClock {
    pub fn at(h: u32, m: u32, s: u32, ms: u32) -> Self {
        let clock = Self { now: Cell::new(None) };
        clock.set(h, m, s, ms);
        clock
    }

    pub fn broken() -> Self {
        Self { now: Cell::new(None) }
    }

    pub fn set(&self, h: u32, m: u32, s: u32, ms: u32) {
        let now = NaiveDate::from_ymd_opt(2024, 3, 3)
            .and_then(|d| d.and_hms_milli_opt(h, m, s, ms));
        self.now.set(now);
    }

    pub fn fail(&self) {
        self.now.set(None);
    }
}

impl ClockSource for FixedClock {
    fn now(&self) -> Result<NaiveDateTime, WatchError> {
        self.now.get().ok_or(WatchError::ClockUnavailable)
    }
}

/// Scheduler that only records; tests fire tasks by hand
#[derive(Default)]
pub struct ManualScheduler {
    next_id: u32,
    pending: Vec<TaskHandle>,
    delays: Vec<Duration>,
    canceled: usize,
}

impl ManualScheduler {
    pub fn pending(&self, kind: TaskKind) -> Vec<TaskHandle> {
        self.pending.iter().copied().filter(|h| h.kind() == kind).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Delay passed to the most recent `set_timer`
    pub fn last_delay(&self) -> Option<Duration> {
        self.delays.last().copied()
    }

    pub fn canceled(&self) -> usize {
        self.canceled
    }

    /// Remove and return the oldest pending task of `kind`
    pub fn take(&mut self, kind: TaskKind) -> Option<TaskHandle> {
        let pos = self.pending.iter().position(|h| h.kind() == kind)?;
        Some(self.pending.remove(pos))
    }

    fn push(&mut self, kind: TaskKind) -> TaskHandle {
        self.next_id += 1;
        let handle = TaskHandle::new(self.next_id, kind);
        self.pending.push(handle);
        handle
    }
}

impl Scheduler for ManualScheduler {
    fn set_timer(&mut self, delay: Duration) -> TaskHandle {
        self.delays.push(delay);
        self.push(TaskKind::Timer)
    }

    fn request_frame(&mut self) -> TaskHandle {
        self.push(TaskKind::Frame)
    }

    fn cancel(&mut self, handle: TaskHandle) {
        let before = self.pending.len();
        self.pending.retain(|&h| h != handle);
        if self.pending.len() != before {
            self.canceled += 1;
        }
    }
}
