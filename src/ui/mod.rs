//! UI definitions module
//! Based on: https://github.com/lupyuen/pinetime-watchface/blob/master/src/lib.rs

use embedded_graphics::{pixelcolor::Rgb565, prelude::*, primitives::Rectangle};

use crate::system::{controller::Mode, time::ClockReading};

mod compositing;
mod sweep_watchface;

pub use compositing::{Backdrop, Clip, Difference, GlyphMask, Scaled, Shadow};
pub use sweep_watchface::{sweep_sector, FaceStyle, SweepWatchface};

pub trait WatchFace {
    /// Paint one frame. Only pixels that change need to be written unless `state.repaint` is set.
    fn draw<D>(&self, target: &mut D, state: &WatchFaceState) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>;
}

/// State for the watch face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchFaceState {
    pub reading: ClockReading,
    pub geometry: Geometry,
    pub mode: Mode,
    /// The surface no longer shows the previous frame of this face and must be cleared
    pub repaint: bool,
}

/// Face layout, fixed for the life of the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    pub center: Point,
    pub radius: u32,
}

impl Geometry {
    /// Center of the surface and half its shorter side. `None` for an empty surface.
    pub fn from_bounds(bounds: Rectangle) -> Option<Self> {
        let Size { width, height } = bounds.size;
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            center: bounds.top_left + Point::new((width / 2) as i32, (height / 2) as i32),
            radius: width.min(height) / 2,
        })
    }

    pub fn diameter(&self) -> u32 {
        self.radius * 2
    }
}
