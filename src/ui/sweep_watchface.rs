//! Sweep watchface
//!
//! A translucent sector grows clockwise from 12 o'clock over the hour, with the hour painted
//! large in the middle of the face.
//!
//! The LCD has no frame buffer, so a frame that follows one of the same hour writes every pixel
//! once with its final color: the sector skips the label, the label is blended against what
//! will be underneath it, and the shadow skips what the foreground covers.

use embedded_graphics::{
    mono_font::MonoTextStyle,
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{PointsIter, PrimitiveStyle, Sector},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use profont::PROFONT_24_POINT;

use super::{
    Backdrop, Clip, Difference, Geometry, GlyphMask, Scaled, Shadow, WatchFace, WatchFaceState,
};
use crate::system::{controller::Mode, time::ClockReading};

/// Where the sweep starts: 12 o'clock
const REFERENCE_ANGLE_DEG: f32 = -90.0;

/// Colors and layout of the face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceStyle {
    pub background: Rgb565,
    /// #CCCCCC at 40 % over the background
    pub sweep_fill: Rgb565,
    /// Ambient mode draws the sector outline only
    pub sweep_outline: Rgb565,
    pub text: Rgb565,
    pub ambient_text: Rgb565,
    pub shadow: Rgb565,
    pub shadow_offset: Point,
    /// Magnification of the 24pt font
    pub text_scale: u32,
    /// Label position relative to the face center
    pub label_offset: Point,
}

impl Default for FaceStyle {
    fn default() -> Self {
        Self {
            background: Rgb565::BLACK,
            sweep_fill: Rgb565::new(10, 20, 10),
            sweep_outline: Rgb565::new(12, 24, 12),
            text: Rgb565::new(25, 51, 25),
            ambient_text: Rgb565::new(16, 32, 16),
            shadow: Rgb565::BLACK,
            shadow_offset: Point::new(3, 3),
            text_scale: 6,
            label_offset: Point::new(0, 17),
        }
    }
}

/// The sector covering the elapsed part of the hour, `None` right on the hour.
pub fn sweep_sector(reading: &ClockReading, geometry: &Geometry) -> Option<Sector> {
    let fraction = reading.sweep_fraction();
    if fraction <= 0.0 {
        return None;
    }
    Some(Sector::with_center(
        geometry.center,
        geometry.diameter(),
        REFERENCE_ANGLE_DEG.deg(),
        (fraction * 360.0).deg(),
    ))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SweepWatchface {
    style: FaceStyle,
}

impl SweepWatchface {
    pub fn new(style: FaceStyle) -> Self {
        Self { style }
    }
}

fn draw_label<D>(target: &mut D, label: &str, position: Point, color: Rgb565) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let character_style = MonoTextStyle::new(&PROFONT_24_POINT, color);
    let text_style = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Middle)
        .build();
    Text::with_text_style(label, position, character_style, text_style).draw(target)?;
    Ok(())
}

impl WatchFace for SweepWatchface {
    fn draw<D>(&self, target: &mut D, state: &WatchFaceState) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let style = &self.style;
        // A growing outline leaves its old edge behind, so ambient frames always start over
        if state.repaint || state.mode == Mode::Ambient {
            target.clear(style.background)?;
        }

        let sector = sweep_sector(&state.reading, &state.geometry);
        let mut buf = [0u8; 2];
        let label = state.reading.hour_label(&mut buf);
        let anchor = state.geometry.center + style.label_offset;

        match state.mode {
            Mode::Normal => {
                let offset = style.shadow_offset;
                let mut glyphs = GlyphMask::new(anchor, style.text_scale);
                if let Err(never) = draw_label(&mut glyphs, label, anchor, style.text) {
                    match never {}
                }

                // Elapsed part of the hour, except where the label goes
                if let Some(sector) = sector {
                    let mut around_label = Clip::new(&mut *target, glyphs.bounds_with(offset), |p| {
                        glyphs.covers(p) || glyphs.covers(p - offset)
                    });
                    // Same pixel set the blend backdrop assumes
                    around_label.draw_iter(sector.points().map(|point| Pixel(point, style.sweep_fill)))?;
                }

                // Foreground, blended against whatever the shadow, sector and background leave
                let backdrop = Backdrop {
                    sector,
                    fill: style.sweep_fill,
                    background: style.background,
                    shadow: Some(Shadow {
                        glyphs: &glyphs,
                        offset,
                        color: style.shadow,
                    }),
                };
                let mut blended = Difference::new(&mut *target, backdrop);
                draw_label(
                    &mut Scaled::new(&mut blended, anchor, style.text_scale),
                    label,
                    anchor,
                    style.text,
                )?;

                // Shadow where the foreground does not cover it
                let shadow_anchor = anchor + offset;
                let mut uncovered = Clip::new(&mut *target, glyphs.bounds(), |p| glyphs.covers(p));
                draw_label(
                    &mut Scaled::new(&mut uncovered, shadow_anchor, style.text_scale),
                    label,
                    shadow_anchor,
                    style.shadow,
                )?;
            }
            Mode::Ambient => {
                if let Some(sector) = sector {
                    sector
                        .into_styled(PrimitiveStyle::with_stroke(style.sweep_outline, 1))
                        .draw(target)?;
                }
                draw_label(
                    &mut Scaled::new(&mut *target, anchor, style.text_scale),
                    label,
                    anchor,
                    style.ambient_text,
                )?;
            }
        }
        Ok(())
    }
}
