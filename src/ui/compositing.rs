//! Draw target adapters used to layer the hour label

use embedded_graphics::{
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{ContainsPoint, Rectangle, Sector},
};

/// Magnifies everything drawn through it by an integer factor around `anchor`.
///
/// Mono fonts only come in small sizes; this lets one glyph set fill most of the face.
pub struct Scaled<'a, D> {
    target: &'a mut D,
    anchor: Point,
    scale: u32,
}

impl<'a, D: DrawTarget> Scaled<'a, D> {
    pub fn new(target: &'a mut D, anchor: Point, scale: u32) -> Self {
        Self {
            target,
            anchor,
            scale: scale.max(1),
        }
    }
}

impl<D: DrawTarget> Dimensions for Scaled<'_, D> {
    fn bounding_box(&self) -> Rectangle {
        let parent = self.target.bounding_box();
        Rectangle::new(
            self.anchor + (parent.top_left - self.anchor) / self.scale as i32,
            parent.size / self.scale,
        )
    }
}

impl<D: DrawTarget> DrawTarget for Scaled<'_, D> {
    type Color = D::Color;
    type Error = D::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let block = Size::new_equal(self.scale);
        for Pixel(point, color) in pixels {
            let top_left = self.anchor + (point - self.anchor) * self.scale as i32;
            self.target.fill_solid(&Rectangle::new(top_left, block), color)?;
        }
        Ok(())
    }
}

/// Coverage of a short label drawn at 1:1 around `anchor`, one bit per pixel.
///
/// Lookups go through the same magnification as [`Scaled`], so the mask answers for the label
/// as it lands on the surface.
pub struct GlyphMask {
    area: Rectangle,
    anchor: Point,
    scale: u32,
    rows: [u64; MASK_HEIGHT],
    extent: Option<(Point, Point)>,
}

const MASK_WIDTH: u32 = u64::BITS;
const MASK_HEIGHT: usize = 48;

impl GlyphMask {
    pub fn new(anchor: Point, scale: u32) -> Self {
        Self {
            area: Rectangle::with_center(anchor, Size::new(MASK_WIDTH, MASK_HEIGHT as u32)),
            anchor,
            scale: scale.max(1),
            rows: [0; MASK_HEIGHT],
            extent: None,
        }
    }

    fn is_set(&self, point: Point) -> bool {
        if !self.area.contains(point) {
            return false;
        }
        let offset = point - self.area.top_left;
        (self.rows[offset.y as usize] >> offset.x) & 1 == 1
    }

    /// Whether the magnified label covers `point`
    pub fn covers(&self, point: Point) -> bool {
        let scale = self.scale as i32;
        let delta = point - self.anchor;
        self.is_set(self.anchor + Point::new(delta.x.div_euclid(scale), delta.y.div_euclid(scale)))
    }

    /// Surface area of the magnified label
    pub fn bounds(&self) -> Rectangle {
        self.bounds_with(Point::zero())
    }

    /// Surface area of the magnified label together with a copy of it moved by `offset`
    pub fn bounds_with(&self, offset: Point) -> Rectangle {
        let Some((min, max)) = self.extent else {
            return Rectangle::zero();
        };
        let scale = self.scale as i32;
        let top_left = self.anchor + (min - self.anchor) * scale;
        let bottom_right = self.anchor + (max - self.anchor) * scale + Point::new(scale - 1, scale - 1);
        Rectangle::with_corners(
            top_left.component_min(top_left + offset),
            bottom_right.component_max(bottom_right + offset),
        )
    }
}

impl Dimensions for GlyphMask {
    fn bounding_box(&self) -> Rectangle {
        self.area
    }
}

impl DrawTarget for GlyphMask {
    type Color = Rgb565;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, _) in pixels {
            if !self.area.contains(point) {
                continue;
            }
            let offset = point - self.area.top_left;
            self.rows[offset.y as usize] |= 1 << offset.x;
            self.extent = Some(match self.extent {
                Some((min, max)) => (min.component_min(point), max.component_max(point)),
                None => (point, point),
            });
        }
        Ok(())
    }
}

/// Drops pixels inside `hole` that `covered` claims, passes everything else through.
pub struct Clip<'a, D, P> {
    target: &'a mut D,
    hole: Rectangle,
    covered: P,
}

impl<'a, D, P> Clip<'a, D, P>
where
    D: DrawTarget,
    P: Fn(Point) -> bool,
{
    pub fn new(target: &'a mut D, hole: Rectangle, covered: P) -> Self {
        Self { target, hole, covered }
    }
}

impl<D, P> Dimensions for Clip<'_, D, P>
where
    D: DrawTarget,
{
    fn bounding_box(&self) -> Rectangle {
        self.target.bounding_box()
    }
}

impl<D, P> DrawTarget for Clip<'_, D, P>
where
    D: DrawTarget,
    P: Fn(Point) -> bool,
{
    type Color = D::Color;
    type Error = D::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let hole = self.hole;
        let covered = &self.covered;
        self.target.draw_iter(
            pixels
                .into_iter()
                .filter(|Pixel(point, _)| !(hole.contains(*point) && covered(*point))),
        )
    }
}

/// Drop shadow already on the surface when the label foreground is drawn
#[derive(Clone, Copy)]
pub struct Shadow<'a> {
    pub glyphs: &'a GlyphMask,
    pub offset: Point,
    pub color: Rgb565,
}

/// What lies underneath the label: its shadow, the sweep sector or plain background.
#[derive(Clone, Copy)]
pub struct Backdrop<'a> {
    pub sector: Option<Sector>,
    pub fill: Rgb565,
    pub background: Rgb565,
    pub shadow: Option<Shadow<'a>>,
}

impl Backdrop<'_> {
    pub fn color_at(&self, point: Point) -> Rgb565 {
        if let Some(shadow) = self.shadow {
            if shadow.glyphs.covers(point - shadow.offset) {
                return shadow.color;
            }
        }
        match self.sector {
            Some(sector) if sector.contains(point) => self.fill,
            _ => self.background,
        }
    }
}

/// "Difference" compositing: each channel becomes `|source - backdrop|`.
pub struct Difference<'a, D> {
    target: &'a mut D,
    backdrop: Backdrop<'a>,
}

impl<'a, D> Difference<'a, D>
where
    D: DrawTarget<Color = Rgb565>,
{
    pub fn new(target: &'a mut D, backdrop: Backdrop<'a>) -> Self {
        Self { target, backdrop }
    }
}

pub fn difference(source: Rgb565, backdrop: Rgb565) -> Rgb565 {
    Rgb565::new(
        source.r().abs_diff(backdrop.r()),
        source.g().abs_diff(backdrop.g()),
        source.b().abs_diff(backdrop.b()),
    )
}

impl<D> Dimensions for Difference<'_, D>
where
    D: DrawTarget<Color = Rgb565>,
{
    fn bounding_box(&self) -> Rectangle {
        self.target.bounding_box()
    }
}

impl<D> DrawTarget for Difference<'_, D>
where
    D: DrawTarget<Color = Rgb565>,
{
    type Color = Rgb565;
    type Error = D::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let backdrop = self.backdrop;
        self.target.draw_iter(
            pixels
                .into_iter()
                .map(|Pixel(point, color)| Pixel(point, difference(color, backdrop.color_at(point)))),
        )
    }
}
