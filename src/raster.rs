//! Rasterization of staged layout surfaces into RGB bitmaps.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::display::Rgb as Color;
use crate::error::{RasterError, SliceError};
use crate::paginate::{PageSlice, SliceSource};
use crate::staging::StagedSurface;
use crate::template::layout::{estimate_text_width, BoxKind, LayoutBox, Rect};
use crate::template::scaled;

const PLACEHOLDER_FONT_PX: u32 = 14;
const PLACEHOLDER_INK: Color = [107, 114, 128];

/// Device size of one rasterization.  Always the full scroll size of the
/// staged node, never just its visible part.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterOptions {
    pub scale: f64,
    pub width: u32,
    pub height: u32,
}

impl RasterOptions {
    /// Covers the whole of `surface` at `scale`.
    pub fn for_surface(surface: &StagedSurface, scale: f64) -> Self {
        Self {
            scale,
            width: scaled(surface.placement.width, scale),
            height: scaled(surface.placement.height, scale),
        }
    }
}

/// One tall bitmap produced by a [`Rasterizer`].
#[derive(Clone, Debug, PartialEq)]
pub struct RasterSurface {
    image: RgbImage,
}

impl RasterSurface {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

impl SliceSource for RasterSurface {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn extract(&self, slice: &PageSlice) -> Result<RgbImage, SliceError> {
        self.image.extract(slice)
    }
}

/// Turns a staged node into pixels.
pub trait Rasterizer: Send + Sync {
    fn rasterize(
        &self,
        surface: &StagedSurface,
        options: &RasterOptions,
    ) -> Result<RasterSurface, RasterError>;
}

/// Deterministic rasterizer that paints the layout box tree directly.
///
/// Fills and borders are painted as solid rectangles.  Text is drawn as one
/// solid block per glyph in the text colour, which keeps the output
/// independent of installed fonts.  Image boxes are scaled into their box.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoxRasterizer;

impl BoxRasterizer {
    pub fn new() -> Self {
        Self
    }
}

impl Rasterizer for BoxRasterizer {
    fn rasterize(
        &self,
        surface: &StagedSurface,
        options: &RasterOptions,
    ) -> Result<RasterSurface, RasterError> {
        if options.width == 0 || options.height == 0 {
            return Err(RasterError::new(format!(
                "{} has an empty device size {}x{}",
                surface.id, options.width, options.height
            )));
        }
        if !(options.scale.is_finite() && options.scale > 0.0) {
            return Err(RasterError::new(format!(
                "invalid device scale {}",
                options.scale
            )));
        }

        let layout = &surface.layout;
        let mut canvas = Canvas {
            image: RgbImage::from_pixel(options.width, options.height, Rgb(layout.background)),
            scale: options.scale,
        };
        for root in &layout.boxes {
            paint(&mut canvas, root)?;
        }
        Ok(RasterSurface::new(canvas.image))
    }
}

struct Canvas {
    image: RgbImage,
    scale: f64,
}

impl Canvas {
    fn device(&self, value: f64) -> u32 {
        (value * self.scale).round().max(0.0) as u32
    }

    /// Fills a rectangle given in layout pixels, clipped to the canvas.
    fn fill(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color) {
        let x0 = self.device(x).min(self.image.width());
        let y0 = self.device(y).min(self.image.height());
        let x1 = self.device(x + width).min(self.image.width());
        let y1 = self.device(y + height).min(self.image.height());
        for py in y0..y1 {
            for px in x0..x1 {
                self.image.put_pixel(px, py, Rgb(color));
            }
        }
    }

    fn stroke(&mut self, node: &LayoutBox, color: Color) {
        let rect = node.rect;
        let (x, y) = (rect.x as f64, rect.y as f64);
        let (w, h) = (rect.width as f64, rect.height as f64);
        let line = 1.0;
        self.fill(x, y, w, line, color);
        self.fill(x, y + h - line, w, line, color);
        self.fill(x, y, line, h, color);
        self.fill(x + w - line, y, line, h, color);
    }

    fn glyphs(&mut self, rect: Rect, text: &str, color: Color) {
        let font = rect.height as f64;
        let right = rect.right() as f64;
        let mut x = rect.x as f64;
        for ch in text.chars() {
            let advance = if ch.is_ascii() { font * 0.55 } else { font };
            if x >= right {
                break;
            }
            if !ch.is_whitespace() {
                let width = (advance * 0.8).min(right - x);
                self.fill(x, rect.y as f64 + font * 0.15, width, font * 0.7, color);
            }
            x += advance;
        }
    }
}

fn paint(canvas: &mut Canvas, node: &LayoutBox) -> Result<(), RasterError> {
    let rect = node.rect;
    match &node.kind {
        BoxKind::Block => {
            if let Some(fill) = node.fill {
                canvas.fill(
                    rect.x as f64,
                    rect.y as f64,
                    rect.width as f64,
                    rect.height as f64,
                    fill,
                );
            }
        }
        BoxKind::Text(text) => {
            if let Some(color) = node.fill {
                canvas.glyphs(rect, text, color);
            }
        }
        BoxKind::Image(chart) => {
            let pixels = chart
                .decode()
                .map_err(|err| RasterError::with_source("chart bitmap could not be decoded", err))?;
            let width = canvas.device(rect.width as f64).max(1);
            let height = canvas.device(rect.height as f64).max(1);
            let fitted = imageops::resize(&pixels, width, height, FilterType::Triangle);
            let (x, y) = (canvas.device(rect.x as f64), canvas.device(rect.y as f64));
            imageops::overlay(&mut canvas.image, &fitted, x, y);
        }
        BoxKind::Placeholder(message) => {
            if let Some(fill) = node.fill {
                canvas.fill(
                    rect.x as f64,
                    rect.y as f64,
                    rect.width as f64,
                    rect.height as f64,
                    fill,
                );
            }
            let font = PLACEHOLDER_FONT_PX.min(rect.height);
            let text_width = estimate_text_width(message, font).min(rect.width);
            let label = Rect::new(
                rect.x + (rect.width - text_width) / 2,
                rect.y + (rect.height - font) / 2,
                text_width,
                font,
            );
            canvas.glyphs(label, message, PLACEHOLDER_INK);
        }
    }

    if let Some(border) = node.border {
        canvas.stroke(node, border);
    }
    for child in &node.children {
        paint(canvas, child)?;
    }
    Ok(())
}
