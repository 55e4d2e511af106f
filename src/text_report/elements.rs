//! Custom `genpdf` elements used by the text report.

use genpdf::elements::{Image, Paragraph};
use genpdf::error::{Error, ErrorKind};
use genpdf::style::{Color, Style};
use genpdf::{render, Alignment, Element, Mm, Position, RenderResult, Scale, Size};
use image::DynamicImage;

use crate::display::{score_palette, Rgb};
use crate::template::chart::ChartImage;

const CHART_DPI: f64 = 150.0;
const MM_PER_INCH: f64 = 25.4;
const CAPTION_SPACING_MM: f64 = 2.0;
const BAR_HEIGHT_MM: f64 = 2.4;
const BAR_SPACING_MM: f64 = 1.6;
const BAR_STROKE_MM: f64 = 0.2;
const TRACK: Rgb = [229, 231, 235];

pub(crate) fn mm(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

/// Converts a display colour into a `genpdf` colour.
pub fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb[0], rgb[1], rgb[2])
}

/// Chart bitmap with a caption stacked underneath, both sharing one alignment.
pub struct CaptionedImage {
    image: Image,
    caption: Paragraph,
    alignment: Alignment,
    natural_width: f64,
    requested_width: Option<Mm>,
}

impl CaptionedImage {
    /// Builds the element from a chart bitmap.
    pub fn from_chart(chart: &ChartImage, caption: Paragraph) -> Result<Self, Error> {
        let pixels = chart.decode().map_err(|err| {
            Error::new(
                format!("Failed to decode chart bitmap: {}", err),
                ErrorKind::InvalidData,
            )
        })?;
        let natural_width = MM_PER_INCH * pixels.width() as f64 / CHART_DPI;
        let image = Image::from_dynamic_image(DynamicImage::ImageRgb8(pixels))?.with_dpi(CHART_DPI);
        let mut element = Self {
            image,
            caption,
            alignment: Alignment::Center,
            natural_width,
            requested_width: None,
        };
        element.apply_layout();
        Ok(element)
    }

    /// Scales the image to `width` while keeping the aspect ratio.
    pub fn with_width(mut self, width: impl Into<Option<Mm>>) -> Self {
        self.requested_width = width.into();
        self.apply_layout();
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self.apply_layout();
        self
    }

    fn apply_layout(&mut self) {
        self.image.set_alignment(self.alignment);
        self.caption.set_alignment(self.alignment);
        let scale = match self.requested_width {
            Some(width) if self.natural_width > f64::EPSILON => {
                mm_to_f64(width) / self.natural_width
            }
            _ => 1.0,
        };
        self.image.set_scale(Scale::new(scale, scale));
    }
}

impl Element for CaptionedImage {
    fn render(
        &mut self,
        context: &genpdf::Context,
        mut area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        let image_result = self.image.render(context, area.clone(), style)?;
        result.size = result.size.stack_vertical(image_result.size);
        result.has_more |= image_result.has_more;

        let spacing = mm(CAPTION_SPACING_MM);
        area.add_offset(Position::new(0, image_result.size.height + spacing));
        result.size = result.size.stack_vertical(Size::new(0, spacing));

        let caption_result = self.caption.render(context, area, style)?;
        result.size = result.size.stack_vertical(caption_result.size);
        result.has_more |= caption_result.has_more;

        Ok(result)
    }
}

/// Horizontal score bar: a gray track with the scored share filled in the
/// score's palette colour.
pub struct ScoreBar {
    score: u8,
}

impl ScoreBar {
    pub fn new(score: u8) -> Self {
        Self {
            score: score.min(100),
        }
    }

    /// Share of the track that is filled, in `0.0..=1.0`.
    pub fn fill_ratio(&self) -> f64 {
        f64::from(self.score) / 100.0
    }
}

impl Element for ScoreBar {
    fn render(
        &mut self,
        _context: &genpdf::Context,
        area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        let height = mm(BAR_HEIGHT_MM + BAR_SPACING_MM);
        if height > area.size().height {
            result.has_more = true;
            return Ok(result);
        }

        let width = mm_to_f64(area.size().width);
        let filled = width * self.fill_ratio();
        let track = Style::new().with_color(color(TRACK));
        let fill = Style::new().with_color(color(score_palette(self.score).accent()));

        // Stack thin strokes to paint a solid band.
        let mut offset = 0.0;
        while offset <= BAR_HEIGHT_MM {
            let y = mm(offset);
            area.draw_line(
                vec![
                    Position::new(0, y),
                    Position::new(mm(width), y),
                ],
                track,
            );
            if filled > 0.0 {
                area.draw_line(
                    vec![
                        Position::new(0, y),
                        Position::new(mm(filled), y),
                    ],
                    fill,
                );
            }
            offset += BAR_STROKE_MM;
        }

        result.size = Size::new(area.size().width, height);
        Ok(result)
    }
}
