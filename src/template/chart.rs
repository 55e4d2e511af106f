//! Score chart inputs and bitmaps.
//!
//! The exporter never goes looking for a chart on screen.  Callers pass either
//! the chart pixels they already have, or the series data so the chart can be
//! laid out and rasterized on its own off-screen surface.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, ImageOutputFormat, RgbImage};

use crate::display::{category_info, score_palette};
use crate::error::ChartCaptureError;
use crate::model::{Category, EvaluationCriteria};
use crate::template::layout::{estimate_text_width, Layout, LayoutBox, LayoutCursor, Rect};

const DATA_URI_PREFIX: &str = "data:";
const PNG_DATA_URI_HEADER: &str = "data:image/png;base64,";

/// Layout size of an isolated chart surface.
pub const CHART_WIDTH_PX: u32 = 600;
pub const CHART_HEIGHT_PX: u32 = 300;

/// PNG-encoded chart bitmap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartImage {
    png: Vec<u8>,
    width: u32,
    height: u32,
}

impl ChartImage {
    /// Wraps an RGB bitmap, encoding it as PNG.
    pub fn from_rgb(image: RgbImage) -> Result<Self, ChartCaptureError> {
        let (width, height) = image.dimensions();
        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image)
            .write_to(&mut png, ImageOutputFormat::Png)
            .map_err(ChartCaptureError::Encode)?;
        Ok(Self {
            png: png.into_inner(),
            width,
            height,
        })
    }

    /// Decodes image bytes of any supported format and normalizes them to PNG.
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Result<Self, ChartCaptureError> {
        let image = image::load_from_memory(bytes.as_ref()).map_err(ChartCaptureError::Decode)?;
        Self::from_rgb(image.to_rgb8())
    }

    /// Parses a `data:<mime>;base64,<payload>` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self, ChartCaptureError> {
        let rest = uri
            .trim()
            .strip_prefix(DATA_URI_PREFIX)
            .ok_or(ChartCaptureError::InvalidDataUri)?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or(ChartCaptureError::InvalidDataUri)?;
        if !header.ends_with(";base64") || !header.starts_with("image/") {
            return Err(ChartCaptureError::InvalidDataUri);
        }
        let bytes = STANDARD.decode(payload.trim())?;
        Self::from_bytes(bytes)
    }

    /// Returns the bitmap as a PNG data URI.
    pub fn to_data_uri(&self) -> String {
        format!("{}{}", PNG_DATA_URI_HEADER, STANDARD.encode(&self.png))
    }

    /// Decodes the PNG back into pixels.
    pub fn decode(&self) -> Result<RgbImage, ChartCaptureError> {
        image::load_from_memory(&self.png)
            .map(|image| image.to_rgb8())
            .map_err(ChartCaptureError::Decode)
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// One bar of the score distribution chart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartPoint {
    pub label: String,
    pub score: u8,
}

impl ChartPoint {
    pub fn new(label: impl Into<String>, score: u8) -> Self {
        Self {
            label: label.into(),
            score: score.min(100),
        }
    }

    /// Builds one point per evaluation category, labelled in display language.
    pub fn from_criteria(criteria: &[EvaluationCriteria]) -> Vec<Self> {
        criteria
            .iter()
            .map(|criteria| {
                let label = match &criteria.category {
                    Category::Other(raw) => raw.clone(),
                    known => category_info(known).label.to_owned(),
                };
                Self::new(label, criteria.score)
            })
            .collect()
    }
}

/// How the export obtains the chart shown on the first page.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ChartInput {
    /// Pixels the caller already rendered.
    Rendered(ChartImage),
    /// Raw series to lay out and rasterize on an isolated surface.
    Series(Vec<ChartPoint>),
    /// Render the "no chart" placeholder.
    #[default]
    None,
}

/// Lays out a horizontal bar chart for `points` on its own surface.
pub fn chart_layout(points: &[ChartPoint]) -> Result<Layout, ChartCaptureError> {
    if points.is_empty() {
        return Err(ChartCaptureError::EmptySeries);
    }

    let padding = 16;
    let mut cursor = LayoutCursor::new(CHART_WIDTH_PX, padding, 0.0);
    let inner = CHART_HEIGHT_PX - padding * 2;
    let row_height = (inner / points.len() as u32).clamp(12, 48);
    let label_width = 150;
    let track_width = cursor.content_width() - label_width;
    let font_px = (row_height / 2).clamp(8, 14);

    for point in points {
        let left = cursor.left();
        let bar_height = row_height * 3 / 5;
        let bar_y = (row_height - bar_height) / 2;
        let fill_width = track_width * u32::from(point.score) / 100;
        let label_rect = Rect::new(
            left,
            (row_height - font_px) / 2,
            estimate_text_width(&point.label, font_px).min(label_width - 8),
            font_px,
        );

        let row = LayoutBox::block(Rect::new(left, 0, cursor.content_width(), row_height))
            .with_child(LayoutBox::text(label_rect, point.label.clone(), [55, 65, 81]))
            .with_child(
                LayoutBox::block(Rect::new(left + label_width, bar_y, track_width, bar_height))
                    .with_fill([229, 231, 235]),
            )
            .with_child(
                LayoutBox::block(Rect::new(left + label_width, bar_y, fill_width, bar_height))
                    .with_fill(score_palette(point.score).accent()),
            );
        cursor.push(row, 0);
    }

    let mut layout = cursor.finish([255, 255, 255]);
    layout.height = layout.height.max(CHART_HEIGHT_PX);
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn data_uri_round_trip_keeps_pixels() {
        let mut pixels = RgbImage::new(3, 2);
        pixels.put_pixel(1, 1, Rgb([200, 10, 10]));
        let chart = ChartImage::from_rgb(pixels.clone()).expect("encode");

        let uri = chart.to_data_uri();
        assert!(uri.starts_with("data:image/png;base64,"));

        let parsed = ChartImage::from_data_uri(&uri).expect("parse");
        assert_eq!((parsed.width(), parsed.height()), (3, 2));
        assert_eq!(parsed.decode().expect("decode"), pixels);
    }

    #[test]
    fn rejects_non_data_uris() {
        assert!(matches!(
            ChartImage::from_data_uri("https://example.com/chart.png"),
            Err(ChartCaptureError::InvalidDataUri)
        ));
        assert!(matches!(
            ChartImage::from_data_uri("data:text/plain;base64,aGk="),
            Err(ChartCaptureError::InvalidDataUri)
        ));
        assert!(matches!(
            ChartImage::from_data_uri("data:image/png;base64,@@@"),
            Err(ChartCaptureError::Base64(_))
        ));
    }

    #[test]
    fn chart_layout_draws_one_row_per_point() {
        let points = vec![ChartPoint::new("첫인상", 80), ChartPoint::new("SEO", 40)];
        let layout = chart_layout(&points).expect("layout");

        assert_eq!(layout.width, CHART_WIDTH_PX);
        assert!(layout.height >= CHART_HEIGHT_PX);
        assert_eq!(layout.boxes.len(), 2);
        let fill = &layout.boxes[0].children[2];
        let track = &layout.boxes[0].children[1];
        assert_eq!(fill.rect.width, track.rect.width * 80 / 100);
    }

    #[test]
    fn empty_series_is_rejected() {
        assert!(matches!(
            chart_layout(&[]),
            Err(ChartCaptureError::EmptySeries)
        ));
    }

    #[test]
    fn points_use_display_labels() {
        let criteria = vec![EvaluationCriteria {
            category: Category::Accessibility,
            score: 64,
            weight: 15.0,
            description: String::new(),
            methodology: String::new(),
            subcriteria: Vec::new(),
        }];
        assert_eq!(
            ChartPoint::from_criteria(&criteria),
            vec![ChartPoint::new("접근성", 64)]
        );
    }
}
