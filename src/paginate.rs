//! Slicing of one tall bitmap into fixed-size output pages.
//!
//! The source bitmap is always scaled so its width fills the page width
//! exactly.  One page therefore holds `page_height * source_width / page_width`
//! source rows.  The surface is cut top to bottom into bands of that height;
//! the last band may be shorter and is placed as-is, without stretching and
//! without padding.  Every source row lands on exactly one page.

use image::RgbImage;
use log::debug;

use crate::config::PageSize;
use crate::error::{ExportError, SliceError};
use crate::writer::{DocumentWriter, PlacedImage};

/// Output page dimensions in the document writer's unit (millimetres for PDF
/// output, although any consistent unit works).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    width: f64,
    height: f64,
}

impl PageGeometry {
    pub fn new(width: f64, height: f64) -> Result<Self, ExportError> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ExportError::InvalidGeometry(format!(
                "page size {}x{} must be positive and finite",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    pub fn from_page_size(page_size: PageSize) -> Result<Self, ExportError> {
        Self::new(page_size.width_mm, page_size.height_mm)
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Number of source rows that fill exactly one page for a surface
    /// `source_width` pixels wide.  Never less than one.
    pub fn slice_height_for(&self, source_width: u32) -> Result<u32, ExportError> {
        if source_width == 0 {
            return Err(ExportError::InvalidGeometry(
                "source surface has zero width".into(),
            ));
        }
        let rows = (self.height * source_width as f64 / self.width).floor();
        Ok((rows.min(u32::MAX as f64) as u32).max(1))
    }

    /// Height a band of `slice_height` rows occupies on the page.
    pub fn rendered_height(&self, slice_height: u32, source_width: u32) -> f64 {
        slice_height as f64 * self.width / source_width as f64
    }
}

/// One horizontal band of the source surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageSlice {
    pub source_y: u32,
    pub height: u32,
}

impl PageSlice {
    /// Exclusive end row.
    pub fn end(&self) -> u32 {
        self.source_y + self.height
    }
}

/// A slice together with where it lands on its output page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedSlice {
    pub page_index: usize,
    pub slice: PageSlice,
    pub placement: PlacedImage,
}

/// Computes the page plan for a `source_width` x `source_height` surface.
///
/// Fails with [`ExportError::PageLimit`] before any work happens when the plan
/// would exceed `max_pages`.
pub fn plan_pages(
    source_width: u32,
    source_height: u32,
    geometry: &PageGeometry,
    max_pages: usize,
) -> Result<Vec<PlacedSlice>, ExportError> {
    if source_width == 0 || source_height == 0 {
        return Err(ExportError::EmptySurface {
            width: source_width,
            height: source_height,
        });
    }

    let page_rows = geometry.slice_height_for(source_width)?;
    let page_count = source_height.div_ceil(page_rows) as usize;
    if page_count > max_pages {
        return Err(ExportError::PageLimit {
            pages: page_count,
            limit: max_pages,
        });
    }

    let mut plan = Vec::with_capacity(page_count);
    let mut cursor = 0u32;
    while cursor < source_height {
        let height = (source_height - cursor).min(page_rows);
        plan.push(PlacedSlice {
            page_index: plan.len(),
            slice: PageSlice {
                source_y: cursor,
                height,
            },
            placement: PlacedImage {
                x: 0.0,
                y: 0.0,
                width: geometry.width(),
                height: geometry.rendered_height(height, source_width),
            },
        });
        cursor += height;
    }
    Ok(plan)
}

/// Something a page band can be cut from.
pub trait SliceSource {
    /// Pixel width and height of the whole surface.
    fn dimensions(&self) -> (u32, u32);

    /// Copies rows `[slice.source_y, slice.end())` at full width.
    fn extract(&self, slice: &PageSlice) -> Result<RgbImage, SliceError>;
}

impl SliceSource for RgbImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn extract(&self, slice: &PageSlice) -> Result<RgbImage, SliceError> {
        if slice.height == 0 || slice.end() > self.height() {
            return Err(SliceError::OutOfBounds {
                start: slice.source_y,
                end: slice.end(),
                surface_height: self.height(),
            });
        }
        Ok(image::imageops::crop_imm(self, 0, slice.source_y, self.width(), slice.height).to_image())
    }
}

/// Writes every page band of `source` into `writer`, top to bottom.
///
/// A band that cannot be extracted aborts the whole run; the writer is left
/// unfinished so no partial document can be saved from it.
pub fn paginate(
    source: &dyn SliceSource,
    writer: &mut dyn DocumentWriter,
    geometry: &PageGeometry,
    max_pages: usize,
) -> Result<Vec<PlacedSlice>, ExportError> {
    let (width, height) = source.dimensions();
    let plan = plan_pages(width, height, geometry, max_pages)?;

    for placed in &plan {
        let band = source
            .extract(&placed.slice)
            .map_err(|source| ExportError::SliceExtraction {
                page: placed.page_index + 1,
                source,
            })?;
        if placed.page_index > 0 {
            writer.add_page()?;
        }
        writer.place_image(&band, placed.placement)?;
        debug!(
            "Placed page {} rows {}..{} at {:.1}x{:.1}",
            placed.page_index + 1,
            placed.slice.source_y,
            placed.slice.end(),
            placed.placement.width,
            placed.placement.height
        );
    }

    Ok(plan)
}
