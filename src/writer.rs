//! Paginated document writers.
//!
//! The paginator only talks to [`DocumentWriter`].  [`PrintPdfWriter`] is the
//! production implementation on top of `printpdf`; tests substitute recorders.

use std::io::BufWriter;

use image::{DynamicImage, RgbImage};
use printpdf::{Image, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use crate::config::PageSize;
use crate::error::ExportError;

const MM_PER_INCH: f64 = 25.4;

/// Where an image goes on the current page, measured from the top-left corner
/// in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedImage {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Sink for page images.
///
/// A new writer starts with one empty page.  Pages are only appended, never
/// revisited, so output order equals call order.
pub trait DocumentWriter {
    /// Starts a new page; later images land on it.
    fn add_page(&mut self) -> Result<(), ExportError>;

    /// Draws `image` on the current page at `placement`.
    fn place_image(&mut self, image: &RgbImage, placement: PlacedImage)
        -> Result<(), ExportError>;

    /// Serializes the document.  The writer cannot be used afterwards.
    fn finish(&mut self) -> Result<Vec<u8>, ExportError>;
}

/// Factory producing a fresh writer for each export.
pub type WriterFactory = dyn Fn(PageSize, &str) -> Box<dyn DocumentWriter> + Send + Sync;

/// Returns a factory creating [`PrintPdfWriter`] instances.
pub fn pdf_writer_factory() -> Box<WriterFactory> {
    Box::new(|page_size: PageSize, title: &str| -> Box<dyn DocumentWriter> {
        Box::new(PrintPdfWriter::new(page_size, title))
    })
}

/// `printpdf`-backed writer producing one image per page.
pub struct PrintPdfWriter {
    document: Option<PdfDocumentReference>,
    layer: PdfLayerReference,
    page_size: PageSize,
    pages: usize,
}

impl PrintPdfWriter {
    pub fn new(page_size: PageSize, title: &str) -> Self {
        let (document, page, layer) = PdfDocument::new(
            title.to_owned(),
            Mm(page_size.width_mm),
            Mm(page_size.height_mm),
            "Page 1".to_owned(),
        );
        let layer = document.get_page(page).get_layer(layer);
        Self {
            document: Some(document),
            layer,
            page_size,
            pages: 1,
        }
    }

    /// Number of pages created so far.
    pub fn page_count(&self) -> usize {
        self.pages
    }

    fn document(&self) -> Result<&PdfDocumentReference, ExportError> {
        self.document
            .as_ref()
            .ok_or_else(|| ExportError::Writer("document already finished".into()))
    }
}

impl DocumentWriter for PrintPdfWriter {
    fn add_page(&mut self) -> Result<(), ExportError> {
        let name = format!("Page {}", self.pages + 1);
        let document = self.document()?;
        let (page, layer) = document.add_page(
            Mm(self.page_size.width_mm),
            Mm(self.page_size.height_mm),
            name,
        );
        self.layer = document.get_page(page).get_layer(layer);
        self.pages += 1;
        Ok(())
    }

    fn place_image(
        &mut self,
        image: &RgbImage,
        placement: PlacedImage,
    ) -> Result<(), ExportError> {
        self.document()?;
        if image.width() == 0 || placement.width <= 0.0 {
            return Err(ExportError::Writer("cannot place an empty image".into()));
        }

        // Pick the dpi that maps the bitmap width onto the requested width;
        // the height follows from the same factor.
        let dpi = image.width() as f64 * MM_PER_INCH / placement.width;
        // PDF origin is bottom-left.
        let bottom = self.page_size.height_mm - placement.y - placement.height;

        Image::from_dynamic_image(&DynamicImage::ImageRgb8(image.clone())).add_to_layer(
            self.layer.clone(),
            Some(Mm(placement.x)),
            Some(Mm(bottom)),
            None,
            None,
            None,
            Some(dpi),
        );
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>, ExportError> {
        let document = self
            .document
            .take()
            .ok_or_else(|| ExportError::Writer("document already finished".into()))?;
        let mut buffer = BufWriter::new(Vec::new());
        document
            .save(&mut buffer)
            .map_err(|err| ExportError::Writer(err.to_string()))?;
        buffer
            .into_inner()
            .map_err(|err| ExportError::Io(err.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_pdf_with_every_page() {
        let mut writer = PrintPdfWriter::new(PageSize::A4, "test");
        writer
            .place_image(
                &RgbImage::new(20, 28),
                PlacedImage {
                    x: 0.0,
                    y: 0.0,
                    width: 210.0,
                    height: 294.0,
                },
            )
            .expect("first image");
        writer.add_page().expect("second page");
        writer
            .place_image(
                &RgbImage::new(20, 5),
                PlacedImage {
                    x: 0.0,
                    y: 0.0,
                    width: 210.0,
                    height: 52.5,
                },
            )
            .expect("second image");
        assert_eq!(writer.page_count(), 2);

        let bytes = writer.finish().expect("finish");
        assert!(bytes.starts_with(b"%PDF"));
        assert!(matches!(writer.finish(), Err(ExportError::Writer(_))));
    }
}
