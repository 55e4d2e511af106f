//! `genpdf` document setup for the text report: fonts, paper, margins and the
//! per-page running header and footer.

use genpdf::elements::Paragraph;
use genpdf::error::{Error, ErrorKind};
use genpdf::style::Style;
use genpdf::{Alignment, Element, Margins, PageDecorator, Position, Size};

use super::elements::{color, mm};
use super::fonts;
use crate::config::PageSize;
use crate::display::Rgb;

const DECORATION_FONT_SIZE: u8 = 8;
const DECORATION_INK: Rgb = [107, 114, 128];
const FOOTER_HEIGHT_MM: f64 = 8.0;
const HEADER_GAP_MM: f64 = 3.0;

/// Configures a report document before any content is pushed.
pub struct DocumentBuilder {
    title: String,
    page_size: PageSize,
    margins: Margins,
    font_size: u8,
    running_header: Option<String>,
    footer_label: Option<String>,
}

impl DocumentBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            page_size: PageSize::A4,
            margins: Margins::trbl(15, 15, 12, 15),
            font_size: 10,
            running_header: None,
            footer_label: None,
        }
    }

    pub fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_margins(mut self, margins: impl Into<Margins>) -> Self {
        self.margins = margins.into();
        self
    }

    pub fn with_font_size(mut self, font_size: u8) -> Self {
        self.font_size = font_size;
        self
    }

    /// Text repeated at the top of every page after the first.
    pub fn with_running_header(mut self, text: impl Into<String>) -> Self {
        self.running_header = Some(text.into());
        self
    }

    /// Label shown before the page number at the bottom of every page.
    pub fn with_footer_label(mut self, label: impl Into<String>) -> Self {
        self.footer_label = Some(label.into());
        self
    }

    /// Loads the bundled font family and applies the configuration.
    pub fn build(self) -> Result<genpdf::Document, Error> {
        let mut document = genpdf::Document::new(fonts::default_font_family()?);
        document.set_title(self.title);
        document.set_paper_size(Size::new(
            mm(self.page_size.width_mm),
            mm(self.page_size.height_mm),
        ));
        document.set_font_size(self.font_size);
        document.set_page_decorator(ReportPageDecorator {
            page: 0,
            margins: self.margins,
            running_header: self.running_header,
            footer_label: self.footer_label,
        });
        Ok(document)
    }
}

fn decoration(text: String, alignment: Alignment) -> impl Element {
    Paragraph::new(text).aligned(alignment).styled(
        Style::new()
            .with_font_size(DECORATION_FONT_SIZE)
            .with_color(color(DECORATION_INK)),
    )
}

struct ReportPageDecorator {
    page: usize,
    margins: Margins,
    running_header: Option<String>,
    footer_label: Option<String>,
}

impl PageDecorator for ReportPageDecorator {
    fn decorate_page<'a>(
        &mut self,
        context: &genpdf::Context,
        mut area: genpdf::render::Area<'a>,
        style: Style,
    ) -> Result<genpdf::render::Area<'a>, Error> {
        self.page += 1;
        area.add_margins(self.margins);

        if let Some(label) = &self.footer_label {
            let footer_height = mm(FOOTER_HEIGHT_MM);
            let available = area.size().height;
            if footer_height > available {
                return Err(Error::new(
                    "page is too small for the footer",
                    ErrorKind::InvalidData,
                ));
            }

            let mut footer_area = area.clone();
            footer_area.add_offset(Position::new(0, available - footer_height));
            let mut footer = decoration(format!("{} · {} 페이지", label, self.page), Alignment::Center);
            let result = footer.render(context, footer_area, style)?;
            if result.has_more {
                return Err(Error::new(
                    "footer does not fit into the reserved space",
                    ErrorKind::PageSizeExceeded,
                ));
            }
            area.set_height(available - footer_height);
        }

        if self.page > 1 {
            if let Some(text) = &self.running_header {
                let mut header = decoration(text.clone(), Alignment::Right);
                let result = header.render(context, area.clone(), style)?;
                area.add_offset(Position::new(0, result.size.height + mm(HEADER_GAP_MM)));
            }
        }

        Ok(area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_a4_and_body_size() {
        let builder = DocumentBuilder::new("Report");
        assert_eq!(builder.page_size, PageSize::A4);
        assert_eq!(builder.font_size, 10);
        assert!(builder.running_header.is_none());
        assert!(builder.footer_label.is_none());
    }

    #[test]
    fn missing_fonts_surface_as_build_error() {
        if fonts::default_fonts_available() {
            return;
        }
        let err = DocumentBuilder::new("Report").build().err().expect("fonts missing");
        assert!(fonts::fonts_missing(&err));
    }
}
