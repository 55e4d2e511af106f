//! Box layout primitives for the static report surface.
//!
//! A [`Layout`] is a tree of sized boxes laid out at a fixed print width with
//! unconstrained height.  Coordinates are CSS pixels; the rasterizer applies
//! the device scale.

use crate::display::Rgb;
use crate::template::chart::ChartImage;

/// Axis-aligned rectangle in CSS pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Whether `other` lies completely inside this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// What a box represents.  Only the rasterizer interprets this.
#[derive(Clone, Debug, PartialEq)]
pub enum BoxKind {
    /// Plain container painted with its fill and border.
    Block,
    /// One line of text, painted as a solid run of its colour.
    Text(String),
    /// Bitmap content scaled into the box.
    Image(ChartImage),
    /// Stand-in shown when no chart bitmap is available.
    Placeholder(String),
}

/// One node of the layout tree.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutBox {
    pub kind: BoxKind,
    pub rect: Rect,
    pub fill: Option<Rgb>,
    pub border: Option<Rgb>,
    pub children: Vec<LayoutBox>,
}

impl LayoutBox {
    pub fn block(rect: Rect) -> Self {
        Self {
            kind: BoxKind::Block,
            rect,
            fill: None,
            border: None,
            children: Vec::new(),
        }
    }

    pub fn text(rect: Rect, text: impl Into<String>, color: Rgb) -> Self {
        Self {
            kind: BoxKind::Text(text.into()),
            rect,
            fill: Some(color),
            border: None,
            children: Vec::new(),
        }
    }

    pub fn image(rect: Rect, image: ChartImage) -> Self {
        Self {
            kind: BoxKind::Image(image),
            rect,
            fill: None,
            border: None,
            children: Vec::new(),
        }
    }

    pub fn placeholder(rect: Rect, message: impl Into<String>) -> Self {
        Self {
            kind: BoxKind::Placeholder(message.into()),
            rect,
            fill: Some([243, 244, 246]),
            border: Some([209, 213, 219]),
            children: Vec::new(),
        }
    }

    /// Sets the fill colour and returns the updated box.
    pub fn with_fill(mut self, fill: Rgb) -> Self {
        self.fill = Some(fill);
        self
    }

    /// Sets the border colour and returns the updated box.
    pub fn with_border(mut self, border: Rgb) -> Self {
        self.border = Some(border);
        self
    }

    /// Appends a child and returns the updated box.
    pub fn with_child(mut self, child: LayoutBox) -> Self {
        self.children.push(child);
        self
    }

    /// Visits this box and all descendants depth first, parents before children.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a LayoutBox)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Position of a named report section, used for bookmarks and page hints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionMark {
    pub id: String,
    pub title: String,
    pub y: u32,
}

/// Fully laid out report surface.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    pub background: Rgb,
    pub boxes: Vec<LayoutBox>,
    pub sections: Vec<SectionMark>,
    /// Offsets where an explicit page break was requested.
    pub page_breaks: Vec<u32>,
}

impl Layout {
    /// Total number of boxes in the tree.
    pub fn box_count(&self) -> usize {
        let mut count = 0;
        for root in &self.boxes {
            root.walk(&mut |_| count += 1);
        }
        count
    }

    /// Returns the first image box, if any.
    pub fn chart_image(&self) -> Option<&ChartImage> {
        let mut found = None;
        for root in &self.boxes {
            root.walk(&mut |node| {
                if let (None, BoxKind::Image(image)) = (&found, &node.kind) {
                    found = Some(image);
                }
            });
        }
        found
    }
}

/// Estimates the rendered width of `text` at `font_px`.
///
/// Hangul and other wide glyphs count as a full em, ASCII as roughly half.
pub fn estimate_text_width(text: &str, font_px: u32) -> u32 {
    let half_em = font_px as f64 * 0.55;
    let width: f64 = text
        .chars()
        .map(|ch| {
            if ch.is_ascii() {
                half_em
            } else {
                font_px as f64
            }
        })
        .sum();
    width.ceil() as u32
}

/// Vertical cursor that stacks boxes at the print width.
#[derive(Debug)]
pub struct LayoutCursor {
    width: u32,
    padding: u32,
    y: u32,
    page_height: f64,
    boxes: Vec<LayoutBox>,
    sections: Vec<SectionMark>,
    page_breaks: Vec<u32>,
}

impl LayoutCursor {
    /// Starts a layout `width` pixels wide whose pages are `page_height` pixels tall.
    pub fn new(width: u32, padding: u32, page_height: f64) -> Self {
        Self {
            width,
            padding,
            y: padding,
            page_height,
            boxes: Vec::new(),
            sections: Vec::new(),
            page_breaks: Vec::new(),
        }
    }

    /// Left edge of the content column.
    pub fn left(&self) -> u32 {
        self.padding
    }

    /// Width of the content column.
    pub fn content_width(&self) -> u32 {
        self.width.saturating_sub(self.padding * 2)
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    /// Records the start of a named section at the current offset.
    pub fn mark_section(&mut self, id: impl Into<String>, title: impl Into<String>) {
        self.sections.push(SectionMark {
            id: id.into(),
            title: title.into(),
            y: self.y,
        });
    }

    /// Places a box at the current offset and advances past it plus `gap`.
    pub fn push(&mut self, mut node: LayoutBox, gap: u32) {
        let shift = self.y.saturating_sub(node.rect.y);
        if shift > 0 {
            offset_tree(&mut node, shift);
        }
        self.y = node.rect.bottom() + gap;
        self.boxes.push(node);
    }

    /// Adds vertical space without placing a box.
    pub fn advance(&mut self, gap: u32) {
        self.y += gap;
    }

    /// Advances the cursor to the start of the next page.
    ///
    /// A cursor already sitting on a page boundary stays on that page and only
    /// receives the top padding.
    pub fn page_break(&mut self) {
        if self.page_height <= 0.0 {
            return;
        }
        let pages_used = (self.y as f64 / self.page_height).ceil();
        let target = ((pages_used * self.page_height).ceil() as u32).max(self.y);
        self.page_breaks.push(target);
        self.y = target + self.padding;
    }

    pub fn finish(self, background: Rgb) -> Layout {
        Layout {
            width: self.width,
            height: self.y + self.padding,
            background,
            boxes: self.boxes,
            sections: self.sections,
            page_breaks: self.page_breaks,
        }
    }
}

fn offset_tree(node: &mut LayoutBox, dy: u32) {
    node.rect.y += dy;
    for child in &mut node.children {
        offset_tree(child, dy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_stacks_boxes_with_gap() {
        let mut cursor = LayoutCursor::new(800, 40, 1000.0);
        cursor.push(LayoutBox::block(Rect::new(40, 0, 720, 100)), 20);
        cursor.push(
            LayoutBox::block(Rect::new(40, 0, 720, 50))
                .with_child(LayoutBox::block(Rect::new(50, 10, 10, 10))),
            0,
        );
        let layout = cursor.finish([255, 255, 255]);

        assert_eq!(layout.boxes[0].rect.y, 40);
        assert_eq!(layout.boxes[1].rect.y, 160);
        assert_eq!(layout.boxes[1].children[0].rect.y, 170);
        assert_eq!(layout.height, 250);
        assert_eq!(layout.box_count(), 3);
    }

    #[test]
    fn page_break_moves_to_next_boundary() {
        let mut cursor = LayoutCursor::new(800, 40, 1000.0);
        cursor.push(LayoutBox::block(Rect::new(40, 0, 720, 300)), 0);
        cursor.page_break();
        assert_eq!(cursor.y(), 1040);

        let layout = cursor.finish([255, 255, 255]);
        assert_eq!(layout.page_breaks, vec![1000]);
    }

    #[test]
    fn wide_glyphs_count_as_full_em() {
        assert_eq!(estimate_text_width("가나", 10), 20);
        assert_eq!(estimate_text_width("ab", 10), 11);
    }
}
