//! Template renderer turning a [`ReportBundle`] into a static report surface.
//!
//! The renderer produces two views of the same content: a self-contained HTML
//! document for on-screen viewing, and a [`Layout`] box tree laid out at the
//! print width that the rasterizer turns into the bitmap the paginator slices.

pub mod chart;
pub mod html;
pub mod layout;

use log::debug;

use crate::config::ExportOptions;
use crate::display::{category_info, format_metric, priority_style, score_palette, Rgb};
use crate::error::ExportError;
use crate::model::{sort_by_priority, top_urgent, Category, Improvement, ReportBundle};
use crate::paginate::PageGeometry;

use self::chart::ChartImage;
use self::layout::{estimate_text_width, Layout, LayoutBox, LayoutCursor, Rect};

/// Report title shown in the header and the text report.
pub const REPORT_TITLE: &str = "UI/UX 분석 보고서";

/// Message shown in place of a missing chart.
pub const NO_CHART_MESSAGE: &str = "차트를 표시할 수 없습니다";

const PAGE_PADDING: u32 = 40;
const SECTION_GAP: u32 = 24;
const ROW_GAP: u32 = 8;
const HEADING_PX: u32 = 18;
const BODY_PX: u32 = 13;
const SMALL_PX: u32 = 11;

const INK: Rgb = [17, 24, 39];
const MUTED: Rgb = [107, 114, 128];
const CARD: Rgb = [249, 250, 251];
const CARD_BORDER: Rgb = [229, 231, 235];
const HEADER_BG: Rgb = [30, 41, 59];
const HEADER_INK: Rgb = [241, 245, 249];
const TRACK: Rgb = [229, 231, 235];

/// Output of the template renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedDocument {
    /// Self-contained HTML with inline styles.
    pub html: String,
    /// Box tree at the print width, ready for staging.
    pub layout: Layout,
}

impl RenderedDocument {
    /// Offsets, in layout pixels, where a new page was explicitly requested.
    pub fn page_breaks(&self) -> &[u32] {
        &self.layout.page_breaks
    }
}

/// Height in layout pixels of one output page at the configured scale.
///
/// This mirrors the paginator's slice height so that requested page breaks
/// line up with real page boundaries.
pub fn layout_page_height(options: &ExportOptions) -> Result<f64, ExportError> {
    let geometry = PageGeometry::from_page_size(options.page_size)?;
    let source_width = scaled(options.print_width_px, options.raster_scale).max(1);
    let slice = geometry.slice_height_for(source_width)?;
    Ok(slice as f64 / options.raster_scale)
}

/// Scales a layout length to device pixels.
pub fn scaled(value: u32, scale: f64) -> u32 {
    (value as f64 * scale).round() as u32
}

/// Renders every report section into HTML and a layout tree.
///
/// `chart` is the already acquired chart bitmap; `None` renders the placeholder.
pub fn render_report(
    bundle: &ReportBundle,
    chart: Option<&ChartImage>,
    options: &ExportOptions,
) -> Result<RenderedDocument, ExportError> {
    options.validate()?;
    let page_height = layout_page_height(options)?;
    let urgent = top_urgent(&bundle.improvements, options.urgent_count);

    let mut cursor = LayoutCursor::new(options.print_width_px, PAGE_PADDING, page_height);
    header(&mut cursor, bundle);
    score_block(&mut cursor, bundle);
    chart_block(&mut cursor, chart);
    key_metrics(&mut cursor, bundle);
    urgent_block(&mut cursor, &urgent);
    cursor.page_break();
    criteria_block(&mut cursor, bundle);
    improvements_block(&mut cursor, &bundle.improvements);
    seo_block(&mut cursor, bundle);
    let layout = cursor.finish([255, 255, 255]);

    debug!(
        "Laid out report for {} at {}x{} px with {} boxes",
        bundle.report.url,
        layout.width,
        layout.height,
        layout.box_count()
    );

    let html = html::render_html(bundle, chart, &urgent);
    Ok(RenderedDocument { html, layout })
}

fn text_line(cursor: &LayoutCursor, x: u32, y: u32, text: &str, font_px: u32, color: Rgb) -> LayoutBox {
    let max = cursor.content_width().saturating_sub(x - cursor.left());
    let width = estimate_text_width(text, font_px).min(max);
    LayoutBox::text(Rect::new(x, y, width, font_px), text, color)
}

fn heading(cursor: &mut LayoutCursor, id: &str, title: &str) {
    cursor.mark_section(id, title);
    let left = cursor.left();
    let line = text_line(cursor, left, 0, title, HEADING_PX, INK);
    let node = LayoutBox::block(Rect::new(left, 0, cursor.content_width(), HEADING_PX + 10))
        .with_child(line);
    cursor.push(node, ROW_GAP);
}

fn card(cursor: &LayoutCursor, height: u32) -> LayoutBox {
    LayoutBox::block(Rect::new(cursor.left(), 0, cursor.content_width(), height))
        .with_fill(CARD)
        .with_border(CARD_BORDER)
}

fn bar(x: u32, y: u32, width: u32, height: u32, score: u8) -> LayoutBox {
    let filled = width * u32::from(score.min(100)) / 100;
    LayoutBox::block(Rect::new(x, y, width, height))
        .with_fill(TRACK)
        .with_child(
            LayoutBox::block(Rect::new(x, y, filled, height))
                .with_fill(score_palette(score).accent()),
        )
}

fn header(cursor: &mut LayoutCursor, bundle: &ReportBundle) {
    cursor.mark_section("header", REPORT_TITLE);
    let left = cursor.left();
    let inner = left + 24;
    let report = &bundle.report;
    let meta = format!("분석일 {} · 분석가 {}", report.analyzed_at, report.analyst);
    let node = LayoutBox::block(Rect::new(left, 0, cursor.content_width(), 96))
        .with_fill(HEADER_BG)
        .with_child(text_line(cursor, inner, 18, REPORT_TITLE, 24, HEADER_INK))
        .with_child(text_line(cursor, inner, 50, &report.url, BODY_PX, HEADER_INK))
        .with_child(text_line(cursor, inner, 72, &meta, SMALL_PX, [148, 163, 184]));
    cursor.push(node, SECTION_GAP);
}

fn score_block(cursor: &mut LayoutCursor, bundle: &ReportBundle) {
    cursor.mark_section("score", "종합 점수");
    let left = cursor.left();
    let score = bundle.total_score();
    let palette = score_palette(score);
    let badge = LayoutBox::block(Rect::new(left + 20, 20, 90, 90))
        .with_fill(palette.tint())
        .with_border(palette.accent())
        .with_child(text_line(
            cursor,
            left + 52,
            41,
            bundle.grade().as_str(),
            48,
            palette.accent(),
        ));
    let summary = format!("종합 점수 {}점 / 100점", score);
    let node = card(cursor, 130)
        .with_child(badge)
        .with_child(text_line(cursor, left + 140, 34, &summary, HEADING_PX, INK))
        .with_child(bar(left + 140, 74, cursor.content_width().saturating_sub(170), 20, score));
    cursor.push(node, SECTION_GAP);
}

fn chart_block(cursor: &mut LayoutCursor, chart: Option<&ChartImage>) {
    heading(cursor, "chart", "평가 항목별 점수 분포");
    let rect = Rect::new(cursor.left(), 0, cursor.content_width(), 240);
    let node = match chart {
        Some(image) => LayoutBox::image(rect, image.clone()),
        None => LayoutBox::placeholder(rect, NO_CHART_MESSAGE),
    };
    cursor.push(node, SECTION_GAP);
}

fn key_metrics(cursor: &mut LayoutCursor, bundle: &ReportBundle) {
    heading(cursor, "metrics", "핵심 지표");
    let left = cursor.left();
    let column = cursor.content_width() / 4;
    let report = &bundle.report;
    let header_labels = ["지표", "현재", "업계 평균", "목표"];
    let row_height = 28;

    let mut grid = LayoutBox::block(Rect::new(left, 0, cursor.content_width(), row_height * 5))
        .with_border(CARD_BORDER);
    for (index, label) in header_labels.iter().enumerate() {
        let x = left + column * index as u32;
        grid = grid.with_child(
            LayoutBox::block(Rect::new(x, 0, column, row_height))
                .with_fill([241, 245, 249])
                .with_child(text_line(cursor, x + 10, 8, label, BODY_PX, INK)),
        );
    }

    let current = report.current_metrics.rows();
    let benchmark = report.industry_benchmark.rows();
    let target = report.target_metrics.rows();
    for (row, ((label, now, unit), ((_, bench, _), (_, goal, _)))) in current
        .iter()
        .zip(benchmark.iter().zip(target.iter()))
        .enumerate()
    {
        let y = row_height * (row as u32 + 1);
        let cells = [
            label.to_string(),
            format_metric(*now, unit),
            format_metric(*bench, unit),
            format_metric(*goal, unit),
        ];
        for (index, value) in cells.iter().enumerate() {
            let x = left + column * index as u32;
            grid = grid.with_child(
                LayoutBox::block(Rect::new(x, y, column, row_height))
                    .with_border(CARD_BORDER)
                    .with_child(text_line(cursor, x + 10, y + 8, value, BODY_PX, INK)),
            );
        }
    }
    cursor.push(grid, SECTION_GAP);
}

fn improvement_card(cursor: &LayoutCursor, item: &Improvement, detailed: bool) -> LayoutBox {
    let left = cursor.left();
    let style = priority_style(&item.priority);
    let height = if detailed { 88 } else { 64 };
    let transition = format!("현재: {} → 목표: {}", item.current_state, item.target_state);
    let mut node = card(cursor, height)
        .with_child(LayoutBox::block(Rect::new(left, 0, 6, height)).with_fill(style.color))
        .with_child(
            LayoutBox::block(Rect::new(left + 20, 14, 56, 18))
                .with_fill(style.color)
                .with_child(text_line(cursor, left + 26, 17, style.label, SMALL_PX, [255, 255, 255])),
        )
        .with_child(text_line(cursor, left + 90, 16, &item.title, BODY_PX, INK))
        .with_child(text_line(cursor, left + 20, 40, &transition, SMALL_PX, MUTED));
    if detailed {
        let impact = format!(
            "기대 효과: {} · 난이도 {} · 상태 {}",
            item.impact,
            item.effort.as_str(),
            item.status.as_str()
        );
        node = node.with_child(text_line(cursor, left + 20, 62, &impact, SMALL_PX, MUTED));
    }
    node
}

fn urgent_block(cursor: &mut LayoutCursor, urgent: &[&Improvement]) {
    heading(cursor, "urgent", "가장 시급한 개선 사항");
    if urgent.is_empty() {
        let left = cursor.left();
        let line = text_line(cursor, left, 0, "시급한 개선 사항이 없습니다.", BODY_PX, MUTED);
        cursor.push(line, SECTION_GAP);
        return;
    }
    for item in urgent {
        let node = improvement_card(cursor, item, false);
        cursor.push(node, ROW_GAP);
    }
}

fn criteria_block(cursor: &mut LayoutCursor, bundle: &ReportBundle) {
    heading(cursor, "criteria", "평가 항목 상세");
    let left = cursor.left();
    for criteria in &bundle.criteria {
        let info = category_info(&criteria.category);
        let label = match &criteria.category {
            Category::Other(raw) => format!("{} ({})", info.label, raw),
            _ => info.label.to_owned(),
        };
        let title = format!("{} · {}점 · 가중치 {:.0}%", label, criteria.score, criteria.weight);
        let height = 64 + 28 * criteria.subcriteria.len() as u32 + 12;
        let mut node = card(cursor, height)
            .with_child(text_line(cursor, left + 20, 16, &title, BODY_PX, INK))
            .with_child(bar(left + 20, 40, cursor.content_width().saturating_sub(40), 12, criteria.score));
        for (index, sub) in criteria.subcriteria.iter().enumerate() {
            let y = 64 + 28 * index as u32;
            let line = format!("{} {}점", sub.name, sub.score);
            node = node
                .with_child(text_line(cursor, left + 30, y, &line, SMALL_PX, MUTED))
                .with_child(bar(left + 360, y + 2, cursor.content_width().saturating_sub(380), 8, sub.score));
        }
        cursor.push(node, ROW_GAP);
    }
    cursor.advance(SECTION_GAP);
}

fn improvements_block(cursor: &mut LayoutCursor, improvements: &[Improvement]) {
    heading(cursor, "improvements", "전체 개선 사항");
    for item in sort_by_priority(improvements) {
        let node = improvement_card(cursor, item, true);
        cursor.push(node, ROW_GAP);
    }
}

fn seo_block(cursor: &mut LayoutCursor, bundle: &ReportBundle) {
    heading(cursor, "seo", "검색 최적화 (SEO)");
    let left = cursor.left();
    let seo = bundle
        .criteria
        .iter()
        .find(|criteria| criteria.category == Category::Seo);
    let seo_items: Vec<&Improvement> = sort_by_priority(&bundle.improvements)
        .into_iter()
        .filter(|item| item.category == Category::Seo)
        .collect();

    if seo.is_none() && seo_items.is_empty() {
        let line = text_line(cursor, left, 0, "SEO 평가 데이터가 없습니다.", BODY_PX, MUTED);
        cursor.push(line, 0);
        return;
    }

    if let Some(criteria) = seo {
        for sub in &criteria.subcriteria {
            let line = format!("{} · {}점 · 기준 {}", sub.name, sub.score, sub.benchmark);
            let node = card(cursor, 36)
                .with_child(text_line(cursor, left + 20, 12, &line, SMALL_PX, INK));
            cursor.push(node, 4);
        }
    }
    for item in seo_items {
        let style = priority_style(&item.priority);
        let node = card(cursor, 36)
            .with_child(LayoutBox::block(Rect::new(left, 0, 6, 36)).with_fill(style.color))
            .with_child(text_line(cursor, left + 20, 12, &item.title, SMALL_PX, INK));
        cursor.push(node, 4);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::sample_bundle;

    #[test]
    fn layout_spans_print_width_and_requests_one_break() {
        let options = ExportOptions::default();
        let document = render_report(&sample_bundle(), None, &options).expect("render");

        assert_eq!(document.layout.width, options.print_width_px);
        assert_eq!(document.page_breaks().len(), 1);
        let page_height = layout_page_height(&options).expect("page height");
        let first_break = document.page_breaks()[0] as f64;
        assert!(first_break >= page_height && first_break < page_height + 2.0);
    }

    #[test]
    fn boxes_stay_inside_the_surface() {
        let document =
            render_report(&sample_bundle(), None, &ExportOptions::default()).expect("render");
        let surface = Rect::new(0, 0, document.layout.width, document.layout.height);
        for root in &document.layout.boxes {
            root.walk(&mut |node| assert!(surface.contains(&node.rect), "{:?}", node.rect));
        }
    }

    #[test]
    fn narrow_print_width_is_rejected_and_minimum_fits() {
        let narrow = ExportOptions {
            print_width_px: 300,
            ..ExportOptions::default()
        };
        assert!(matches!(
            render_report(&sample_bundle(), None, &narrow),
            Err(ExportError::Config(_))
        ));

        let minimum = ExportOptions {
            print_width_px: crate::config::MIN_PRINT_WIDTH_PX,
            ..ExportOptions::default()
        };
        let document = render_report(&sample_bundle(), None, &minimum).expect("render");
        let surface = Rect::new(0, 0, document.layout.width, document.layout.height);
        for root in &document.layout.boxes {
            root.walk(&mut |node| assert!(surface.contains(&node.rect), "{:?}", node.rect));
        }
    }

    #[test]
    fn missing_chart_renders_placeholder() {
        let document =
            render_report(&sample_bundle(), None, &ExportOptions::default()).expect("render");
        assert!(document.layout.chart_image().is_none());
        assert!(document.html.contains(NO_CHART_MESSAGE));
    }

    #[test]
    fn sections_are_marked_in_order() {
        let document =
            render_report(&sample_bundle(), None, &ExportOptions::default()).expect("render");
        let ids: Vec<&str> = document
            .layout
            .sections
            .iter()
            .map(|mark| mark.id.as_str())
            .collect();
        assert_eq!(
            ids,
            [
                "header",
                "score",
                "chart",
                "metrics",
                "urgent",
                "criteria",
                "improvements",
                "seo"
            ]
        );
        assert!(document
            .layout
            .sections
            .windows(2)
            .all(|pair| pair[0].y < pair[1].y));
    }
}
