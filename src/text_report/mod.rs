//! Text-based PDF report.
//!
//! This is the fallback export for environments without a rasterizer: the
//! report is typeset with `genpdf` instead of being sliced from a bitmap.  It
//! needs the bundled Hangul fonts, see [`fonts`].

pub mod builder;
pub mod elements;
pub mod fonts;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use genpdf::elements::{Break, FrameCellDecorator, LinearLayout, Paragraph, TableLayout};
use genpdf::style::{Style, StyledString};
use genpdf::{Alignment, Element};
use log::{info, warn};

use crate::config::ExportOptions;
use crate::display::{category_info, format_metric, priority_style, score_palette};
use crate::error::ExportError;
use crate::export::{apply_weight_policy, file_name_component};
use crate::model::{sort_by_priority, Category, ReportBundle};
use crate::template::chart::ChartImage;
use crate::template::{NO_CHART_MESSAGE, REPORT_TITLE};

use self::builder::DocumentBuilder;
use self::elements::{color, mm, CaptionedImage, ScoreBar};

const CHART_WIDTH_MM: f64 = 150.0;
const MUTED: [u8; 3] = [107, 114, 128];

/// A typeset report held in memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextReport {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl TextReport {
    /// Writes the report into `dir` and returns the full path.
    pub fn save_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ExportError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.bytes)?;
        info!("Saved {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

/// Extracts the host part of `url`, without scheme, port or path.
pub fn site_host(url: &str) -> String {
    let rest = url
        .trim()
        .split_once("://")
        .map_or(url.trim(), |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or_default();
    host.split(':').next().unwrap_or_default().to_owned()
}

/// Builds `<product>_Analysis_Report_<host>_<YYYYMMDD>.pdf`.
pub fn text_report_file_name(product_name: &str, url: &str, date: NaiveDate) -> String {
    format!(
        "{}_Analysis_Report_{}_{}.pdf",
        file_name_component(product_name),
        file_name_component(&site_host(url)),
        date.format("%Y%m%d")
    )
}

/// Typesets `bundle` into a PDF.
pub fn render_text_report(
    bundle: &ReportBundle,
    chart: Option<&ChartImage>,
    options: &ExportOptions,
    date: NaiveDate,
) -> Result<TextReport, ExportError> {
    options.validate()?;
    let bundle = apply_weight_policy(bundle, options.weight_policy)?;
    let report = &bundle.report;

    let mut document = DocumentBuilder::new(format!("{} - {}", REPORT_TITLE, report.url))
        .with_page_size(options.page_size)
        .with_font_size(10)
        .with_running_header(format!("{} · {}", REPORT_TITLE, site_host(&report.url)))
        .with_footer_label(options.product_name.as_str())
        .build()
        .map_err(ExportError::TextReport)?;

    document.push(report_body(&bundle, chart)?.into_element());

    let mut bytes = Vec::new();
    document.render(&mut bytes).map_err(ExportError::TextReport)?;

    let file_name = text_report_file_name(&options.product_name, &report.url, date);
    info!("Rendered text report {} ({} bytes)", file_name, bytes.len());
    Ok(TextReport { file_name, bytes })
}

/// Report content as one vertical flow, independent of the loaded fonts.
pub struct ReportBody {
    layout: LinearLayout,
    blocks: usize,
    chart_embedded: bool,
}

impl ReportBody {
    fn new() -> Self {
        Self {
            layout: LinearLayout::vertical(),
            blocks: 0,
            chart_embedded: false,
        }
    }

    fn push<E: Element + 'static>(&mut self, element: E) {
        self.layout.push(element);
        self.blocks += 1;
    }

    /// Number of top-level elements in the flow.
    pub fn block_count(&self) -> usize {
        self.blocks
    }

    /// Whether the chart bitmap made it into the flow instead of the placeholder.
    pub fn chart_embedded(&self) -> bool {
        self.chart_embedded
    }

    pub fn into_element(self) -> LinearLayout {
        self.layout
    }
}

/// Builds the typeset sections of `bundle` in reading order.
pub fn report_body(
    bundle: &ReportBundle,
    chart: Option<&ChartImage>,
) -> Result<ReportBody, ExportError> {
    let report = &bundle.report;
    let mut body = ReportBody::new();

    body.push(
        Paragraph::new(REPORT_TITLE).styled(Style::new().bold().with_font_size(20)),
    );
    body.push(Paragraph::new(report.url.as_str()));
    body.push(
        Paragraph::new(format!("분석일 {} · 분석가 {}", report.analyzed_at, report.analyst))
            .styled(Style::new().with_font_size(8).with_color(color(MUTED))),
    );
    body.push(Break::new(1));

    let score = bundle.total_score();
    body.push(
        Paragraph::new(format!("종합 점수 {}점 / 100점 · 등급 {}", score, bundle.grade())).styled(
            Style::new()
                .bold()
                .with_font_size(14)
                .with_color(color(score_palette(score).accent())),
        ),
    );
    body.push(ScoreBar::new(score));
    body.push(Break::new(1));

    section_title(&mut body, "평가 항목별 점수 분포");
    match chart.map(|chart| {
        CaptionedImage::from_chart(
            chart,
            Paragraph::new(StyledString::new("평가 항목별 점수", Style::new().with_font_size(8))),
        )
    }) {
        Some(Ok(image)) => {
            body.push(image.with_width(mm(CHART_WIDTH_MM)));
            body.chart_embedded = true;
        }
        Some(Err(err)) => {
            warn!("Chart could not be embedded in the text report: {}", err);
            body.push(placeholder());
        }
        None => body.push(placeholder()),
    }
    body.push(Break::new(1));

    section_title(&mut body, "핵심 지표");
    let mut table = TableLayout::new(vec![2, 1, 1, 1]);
    table.set_cell_decorator(FrameCellDecorator::new(true, true, false));
    let mut header = table.row();
    for label in ["지표", "현재", "업계 평균", "목표"] {
        header = header.element(Paragraph::new(label).styled(Style::new().bold()).padded(1));
    }
    header.push().map_err(ExportError::TextReport)?;
    let rows = report
        .current_metrics
        .rows()
        .into_iter()
        .zip(report.industry_benchmark.rows())
        .zip(report.target_metrics.rows());
    for (((label, now, unit), (_, bench, _)), (_, goal, _)) in rows {
        table
            .row()
            .element(Paragraph::new(label).padded(1))
            .element(Paragraph::new(format_metric(now, unit)).padded(1))
            .element(Paragraph::new(format_metric(bench, unit)).padded(1))
            .element(Paragraph::new(format_metric(goal, unit)).padded(1))
            .push()
            .map_err(ExportError::TextReport)?;
    }
    body.push(table);
    body.push(Break::new(1));

    section_title(&mut body, "평가 항목 상세");
    for criteria in &bundle.criteria {
        let info = category_info(&criteria.category);
        let label = match &criteria.category {
            Category::Other(raw) => format!("{} ({})", info.label, raw),
            _ => info.label.to_owned(),
        };
        body.push(
            Paragraph::new(format!(
                "{} · {}점 · 가중치 {:.0}%",
                label, criteria.score, criteria.weight
            ))
            .styled(Style::new().bold()),
        );
        body.push(ScoreBar::new(criteria.score));
        for sub in &criteria.subcriteria {
            body.push(
                Paragraph::new(format!("  {} {}점 (기준 {})", sub.name, sub.score, sub.benchmark))
                    .styled(Style::new().with_font_size(9)),
            );
        }
        body.push(Break::new(0.5));
    }

    section_title(&mut body, "전체 개선 사항");
    for item in sort_by_priority(&bundle.improvements) {
        let style = priority_style(&item.priority);
        body.push(
            Paragraph::new(format!("[{}] {}", style.label, item.title))
                .styled(Style::new().bold().with_color(color(style.color))),
        );
        body.push(
            Paragraph::new(format!(
                "현재: {} → 목표: {}",
                item.current_state, item.target_state
            ))
            .styled(Style::new().with_font_size(9)),
        );
        body.push(
            Paragraph::new(format!(
                "기대 효과: {} · 난이도 {} · 상태 {}",
                item.impact,
                item.effort.as_str(),
                item.status.as_str()
            ))
            .styled(Style::new().with_font_size(9).with_color(color(MUTED))),
        );
        body.push(Break::new(0.5));
    }

    Ok(body)
}

fn section_title(body: &mut ReportBody, title: &str) {
    body.push(Paragraph::new(title).styled(Style::new().bold().with_font_size(13)));
    body.push(Break::new(0.5));
}

fn placeholder() -> impl Element {
    Paragraph::new(NO_CHART_MESSAGE)
        .aligned(Alignment::Center)
        .styled(Style::new().with_color(color(MUTED)))
}
