//! Self-contained HTML view of a report.
//!
//! All styling is inline so the document renders the same wherever it is
//! opened.  Every piece of report text is escaped before it is written.

use std::fmt::Write as _;

use crate::display::{category_info, format_metric, hex, priority_style, score_palette};
use crate::model::{sort_by_priority, Category, EvaluationCriteria, Improvement, ReportBundle};
use crate::template::chart::ChartImage;
use crate::template::{NO_CHART_MESSAGE, REPORT_TITLE};

const WEBFONT_URL: &str =
    "https://fonts.googleapis.com/css2?family=Noto+Sans+KR:wght@400;700&display=swap";

const PAGE_STYLE: &str = "width:794px;margin:0 auto;padding:40px;box-sizing:border-box;\
font-family:'Noto Sans KR',sans-serif;color:#111827;background:#ffffff";
const CARD_STYLE: &str =
    "background:#f9fafb;border:1px solid #e5e7eb;border-radius:8px;padding:16px 20px;margin-bottom:8px";
const H2_STYLE: &str = "font-size:18px;margin:24px 0 8px";

/// Renders the report as one HTML document.
pub fn render_html(
    bundle: &ReportBundle,
    chart: Option<&ChartImage>,
    urgent: &[&Improvement],
) -> String {
    let report = &bundle.report;
    let mut html = String::with_capacity(16 * 1024);

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"ko\">\n<head>\n<meta charset=\"utf-8\">\n\
<title>{title} - {url}</title>\n<link rel=\"stylesheet\" href=\"{font}\">\n</head>\n\
<body style=\"margin:0;background:#f3f4f6\">\n<div style=\"{page}\">\n",
        title = html_escape(REPORT_TITLE),
        url = html_escape(&report.url),
        font = WEBFONT_URL,
        page = PAGE_STYLE,
    );

    let _ = write!(
        html,
        "<header id=\"header\" style=\"background:#1e293b;color:#f1f5f9;border-radius:8px;padding:18px 24px\">\n\
<h1 style=\"font-size:24px;margin:0 0 8px\">{}</h1>\n<div style=\"font-size:13px\">{}</div>\n\
<div style=\"font-size:11px;color:#94a3b8\">분석일 {} · 분석가 {}</div>\n</header>\n",
        html_escape(REPORT_TITLE),
        html_escape(&report.url),
        html_escape(&report.analyzed_at),
        html_escape(&report.analyst),
    );

    score_section(&mut html, bundle);
    chart_section(&mut html, chart);
    metrics_section(&mut html, bundle);

    let _ = writeln!(html, "<section id=\"urgent\">\n<h2 style=\"{}\">가장 시급한 개선 사항</h2>", H2_STYLE);
    if urgent.is_empty() {
        html.push_str("<p style=\"color:#6b7280\">시급한 개선 사항이 없습니다.</p>\n");
    }
    for item in urgent {
        improvement_card(&mut html, item, false);
    }
    html.push_str("</section>\n");

    html.push_str("<div style=\"page-break-before:always;break-before:page\"></div>\n");

    let _ = writeln!(html, "<section id=\"criteria\">\n<h2 style=\"{}\">평가 항목 상세</h2>", H2_STYLE);
    for criteria in &bundle.criteria {
        criteria_card(&mut html, criteria);
    }
    html.push_str("</section>\n");

    let _ = writeln!(html, "<section id=\"improvements\">\n<h2 style=\"{}\">전체 개선 사항</h2>", H2_STYLE);
    for item in sort_by_priority(&bundle.improvements) {
        improvement_card(&mut html, item, true);
    }
    html.push_str("</section>\n");

    seo_section(&mut html, bundle);

    html.push_str("</div>\n</body>\n</html>\n");
    html
}

fn score_section(html: &mut String, bundle: &ReportBundle) {
    let score = bundle.total_score();
    let palette = score_palette(score);
    let _ = write!(
        html,
        "<section id=\"score\" style=\"{card};display:flex;align-items:center;gap:30px;margin-top:24px\">\n\
<div style=\"width:90px;height:90px;border-radius:12px;border:2px solid {accent};background:{tint};\
color:{accent};font-size:48px;font-weight:700;text-align:center;line-height:90px\">{grade}</div>\n\
<div style=\"flex:1\"><div style=\"font-size:18px;font-weight:700\">종합 점수 {score}점 / 100점</div>\n\
{bar}</div>\n</section>\n",
        card = CARD_STYLE,
        accent = hex(palette.accent()),
        tint = hex(palette.tint()),
        grade = bundle.grade(),
        score = score,
        bar = progress_bar(score, 20),
    );
}

fn chart_section(html: &mut String, chart: Option<&ChartImage>) {
    let _ = writeln!(html, "<section id=\"chart\">\n<h2 style=\"{}\">평가 항목별 점수 분포</h2>", H2_STYLE);
    match chart {
        Some(image) => {
            let _ = writeln!(
                html,
                "<img src=\"{}\" alt=\"평가 항목별 점수 차트\" width=\"{}\" height=\"{}\" style=\"width:100%;height:auto\">",
                image.to_data_uri(),
                image.width(),
                image.height()
            );
        }
        None => {
            let _ = writeln!(
                html,
                "<div style=\"height:240px;background:#f3f4f6;border:1px solid #d1d5db;color:#6b7280;\
display:flex;align-items:center;justify-content:center\">{}</div>",
                html_escape(NO_CHART_MESSAGE)
            );
        }
    }
    html.push_str("</section>\n");
}

fn metrics_section(html: &mut String, bundle: &ReportBundle) {
    let report = &bundle.report;
    let _ = writeln!(
        html,
        "<section id=\"metrics\">\n<h2 style=\"{}\">핵심 지표</h2>\n\
<table style=\"width:100%;border-collapse:collapse;font-size:13px\">\n\
<tr style=\"background:#f1f5f9\"><th style=\"{cell}\">지표</th><th style=\"{cell}\">현재</th>\
<th style=\"{cell}\">업계 평균</th><th style=\"{cell}\">목표</th></tr>",
        H2_STYLE,
        cell = "border:1px solid #e5e7eb;padding:6px 10px;text-align:left",
    );
    let rows = report
        .current_metrics
        .rows()
        .into_iter()
        .zip(report.industry_benchmark.rows())
        .zip(report.target_metrics.rows());
    for (((label, now, unit), (_, bench, _)), (_, goal, _)) in rows {
        let _ = writeln!(
            html,
            "<tr><td style=\"{cell}\">{}</td><td style=\"{cell}\">{}</td><td style=\"{cell}\">{}</td>\
<td style=\"{cell}\">{}</td></tr>",
            html_escape(label),
            html_escape(&format_metric(now, unit)),
            html_escape(&format_metric(bench, unit)),
            html_escape(&format_metric(goal, unit)),
            cell = "border:1px solid #e5e7eb;padding:6px 10px",
        );
    }
    html.push_str("</table>\n</section>\n");
}

fn criteria_card(html: &mut String, criteria: &EvaluationCriteria) {
    let info = category_info(&criteria.category);
    let label = match &criteria.category {
        Category::Other(raw) => format!("{} ({})", info.label, raw),
        _ => info.label.to_owned(),
    };
    let _ = writeln!(
        html,
        "<div style=\"{}\">\n<div style=\"font-weight:700\">{} · {}점 · 가중치 {:.0}%</div>\n\
<div style=\"font-size:11px;color:#6b7280\">{}</div>\n{}",
        CARD_STYLE,
        html_escape(&label),
        criteria.score,
        criteria.weight,
        html_escape(if criteria.description.is_empty() {
            info.description
        } else {
            criteria.description.as_str()
        }),
        progress_bar(criteria.score, 12),
    );
    for sub in &criteria.subcriteria {
        let _ = writeln!(
            html,
            "<div style=\"display:flex;gap:12px;font-size:11px;margin-top:8px\">\
<span style=\"width:320px\">{} {}점</span><span style=\"flex:1\">{}</span></div>",
            html_escape(&sub.name),
            sub.score,
            progress_bar(sub.score, 8),
        );
    }
    html.push_str("</div>\n");
}

fn improvement_card(html: &mut String, item: &Improvement, detailed: bool) {
    let style = priority_style(&item.priority);
    let color = hex(style.color);
    let _ = write!(
        html,
        "<div style=\"{card};border-left:6px solid {color}\">\n\
<span style=\"background:{color};color:#ffffff;font-size:11px;padding:2px 6px;border-radius:4px\">{label}</span>\n\
<strong style=\"font-size:13px;margin-left:8px\">{title}</strong>\n\
<div style=\"font-size:11px;color:#6b7280;margin-top:6px\">현재: {current} → 목표: {target}</div>\n",
        card = CARD_STYLE,
        color = color,
        label = html_escape(style.label),
        title = html_escape(&item.title),
        current = html_escape(&item.current_state),
        target = html_escape(&item.target_state),
    );
    if detailed {
        let _ = writeln!(
            html,
            "<div style=\"font-size:11px;color:#6b7280\">기대 효과: {} · 난이도 {} · 상태 {}</div>",
            html_escape(&item.impact),
            html_escape(item.effort.as_str()),
            html_escape(item.status.as_str()),
        );
    }
    html.push_str("</div>\n");
}

fn seo_section(html: &mut String, bundle: &ReportBundle) {
    let _ = writeln!(html, "<section id=\"seo\">\n<h2 style=\"{}\">검색 최적화 (SEO)</h2>", H2_STYLE);
    let seo = bundle
        .criteria
        .iter()
        .find(|criteria| criteria.category == Category::Seo);
    let items: Vec<&Improvement> = sort_by_priority(&bundle.improvements)
        .into_iter()
        .filter(|item| item.category == Category::Seo)
        .collect();

    if seo.is_none() && items.is_empty() {
        html.push_str("<p style=\"color:#6b7280\">SEO 평가 데이터가 없습니다.</p>\n</section>\n");
        return;
    }
    if let Some(criteria) = seo {
        for sub in &criteria.subcriteria {
            let _ = writeln!(
                html,
                "<div style=\"{}\">{} · {}점 · 기준 {}</div>",
                CARD_STYLE,
                html_escape(&sub.name),
                sub.score,
                html_escape(&sub.benchmark),
            );
        }
    }
    for item in items {
        let _ = writeln!(
            html,
            "<div style=\"{};border-left:6px solid {}\">{}</div>",
            CARD_STYLE,
            hex(priority_style(&item.priority).color),
            html_escape(&item.title),
        );
    }
    html.push_str("</section>\n");
}

fn progress_bar(score: u8, height: u32) -> String {
    format!(
        "<div style=\"background:#e5e7eb;height:{h}px;border-radius:{r}px;margin-top:8px\">\
<div style=\"width:{w}%;height:{h}px;border-radius:{r}px;background:{c}\"></div></div>",
        h = height,
        r = height / 2,
        w = score.min(100),
        c = hex(score_palette(score).accent()),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
