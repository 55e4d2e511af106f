//! Presentation values derived from the report model at render time.
//!
//! Nothing here is stored; the HTML view, the raster layout and the text
//! report all compute colours and labels through these helpers so the three
//! outputs agree.

use crate::model::{Category, Priority};

/// RGB colour triple.
pub type Rgb = [u8; 3];

/// Formats an RGB triple as a CSS hex colour.
pub fn hex(color: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

/// Colour scheme selected from a score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Palette {
    Good,
    Warning,
    Critical,
}

impl Palette {
    /// Foreground colour used for scores, bars and badges.
    pub fn accent(self) -> Rgb {
        match self {
            Self::Good => [22, 163, 74],
            Self::Warning => [217, 119, 6],
            Self::Critical => [220, 38, 38],
        }
    }

    /// Light background tint paired with [`Palette::accent`].
    pub fn tint(self) -> Rgb {
        match self {
            Self::Good => [220, 252, 231],
            Self::Warning => [254, 243, 199],
            Self::Critical => [254, 226, 226],
        }
    }
}

/// Picks the palette for a score.  Both `A` and `B` grades share the good palette.
pub fn score_palette(score: u8) -> Palette {
    if score >= 70 {
        Palette::Good
    } else if score >= 50 {
        Palette::Warning
    } else {
        Palette::Critical
    }
}

/// Colour and Korean label shown for a priority badge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriorityStyle {
    pub color: Rgb,
    pub label: &'static str,
    pub order: u8,
}

const GRAY: Rgb = [107, 114, 128];

pub fn priority_style(priority: &Priority) -> PriorityStyle {
    let (color, label) = match priority {
        Priority::Critical => ([220, 38, 38], "치명적"),
        Priority::High => ([234, 88, 12], "높음"),
        Priority::Medium => ([217, 119, 6], "중간"),
        Priority::Low => (GRAY, "낮음"),
        Priority::Unknown(_) => (GRAY, "미분류"),
    };
    PriorityStyle {
        color,
        label,
        order: priority.severity(),
    }
}

/// Static presentation metadata for an evaluation category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CategoryInfo {
    pub label: &'static str,
    pub description: &'static str,
    pub weight: &'static str,
}

/// Label used for categories outside the fixed set.
pub const FALLBACK_CATEGORY_LABEL: &str = "종합 평가";

/// Weight shown for categories outside the fixed set.
pub const FALLBACK_CATEGORY_WEIGHT: &str = "10%";

/// Looks up label, description and nominal weight for a category.
///
/// Category names are free text from the language model, so anything that did
/// not normalize into a known variant falls back to a generic entry.
pub fn category_info(category: &Category) -> CategoryInfo {
    match category {
        Category::FirstImpression => CategoryInfo {
            label: "첫인상",
            description: "방문 후 3초 안에 전달되는 신뢰감과 핵심 메시지",
            weight: "20%",
        },
        Category::BounceProtection => CategoryInfo {
            label: "이탈 방지",
            description: "첫 화면에서 다음 행동으로 이어지게 만드는 장치",
            weight: "20%",
        },
        Category::MobileExperience => CategoryInfo {
            label: "모바일 경험",
            description: "작은 화면에서의 가독성, 터치 영역, 로딩 속도",
            weight: "20%",
        },
        Category::Engagement => CategoryInfo {
            label: "참여도",
            description: "콘텐츠 탐색을 이어가게 하는 구조와 상호작용",
            weight: "15%",
        },
        Category::Accessibility => CategoryInfo {
            label: "접근성",
            description: "대비, 대체 텍스트, 키보드 탐색 등 누구나 쓸 수 있는 설계",
            weight: "15%",
        },
        Category::Seo => CategoryInfo {
            label: "검색 최적화",
            description: "메타 정보, 구조화 데이터, 검색 노출을 위한 기본기",
            weight: "10%",
        },
        Category::Other(_) => CategoryInfo {
            label: FALLBACK_CATEGORY_LABEL,
            description: "",
            weight: FALLBACK_CATEGORY_WEIGHT,
        },
    }
}

/// Formats an optional metric value with its unit, or a dash when missing.
pub fn format_metric(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(value) if value.fract().abs() < f64::EPSILON => format!("{}{}", value as i64, unit),
        Some(value) => format!("{:.1}{}", value, unit),
        None => "-".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_thresholds() {
        assert_eq!(score_palette(95), Palette::Good);
        assert_eq!(score_palette(70), Palette::Good);
        assert_eq!(score_palette(69), Palette::Warning);
        assert_eq!(score_palette(50), Palette::Warning);
        assert_eq!(score_palette(49), Palette::Critical);
    }

    #[test]
    fn unknown_priority_is_gray_and_last() {
        let style = priority_style(&Priority::parse("whenever"));
        assert_eq!(style.color, GRAY);
        assert_eq!(style.order, 99);
        assert_eq!(priority_style(&Priority::Critical).label, "치명적");
    }

    #[test]
    fn unknown_category_falls_back() {
        let info = category_info(&Category::parse("Brand Voice"));
        assert_eq!(info.label, "종합 평가");
        assert_eq!(info.weight, "10%");
    }

    #[test]
    fn metrics_format_with_units() {
        assert_eq!(format_metric(Some(42.0), "%"), "42%");
        assert_eq!(format_metric(Some(2.36), "초"), "2.4초");
        assert_eq!(format_metric(None, "%"), "-");
    }

    #[test]
    fn hex_formats_lowercase() {
        assert_eq!(hex([255, 0, 16]), "#ff0010");
    }
}
