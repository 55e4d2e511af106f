//! Built-in sample report used when no analysis data is at hand.

use crate::model::{
    AnalysisReport, Category, Effort, EvaluationCriteria, Grade, Improvement, ItemStatus, Metrics,
    Priority, ReportBundle, Subcriterion,
};

/// Returns the sample report.  The content is fixed, so repeated calls
/// return equal bundles.
pub fn sample_bundle() -> ReportBundle {
    let report = AnalysisReport {
        url: "https://www.example-shop.co.kr".into(),
        analyzed_at: "2024-05-14".into(),
        analyst: "UXReport AI".into(),
        total_score: 72,
        grade: Grade::B,
        current_metrics: Metrics {
            bounce_rate: Some(58.4),
            avg_session_duration: Some(94.0),
            conversion_rate: Some(1.8),
            page_load_time: Some(3.9),
        },
        industry_benchmark: Metrics {
            bounce_rate: Some(47.0),
            avg_session_duration: Some(132.0),
            conversion_rate: Some(2.6),
            page_load_time: Some(2.5),
        },
        target_metrics: Metrics {
            bounce_rate: Some(40.0),
            avg_session_duration: Some(150.0),
            conversion_rate: Some(3.2),
            page_load_time: Some(2.0),
        },
    };

    let criteria = vec![
        criteria(
            Category::FirstImpression,
            78,
            20.0,
            &[("히어로 메시지 명확성", 82), ("시각적 신뢰도", 74)],
        ),
        criteria(
            Category::BounceProtection,
            64,
            20.0,
            &[("첫 화면 행동 유도", 60), ("로딩 중 피드백", 68)],
        ),
        criteria(
            Category::MobileExperience,
            70,
            20.0,
            &[("터치 영역 크기", 66), ("반응형 레이아웃", 75)],
        ),
        criteria(
            Category::Engagement,
            75,
            15.0,
            &[("콘텐츠 탐색 흐름", 77), ("상호작용 피드백", 72)],
        ),
        criteria(
            Category::Accessibility,
            62,
            15.0,
            &[("색 대비", 55), ("대체 텍스트", 70)],
        ),
        criteria(
            Category::Seo,
            81,
            10.0,
            &[("메타 설명", 88), ("구조화 데이터", 72), ("사이트맵", 84)],
        ),
    ];

    let improvements = vec![
        improvement(
            "1",
            Category::MobileExperience,
            "상품 이미지 지연 로딩 적용",
            Priority::High,
            ("첫 화면 로딩 3.9초", "2초 이내"),
            "이탈률 8% 감소 예상",
            Effort::Medium,
            ItemStatus::Fail,
        ),
        improvement(
            "2",
            Category::BounceProtection,
            "첫 화면 주요 행동 버튼 추가",
            Priority::Critical,
            ("스크롤 후에야 구매 버튼 노출", "첫 화면에 구매 버튼 노출"),
            "전환율 0.6%p 상승 예상",
            Effort::Easy,
            ItemStatus::Fail,
        ),
        improvement(
            "3",
            Category::Accessibility,
            "본문 텍스트 색 대비 개선",
            Priority::Medium,
            ("대비율 3.1:1", "대비율 4.5:1 이상"),
            "저시력 사용자 가독성 향상",
            Effort::Easy,
            ItemStatus::Warning,
        ),
        improvement(
            "4",
            Category::Seo,
            "상품 페이지 구조화 데이터 추가",
            Priority::Medium,
            ("Product 스키마 없음", "Product 및 Review 스키마 적용"),
            "검색 결과 리치 스니펫 노출",
            Effort::Medium,
            ItemStatus::Warning,
        ),
        improvement(
            "5",
            Category::Engagement,
            "최근 본 상품 위젯 추가",
            Priority::Low,
            ("재방문 유도 장치 없음", "최근 본 상품 목록 제공"),
            "평균 체류 시간 15초 증가 예상",
            Effort::Hard,
            ItemStatus::Pass,
        ),
        improvement(
            "6",
            Category::Seo,
            "메타 설명 길이 조정",
            Priority::Low,
            ("일부 페이지 메타 설명 누락", "모든 페이지 120자 내외 설명"),
            "검색 클릭률 개선",
            Effort::Easy,
            ItemStatus::Pass,
        ),
    ];

    ReportBundle::new(report, criteria, improvements)
}

fn criteria(
    category: Category,
    score: u8,
    weight: f64,
    subcriteria: &[(&str, u8)],
) -> EvaluationCriteria {
    EvaluationCriteria {
        category,
        score,
        weight,
        description: String::new(),
        methodology: "휴리스틱 평가와 자동 측정 결과 종합".into(),
        subcriteria: subcriteria
            .iter()
            .map(|(name, score)| Subcriterion {
                name: (*name).to_owned(),
                score: *score,
                description: String::new(),
                benchmark: "업계 상위 25%".into(),
            })
            .collect(),
    }
}

#[allow(clippy::too_many_arguments)]
fn improvement(
    id: &str,
    category: Category,
    title: &str,
    priority: Priority,
    (current_state, target_state): (&str, &str),
    impact: &str,
    effort: Effort,
    status: ItemStatus,
) -> Improvement {
    Improvement {
        id: id.to_owned(),
        category,
        title: title.to_owned(),
        priority,
        current_state: current_state.to_owned(),
        target_state: target_state.to_owned(),
        impact: impact.to_owned(),
        effort,
        status,
        impact_on_retention: String::new(),
        impact_on_bounce_rate: String::new(),
    }
}
