//! Data structures describing an AI-generated website analysis report.
//!
//! The types in this module form a serialization-friendly model of what the
//! analysis provider returns.  Free-text fields coming from the language model
//! (category names, priorities, effort and status labels) are normalized into
//! tagged variants at deserialization time.  Every tagged variant carries an
//! explicit fallback holding the raw string so that unexpected producer output
//! degrades gracefully instead of failing the whole report.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Letter bucket derived from the total score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    #[default]
    D,
}

impl Grade {
    /// Maps a 0..=100 score onto its letter grade.
    ///
    /// Boundaries are inclusive lower bounds: 90 and up is `A`, 70 and up is
    /// `B`, 50 and up is `C`, everything below is `D`.
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => Self::A,
            70..=89 => Self::B,
            50..=69 => Self::C,
            _ => Self::D,
        }
    }

    /// Reads the leading letter of a free-text grade such as `"b"` or `"A+"`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().chars().next()?.to_ascii_uppercase() {
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            'C' => Some(Self::C),
            'D' => Some(Self::D),
            _ => None,
        }
    }

    /// Returns the letter as a static string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Site-level metrics reported for the current state, the industry benchmark
/// and the target after improvements.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metrics {
    /// Bounce rate as a percentage.
    pub bounce_rate: Option<f64>,
    /// Average session duration in seconds.
    pub avg_session_duration: Option<f64>,
    /// Conversion rate as a percentage.
    pub conversion_rate: Option<f64>,
    /// Page load time in seconds.
    pub page_load_time: Option<f64>,
}

impl Metrics {
    /// Returns the metrics as labelled rows in display order.
    pub fn rows(&self) -> [(&'static str, Option<f64>, &'static str); 4] {
        [
            ("이탈률", self.bounce_rate, "%"),
            ("평균 체류 시간", self.avg_session_duration, "초"),
            ("전환율", self.conversion_rate, "%"),
            ("페이지 로딩 시간", self.page_load_time, "초"),
        ]
    }
}

/// Top-level report header produced once per analysis run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub url: String,
    #[serde(default)]
    pub analyzed_at: String,
    #[serde(default)]
    pub analyst: String,
    #[serde(deserialize_with = "lenient_score")]
    pub total_score: u8,
    #[serde(default, deserialize_with = "lenient_grade")]
    pub grade: Grade,
    #[serde(default)]
    pub current_metrics: Metrics,
    #[serde(default)]
    pub industry_benchmark: Metrics,
    #[serde(default)]
    pub target_metrics: Metrics,
}

/// Evaluation category as normalized from the provider's free-text label.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    FirstImpression,
    BounceProtection,
    MobileExperience,
    Engagement,
    Accessibility,
    Seo,
    /// Any label outside the fixed set, kept verbatim.
    Other(String),
}

impl Category {
    /// Parses a label, accepting English identifiers and the Korean names the
    /// provider uses.  Unknown labels become [`Category::Other`].
    pub fn parse(label: &str) -> Self {
        match normalize_key(label).as_str() {
            "firstimpression" | "첫인상" => Self::FirstImpression,
            "bounceprotection" | "bounce" | "이탈방지" => Self::BounceProtection,
            "mobileexperience" | "mobile" | "모바일경험" | "모바일" => Self::MobileExperience,
            "engagement" | "참여도" | "사용자참여" => Self::Engagement,
            "accessibility" | "접근성" => Self::Accessibility,
            "seo" | "검색최적화" | "검색엔진최적화" => Self::Seo,
            _ => Self::Other(label.trim().to_owned()),
        }
    }

    /// Returns the canonical identifier, or the raw label for unknown categories.
    pub fn as_str(&self) -> &str {
        match self {
            Self::FirstImpression => "FirstImpression",
            Self::BounceProtection => "BounceProtection",
            Self::MobileExperience => "MobileExperience",
            Self::Engagement => "Engagement",
            Self::Accessibility => "Accessibility",
            Self::Seo => "SEO",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_owned()
    }
}

/// A single scored line inside an evaluation category.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subcriterion {
    pub name: String,
    #[serde(deserialize_with = "lenient_score")]
    pub score: u8,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub benchmark: String,
}

/// Scored evaluation category with its share of the total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationCriteria {
    pub category: Category,
    #[serde(deserialize_with = "lenient_score")]
    pub score: u8,
    /// Percentage share of the total score.
    #[serde(default, deserialize_with = "lenient_weight")]
    pub weight: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub methodology: String,
    #[serde(default)]
    pub subcriteria: Vec<Subcriterion>,
}

/// Improvement priority.  Unknown labels sort after every known priority.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
    Unknown(String),
}

/// Sort key assigned to unrecognized priorities.
pub const UNKNOWN_PRIORITY_ORDER: u8 = 99;

impl Priority {
    pub fn parse(label: &str) -> Self {
        match normalize_key(label).as_str() {
            "critical" | "치명적" | "긴급" => Self::Critical,
            "high" | "높음" => Self::High,
            "medium" | "중간" | "보통" => Self::Medium,
            "low" | "낮음" => Self::Low,
            _ => Self::Unknown(label.trim().to_owned()),
        }
    }

    /// Severity rank used for ordering; lower is more urgent.
    pub fn severity(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
            Self::Unknown(_) => UNKNOWN_PRIORITY_ORDER,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for Priority {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Priority> for String {
    fn from(value: Priority) -> Self {
        value.as_str().to_owned()
    }
}

/// Estimated implementation effort.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Effort {
    Easy,
    Medium,
    Hard,
    Unknown(String),
}

impl Effort {
    pub fn parse(label: &str) -> Self {
        match normalize_key(label).as_str() {
            "easy" | "쉬움" => Self::Easy,
            "medium" | "보통" | "중간" => Self::Medium,
            "hard" | "어려움" => Self::Hard,
            _ => Self::Unknown(label.trim().to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for Effort {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Effort> for String {
    fn from(value: Effort) -> Self {
        value.as_str().to_owned()
    }
}

/// Check outcome of an improvement item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemStatus {
    Pass,
    Fail,
    Warning,
    Unknown(String),
}

impl ItemStatus {
    pub fn parse(label: &str) -> Self {
        match normalize_key(label).as_str() {
            "pass" | "passed" | "통과" => Self::Pass,
            "fail" | "failed" | "실패" => Self::Fail,
            "warning" | "warn" | "경고" => Self::Warning,
            _ => Self::Unknown(label.trim().to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Warning => "warning",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for ItemStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ItemStatus> for String {
    fn from(value: ItemStatus) -> Self {
        value.as_str().to_owned()
    }
}

/// A recommended change, unique by `id` within one report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Improvement {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    pub category: Category,
    pub title: String,
    pub priority: Priority,
    #[serde(default)]
    pub current_state: String,
    #[serde(default)]
    pub target_state: String,
    #[serde(default)]
    pub impact: String,
    pub effort: Effort,
    pub status: ItemStatus,
    #[serde(default)]
    pub impact_on_retention: String,
    #[serde(default)]
    pub impact_on_bounce_rate: String,
}

/// Returns the improvements ordered by priority severity.
///
/// The sort is stable, so items sharing a priority keep their original order.
pub fn sort_by_priority(improvements: &[Improvement]) -> Vec<&Improvement> {
    let mut sorted: Vec<&Improvement> = improvements.iter().collect();
    sorted.sort_by_key(|item| item.priority.severity());
    sorted
}

/// Returns the `count` most urgent improvements.
pub fn top_urgent(improvements: &[Improvement], count: usize) -> Vec<&Improvement> {
    let mut sorted = sort_by_priority(improvements);
    sorted.truncate(count);
    sorted
}

/// Everything the export pipeline needs to render one report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBundle {
    pub report: AnalysisReport,
    #[serde(default)]
    pub criteria: Vec<EvaluationCriteria>,
    #[serde(default)]
    pub improvements: Vec<Improvement>,
    /// Overrides the report's own total when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_score: Option<u8>,
}

impl ReportBundle {
    /// Creates a bundle and derives the grade from the report total.
    pub fn new(
        report: AnalysisReport,
        criteria: Vec<EvaluationCriteria>,
        improvements: Vec<Improvement>,
    ) -> Self {
        let mut bundle = Self {
            report,
            criteria,
            improvements,
            total_score: None,
        };
        bundle.normalize();
        bundle
    }

    /// Sets an explicit total score and returns the updated bundle.
    pub fn with_total_score(mut self, total_score: u8) -> Self {
        self.total_score = Some(total_score.min(100));
        self.normalize();
        self
    }

    /// Total score used for rendering.
    pub fn total_score(&self) -> u8 {
        self.total_score.unwrap_or(self.report.total_score)
    }

    /// Grade derived from [`ReportBundle::total_score`].
    pub fn grade(&self) -> Grade {
        Grade::from_score(self.total_score())
    }

    /// Re-derives fields that must stay consistent with the total score.
    pub fn normalize(&mut self) {
        self.report.grade = self.grade();
    }

    /// Sums the criteria weights for validation.
    pub fn weight_check(&self) -> WeightCheck {
        WeightCheck {
            sum: self.criteria.iter().map(|criteria| criteria.weight).sum(),
            count: self.criteria.len(),
        }
    }
}

/// How a report whose criteria weights do not add up to 100 is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightPolicy {
    /// Render as-is without comment.
    Accept,
    /// Render as-is and log a warning.
    #[default]
    Warn,
    /// Rescale the weights proportionally so they sum to 100.
    Normalize,
    /// Refuse to render the report.
    Reject,
}

/// Tolerance applied when comparing the weight sum to 100.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.5;

/// Result of summing criteria weights.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightCheck {
    pub sum: f64,
    pub count: usize,
}

impl WeightCheck {
    /// An empty criteria list is considered balanced.
    pub fn is_balanced(&self) -> bool {
        self.count == 0 || (self.sum - 100.0).abs() <= WEIGHT_SUM_TOLERANCE
    }
}

/// Rescales every weight so the sum becomes exactly 100.
///
/// Leaves the weights untouched when they sum to zero.
pub fn normalize_weights(criteria: &mut [EvaluationCriteria]) {
    let sum: f64 = criteria.iter().map(|criteria| criteria.weight).sum();
    if sum <= f64::EPSILON {
        return;
    }
    for item in criteria.iter_mut() {
        item.weight = item.weight * 100.0 / sum;
    }
}

/// Provider grades are advisory; [`ReportBundle::normalize`] re-derives the
/// grade from the score, so anything unreadable falls back to the default.
fn lenient_grade<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Grade, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(Grade::parse)
        .unwrap_or_default())
}

fn normalize_key(label: &str) -> String {
    label
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '_' && *ch != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawNumber {
    fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Text(text) => text.trim().trim_end_matches('%').trim().parse().ok(),
        }
    }
}

fn clamp_score(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

fn lenient_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = RawNumber::deserialize(deserializer)?;
    raw.to_f64()
        .map(clamp_score)
        .ok_or_else(|| serde::de::Error::custom("score is not a number"))
}

fn lenient_weight<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = RawNumber::deserialize(deserializer)?;
    raw.to_f64()
        .filter(|value| value.is_finite() && *value >= 0.0)
        .ok_or_else(|| serde::de::Error::custom("weight is not a non-negative number"))
}

fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawNumber::deserialize(deserializer)? {
        RawNumber::Int(value) => value.to_string(),
        RawNumber::Float(value) => value.to_string(),
        RawNumber::Text(text) => text,
    })
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    /// Orders by severity, with unknown labels compared by their raw text.
    fn cmp(&self, other: &Self) -> Ordering {
        self.severity()
            .cmp(&other.severity())
            .then_with(|| match (self, other) {
                (Self::Unknown(a), Self::Unknown(b)) => a.cmp(b),
                _ => Ordering::Equal,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn improvement(id: &str, priority: &str) -> Improvement {
        Improvement {
            id: id.to_owned(),
            category: Category::Engagement,
            title: format!("item {id}"),
            priority: Priority::parse(priority),
            current_state: String::new(),
            target_state: String::new(),
            impact: String::new(),
            effort: Effort::Easy,
            status: ItemStatus::Fail,
            impact_on_retention: String::new(),
            impact_on_bounce_rate: String::new(),
        }
    }

    #[test]
    fn grade_boundaries() {
        assert_eq!(Grade::from_score(95), Grade::A);
        assert_eq!(Grade::from_score(90), Grade::A);
        assert_eq!(Grade::from_score(89), Grade::B);
        assert_eq!(Grade::from_score(70), Grade::B);
        assert_eq!(Grade::from_score(69), Grade::C);
        assert_eq!(Grade::from_score(50), Grade::C);
        assert_eq!(Grade::from_score(49), Grade::D);
        assert_eq!(Grade::from_score(0), Grade::D);
    }

    #[test]
    fn priority_sort_is_stable_and_puts_unknown_last() {
        let items = vec![
            improvement("1", "low"),
            improvement("2", "someday"),
            improvement("3", "high"),
            improvement("4", "critical"),
            improvement("5", "high"),
            improvement("6", "medium"),
        ];

        let order: Vec<&str> = sort_by_priority(&items)
            .into_iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(order, ["4", "3", "5", "6", "1", "2"]);
    }

    #[test]
    fn top_urgent_takes_three_most_severe() {
        let items = vec![
            improvement("a", "low"),
            improvement("b", "critical"),
            improvement("c", "medium"),
            improvement("d", "high"),
        ];
        let ids: Vec<&str> = top_urgent(&items, 3)
            .into_iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(ids, ["b", "d", "c"]);
    }

    #[test]
    fn categories_accept_aliases_and_keep_unknown_labels() {
        assert_eq!(Category::parse("First Impression"), Category::FirstImpression);
        assert_eq!(Category::parse("mobile_experience"), Category::MobileExperience);
        assert_eq!(Category::parse("접근성"), Category::Accessibility);
        assert_eq!(Category::parse("seo"), Category::Seo);
        assert_eq!(
            Category::parse(" Visual Hierarchy "),
            Category::Other("Visual Hierarchy".to_owned())
        );
    }

    #[test]
    fn priority_ordering_is_total() {
        let mut priorities = vec![
            Priority::parse("zzz"),
            Priority::Low,
            Priority::parse("aaa"),
            Priority::Critical,
            Priority::Medium,
            Priority::High,
        ];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![
                Priority::Critical,
                Priority::High,
                Priority::Medium,
                Priority::Low,
                Priority::Unknown("aaa".to_owned()),
                Priority::Unknown("zzz".to_owned()),
            ]
        );
    }

    #[test]
    fn weights_normalize_to_hundred() {
        let mut criteria = vec![
            EvaluationCriteria {
                category: Category::Seo,
                score: 50,
                weight: 30.0,
                description: String::new(),
                methodology: String::new(),
                subcriteria: Vec::new(),
            },
            EvaluationCriteria {
                category: Category::Engagement,
                score: 70,
                weight: 30.0,
                description: String::new(),
                methodology: String::new(),
                subcriteria: Vec::new(),
            },
        ];
        normalize_weights(&mut criteria);
        assert!((criteria[0].weight - 50.0).abs() < 1e-9);
        assert!((criteria[1].weight - 50.0).abs() < 1e-9);
    }

    #[test]
    fn bundle_derives_grade_from_total() {
        let report = AnalysisReport {
            url: "https://example.com".to_owned(),
            total_score: 72,
            grade: Grade::A,
            ..AnalysisReport::default()
        };
        let bundle = ReportBundle::new(report, Vec::new(), Vec::new());
        assert_eq!(bundle.report.grade, Grade::B);
        assert_eq!(bundle.with_total_score(91).grade(), Grade::A);
    }
}
