//! Loading analysis results from the provider and from storage.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use crate::error::AnalysisError;
use crate::model::ReportBundle;

/// Parses the provider's JSON payload into a report bundle.
///
/// Language model output is often wrapped in a fenced code block; the fence
/// is stripped before parsing.
pub fn parse_analysis_payload(payload: &str) -> Result<ReportBundle, AnalysisError> {
    let json = strip_code_fence(payload);
    let mut bundle: ReportBundle = serde_json::from_str(json)?;
    bundle.normalize();
    debug!(
        "Parsed analysis for {} with {} criteria and {} improvements",
        bundle.report.url,
        bundle.criteria.len(),
        bundle.improvements.len()
    );
    Ok(bundle)
}

fn strip_code_fence(payload: &str) -> &str {
    let trimmed = payload.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`, `JSON`, ...) on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Deserialize)]
struct ProviderErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Maps a failed provider response onto an [`AnalysisError`].
///
/// The status code decides first; providers that report quota and key
/// problems with a generic status are recognized by their error body.
pub fn classify_provider_failure(status: u16, body: &str) -> AnalysisError {
    let detail = serde_json::from_str::<ProviderErrorBody>(body)
        .map(|parsed| parsed.error)
        .ok();
    let message = detail
        .as_ref()
        .map(|detail| detail.message.clone())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| body.trim().chars().take(200).collect());
    let markers = detail
        .as_ref()
        .map(|detail| {
            let code = detail
                .code
                .as_ref()
                .map(|code| code.to_string())
                .unwrap_or_default();
            format!("{} {} {}", detail.kind, code, detail.message)
        })
        .unwrap_or_else(|| body.to_owned())
        .to_lowercase();

    match status {
        429 => AnalysisError::RateLimited {
            retry_after_secs: None,
        },
        401 | 403 => AnalysisError::InvalidApiKey,
        _ if markers.contains("rate_limit") || markers.contains("quota") => {
            AnalysisError::RateLimited {
                retry_after_secs: None,
            }
        }
        _ if markers.contains("invalid_api_key") || markers.contains("authentication") => {
            AnalysisError::InvalidApiKey
        }
        _ => AnalysisError::Provider { status, message },
    }
}

/// Failure reading stored reports.  A missing report is not an error, see
/// [`ReportLookup::NotFound`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid project id {0:?}")]
    InvalidProjectId(String),
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("stored report {path} is not valid")]
    Parse {
        path: PathBuf,
        #[source]
        source: AnalysisError,
    },
}

/// Result of looking up a stored report.
#[derive(Clone, Debug, PartialEq)]
pub enum ReportLookup {
    Found(ReportBundle),
    NotFound,
}

/// Read access to previously stored analysis results.
pub trait ReportStore {
    fn fetch(&self, project_id: &str) -> Result<ReportLookup, StoreError>;
}

/// Stores reports as `<dir>/<project_id>.json`.
#[derive(Clone, Debug)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, project_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !project_id.is_empty()
            && project_id
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if !valid {
            return Err(StoreError::InvalidProjectId(project_id.to_owned()));
        }
        Ok(self.root.join(format!("{}.json", project_id)))
    }
}

impl ReportStore for JsonDirStore {
    fn fetch(&self, project_id: &str) -> Result<ReportLookup, StoreError> {
        let path = self.path_for(project_id)?;
        let payload = match fs::read_to_string(&path) {
            Ok(payload) => payload,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("No stored report for project {}", project_id);
                return Ok(ReportLookup::NotFound);
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let bundle = parse_analysis_payload(&payload)
            .map_err(|source| StoreError::Parse { path: path.clone(), source })?;
        Ok(ReportLookup::Found(bundle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Grade, Priority};

    const PAYLOAD: &str = r#"{
        "report": {
            "url": "https://example.com",
            "analyzedAt": "2024-05-14",
            "analyst": "AI",
            "totalScore": "91",
            "grade": "C",
            "currentMetrics": { "bounceRate": 41.5 }
        },
        "criteria": [
            { "category": "접근성", "score": 130, "weight": "15%" },
            { "category": "Delight", "score": 50, "weight": 85 }
        ],
        "improvements": [
            {
                "id": 7,
                "category": "seo",
                "title": "Add meta description",
                "priority": "urgent-ish",
                "effort": "easy",
                "status": "fail"
            }
        ]
    }"#;

    #[test]
    fn parses_lenient_payload() {
        let bundle = parse_analysis_payload(PAYLOAD).expect("parse");

        assert_eq!(bundle.total_score(), 91);
        assert_eq!(bundle.report.grade, Grade::A);
        assert_eq!(bundle.criteria[0].category, Category::Accessibility);
        assert_eq!(bundle.criteria[0].score, 100);
        assert_eq!(bundle.criteria[0].weight, 15.0);
        assert_eq!(bundle.criteria[1].category, Category::Other("Delight".into()));
        assert_eq!(bundle.improvements[0].id, "7");
        assert_eq!(
            bundle.improvements[0].priority,
            Priority::Unknown("urgent-ish".into())
        );
    }

    #[test]
    fn free_text_grade_does_not_reject_payload() {
        for grade in ["\"A+\"", "\"b\"", "\"우수\"", "null", "3"] {
            let payload = PAYLOAD.replace("\"grade\": \"C\"", &format!("\"grade\": {}", grade));
            let bundle = parse_analysis_payload(&payload).expect("lenient grade");
            assert_eq!(bundle.report.grade, Grade::A, "grade {grade}");
        }
        assert_eq!(Grade::parse(" b-"), Some(Grade::B));
        assert_eq!(Grade::parse("F"), None);
    }

    #[test]
    fn strips_markdown_fence() {
        let fenced = format!("```json\n{}\n```\n", PAYLOAD);
        assert!(parse_analysis_payload(&fenced).is_ok());
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {} "), "{}");
    }

    #[test]
    fn malformed_payload_is_reported() {
        assert!(matches!(
            parse_analysis_payload("{\"report\": "),
            Err(AnalysisError::MalformedJson(_))
        ));
    }

    #[test]
    fn classifies_provider_failures() {
        assert!(matches!(
            classify_provider_failure(429, ""),
            AnalysisError::RateLimited { .. }
        ));
        assert!(matches!(
            classify_provider_failure(401, "unauthorized"),
            AnalysisError::InvalidApiKey
        ));
        assert!(matches!(
            classify_provider_failure(
                400,
                r#"{"error":{"message":"Incorrect API key","type":"invalid_request_error","code":"invalid_api_key"}}"#
            ),
            AnalysisError::InvalidApiKey
        ));
        assert!(matches!(
            classify_provider_failure(400, r#"{"error":{"message":"quota exceeded","type":"insufficient_quota"}}"#),
            AnalysisError::RateLimited { .. }
        ));
        match classify_provider_failure(502, "bad gateway") {
            AnalysisError::Provider { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "bad gateway");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_report_is_not_an_error() {
        let store = JsonDirStore::new(std::env::temp_dir().join("uxreport-store-missing"));
        assert_eq!(store.fetch("nope").expect("lookup"), ReportLookup::NotFound);
        assert!(matches!(
            store.fetch("../etc/passwd"),
            Err(StoreError::InvalidProjectId(_))
        ));
    }

    #[test]
    fn stored_report_is_found() {
        let dir = std::env::temp_dir().join(format!("uxreport-store-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create dir");
        fs::write(dir.join("project-1.json"), PAYLOAD).expect("write payload");

        let lookup = JsonDirStore::new(&dir).fetch("project-1").expect("lookup");
        fs::remove_dir_all(&dir).expect("cleanup");

        match lookup {
            ReportLookup::Found(bundle) => assert_eq!(bundle.report.url, "https://example.com"),
            ReportLookup::NotFound => panic!("report should exist"),
        }
    }
}
