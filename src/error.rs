//! Error types shared across the export pipeline.
//!
//! Pipeline-internal failures propagate as [`ExportError`] up to the export
//! entry point.  Chart capture failures are the only non-fatal class and use
//! [`ChartCaptureError`], which callers log and replace with a placeholder.

use std::error::Error as StdError;

use thiserror::Error;

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// Failure reported by a [`crate::raster::Rasterizer`].
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RasterError {
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl RasterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxedSource>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Failure to cut one page band out of a rasterized surface.
#[derive(Debug, Error)]
pub enum SliceError {
    #[error("rows {start}..{end} fall outside the surface height {surface_height}")]
    OutOfBounds {
        start: u32,
        end: u32,
        surface_height: u32,
    },
    #[error("drawing surface unavailable: {0}")]
    Unavailable(String),
}

/// Non-fatal failure while acquiring the score chart bitmap.
#[derive(Debug, Error)]
pub enum ChartCaptureError {
    #[error("chart image is not a base64 data URI")]
    InvalidDataUri,
    #[error("chart data URI is not valid base64")]
    Base64(#[from] base64::DecodeError),
    #[error("chart bitmap could not be decoded")]
    Decode(#[source] image::ImageError),
    #[error("chart bitmap could not be encoded")]
    Encode(#[source] image::ImageError),
    #[error("chart has no data points")]
    EmptySeries,
    #[error("chart rasterization failed")]
    Raster(#[from] RasterError),
}

/// Fatal failure of an export call.  No artifact is produced when one is returned.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to rasterize staged surface {staging_id}")]
    Raster {
        staging_id: String,
        #[source]
        source: RasterError,
    },
    #[error("failed to extract page {page} from the rasterized surface")]
    SliceExtraction {
        page: usize,
        #[source]
        source: SliceError,
    },
    #[error("document writer failed: {0}")]
    Writer(String),
    #[error("report would produce {pages} pages, more than the limit of {limit}")]
    PageLimit { pages: usize, limit: usize },
    #[error("invalid page geometry: {0}")]
    InvalidGeometry(String),
    #[error("rasterized surface is empty ({width}x{height})")]
    EmptySurface { width: u32, height: u32 },
    #[error("criteria weights sum to {sum:.1} instead of 100")]
    WeightSum { sum: f64 },
    #[error("failed to render the text report")]
    TextReport(#[source] genpdf::error::Error),
    #[error("invalid export configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "bookmarks")]
    #[error("failed to embed section bookmarks")]
    Bookmarks(#[from] crate::bookmarks::BookmarkError),
}

impl ExportError {
    /// Whether retrying the same export may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Raster { .. } | Self::Writer(_) | Self::Io(_))
    }

    /// Message suitable for an end-user notification.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Raster { .. } | Self::SliceExtraction { .. } | Self::EmptySurface { .. } => {
                "보고서 이미지를 만드는 중 문제가 발생했습니다. 잠시 후 다시 시도해 주세요."
            }
            Self::Writer(_) | Self::Io(_) => {
                "PDF 파일을 저장하지 못했습니다. 잠시 후 다시 시도해 주세요."
            }
            Self::PageLimit { .. } => "보고서가 너무 길어 PDF로 내보낼 수 없습니다.",
            Self::WeightSum { .. } => "분석 결과의 평가 가중치가 올바르지 않습니다.",
            Self::TextReport(_) => "텍스트 보고서를 만들지 못했습니다. 글꼴 설정을 확인해 주세요.",
            Self::InvalidGeometry(_) | Self::Config(_) => {
                "내보내기 설정이 올바르지 않습니다. 관리자에게 문의해 주세요."
            }
            #[cfg(feature = "bookmarks")]
            Self::Bookmarks(_) => "PDF 목차를 만드는 중 문제가 발생했습니다.",
        }
    }
}

/// Failure reported by the third-party analysis provider.
///
/// Every variant maps to its own user-facing message; none of them collapse
/// into a generic failure string.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis provider rate limit exceeded")]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("analysis provider rejected the API key")]
    InvalidApiKey,
    #[error("analysis payload is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("analysis provider unreachable: {0}")]
    Network(String),
    #[error("analysis provider returned status {status}: {message}")]
    Provider { status: u16, message: String },
}

impl AnalysisError {
    /// Transient failures are worth retrying; the rest need a configuration fix.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network(_) | Self::MalformedJson(_) => true,
            Self::Provider { status, .. } => *status >= 500,
            Self::InvalidApiKey => false,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => {
                "요청이 너무 많습니다. 잠시 후 다시 시도해 주세요."
            }
            Self::InvalidApiKey => "AI 분석 API 키가 올바르지 않습니다. 설정을 확인해 주세요.",
            Self::MalformedJson(_) => {
                "AI 분석 결과를 해석하지 못했습니다. 다시 분석을 요청해 주세요."
            }
            Self::Network(_) => "AI 분석 서버에 연결하지 못했습니다. 네트워크를 확인해 주세요.",
            Self::Provider { .. } => "AI 분석 서버에서 오류가 발생했습니다.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_messages_are_distinct() {
        let malformed = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let errors = [
            AnalysisError::RateLimited {
                retry_after_secs: None,
            },
            AnalysisError::InvalidApiKey,
            AnalysisError::MalformedJson(malformed),
            AnalysisError::Network("timeout".into()),
            AnalysisError::Provider {
                status: 500,
                message: "boom".into(),
            },
        ];

        let mut messages: Vec<&str> = errors.iter().map(AnalysisError::user_message).collect();
        messages.sort_unstable();
        messages.dedup();
        assert_eq!(messages.len(), errors.len());
        assert!(!AnalysisError::InvalidApiKey.is_transient());
    }

    #[test]
    fn raster_failures_are_transient() {
        let err = ExportError::Raster {
            staging_id: "uxreport-staging-1".into(),
            source: RasterError::new("canvas lost"),
        };
        assert!(err.is_transient());
        assert!(!ExportError::PageLimit {
            pages: 80,
            limit: 50
        }
        .is_transient());
        assert_eq!(
            StdError::source(&err).map(ToString::to_string),
            Some("canvas lost".to_owned())
        );
    }
}
