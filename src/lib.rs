//! Paginated PDF export for AI-generated UI/UX analysis reports.
//!
//! A report is rendered into a static surface at print width, staged
//! off-screen, rasterized into one tall bitmap and sliced into fixed-size
//! pages.  [`export::ReportExporter`] drives the whole pipeline;
//! [`text_report`] offers a typeset fallback.

pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod ingest;
pub mod model;
pub mod paginate;
pub mod raster;
pub mod readiness;
pub mod sample;
pub mod staging;
pub mod template;
pub mod text_report;
pub mod writer;

#[cfg(feature = "bookmarks")]
pub mod bookmarks;

pub use config::{ExportOptions, PageSize};
pub use error::{AnalysisError, ExportError};
pub use export::{ExportArtifact, ExportSource, ReportExporter};
pub use model::ReportBundle;
pub use template::chart::{ChartImage, ChartInput, ChartPoint};
