//! Export orchestration: template, staging, rasterization, pagination and
//! document assembly in one call.
//!
//! Each call owns its staged nodes and its writer.  Nothing is written to disk
//! here; callers persist a successful [`ExportArtifact`] themselves, so a
//! failed export never leaves a partial file behind.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use log::{debug, info, warn};

use crate::config::ExportOptions;
use crate::error::{ChartCaptureError, ExportError};
use crate::model::{normalize_weights, ReportBundle, WeightPolicy};
use crate::paginate::{paginate, plan_pages, PageGeometry};
use crate::raster::{BoxRasterizer, RasterOptions, Rasterizer};
use crate::readiness::{ImmediateReadiness, ReadyState, Readiness};
use crate::staging::{StagingArea, StagingGuard};
use crate::template::chart::{chart_layout, ChartImage, ChartInput, ChartPoint};
use crate::template::layout::SectionMark;
use crate::template::{render_report, RenderedDocument, REPORT_TITLE};
use crate::writer::{pdf_writer_factory, WriterFactory};

/// What the exporter rasterizes.
#[derive(Clone, Debug)]
pub enum ExportSource {
    /// Render the report template with the given chart input.
    Template(ChartInput),
    /// Rasterize a document that was already rendered by the caller.
    Rendered(RenderedDocument),
}

impl Default for ExportSource {
    fn default() -> Self {
        Self::Template(ChartInput::None)
    }
}

/// A finished export held in memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub pages: usize,
}

impl ExportArtifact {
    pub fn page_count(&self) -> usize {
        self.pages
    }

    /// Writes the document into `dir`, creating the directory if needed, and
    /// returns the full path.
    pub fn save_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ExportError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.bytes)?;
        info!(
            "Saved {} ({} pages, {} bytes)",
            path.display(),
            self.pages,
            self.bytes.len()
        );
        Ok(path)
    }
}

/// Builds the download name `<product>_Analysis_Report_<YYYYMMDD>.pdf`.
pub fn export_file_name(product_name: &str, date: NaiveDate) -> String {
    format!(
        "{}_Analysis_Report_{}.pdf",
        file_name_component(product_name),
        date.format("%Y%m%d")
    )
}

/// Replaces characters that are unsafe in file names with `_`.
pub fn file_name_component(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "report".to_owned()
    } else {
        cleaned
    }
}

/// Applies `policy` when the criteria weights do not sum to 100.
pub fn apply_weight_policy(
    bundle: &ReportBundle,
    policy: WeightPolicy,
) -> Result<Cow<'_, ReportBundle>, ExportError> {
    let check = bundle.weight_check();
    if check.is_balanced() {
        return Ok(Cow::Borrowed(bundle));
    }

    match policy {
        WeightPolicy::Accept => Ok(Cow::Borrowed(bundle)),
        WeightPolicy::Warn => {
            warn!(
                "Criteria weights for {} sum to {:.1} instead of 100; rendering as-is",
                bundle.report.url, check.sum
            );
            Ok(Cow::Borrowed(bundle))
        }
        WeightPolicy::Normalize => {
            let mut normalized = bundle.clone();
            normalize_weights(&mut normalized.criteria);
            info!(
                "Rescaled criteria weights for {} from {:.1} to 100",
                bundle.report.url, check.sum
            );
            Ok(Cow::Owned(normalized))
        }
        WeightPolicy::Reject => Err(ExportError::WeightSum { sum: check.sum }),
    }
}

/// Maps each section to the 1-based page its first row lands on.
///
/// Pages are clamped to `page_count`: a rasterizer may return a bitmap shorter
/// than the layout, in which case trailing sections point at the last page.
pub fn section_pages(
    sections: &[SectionMark],
    scale: f64,
    slice_height: u32,
    page_count: usize,
) -> Vec<(String, usize)> {
    let slice_height = slice_height.max(1) as f64;
    let last_page = page_count.max(1);
    sections
        .iter()
        .map(|mark| {
            let row = (mark.y as f64 * scale).floor();
            let page = (row / slice_height).floor() as usize + 1;
            (mark.title.clone(), page.min(last_page))
        })
        .collect()
}

/// Runs exports against one staging tree.
///
/// The exporter is `Send + Sync`; concurrent calls share the staging tree but
/// never a staged node or a writer.
pub struct ReportExporter {
    options: ExportOptions,
    rasterizer: Arc<dyn Rasterizer>,
    readiness: Arc<dyn Readiness>,
    staging: StagingArea,
    writer_factory: Box<WriterFactory>,
}

impl ReportExporter {
    /// Creates an exporter using the built-in rasterizer and PDF writer.
    pub fn new(options: ExportOptions) -> Self {
        Self {
            options,
            rasterizer: Arc::new(BoxRasterizer::new()),
            readiness: Arc::new(ImmediateReadiness),
            staging: StagingArea::new(),
            writer_factory: pdf_writer_factory(),
        }
    }

    /// Replaces the rasterizer and returns the updated exporter.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Replaces the readiness source and returns the updated exporter.
    pub fn with_readiness(mut self, readiness: Arc<dyn Readiness>) -> Self {
        self.readiness = readiness;
        self
    }

    /// Uses an existing staging tree and returns the updated exporter.
    pub fn with_staging_area(mut self, staging: StagingArea) -> Self {
        self.staging = staging;
        self
    }

    /// Replaces the document writer factory and returns the updated exporter.
    pub fn with_writer_factory(mut self, factory: Box<WriterFactory>) -> Self {
        self.writer_factory = factory;
        self
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Exports `bundle` dated today.
    pub fn export(
        &self,
        bundle: &ReportBundle,
        source: ExportSource,
    ) -> Result<ExportArtifact, ExportError> {
        self.export_on(bundle, source, Local::now().date_naive())
    }

    /// Exports `bundle` with the file name dated `date`.
    pub fn export_on(
        &self,
        bundle: &ReportBundle,
        source: ExportSource,
        date: NaiveDate,
    ) -> Result<ExportArtifact, ExportError> {
        self.options.validate()?;
        let geometry = PageGeometry::from_page_size(self.options.page_size)?;
        let bundle = apply_weight_policy(bundle, self.options.weight_policy)?;

        info!("Exporting report for {}", bundle.report.url);
        let document = match source {
            ExportSource::Template(chart) => self.render(&bundle, &chart)?,
            ExportSource::Rendered(document) => document,
        };
        let sections = document.layout.sections.clone();

        let guard = self.staging.stage(document.layout);
        let result = self.write_pages(&guard, &bundle, &geometry);
        drop(guard);
        let (bytes, pages, slice_height) = result?;

        let entries = section_pages(&sections, self.options.raster_scale, slice_height, pages);
        #[cfg(feature = "bookmarks")]
        let bytes = crate::bookmarks::apply_section_bookmarks(&bytes, &entries)?;
        #[cfg(not(feature = "bookmarks"))]
        debug!("Section pages: {:?}", entries);

        let artifact = ExportArtifact {
            file_name: export_file_name(&self.options.product_name, date),
            bytes,
            pages,
        };
        info!(
            "Exported {} with {} pages",
            artifact.file_name, artifact.pages
        );
        Ok(artifact)
    }

    /// Renders the template after acquiring the chart.
    pub fn render(
        &self,
        bundle: &ReportBundle,
        chart: &ChartInput,
    ) -> Result<RenderedDocument, ExportError> {
        let chart = self.acquire_chart(bundle, chart);
        render_report(bundle, chart.as_ref(), &self.options)
    }

    /// Resolves the chart bitmap.  Failures are logged and yield `None`, which
    /// renders the placeholder.
    pub fn acquire_chart(&self, bundle: &ReportBundle, input: &ChartInput) -> Option<ChartImage> {
        let result = match input {
            ChartInput::Rendered(image) => return Some(image.clone()),
            ChartInput::None => return None,
            ChartInput::Series(points) if points.is_empty() => {
                self.capture_chart(&ChartPoint::from_criteria(&bundle.criteria))
            }
            ChartInput::Series(points) => self.capture_chart(points),
        };
        match result {
            Ok(image) => Some(image),
            Err(err) => {
                warn!("Chart capture failed, using placeholder: {}", err);
                None
            }
        }
    }

    fn capture_chart(&self, points: &[ChartPoint]) -> Result<ChartImage, ChartCaptureError> {
        let guard = self.staging.stage(chart_layout(points)?);
        self.wait_for_layout(&guard, self.options.chart_settle());
        let options = RasterOptions::for_surface(guard.surface(), self.options.raster_scale);
        let surface = self.rasterizer.rasterize(guard.surface(), &options);
        drop(guard);
        ChartImage::from_rgb(surface?.into_image())
    }

    fn wait_for_layout(&self, guard: &StagingGuard, cap: std::time::Duration) {
        if self.readiness.wait_ready(cap) == ReadyState::TimedOut {
            warn!(
                "{} not ready after {} ms; rasterizing anyway",
                guard.id(),
                cap.as_millis()
            );
        }
    }

    fn write_pages(
        &self,
        guard: &StagingGuard,
        bundle: &ReportBundle,
        geometry: &PageGeometry,
    ) -> Result<(Vec<u8>, usize, u32), ExportError> {
        let surface = guard.surface();
        let raster_options = RasterOptions::for_surface(surface, self.options.raster_scale);
        let planned = plan_pages(
            raster_options.width,
            raster_options.height,
            geometry,
            self.options.max_pages,
        )?;
        debug!(
            "{} will span {} pages at {}x{} px",
            guard.id(),
            planned.len(),
            raster_options.width,
            raster_options.height
        );

        self.wait_for_layout(guard, self.options.document_settle());
        let raster = self
            .rasterizer
            .rasterize(surface, &raster_options)
            .map_err(|source| ExportError::Raster {
                staging_id: guard.id().to_owned(),
                source,
            })?;
        info!(
            "Rasterized {} to {}x{} px",
            guard.id(),
            raster.width(),
            raster.height()
        );

        let title = format!("{} - {}", REPORT_TITLE, bundle.report.url);
        let mut writer = (self.writer_factory)(self.options.page_size, &title);
        let placed = paginate(&raster, writer.as_mut(), geometry, self.options.max_pages)?;
        let bytes = writer.finish()?;
        let slice_height = geometry.slice_height_for(raster.width())?;
        Ok((bytes, placed.len(), slice_height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RasterError;
    use crate::raster::RasterSurface;
    use crate::sample::sample_bundle;
    use crate::staging::StagedSurface;

    #[test]
    fn file_name_uses_product_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 14).expect("date");
        assert_eq!(
            export_file_name("SiteLens", date),
            "SiteLens_Analysis_Report_20240514.pdf"
        );
        assert_eq!(
            export_file_name("My Site/2", date),
            "My_Site_2_Analysis_Report_20240514.pdf"
        );
    }

    #[test]
    fn weight_policy_variants() {
        let mut bundle = sample_bundle();
        bundle.criteria[0].weight = 40.0;

        assert!(matches!(
            apply_weight_policy(&bundle, WeightPolicy::Warn),
            Ok(Cow::Borrowed(_))
        ));
        assert!(matches!(
            apply_weight_policy(&bundle, WeightPolicy::Reject),
            Err(ExportError::WeightSum { .. })
        ));
        let normalized = apply_weight_policy(&bundle, WeightPolicy::Normalize).expect("normalize");
        assert!(normalized.weight_check().is_balanced());
    }

    #[test]
    fn section_pages_follow_slice_height() {
        let marks = vec![
            SectionMark {
                id: "header".into(),
                title: "Header".into(),
                y: 40,
            },
            SectionMark {
                id: "criteria".into(),
                title: "Criteria".into(),
                y: 1163,
            },
        ];
        assert_eq!(
            section_pages(&marks, 2.0, 2245, 3),
            vec![("Header".to_owned(), 1), ("Criteria".to_owned(), 2)]
        );
    }

    #[test]
    fn section_pages_never_pass_the_last_page() {
        let marks = vec![SectionMark {
            id: "seo".into(),
            title: "SEO".into(),
            y: 5000,
        }];
        assert_eq!(section_pages(&marks, 2.0, 2245, 1), vec![("SEO".to_owned(), 1)]);
        assert_eq!(section_pages(&marks, 2.0, 2245, 0), vec![("SEO".to_owned(), 1)]);
    }

    struct FailingRasterizer;

    impl Rasterizer for FailingRasterizer {
        fn rasterize(
            &self,
            _surface: &StagedSurface,
            _options: &RasterOptions,
        ) -> Result<RasterSurface, RasterError> {
            Err(RasterError::new("surface lost"))
        }
    }

    #[test]
    fn chart_failure_falls_back_to_placeholder() {
        let exporter =
            ReportExporter::new(ExportOptions::default()).with_rasterizer(Arc::new(FailingRasterizer));
        let bundle = sample_bundle();

        let chart = exporter.acquire_chart(&bundle, &ChartInput::Series(Vec::new()));

        assert!(chart.is_none());
        assert!(exporter.staging().is_empty());
    }

    #[test]
    fn series_chart_is_captured_and_detached() {
        let exporter = ReportExporter::new(ExportOptions::default().with_raster_scale(1.0));
        let bundle = sample_bundle();

        let chart = exporter
            .acquire_chart(&bundle, &ChartInput::Series(ChartPoint::from_criteria(&bundle.criteria)))
            .expect("chart");

        assert_eq!(chart.width(), crate::template::chart::CHART_WIDTH_PX);
        assert!(exporter.staging().is_empty());
    }
}
