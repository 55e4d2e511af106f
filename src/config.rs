//! Export configuration with defaults, TOML files and environment overrides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use serde::Deserialize;

use crate::error::ExportError;
use crate::model::WeightPolicy;

/// Physical page size in millimetres.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct PageSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PageSize {
    /// ISO A4 portrait, 210 x 297 mm.
    pub const A4: PageSize = PageSize {
        width_mm: 210.0,
        height_mm: 297.0,
    };
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

/// CSS pixel width of 210 mm at 96 dpi.
pub const DEFAULT_PRINT_WIDTH_PX: u32 = 794;

/// Narrowest layout width the report template fits into.
pub const MIN_PRINT_WIDTH_PX: u32 = 480;

/// Options controlling one export.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Product name used as the file name prefix.
    pub product_name: String,
    pub page_size: PageSize,
    /// Layout width of the staging surface in CSS pixels.
    pub print_width_px: u32,
    /// Device pixel ratio applied by the rasterizer.
    pub raster_scale: f64,
    /// Upper bound for waiting on fonts and layout before rasterizing the document.
    pub document_settle_ms: u64,
    /// Upper bound for waiting before rasterizing an isolated chart node.
    pub chart_settle_ms: u64,
    /// Exports that would exceed this many pages fail instead of writing.
    pub max_pages: usize,
    pub weight_policy: WeightPolicy,
    /// Number of urgent improvements highlighted on the first page.
    pub urgent_count: usize,
    pub output_dir: PathBuf,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            product_name: "UXReport".to_owned(),
            page_size: PageSize::A4,
            print_width_px: DEFAULT_PRINT_WIDTH_PX,
            raster_scale: 2.0,
            document_settle_ms: 1500,
            chart_settle_ms: 500,
            max_pages: 50,
            weight_policy: WeightPolicy::default(),
            urgent_count: 3,
            output_dir: PathBuf::from("."),
        }
    }
}

impl ExportOptions {
    /// Creates options with the crate defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ExportError> {
        let options: Self =
            toml::from_str(source).map_err(|err| ExportError::Config(err.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Loads options from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let source = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    /// Applies `UXREPORT_*` environment overrides and returns the updated options.
    ///
    /// Unparseable values are logged and ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(name) = env_string("UXREPORT_PRODUCT_NAME") {
            self.product_name = name;
        }
        if let Some(dir) = env_string("UXREPORT_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(scale) = env_parsed("UXREPORT_RASTER_SCALE") {
            self.raster_scale = scale;
        }
        if let Some(max_pages) = env_parsed("UXREPORT_MAX_PAGES") {
            self.max_pages = max_pages;
        }
        if let Some(ms) = env_parsed("UXREPORT_DOCUMENT_SETTLE_MS") {
            self.document_settle_ms = ms;
        }
        if let Some(ms) = env_parsed("UXREPORT_CHART_SETTLE_MS") {
            self.chart_settle_ms = ms;
        }
        self
    }

    /// Sets the product name and returns the updated options.
    pub fn with_product_name(mut self, product_name: impl Into<String>) -> Self {
        self.product_name = product_name.into();
        self
    }

    /// Sets the raster scale and returns the updated options.
    pub fn with_raster_scale(mut self, raster_scale: f64) -> Self {
        self.raster_scale = raster_scale;
        self
    }

    /// Sets the page limit and returns the updated options.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Sets the weight policy and returns the updated options.
    pub fn with_weight_policy(mut self, weight_policy: WeightPolicy) -> Self {
        self.weight_policy = weight_policy;
        self
    }

    pub fn document_settle(&self) -> Duration {
        Duration::from_millis(self.document_settle_ms)
    }

    pub fn chart_settle(&self) -> Duration {
        Duration::from_millis(self.chart_settle_ms)
    }

    /// Rejects values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ExportError> {
        if !(self.page_size.width_mm > 0.0 && self.page_size.height_mm > 0.0) {
            return Err(ExportError::InvalidGeometry(format!(
                "page size {}x{} mm must be positive",
                self.page_size.width_mm, self.page_size.height_mm
            )));
        }
        if !(self.raster_scale.is_finite() && self.raster_scale > 0.0) {
            return Err(ExportError::Config(format!(
                "raster scale {} must be a positive number",
                self.raster_scale
            )));
        }
        if self.print_width_px < MIN_PRINT_WIDTH_PX {
            return Err(ExportError::Config(format!(
                "print width {} px is narrower than the minimum of {} px",
                self.print_width_px, MIN_PRINT_WIDTH_PX
            )));
        }
        if self.max_pages == 0 {
            return Err(ExportError::Config("max pages must be at least 1".into()));
        }
        Ok(())
    }
}

fn env_string(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn env_parsed<T: std::str::FromStr>(var: &str) -> Option<T> {
    let raw = env_string(var)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {var}={raw:?}: not a valid value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_overrides_only_given_keys() {
        let options = ExportOptions::from_toml_str(
            r#"
            product_name = "SiteLens"
            max_pages = 12
            weight_policy = "normalize"
            "#,
        )
        .expect("parse options");

        assert_eq!(options.product_name, "SiteLens");
        assert_eq!(options.max_pages, 12);
        assert_eq!(options.weight_policy, WeightPolicy::Normalize);
        assert_eq!(options.page_size, PageSize::A4);
        assert_eq!(options.print_width_px, DEFAULT_PRINT_WIDTH_PX);
    }

    #[test]
    fn rejects_non_positive_scale() {
        let err = ExportOptions::from_toml_str("raster_scale = 0.0").unwrap_err();
        assert!(matches!(err, ExportError::Config(_)));
    }

    #[test]
    fn rejects_narrow_print_width() {
        let err = ExportOptions::from_toml_str("print_width_px = 300").unwrap_err();
        assert!(matches!(err, ExportError::Config(_)));

        let options = ExportOptions {
            print_width_px: MIN_PRINT_WIDTH_PX,
            ..ExportOptions::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn rejects_zero_page_limit() {
        let err = ExportOptions::new().with_max_pages(0).validate().unwrap_err();
        assert!(matches!(err, ExportError::Config(_)));
    }
}
