//! Font lookup for the text report.
//!
//! Hangul needs a font that covers it, so the text report ships with the
//! NanumGothic family instead of relying on the PDF base fonts.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::{Error, ErrorKind};
use genpdf::fonts::{self, FontData, FontFamily};

/// Name of the bundled font family.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "NanumGothic";

/// Environment variable pointing at a directory with the font files.
pub const FONTS_DIR_ENV: &str = "UXREPORT_FONTS_DIR";

const FONT_FILES: &[&str] = &[
    "NanumGothic-Regular.ttf",
    "NanumGothic-Bold.ttf",
    "NanumGothic-Italic.ttf",
    "NanumGothic-BoldItalic.ttf",
];

fn font_directory_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = env::var_os(FONTS_DIR_ENV).filter(|value| !value.is_empty()) {
        candidates.push(PathBuf::from(path));
    }

    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            let candidate = bin_dir.join("assets/fonts");
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }

    let manifest_candidate = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts");
    if !candidates.contains(&manifest_candidate) {
        candidates.push(manifest_candidate);
    }

    candidates
}

fn missing_font_files(path: &Path) -> Vec<PathBuf> {
    FONT_FILES
        .iter()
        .map(|name| path.join(name))
        .filter(|candidate| !candidate.is_file())
        .collect()
}

/// Returns the first candidate directory holding every font file.
pub fn resolve_font_directory() -> Result<PathBuf, Error> {
    let mut attempts = Vec::new();

    for candidate in font_directory_candidates() {
        let exists = candidate.is_dir();
        let missing = missing_font_files(&candidate);

        if exists && missing.is_empty() {
            return Ok(candidate);
        }

        let reason = if !exists {
            "directory missing".to_owned()
        } else {
            let names = missing
                .iter()
                .map(|path| path.file_name().unwrap_or_default().to_string_lossy())
                .collect::<Vec<_>>()
                .join(", ");
            format!("missing files [{}]", names)
        };
        attempts.push(format!("{} ({})", candidate.display(), reason));
    }

    Err(Error::new(
        format!(
            "Unable to locate the {} fonts. Checked: {}. Set {} to a directory containing {}.",
            DEFAULT_FONT_FAMILY_NAME,
            attempts.join(", "),
            FONTS_DIR_ENV,
            FONT_FILES.join(", ")
        ),
        io::Error::new(io::ErrorKind::NotFound, "report fonts not found"),
    ))
}

/// Loads the bundled font family.
pub fn default_font_family() -> Result<FontFamily<FontData>, Error> {
    let directory = resolve_font_directory()?;

    fonts::from_files(&directory, DEFAULT_FONT_FAMILY_NAME, None).map_err(|err| {
        Error::new(
            format!(
                "Failed to load font family '{}' from {}: {}",
                DEFAULT_FONT_FAMILY_NAME,
                directory.display(),
                err
            ),
            io::Error::new(io::ErrorKind::Other, err.to_string()),
        )
    })
}

/// Whether the font lookup failed because files are absent rather than broken.
pub fn fonts_missing(err: &Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::IoError(io_err)
            if io_err.kind() == io::ErrorKind::NotFound
                || io_err.kind() == io::ErrorKind::PermissionDenied
    )
}

/// Indicates whether every font file of the default family is present on disk.
pub fn default_fonts_available() -> bool {
    resolve_font_directory().is_ok()
}
