use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, Result};

/// Smallest and largest accepted output edge, in pixels.
pub const MIN_DIMENSION: u32 = 1;
pub const MAX_DIMENSION: u32 = 512;

/// Largest accepted corner radius, in pixels.
pub const MAX_CORNER_RADIUS: u32 = 100;

/// How the rounded-corner mask combines with the source alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlphaMode {
    /// Inside pixels keep their source alpha, outside pixels become transparent.
    #[default]
    Preserve,
    /// The mask becomes the alpha channel, discarding any source alpha.
    Replace,
}

/// A validated, immutable conversion request.
///
/// Build one with [`ConversionRequest::builder`]:
///
/// ```rust,no_run
/// use img2ico::request::ConversionRequest;
///
/// let request = ConversionRequest::builder("photo.jpg")
///     .size(128, 128)
///     .corner_radius(20)
///     .output_dir("/tmp/out")
///     .build()
///     .unwrap();
/// assert_eq!(request.output_path(), std::path::Path::new("/tmp/out/photo.ico"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    source_path: PathBuf,
    target_width: u32,
    target_height: u32,
    corner_radius: u32,
    output_dir: Option<PathBuf>,
    alpha_mode: AlphaMode,
}

impl ConversionRequest {
    pub fn builder(source_path: impl Into<PathBuf>) -> ConversionRequestBuilder {
        ConversionRequestBuilder {
            source_path: source_path.into(),
            target_width: 64,
            target_height: 64,
            corner_radius: 0,
            output_dir: None,
            alpha_mode: AlphaMode::default(),
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    pub fn target_height(&self) -> u32 {
        self.target_height
    }

    pub fn corner_radius(&self) -> u32 {
        self.corner_radius
    }

    pub fn alpha_mode(&self) -> AlphaMode {
        self.alpha_mode
    }

    /// Directory the icon is written to. Falls back to `.` (the process working
    /// directory) when none was given.
    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(Path::new("."))
    }

    /// `<output_dir>/<source stem>.ico`
    pub fn output_path(&self) -> PathBuf {
        // `build` guarantees a file stem.
        let stem = self.source_path.file_stem().unwrap_or_default();
        let mut name = stem.to_os_string();
        name.push(".ico");
        self.output_dir().join(name)
    }
}

/// Builder for [`ConversionRequest`]. Range checks happen in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ConversionRequestBuilder {
    source_path: PathBuf,
    target_width: u32,
    target_height: u32,
    corner_radius: u32,
    output_dir: Option<PathBuf>,
    alpha_mode: AlphaMode,
}

impl ConversionRequestBuilder {
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.target_width = width;
        self.target_height = height;
        self
    }

    pub fn corner_radius(mut self, radius: u32) -> Self {
        self.corner_radius = radius;
        self
    }

    /// Set the output directory. Surrounding whitespace is dropped and blank
    /// strings are treated as "not set".
    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        self.output_dir = match dir.to_str() {
            Some(s) if s.trim().is_empty() => None,
            Some(s) => Some(PathBuf::from(s.trim())),
            // Non-UTF-8 paths are kept verbatim.
            None => Some(dir.to_path_buf()),
        };
        self
    }

    pub fn alpha_mode(mut self, mode: AlphaMode) -> Self {
        self.alpha_mode = mode;
        self
    }

    pub fn build(self) -> Result<ConversionRequest> {
        let dims = MIN_DIMENSION..=MAX_DIMENSION;
        if !dims.contains(&self.target_width) || !dims.contains(&self.target_height) {
            return Err(ConvertError::InvalidRequest(format!(
                "target size {}x{} outside {MIN_DIMENSION}..={MAX_DIMENSION}",
                self.target_width, self.target_height
            )));
        }
        if self.corner_radius > MAX_CORNER_RADIUS {
            return Err(ConvertError::InvalidRequest(format!(
                "corner radius {} exceeds {MAX_CORNER_RADIUS}",
                self.corner_radius
            )));
        }
        if self.source_path.file_stem().is_none() {
            return Err(ConvertError::InvalidRequest(format!(
                "source path {} has no file name",
                self.source_path.display()
            )));
        }

        Ok(ConversionRequest {
            source_path: self.source_path,
            target_width: self.target_width,
            target_height: self.target_height,
            corner_radius: self.corner_radius,
            output_dir: self.output_dir,
            alpha_mode: self.alpha_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_strips_extension() {
        let req = ConversionRequest::builder("/pics/photo.jpg")
            .size(128, 128)
            .corner_radius(20)
            .output_dir("/tmp/out")
            .build()
            .unwrap();
        assert_eq!(req.output_path(), PathBuf::from("/tmp/out/photo.ico"));
    }

    #[test]
    fn output_path_keeps_inner_dots() {
        let req = ConversionRequest::builder("my.logo.v2.png")
            .output_dir("out")
            .build()
            .unwrap();
        assert_eq!(req.output_path(), PathBuf::from("out/my.logo.v2.ico"));
    }

    #[test]
    fn blank_output_dir_means_working_dir() {
        let req = ConversionRequest::builder("a/b/icon.png")
            .output_dir("   ")
            .build()
            .unwrap();
        assert_eq!(req.output_dir(), Path::new("."));
        assert_eq!(req.output_path(), PathBuf::from("./icon.ico"));
    }

    #[test]
    fn output_dir_is_trimmed() {
        let req = ConversionRequest::builder("logo.png")
            .output_dir(" out ")
            .build()
            .unwrap();
        assert_eq!(req.output_dir(), Path::new("out"));
        assert_eq!(req.output_path(), PathBuf::from("out/logo.ico"));
    }

    #[test]
    fn rejects_zero_and_oversized_dimensions() {
        assert!(matches!(
            ConversionRequest::builder("a.png").size(0, 10).build(),
            Err(ConvertError::InvalidRequest(_))
        ));
        assert!(matches!(
            ConversionRequest::builder("a.png").size(10, 513).build(),
            Err(ConvertError::InvalidRequest(_))
        ));
    }

    #[test]
    fn accepts_range_bounds() {
        assert!(ConversionRequest::builder("a.png").size(1, 1).build().is_ok());
        assert!(
            ConversionRequest::builder("a.png")
                .size(512, 512)
                .corner_radius(100)
                .build()
                .is_ok()
        );
    }

    #[test]
    fn rejects_large_radius() {
        assert!(matches!(
            ConversionRequest::builder("a.png").corner_radius(101).build(),
            Err(ConvertError::InvalidRequest(_))
        ));
    }

    #[test]
    fn rejects_path_without_file_name() {
        assert!(ConversionRequest::builder("").build().is_err());
        assert!(ConversionRequest::builder("/").build().is_err());
    }

    #[test]
    fn alpha_mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&AlphaMode::Replace).unwrap(), "\"replace\"");
        let mode: AlphaMode = serde_json::from_str("\"preserve\"").unwrap();
        assert_eq!(mode, AlphaMode::Preserve);
    }
}
