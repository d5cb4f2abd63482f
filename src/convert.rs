use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbaImage};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, Result};
use crate::ico;
use crate::mask;
use crate::request::ConversionRequest;

/// What a successful conversion produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionOutcome {
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Whether a rounded-corner mask was applied.
    pub masked: bool,
}

/// Turns one source image into a single-frame ICO file.
///
/// Every call is synchronous and owns its pixel buffers for the duration of
/// the call only.
///
/// ```rust,no_run
/// use img2ico::convert::IconConverter;
/// use img2ico::request::ConversionRequest;
///
/// let request = ConversionRequest::builder("photo.jpg")
///     .size(128, 128)
///     .corner_radius(20)
///     .output_dir("/tmp/out")
///     .build()?;
/// let outcome = IconConverter::new().convert(&request)?;
/// println!("Wrote {}", outcome.output_path.display());
/// # Ok::<(), img2ico::ConvertError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct IconConverter {
    filter: FilterType,
}

impl Default for IconConverter {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }
}

impl IconConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode, resize, mask, encode and write the icon described by `request`.
    ///
    /// Nothing is written unless every step succeeds. The final file appears
    /// through a rename, so readers never observe a partial icon.
    pub fn convert(&self, request: &ConversionRequest) -> Result<ConversionOutcome> {
        let source = decode_source(request.source_path())?;
        let rendered = self.render(&source, request);
        drop(source);

        let bytes = self.encode_ico(&rendered)?;
        let output_path = request.output_path();
        write_atomically(request.output_dir(), &output_path, &bytes)?;

        log::info!(
            "Converted {} -> {} ({}x{}, radius {})",
            request.source_path().display(),
            output_path.display(),
            rendered.width(),
            rendered.height(),
            request.corner_radius()
        );

        Ok(ConversionOutcome {
            output_path,
            width: rendered.width(),
            height: rendered.height(),
            masked: request.corner_radius() > 0,
        })
    }

    /// Resize `image` to the requested size and apply the corner mask.
    ///
    /// Images that already have the target size are copied unchanged, so
    /// rendering twice to the same size is a no-op.
    pub fn render(&self, image: &DynamicImage, request: &ConversionRequest) -> RgbaImage {
        let (width, height) = (request.target_width(), request.target_height());

        let mut rgba = if image.dimensions() == (width, height) {
            log::debug!("Source already {width}x{height}, skipping resample");
            image.to_rgba8()
        } else {
            image.resize_exact(width, height, self.filter).to_rgba8()
        };

        let radius = request.corner_radius();
        if radius > 0 {
            log::debug!("Applying corner mask, radius {radius}px");
            let mask = mask::rounded_rect_mask(width, height, radius);
            mask::apply_mask(&mut rgba, &mask, request.alpha_mode());
        }

        rgba
    }

    pub fn encode_ico(&self, image: &RgbaImage) -> Result<Vec<u8>> {
        ico::write_ico(image)
    }
}

/// Convert with the default Lanczos3 filter.
pub fn convert(request: &ConversionRequest) -> Result<ConversionOutcome> {
    IconConverter::default().convert(request)
}

fn decode_source(path: &Path) -> Result<DynamicImage> {
    let decode_err = |source| ConvertError::Decode {
        path: path.to_path_buf(),
        source,
    };
    let bytes = std::fs::read(path).map_err(|e| decode_err(image::ImageError::IoError(e)))?;
    let image = image::load_from_memory(&bytes).map_err(decode_err)?;
    log::debug!(
        "Decoded {} ({}x{}, {:?})",
        path.display(),
        image.width(),
        image.height(),
        image.color()
    );
    Ok(image)
}

fn write_atomically(dir: &Path, target: &Path, bytes: &[u8]) -> Result<()> {
    let meta = std::fs::metadata(dir).map_err(|e| ConvertError::io(dir, e))?;
    if !meta.is_dir() {
        return Err(ConvertError::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
        ));
    }

    // The temp file is removed on drop if anything below fails.
    let mut tmp = tempfile::Builder::new()
        .prefix(".img2ico-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| ConvertError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| ConvertError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| ConvertError::io(tmp.path(), e))?;
    tmp.persist(target)
        .map_err(|e| ConvertError::io(target, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::AlphaMode;
    use image::{Rgb, RgbImage, Rgba};
    use std::fs;
    use tempfile::TempDir;

    fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]))
            .save(&path)
            .unwrap();
        path
    }

    fn write_png(dir: &Path, name: &str, image: &RgbaImage) -> PathBuf {
        let path = dir.join(name);
        image.save(&path).unwrap();
        path
    }

    fn translucent(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([200, 100, 50, ((x * 7 + y * 3) % 256) as u8])
        })
    }

    fn read_output(path: &Path) -> RgbaImage {
        ico::decode_frame(&fs::read(path).unwrap()).unwrap()
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn photo_to_rounded_icon() {
        let src_dir = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        let source = write_jpeg(src_dir.path(), "photo.jpg", 300, 200);

        let request = ConversionRequest::builder(&source)
            .size(128, 128)
            .corner_radius(20)
            .output_dir(out_dir.path())
            .build()
            .unwrap();
        let outcome = convert(&request).unwrap();

        assert_eq!(outcome.output_path, out_dir.path().join("photo.ico"));
        assert_eq!((outcome.width, outcome.height), (128, 128));
        assert!(outcome.masked);
        assert_eq!(dir_entries(out_dir.path()), vec!["photo.ico"]);

        let info = ico::inspect(&outcome.output_path).unwrap();
        assert_eq!(info.frames.len(), 1);
        assert_eq!((info.frames[0].width, info.frames[0].height), (128, 128));

        let pixels = read_output(&outcome.output_path);
        for (x, y) in [(0, 0), (127, 0), (0, 127), (127, 127)] {
            assert_eq!(pixels.get_pixel(x, y).0[3], 0, "corner ({x},{y})");
        }
        for (x, y) in [(64, 64), (64, 0), (0, 64), (20, 20)] {
            assert_eq!(pixels.get_pixel(x, y).0[3], 255, "inside ({x},{y})");
        }
    }

    #[test]
    fn output_has_exact_requested_dimensions() {
        let src_dir = TempDir::new().unwrap();
        let source = write_jpeg(src_dir.path(), "wide.jpg", 97, 41);

        for (w, h) in [(1, 1), (16, 512), (255, 256), (512, 512), (37, 300)] {
            let out_dir = TempDir::new().unwrap();
            let request = ConversionRequest::builder(&source)
                .size(w, h)
                .corner_radius(5)
                .output_dir(out_dir.path())
                .build()
                .unwrap();
            let outcome = convert(&request).unwrap();
            let info = ico::inspect(&outcome.output_path).unwrap();
            assert_eq!((info.frames[0].width, info.frames[0].height), (w, h));
            assert_eq!(read_output(&outcome.output_path).dimensions(), (w, h));
        }
    }

    #[test]
    fn zero_radius_keeps_source_alpha() {
        let dir = TempDir::new().unwrap();
        let original = translucent(64, 48);
        let source = write_png(dir.path(), "logo.png", &original);

        let request = ConversionRequest::builder(&source)
            .size(64, 48)
            .output_dir(dir.path())
            .build()
            .unwrap();
        let outcome = convert(&request).unwrap();
        assert!(!outcome.masked);

        assert_eq!(read_output(&outcome.output_path), original);
    }

    #[test]
    fn zero_radius_on_opaque_source_is_fully_opaque() {
        let dir = TempDir::new().unwrap();
        let source = write_jpeg(dir.path(), "flat.jpg", 40, 40);

        let request = ConversionRequest::builder(&source)
            .size(32, 32)
            .output_dir(dir.path())
            .build()
            .unwrap();
        let outcome = convert(&request).unwrap();
        assert!(read_output(&outcome.output_path).pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn rounded_mask_preserves_inside_alpha() {
        let dir = TempDir::new().unwrap();
        let original = translucent(80, 80);
        let source = write_png(dir.path(), "glass.png", &original);

        let request = ConversionRequest::builder(&source)
            .size(80, 80)
            .corner_radius(16)
            .output_dir(dir.path())
            .build()
            .unwrap();
        let pixels = read_output(&convert(&request).unwrap().output_path);
        let mask = mask::rounded_rect_mask(80, 80, 16);

        for (x, y, p) in pixels.enumerate_pixels() {
            let expected = if mask.get_pixel(x, y).0[0] == 0 {
                0
            } else {
                original.get_pixel(x, y).0[3]
            };
            assert_eq!(p.0[3], expected, "pixel ({x},{y})");
        }
    }

    #[test]
    fn replace_mode_discards_source_alpha() {
        let dir = TempDir::new().unwrap();
        let source = write_png(dir.path(), "glass.png", &translucent(50, 50));

        let request = ConversionRequest::builder(&source)
            .size(50, 50)
            .corner_radius(10)
            .alpha_mode(AlphaMode::Replace)
            .output_dir(dir.path())
            .build()
            .unwrap();
        let pixels = read_output(&convert(&request).unwrap().output_path);
        assert_eq!(pixels.get_pixel(25, 25).0[3], 255);
        assert_eq!(pixels.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn rendering_at_same_size_is_identity() {
        let converter = IconConverter::new();
        let image = DynamicImage::ImageRgba8(translucent(33, 17));
        let request = ConversionRequest::builder("x.png").size(33, 17).build().unwrap();

        let once = converter.render(&image, &request);
        assert_eq!(once, image.to_rgba8());
        let twice = converter.render(&DynamicImage::ImageRgba8(once.clone()), &request);
        assert_eq!(twice, once);
    }

    #[test]
    fn missing_source_is_decode_error() {
        let out_dir = TempDir::new().unwrap();
        let request = ConversionRequest::builder(out_dir.path().join("nope.png"))
            .output_dir(out_dir.path())
            .build()
            .unwrap();
        let err = convert(&request).unwrap_err();
        assert!(matches!(err, ConvertError::Decode { .. }), "{err}");
        assert!(dir_entries(out_dir.path()).is_empty());
    }

    #[test]
    fn corrupt_source_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("broken.png");
        fs::write(&source, b"definitely not a png").unwrap();

        let request = ConversionRequest::builder(&source)
            .output_dir(dir.path())
            .build()
            .unwrap();
        let err = convert(&request).unwrap_err();
        assert!(matches!(err, ConvertError::Decode { .. }), "{err}");
        assert_eq!(dir_entries(dir.path()), vec!["broken.png"]);
    }

    #[test]
    fn missing_output_dir_is_io_error() {
        let dir = TempDir::new().unwrap();
        let source = write_jpeg(dir.path(), "photo.jpg", 10, 10);
        let missing = dir.path().join("not-created");

        let request = ConversionRequest::builder(&source)
            .output_dir(&missing)
            .build()
            .unwrap();
        let err = convert(&request).unwrap_err();
        assert!(matches!(err, ConvertError::Io { .. }), "{err}");
        assert!(!missing.exists());
        assert_eq!(dir_entries(dir.path()), vec!["photo.jpg"]);
    }

    #[test]
    fn file_as_output_dir_is_io_error() {
        let dir = TempDir::new().unwrap();
        let source = write_jpeg(dir.path(), "photo.jpg", 10, 10);

        let request = ConversionRequest::builder(&source)
            .output_dir(&source)
            .build()
            .unwrap();
        let err = convert(&request).unwrap_err();
        assert!(matches!(err, ConvertError::Io { .. }), "{err}");
        assert_eq!(dir_entries(dir.path()), vec!["photo.jpg"]);
    }

    #[cfg(unix)]
    #[test]
    fn read_only_output_dir_is_io_error() {
        use std::os::unix::fs::PermissionsExt;

        let src_dir = TempDir::new().unwrap();
        let source = write_jpeg(src_dir.path(), "photo.jpg", 10, 10);
        let out_dir = TempDir::new().unwrap();
        fs::set_permissions(out_dir.path(), fs::Permissions::from_mode(0o555)).unwrap();

        // Root ignores directory permissions; nothing to check there.
        let canary = out_dir.path().join("canary");
        if fs::write(&canary, b"x").is_ok() {
            fs::remove_file(&canary).unwrap();
            fs::set_permissions(out_dir.path(), fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let request = ConversionRequest::builder(&source)
            .output_dir(out_dir.path())
            .build()
            .unwrap();
        let err = convert(&request).unwrap_err();
        let leftovers = dir_entries(out_dir.path());
        fs::set_permissions(out_dir.path(), fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(err, ConvertError::Io { .. }), "{err}");
        assert!(leftovers.is_empty(), "left behind: {leftovers:?}");
    }

    #[test]
    fn existing_icon_is_replaced() {
        let dir = TempDir::new().unwrap();
        let source = write_jpeg(dir.path(), "photo.jpg", 20, 20);
        fs::write(dir.path().join("photo.ico"), b"stale").unwrap();

        let request = ConversionRequest::builder(&source)
            .size(24, 24)
            .output_dir(dir.path())
            .build()
            .unwrap();
        let outcome = convert(&request).unwrap();
        assert_eq!(read_output(&outcome.output_path).dimensions(), (24, 24));
        assert_eq!(dir_entries(dir.path()), vec!["photo.ico", "photo.jpg"]);
    }

    #[test]
    fn format_is_sniffed_from_content() {
        let dir = TempDir::new().unwrap();
        let png = write_png(dir.path(), "real.png", &translucent(12, 12));
        let disguised = dir.path().join("disguised.jpg");
        fs::rename(&png, &disguised).unwrap();

        let request = ConversionRequest::builder(&disguised)
            .size(12, 12)
            .output_dir(dir.path())
            .build()
            .unwrap();
        let outcome = convert(&request).unwrap();
        assert_eq!(outcome.output_path, dir.path().join("disguised.ico"));
    }
}
