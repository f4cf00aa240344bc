//! Image task: lossless PNG optimization and JPEG recompression.
//!
//! SVG and GIF files are copied unchanged; only PNG and JPEG are optimized.

use std::fs;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use rayon::prelude::*;

use crate::config::BuildConfig;
use crate::task::{source_files, write_output, BuildError, BuildTask, TaskKind};

/// Image extensions picked up from the images folder.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "svg", "gif"];

/// oxipng preset used for PNG files.
const PNG_PRESET: u8 = 5;

/// Quality used when recompressing JPEG files.
const JPEG_QUALITY: u8 = 75;

/// Optimizes `images/*` in parallel into the images output folder.
#[derive(Debug, Default)]
pub struct ImagesTask;

impl BuildTask for ImagesTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Images
    }

    fn run(&self, config: &BuildConfig) -> Result<Vec<PathBuf>, BuildError> {
        let sources = source_files(&config.images_dir(), &IMAGE_EXTENSIONS)?;
        let target = config.images_output();

        sources
            .par_iter()
            .map(|source| {
                let data = fs::read(source).map_err(|e| BuildError::read(source, e))?;
                let optimized = optimize(source, data)?;

                let Some(name) = source.file_name() else {
                    return Err(BuildError::read(source, "missing file name"));
                };
                let dest = target.join(name);
                write_output(&dest, optimized)?;
                Ok(dest)
            })
            .collect()
    }
}

/// Optimize one image by extension. SVG and GIF pass through unchanged.
pub fn optimize(path: &Path, data: Vec<u8>) -> Result<Vec<u8>, BuildError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let image_error = |message: String| BuildError::ImageError {
        path: path.display().to_string(),
        message,
    };

    let optimized = match ext.as_str() {
        "png" => oxipng::optimize_from_memory(&data, &oxipng::Options::from_preset(PNG_PRESET))
            .map_err(|e| image_error(e.to_string()))?,
        "jpg" | "jpeg" => recompress_jpeg(&data).map_err(|e| image_error(e.to_string()))?,
        _ => return Ok(data),
    };

    // Never ship a file that got bigger.
    if optimized.len() < data.len() {
        tracing::debug!(
            "Optimized {} ({} -> {} bytes)",
            path.display(),
            data.len(),
            optimized.len()
        );
        Ok(optimized)
    } else {
        Ok(data)
    }
}

fn recompress_jpeg(data: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let decoded = image::load_from_memory_with_format(data, ImageFormat::Jpeg)?;
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());

    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn gradient() -> RgbImage {
        RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]))
    }

    fn config_in(root: &Path) -> BuildConfig {
        let mut config = BuildConfig::default();
        config.source_dir = root.join("src");
        config.output_dir = root.join("out");
        config
    }

    #[test]
    fn optimizes_png_and_jpeg_and_copies_the_rest() {
        let temp = tempdir().unwrap();
        let config = config_in(temp.path());
        let images = config.images_dir();
        fs::create_dir_all(&images).unwrap();
        gradient().save(images.join("photo.png")).unwrap();
        gradient().save(images.join("photo.jpg")).unwrap();
        fs::write(images.join("logo.svg"), "<svg/>").unwrap();
        fs::write(images.join("readme.txt"), "not an image").unwrap();

        let mut outputs = ImagesTask.run(&config).unwrap();
        outputs.sort();

        let out = config.images_output();
        assert_eq!(
            outputs,
            vec![out.join("logo.svg"), out.join("photo.jpg"), out.join("photo.png")]
        );

        let png = image::open(out.join("photo.png")).unwrap();
        assert_eq!((png.width(), png.height()), (64, 64));
        let jpg = image::open(out.join("photo.jpg")).unwrap();
        assert_eq!((jpg.width(), jpg.height()), (64, 64));
        assert_eq!(fs::read_to_string(out.join("logo.svg")).unwrap(), "<svg/>");
    }

    #[test]
    fn optimized_files_never_grow() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("photo.png");
        gradient().save(&path).unwrap();
        let original = fs::read(&path).unwrap();

        let optimized = optimize(&path, original.clone()).unwrap();

        assert!(optimized.len() <= original.len());
    }

    #[test]
    fn corrupt_jpeg_is_an_error() {
        let err = optimize(Path::new("broken.jpg"), b"not a jpeg".to_vec()).unwrap_err();

        assert!(matches!(err, BuildError::ImageError { .. }));
    }

    #[test]
    fn gif_passes_through() {
        let data = b"GIF89a...".to_vec();

        let out = optimize(Path::new("anim.gif"), data.clone()).unwrap();

        assert_eq!(out, data);
    }
}
