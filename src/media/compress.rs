//! Image compression
//!
//! The source format is sniffed from the content, never trusted from the file
//! extension. Every accepted image is resized to a fixed width and
//! re-encoded as JPEG.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ImageFormat, ImageReader};

use super::types::{CompressionSettings, MediaError, SourceFormat};

/// Result of compressing one image
#[derive(Debug)]
pub struct CompressedImage {
    /// JPEG bytes
    pub data: Vec<u8>,
    pub source_format: SourceFormat,
    pub width: u32,
    pub height: u32,
}

/// Decode, resize and JPEG-encode an image held in memory
pub fn compress_bytes(
    data: &[u8],
    settings: CompressionSettings,
) -> Result<CompressedImage, MediaError> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;

    let source_format = match reader.format() {
        Some(ImageFormat::Jpeg) => SourceFormat::Jpeg,
        Some(ImageFormat::Png) => SourceFormat::Png,
        Some(ImageFormat::WebP) => SourceFormat::WebP,
        Some(other) => return Err(MediaError::UnsupportedFormat(format!("{:?}", other))),
        None => return Err(MediaError::UnsupportedFormat("unknown".to_string())),
    };

    let img = reader
        .decode()
        .map_err(|e| MediaError::Decode(e.to_string()))?;

    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(MediaError::Decode("image has no pixels".to_string()));
    }

    let target_width = settings.target_width.max(1);
    let target_height = scaled_height(width, height, target_width);
    let resized = img.resize_exact(target_width, target_height, FilterType::Lanczos3);

    let mut data = Vec::new();
    JpegEncoder::new_with_quality(&mut data, settings.jpeg_quality)
        .encode_image(&resized.to_rgb8())
        .map_err(|e| MediaError::Encode(e.to_string()))?;

    tracing::debug!(
        format = source_format.as_str(),
        from = format!("{}x{}", width, height),
        to = format!("{}x{}", target_width, target_height),
        bytes = data.len(),
        "Compressed image"
    );

    Ok(CompressedImage {
        data,
        source_format,
        width: target_width,
        height: target_height,
    })
}

/// Compress the image at `source` into `output`
pub async fn compress_file_to(
    source: &Path,
    output: &Path,
    settings: CompressionSettings,
) -> Result<CompressedImage, MediaError> {
    let data = tokio::fs::read(source).await?;

    // Decode and resize are CPU-bound
    let compressed = tokio::task::spawn_blocking(move || compress_bytes(&data, settings))
        .await
        .map_err(|e| MediaError::Task(e.to_string()))??;

    tokio::fs::write(output, &compressed.data).await?;

    tracing::info!(
        source = %source.display(),
        output = %output.display(),
        format = compressed.source_format.as_str(),
        "Compressed image created"
    );
    Ok(compressed)
}

/// Output location for a compressed image: same stem, `.jpg` extension
pub fn compressed_path(path: &Path) -> PathBuf {
    path.with_extension("jpg")
}

fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let scaled = (u64::from(height) * u64::from(target_width) + u64::from(width) / 2)
        / u64::from(width);
    scaled.clamp(1, u64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use tempfile::TempDir;

    fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([200, 40, 90]),
        ));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_compress_png_to_jpeg() {
        let png = encode(40, 20, ImageFormat::Png);

        let compressed = compress_bytes(&png, CompressionSettings::default()).unwrap();

        assert_eq!(compressed.source_format, SourceFormat::Png);
        assert_eq!((compressed.width, compressed.height), (500, 250));
        assert_eq!(
            image::guess_format(&compressed.data).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_rejects_unsupported_formats() {
        let bmp = encode(8, 8, ImageFormat::Bmp);
        assert!(matches!(
            compress_bytes(&bmp, CompressionSettings::default()),
            Err(MediaError::UnsupportedFormat(_))
        ));

        assert!(matches!(
            compress_bytes(b"definitely not an image", CompressionSettings::default()),
            Err(MediaError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_format_sniffed_from_content() {
        // PNG bytes behind a .jpg name still decode as PNG
        let png = encode(10, 10, ImageFormat::Png);
        let compressed = compress_bytes(&png, CompressionSettings::default()).unwrap();
        assert_eq!(compressed.source_format, SourceFormat::Png);
    }

    #[test]
    fn test_compressed_path() {
        assert_eq!(
            compressed_path(Path::new("dir/abc_cat.png")),
            PathBuf::from("dir/abc_cat.jpg")
        );
        assert_eq!(
            compressed_path(Path::new("dir/abc_cat.jpg")),
            PathBuf::from("dir/abc_cat.jpg")
        );
        assert_eq!(
            compressed_path(Path::new("dir/abc_cat")),
            PathBuf::from("dir/abc_cat.jpg")
        );
    }

    #[test]
    fn test_scaled_height() {
        assert_eq!(scaled_height(1000, 500, 500), 250);
        assert_eq!(scaled_height(3, 1, 500), 167);
        assert_eq!(scaled_height(5000, 1, 500), 1);
    }

    #[tokio::test]
    async fn test_compress_file_to() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("abc.upload.tmp");
        tokio::fs::write(&source, encode(20, 20, ImageFormat::Png))
            .await
            .unwrap();

        let output = temp_dir.path().join("abc_cat.jpg");
        let compressed = compress_file_to(&source, &output, CompressionSettings::default())
            .await
            .unwrap();

        assert_eq!(compressed.source_format, SourceFormat::Png);
        assert!(source.exists());
        let data = tokio::fs::read(&output).await.unwrap();
        assert_eq!(image::guess_format(&data).unwrap(), ImageFormat::Jpeg);
    }
}
