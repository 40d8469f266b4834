//! 写真の参照と送信用エンコード

use crate::error::{IdentifyError, Result};
use base64::Engine;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// 解析対象の写真
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRef {
    pub path: PathBuf,
    pub file_name: String,
    /// 内容のSHA-256（16進）
    pub fingerprint: String,
}

impl PhotoRef {
    /// 写真ファイルを開いて参照を作る
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(IdentifyError::FileNotFound(path.display().to_string()));
        }

        let supported = path
            .extension()
            .map(|ext| is_image_extension(&ext.to_string_lossy()))
            .unwrap_or(false);
        if !supported {
            return Err(IdentifyError::UnsupportedPhoto(path.display().to_string()));
        }

        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            fingerprint: compute_fingerprint(&bytes),
        })
    }

    /// 長辺を `max_size` 以下に縮小し、JPEGのBase64にする
    pub fn encode_for_upload(&self, max_size: u32) -> Result<String> {
        let img = image::open(&self.path)
            .map_err(|e| IdentifyError::ImageLoad(format!("{}: {}", self.file_name, e)))?;

        let img = if img.width().max(img.height()) > max_size {
            img.resize(max_size, max_size, FilterType::Triangle)
        } else {
            img
        };

        // JPEGはアルファ非対応
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        let mut buffer = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
            .map_err(|e| IdentifyError::ImageLoad(format!("JPEGエンコード失敗: {}", e)))?;

        Ok(base64::engine::general_purpose::STANDARD.encode(buffer))
    }
}

fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

fn compute_fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use tempfile::tempdir;

    #[test]
    fn test_is_image_extension() {
        assert!(is_image_extension("jpg"));
        assert!(is_image_extension("JPG"));
        assert!(is_image_extension("webp"));
        assert!(!is_image_extension("txt"));
        assert!(!is_image_extension("gif"));
    }

    #[test]
    fn test_open_not_found() {
        let result = PhotoRef::open(Path::new("/nonexistent/photo.jpg"));
        assert!(matches!(result, Err(IdentifyError::FileNotFound(_))));
    }

    #[test]
    fn test_open_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        assert!(matches!(PhotoRef::open(&path), Err(IdentifyError::UnsupportedPhoto(_))));
    }

    #[test]
    fn test_fingerprint_depends_on_content() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("b.jpg");
        let c = dir.path().join("c.jpg");
        std::fs::write(&a, b"same").unwrap();
        std::fs::write(&b, b"same").unwrap();
        std::fs::write(&c, b"other").unwrap();

        let a = PhotoRef::open(&a).unwrap();
        let b = PhotoRef::open(&b).unwrap();
        let c = PhotoRef::open(&c).unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_ne!(a.fingerprint, c.fingerprint);
        assert_eq!(a.fingerprint.len(), 64);
        assert_eq!(a.file_name, "a.jpg");
    }

    #[test]
    fn test_encode_for_upload_downsizes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.png");
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(64, 32, Rgba([200, 10, 10, 255]));
        img.save(&path).unwrap();

        let photo = PhotoRef::open(&path).unwrap();
        let encoded = photo.encode_for_upload(16).unwrap();
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();

        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 8);
    }

    #[test]
    fn test_encode_for_upload_invalid_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();

        let photo = PhotoRef::open(&path).unwrap();
        assert!(matches!(photo.encode_for_upload(512), Err(IdentifyError::ImageLoad(_))));
    }
}
