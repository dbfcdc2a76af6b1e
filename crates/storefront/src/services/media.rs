//! Uploaded product images on local disk.
//!
//! Files are written to `<media root>/products/<uuid>.<ext>`; the product row
//! stores only the path relative to the media root.

use std::io;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use uuid::Uuid;

/// Accepted image file extensions, lowercase.
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Subdirectory of the media root that holds product images.
const PRODUCT_IMAGE_DIR: &str = "products";

/// An uploaded file as received from the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Client-supplied file name; only its extension is used.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// The normalized extension if this upload is an accepted image.
    ///
    /// The file name must carry an allowed extension and the bytes must open
    /// with the signature of a PNG, JPEG, GIF or WebP file.
    #[must_use]
    pub fn accepted_extension(&self) -> Option<String> {
        let ext = Path::new(&self.file_name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        (ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) && self.is_image()).then_some(ext)
    }

    fn is_image(&self) -> bool {
        matches!(
            image::guess_format(&self.bytes),
            Ok(ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP)
        )
    }
}

/// Media directory handle.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    /// Use `root` as the media directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The media directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a product image and return its path relative to the media root.
    ///
    /// # Errors
    ///
    /// Returns `io::ErrorKind::InvalidInput` if the upload is not an accepted
    /// image, or any error from creating the directory or writing the file.
    pub async fn save_product_image(&self, upload: &ImageUpload) -> io::Result<String> {
        let ext = upload.accepted_extension().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "unsupported image upload")
        })?;

        let dir = self.root.join(PRODUCT_IMAGE_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{ext}", Uuid::new_v4());
        tokio::fs::write(dir.join(&file_name), &upload.bytes).await?;

        Ok(format!("{PRODUCT_IMAGE_DIR}/{file_name}"))
    }

    /// Remove a previously saved file. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns any I/O error other than `NotFound`.
    pub async fn remove(&self, relative: &str) -> io::Result<()> {
        match tokio::fs::remove_file(self.root.join(relative)).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn upload(name: &str, bytes: &[u8]) -> ImageUpload {
        ImageUpload {
            file_name: name.to_owned(),
            bytes: bytes.to_vec(),
        }
    }

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG: &[u8] = b"\xff\xd8\xff\xe0\0\x10JFIF\0";

    #[test]
    fn test_accepted_extensions() {
        assert_eq!(upload("a.PNG", PNG).accepted_extension().as_deref(), Some("png"));
        assert_eq!(upload("photo.jpeg", JPEG).accepted_extension().as_deref(), Some("jpeg"));
        assert!(upload("notes.txt", PNG).accepted_extension().is_none());
        assert!(upload("noext", PNG).accepted_extension().is_none());
        assert!(upload("empty.png", b"").accepted_extension().is_none());
    }

    #[test]
    fn test_renamed_text_file_is_rejected() {
        assert!(upload("x.png", b"just some notes").accepted_extension().is_none());
        assert!(upload("x.jpg", b"GIF8").accepted_extension().is_none());
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let root = std::env::temp_dir().join(format!("pm-media-{}", Uuid::new_v4()));
        let media = MediaStorage::new(&root);

        let path = media.save_product_image(&upload("pic.gif", b"GIF89a")).await.unwrap();
        assert!(path.starts_with("products/"));
        assert!(path.ends_with(".gif"));
        assert_eq!(tokio::fs::read(root.join(&path)).await.unwrap(), b"GIF89a");

        media.remove(&path).await.unwrap();
        assert!(!root.join(&path).exists());
        media.remove(&path).await.unwrap();

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
