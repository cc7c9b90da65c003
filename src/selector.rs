use crate::errors::SelectError;
use crate::image_types::sniff_format;
use base64::Engine;
use base64::engine::general_purpose;
use image::DynamicImage;
use log::debug;
use std::sync::Arc;
use tokio::task::spawn_blocking;

/// A file as handed over by the host file input: declared name, declared
/// MIME type and raw content.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Validated selection, held in memory for the duration of one crop session.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub name: String,
    pub mime: String,
    pub size: u64,
    bytes: Arc<Vec<u8>>,
}

impl SourceImage {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode the selected file off the caller's thread into preview form.
    ///
    /// The crop engine cannot load an image before this completes. Content
    /// that does not decode despite its declared MIME type fails the same way
    /// an undeclared type does.
    pub async fn decode_preview(&self) -> Result<ImagePreview, SelectError> {
        let bytes = self.bytes.clone();
        let mime = self.mime.clone();
        let decoded = spawn_blocking(move || {
            let format = sniff_format(&bytes)
                .ok_or_else(|| SelectError::InvalidType("content is not a decodable image".into()))?;
            let pixels = image::load_from_memory_with_format(&bytes, format)
                .map_err(|err| SelectError::InvalidType(format!("decode failed: {err}")))?;
            let data_url = format!(
                "data:{};base64,{}",
                mime,
                general_purpose::STANDARD.encode(bytes.as_slice())
            );
            Ok::<_, SelectError>((pixels, data_url))
        })
        .await
        .map_err(|err| SelectError::InvalidType(format!("decode task failed: {err}")))??;

        let (pixels, data_url) = decoded;
        debug!(
            "decoded preview for {} ({}x{})",
            self.name,
            pixels.width(),
            pixels.height()
        );
        Ok(ImagePreview {
            natural_width: pixels.width(),
            natural_height: pixels.height(),
            data_url,
            pixels: Arc::new(pixels),
        })
    }
}

/// Decode product of a [`SourceImage`]: the pixels, their natural dimensions
/// and a `data:` URL for the host to show while cropping.
#[derive(Clone, Debug)]
pub struct ImagePreview {
    pub natural_width: u32,
    pub natural_height: u32,
    pub data_url: String,
    pub(crate) pixels: Arc<DynamicImage>,
}

/// Validates picked files and keeps the current selection.
pub struct ImageSelector {
    max_bytes: u64,
    current: Option<SourceImage>,
}

impl ImageSelector {
    pub fn new(max_bytes: u64) -> Self {
        ImageSelector {
            max_bytes,
            current: None,
        }
    }

    /// Validate a picked file and make it the current selection.
    ///
    /// A rejected file leaves the previous selection untouched. An accepted
    /// one replaces it entirely; any crop state derived from the previous
    /// selection is invalid from this point and must be reset by the caller.
    pub fn select_file(&mut self, candidate: FileCandidate) -> Result<&SourceImage, SelectError> {
        if !candidate.mime.starts_with("image/") {
            return Err(SelectError::InvalidType(candidate.mime));
        }
        let size = candidate.bytes.len() as u64;
        if size > self.max_bytes {
            return Err(SelectError::FileTooLarge {
                size,
                limit: self.max_bytes,
            });
        }

        debug!("selected {} ({} bytes, {})", candidate.name, size, candidate.mime);
        Ok(self.current.insert(SourceImage {
            name: candidate.name,
            mime: candidate.mime,
            size,
            bytes: Arc::new(candidate.bytes),
        }))
    }

    pub fn current(&self) -> Option<&SourceImage> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::FileCandidate;
    use std::io::Cursor;

    pub(crate) fn png_candidate(name: &str, width: u32, height: u32) -> FileCandidate {
        let img = image::DynamicImage::new_rgba8(width, height);
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        FileCandidate {
            name: name.to_string(),
            mime: "image/png".to_string(),
            bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::png_candidate;
    use super::*;

    #[test]
    fn rejects_non_image_mime() {
        let mut selector = ImageSelector::new(10 * 1024 * 1024);
        let candidate = FileCandidate {
            name: "notes.pdf".into(),
            mime: "application/pdf".into(),
            bytes: vec![1, 2, 3],
        };
        let err = selector.select_file(candidate).unwrap_err();
        assert_eq!(err, SelectError::InvalidType("application/pdf".into()));
        assert!(selector.current().is_none());
    }

    #[test]
    fn rejects_oversized_file_and_keeps_prior_selection() {
        let mut selector = ImageSelector::new(10 * 1024 * 1024);
        selector.select_file(png_candidate("first.png", 2, 2)).unwrap();

        let oversized = FileCandidate {
            name: "huge.png".into(),
            mime: "image/png".into(),
            bytes: vec![0; 10 * 1024 * 1024 + 1],
        };
        let err = selector.select_file(oversized).unwrap_err();
        assert_eq!(
            err,
            SelectError::FileTooLarge {
                size: 10 * 1024 * 1024 + 1,
                limit: 10 * 1024 * 1024,
            }
        );
        assert_eq!(selector.current().unwrap().name, "first.png");
    }

    #[test]
    fn accepted_file_replaces_prior_selection() {
        let mut selector = ImageSelector::new(10 * 1024 * 1024);
        selector.select_file(png_candidate("first.png", 2, 2)).unwrap();
        selector.select_file(png_candidate("second.png", 3, 3)).unwrap();
        assert_eq!(selector.current().unwrap().name, "second.png");
    }

    #[tokio::test]
    async fn decodes_preview_with_natural_dimensions_and_data_url() {
        let mut selector = ImageSelector::new(10 * 1024 * 1024);
        let source = selector
            .select_file(png_candidate("banner.png", 12, 7))
            .unwrap()
            .clone();
        let preview = source.decode_preview().await.unwrap();
        assert_eq!(preview.natural_width, 12);
        assert_eq!(preview.natural_height, 7);
        assert!(preview.data_url.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn mislabeled_content_fails_decode() {
        let mut selector = ImageSelector::new(10 * 1024 * 1024);
        let source = selector
            .select_file(FileCandidate {
                name: "fake.png".into(),
                mime: "image/png".into(),
                bytes: b"just some text".to_vec(),
            })
            .unwrap()
            .clone();
        let err = source.decode_preview().await.unwrap_err();
        assert!(matches!(err, SelectError::InvalidType(_)));
    }
}
