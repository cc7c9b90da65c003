use image::ImageFormat;
use imghdr::Type;

pub trait MimeType {
    fn mime_type(&self) -> &str;
}

/// Formats the crop render can encode back to. The set matches what browsers
/// hand us from a file input; anything else fails the render with a clear
/// message instead of silently switching formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeFormat {
    Jpeg,
    Png,
    Webp,
    Gif,
    Bmp,
}

impl EncodeFormat {
    /// Map a declared MIME type to an encodable format.
    pub fn from_mime(mime: &str) -> Option<EncodeFormat> {
        match mime {
            "image/jpeg" | "image/jpg" => Some(EncodeFormat::Jpeg),
            "image/png" => Some(EncodeFormat::Png),
            "image/webp" => Some(EncodeFormat::Webp),
            "image/gif" => Some(EncodeFormat::Gif),
            "image/bmp" => Some(EncodeFormat::Bmp),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EncodeFormat::Jpeg => "jpeg",
            EncodeFormat::Png => "png",
            EncodeFormat::Webp => "webp",
            EncodeFormat::Gif => "gif",
            EncodeFormat::Bmp => "bmp",
        }
    }

    /// Whether the format takes a lossy quality factor when encoding.
    pub fn lossy(&self) -> bool {
        matches!(self, EncodeFormat::Jpeg | EncodeFormat::Webp)
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            EncodeFormat::Jpeg => ImageFormat::Jpeg,
            EncodeFormat::Png => ImageFormat::Png,
            EncodeFormat::Webp => ImageFormat::WebP,
            EncodeFormat::Gif => ImageFormat::Gif,
            EncodeFormat::Bmp => ImageFormat::Bmp,
        }
    }
}

impl MimeType for EncodeFormat {
    fn mime_type(&self) -> &str {
        match self {
            EncodeFormat::Jpeg => "image/jpeg",
            EncodeFormat::Png => "image/png",
            EncodeFormat::Webp => "image/webp",
            EncodeFormat::Gif => "image/gif",
            EncodeFormat::Bmp => "image/bmp",
        }
    }
}

/// Determine the decodable format of raw bytes, for the content check behind
/// the declared MIME type.
pub fn sniff_format(data: &[u8]) -> Option<ImageFormat> {
    let img_type = imghdr::from_bytes(data);
    if let Some(img_type) = img_type {
        return match img_type {
            Type::Gif => Some(ImageFormat::Gif),
            Type::Tiff => Some(ImageFormat::Tiff),
            Type::Jpeg => Some(ImageFormat::Jpeg),
            Type::Bmp => Some(ImageFormat::Bmp),
            Type::Png => Some(ImageFormat::Png),
            Type::Webp => Some(ImageFormat::WebP),
            Type::Ico => Some(ImageFormat::Ico),
            _ => None,
        };
    }
    None
}
