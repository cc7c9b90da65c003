use crate::crop::geometry::{CropRect, NaturalScale, Viewport, surface_size, to_natural};
use crate::errors::CropError;
use crate::image_types::{EncodeFormat, MimeType};
use fast_image_resize::Resizer;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use log::debug;
use sanitize_filename::sanitize;
use std::io::Cursor;
use std::time::SystemTime;

/// Final crop output: the selected region redrawn at natural resolution and
/// encoded back into the source format. Downstream treats it as the same
/// file, just transformed, so the (sanitized) filename is preserved.
#[derive(Debug, Clone)]
pub struct RenderedAsset {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub width: u32,
    pub height: u32,
    pub filename: String,
    pub last_modified: SystemTime,
}

/// Redraw `rect` (displayed space) from the decoded source at natural
/// resolution, scaled by the device pixel ratio, and encode it.
pub fn render_crop(
    pixels: &DynamicImage,
    rect: CropRect,
    viewport: Viewport,
    source_name: &str,
    mime: &str,
    quality: u8,
) -> Result<RenderedAsset, CropError> {
    let scale = NaturalScale::between(
        pixels.width(),
        pixels.height(),
        viewport.width,
        viewport.height,
    );
    let natural = to_natural(rect, scale);
    let (out_w, out_h) = surface_size(natural, viewport.device_pixel_ratio);
    if out_w == 0 || out_h == 0 {
        return Err(CropError::Render(format!(
            "surface would be {out_w}x{out_h}"
        )));
    }

    let format = EncodeFormat::from_mime(mime)
        .ok_or_else(|| CropError::Render(format!("cannot encode {mime}")))?;

    // Source region in whole natural pixels, kept inside the image.
    let src_x = (natural.x.max(0.0) as u32).min(pixels.width().saturating_sub(1));
    let src_y = (natural.y.max(0.0) as u32).min(pixels.height().saturating_sub(1));
    let src_w = (natural.width.round() as u32).min(pixels.width() - src_x).max(1);
    let src_h = (natural.height.round() as u32).min(pixels.height() - src_y).max(1);

    let region = pixels.crop_imm(src_x, src_y, src_w, src_h);

    let mut surface = DynamicImage::new(out_w, out_h, region.color());
    let mut resizer = Resizer::new();
    resizer
        .resize(&region, &mut surface, None)
        .map_err(|err| CropError::Render(format!("resample failed: {err}")))?;

    debug!(
        "rendered crop {}x{} -> {}x{} ({})",
        src_w,
        src_h,
        out_w,
        out_h,
        format.name()
    );

    let bytes = encode_surface(&surface, format, quality)?;
    Ok(RenderedAsset {
        bytes,
        mime: format.mime_type().to_string(),
        width: out_w,
        height: out_h,
        filename: sanitize(source_name),
        last_modified: SystemTime::now(),
    })
}

fn encode_surface(
    surface: &DynamicImage,
    format: EncodeFormat,
    quality: u8,
) -> Result<Vec<u8>, CropError> {
    let mut bytes = Vec::new();
    match format {
        EncodeFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), quality);
            surface
                .to_rgb8()
                .write_with_encoder(encoder)
                .map_err(|err| CropError::Render(format!("jpeg encode failed: {err}")))?;
        }
        EncodeFormat::Webp => {
            let rgba = surface.to_rgba8();
            let encoder = webp::Encoder::new(
                rgba.as_raw(),
                webp::PixelLayout::Rgba,
                surface.width(),
                surface.height(),
            );
            bytes = encoder.encode(quality as f32).as_ref().to_owned();
        }
        EncodeFormat::Png | EncodeFormat::Gif | EncodeFormat::Bmp => {
            surface
                .write_to(&mut Cursor::new(&mut bytes), format.image_format())
                .map_err(|err| {
                    CropError::Render(format!("{} encode failed: {err}", format.name()))
                })?;
        }
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop::geometry::initial_rect;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(image::RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        }))
    }

    #[test]
    fn scale_four_rect_renders_at_natural_resolution() {
        // natural 2000, displayed 500: a 100px displayed rect comes out 400px
        let pixels = gradient(2000, 1000);
        let viewport = Viewport::new(500.0, 250.0);
        let rect = CropRect { x: 25.0, y: 25.0, width: 100.0, height: 50.0 };
        let asset = render_crop(&pixels, rect, viewport, "photo.png", "image/png", 95).unwrap();
        assert_eq!((asset.width, asset.height), (400, 200));

        let decoded = image::load_from_memory(&asset.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (400, 200));
    }

    #[test]
    fn device_pixel_ratio_scales_the_surface() {
        let pixels = gradient(2000, 1000);
        let viewport = Viewport::new(500.0, 250.0).with_device_pixel_ratio(2.0);
        let rect = CropRect { x: 0.0, y: 0.0, width: 100.0, height: 50.0 };
        let asset = render_crop(&pixels, rect, viewport, "photo.png", "image/png", 95).unwrap();
        assert_eq!((asset.width, asset.height), (800, 400));
    }

    #[test]
    fn banner_scenario_comes_out_at_twice_displayed_size() {
        // 1200x800 natural shown at 600x400, ratio 1.78, untouched initial
        // crop of 480 x 480/1.78: both axes scale by 2
        let pixels = gradient(1200, 800);
        let viewport = Viewport::new(600.0, 400.0);
        let rect = initial_rect(600.0, 400.0, 1.78, 30.0);
        let asset = render_crop(&pixels, rect, viewport, "banner.png", "image/png", 95).unwrap();
        assert_eq!((asset.width, asset.height), (960, 539));
        let ratio = asset.width as f64 / asset.height as f64;
        assert!((ratio - 1.78).abs() < 0.01);
    }

    #[test]
    fn zero_size_rect_fails_render() {
        let pixels = gradient(100, 100);
        let viewport = Viewport::new(100.0, 100.0);
        let rect = CropRect { x: 0.0, y: 0.0, width: 0.0, height: 0.0 };
        let err = render_crop(&pixels, rect, viewport, "p.png", "image/png", 95).unwrap_err();
        assert!(matches!(err, CropError::Render(_)));
    }

    #[test]
    fn unencodable_mime_fails_render() {
        let pixels = gradient(100, 100);
        let viewport = Viewport::new(100.0, 100.0);
        let rect = CropRect { x: 0.0, y: 0.0, width: 50.0, height: 50.0 };
        let err = render_crop(&pixels, rect, viewport, "p.tiff", "image/tiff", 95).unwrap_err();
        assert!(matches!(err, CropError::Render(_)));
    }

    #[test]
    fn jpeg_source_encodes_back_to_jpeg_with_sanitized_name() {
        let pixels = gradient(200, 200);
        let viewport = Viewport::new(100.0, 100.0);
        let rect = CropRect { x: 10.0, y: 10.0, width: 60.0, height: 60.0 };
        let asset =
            render_crop(&pixels, rect, viewport, "a photo?.jpg", "image/jpeg", 95).unwrap();
        assert_eq!(asset.mime, "image/jpeg");
        assert_eq!(asset.filename, "a photo.jpg");
        assert_eq!(
            crate::image_types::sniff_format(&asset.bytes),
            Some(image::ImageFormat::Jpeg)
        );
    }
}
