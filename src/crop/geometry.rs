//! Rectangle math in displayed-image space, plus the mapping back to natural
//! pixels. All inputs and outputs here are plain numbers so the invariants
//! can be checked without an image in hand.

use serde::{Deserialize, Serialize};

/// Tolerance for aspect-ratio equality after floating arithmetic.
pub const RATIO_TOLERANCE: f64 = 1e-6;

/// Crop selection in the coordinate space of the displayed (possibly
/// scaled-down) image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn ratio(&self) -> f64 {
        self.width / self.height
    }

    pub fn contained_in(&self, disp_w: f64, disp_h: f64) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= disp_w + RATIO_TOLERANCE
            && self.y + self.height <= disp_h + RATIO_TOLERANCE
    }
}

/// On-screen geometry of the image element the user manipulates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Viewport {
            width,
            height,
            device_pixel_ratio: 1.0,
        }
    }

    pub fn with_device_pixel_ratio(mut self, ratio: f64) -> Self {
        self.device_pixel_ratio = ratio;
        self
    }
}

/// A user-driven change proposal. Fields left `None` keep their current
/// value. When both dimensions appear, width wins and height is recomputed
/// from the fixed ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RectChange {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl RectChange {
    pub fn moved_to(x: f64, y: f64) -> Self {
        RectChange {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn resized_to(width: f64) -> Self {
        RectChange {
            width: Some(width),
            ..Default::default()
        }
    }
}

/// Initial selection: 80% of the limiting dimension at the target ratio,
/// centered on the displayed image.
pub fn initial_rect(disp_w: f64, disp_h: f64, ratio: f64, min_width: f64) -> CropRect {
    let (width, height) = if disp_w / disp_h > ratio {
        // image wider than the target ratio, height limits
        let height = disp_h * 0.8;
        (height * ratio, height)
    } else {
        let width = disp_w * 0.8;
        (width, width / ratio)
    };

    let width = clamp_width(width, disp_w, disp_h, ratio, min_width);
    let height = width / ratio;

    CropRect {
        x: ((disp_w - width) / 2.0).max(0.0),
        y: ((disp_h - height) / 2.0).max(0.0),
        width,
        height,
    }
}

/// Re-clamp a change proposal against the viewport and the fixed ratio.
///
/// Order matters: the driving dimension is resolved first (width before
/// height), clamped so the rectangle can still fit, then the position is
/// clamped into what remains.
pub fn apply_change(
    current: CropRect,
    change: RectChange,
    disp_w: f64,
    disp_h: f64,
    ratio: f64,
    min_width: f64,
) -> CropRect {
    let proposed_width = match (change.width, change.height) {
        (Some(width), _) => width,
        (None, Some(height)) => height * ratio,
        (None, None) => current.width,
    };

    let width = clamp_width(proposed_width, disp_w, disp_h, ratio, min_width);
    let height = width / ratio;
    let x = change.x.unwrap_or(current.x).clamp(0.0, (disp_w - width).max(0.0));
    let y = change.y.unwrap_or(current.y).clamp(0.0, (disp_h - height).max(0.0));

    CropRect { x, y, width, height }
}

// The floor keeps the selection grabbable; the viewport bound wins over the
// floor when the displayed image itself is smaller than the floor.
fn clamp_width(width: f64, disp_w: f64, disp_h: f64, ratio: f64, min_width: f64) -> f64 {
    let max_width = disp_w.min(disp_h * ratio);
    width.max(min_width).min(max_width)
}

/// Per-axis factor between natural pixels and displayed pixels.
#[derive(Debug, Clone, Copy)]
pub struct NaturalScale {
    pub x: f64,
    pub y: f64,
}

impl NaturalScale {
    pub fn between(natural_w: u32, natural_h: u32, disp_w: f64, disp_h: f64) -> NaturalScale {
        NaturalScale {
            x: natural_w as f64 / disp_w,
            y: natural_h as f64 / disp_h,
        }
    }
}

/// Map a displayed-space rectangle into natural pixel space.
pub fn to_natural(rect: CropRect, scale: NaturalScale) -> CropRect {
    CropRect {
        x: rect.x * scale.x,
        y: rect.y * scale.y,
        width: rect.width * scale.x,
        height: rect.height * scale.y,
    }
}

/// Output raster dimensions for a natural-space rectangle at the given device
/// pixel ratio.
pub fn surface_size(natural: CropRect, device_pixel_ratio: f64) -> (u32, u32) {
    (
        (natural.width * device_pixel_ratio).floor() as u32,
        (natural.height * device_pixel_ratio).floor() as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariants(rect: CropRect, disp_w: f64, disp_h: f64, ratio: f64) {
        assert!(
            (rect.ratio() - ratio).abs() < RATIO_TOLERANCE * ratio.max(1.0),
            "ratio drifted: {} vs {}",
            rect.ratio(),
            ratio
        );
        assert!(rect.contained_in(disp_w, disp_h), "out of bounds: {rect:?}");
    }

    #[test]
    fn initial_rect_for_wide_image() {
        // wider than 16:9, height limits the selection
        let rect = initial_rect(1000.0, 300.0, 16.0 / 9.0, 30.0);
        assert!((rect.height - 240.0).abs() < 1e-9);
        assert!((rect.width - 240.0 * 16.0 / 9.0).abs() < 1e-9);
        assert_invariants(rect, 1000.0, 300.0, 16.0 / 9.0);
    }

    #[test]
    fn initial_rect_for_tall_image() {
        // 600x400 shown is narrower than 1.78, width limits the selection
        let rect = initial_rect(600.0, 400.0, 1.78, 30.0);
        assert!((rect.width - 480.0).abs() < 1e-9);
        assert!((rect.height - 480.0 / 1.78).abs() < 1e-9);
        assert!((rect.x - 60.0).abs() < 1e-9);
        assert!((rect.y - (400.0 - 480.0 / 1.78) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn initial_rect_uses_height_when_image_is_wider_than_the_ratio() {
        let rect = initial_rect(800.0, 400.0, 1.78, 30.0);
        assert!((rect.height - 320.0).abs() < 1e-9);
        assert!((rect.width - 569.6).abs() < 1e-9);
        assert!((rect.x - 115.2).abs() < 1e-9);
        assert!((rect.y - 40.0).abs() < 1e-9);
    }

    #[test]
    fn initial_rect_is_centered_and_in_bounds_across_viewports() {
        let ratios = [0.25, 1.0, 1.78, 3.5];
        let dims = [(50.0, 400.0), (400.0, 50.0), (333.0, 517.0), (1920.0, 1080.0)];
        for ratio in ratios {
            for (w, h) in dims {
                let rect = initial_rect(w, h, ratio, 30.0);
                assert_invariants(rect, w, h, ratio);
            }
        }
    }

    #[test]
    fn min_width_floor_applies_but_bounds_win() {
        // floor kicks in
        let rect = initial_rect(200.0, 200.0, 1.0, 180.0);
        assert!((rect.width - 180.0).abs() < 1e-9);
        assert_invariants(rect, 200.0, 200.0, 1.0);

        // viewport smaller than the floor: bounds win
        let rect = initial_rect(20.0, 20.0, 1.0, 30.0);
        assert!((rect.width - 20.0).abs() < 1e-9);
        assert_invariants(rect, 20.0, 20.0, 1.0);
    }

    #[test]
    fn width_takes_precedence_over_height_in_one_proposal() {
        let ratio = 2.0;
        let current = initial_rect(800.0, 400.0, ratio, 30.0);
        let next = apply_change(
            current,
            RectChange {
                width: Some(300.0),
                height: Some(10.0),
                ..Default::default()
            },
            800.0,
            400.0,
            ratio,
            30.0,
        );
        assert!((next.width - 300.0).abs() < 1e-9);
        assert!((next.height - 150.0).abs() < 1e-9);
    }

    #[test]
    fn height_only_proposal_drives_width() {
        let ratio = 2.0;
        let current = initial_rect(800.0, 400.0, ratio, 30.0);
        let next = apply_change(
            current,
            RectChange {
                height: Some(100.0),
                ..Default::default()
            },
            800.0,
            400.0,
            ratio,
            30.0,
        );
        assert!((next.width - 200.0).abs() < 1e-9);
        assert!((next.height - 100.0).abs() < 1e-9);
    }

    #[test]
    fn invariants_hold_across_arbitrary_proposal_sequences() {
        let (disp_w, disp_h, ratio, min_width) = (640.0, 480.0, 1.78, 30.0);
        let mut rect = initial_rect(disp_w, disp_h, ratio, min_width);

        // includes out-of-bounds moves, oversize and undersize resizes
        let proposals = [
            RectChange::moved_to(-50.0, -50.0),
            RectChange::resized_to(10_000.0),
            RectChange::moved_to(600.0, 450.0),
            RectChange::resized_to(1.0),
            RectChange { x: Some(9999.0), y: None, width: None, height: Some(2.0) },
            RectChange::moved_to(100.0, 100.0),
            RectChange { x: None, y: Some(-3.0), width: Some(320.0), height: None },
            RectChange::default(),
        ];
        for change in proposals {
            rect = apply_change(rect, change, disp_w, disp_h, ratio, min_width);
            assert!(
                (rect.ratio() - ratio).abs() < RATIO_TOLERANCE * ratio,
                "ratio broken after {change:?}: {rect:?}"
            );
            assert!(rect.contained_in(disp_w, disp_h), "bounds broken after {change:?}: {rect:?}");
            assert!(rect.width >= 30.0 - RATIO_TOLERANCE || rect.width >= disp_w.min(disp_h * ratio) - RATIO_TOLERANCE);
        }
    }

    #[test]
    fn natural_scale_maps_displayed_rect_to_natural_pixels() {
        let scale = NaturalScale::between(2000, 1000, 500.0, 250.0);
        assert!((scale.x - 4.0).abs() < 1e-9);
        assert!((scale.y - 4.0).abs() < 1e-9);

        let rect = CropRect { x: 10.0, y: 20.0, width: 100.0, height: 50.0 };
        let natural = to_natural(rect, scale);
        assert!((natural.x - 40.0).abs() < 1e-9);
        assert!((natural.width - 400.0).abs() < 1e-9);

        assert_eq!(surface_size(natural, 1.0), (400, 200));
        assert_eq!(surface_size(natural, 2.0), (800, 400));
    }
}
