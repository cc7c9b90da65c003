use crate::crop::geometry::{CropRect, RectChange, Viewport, apply_change, initial_rect};
use crate::crop::render::{RenderedAsset, render_crop};
use crate::errors::CropError;
use crate::selector::{ImagePreview, SourceImage};
use log::{debug, warn};

/// Observable lifecycle phase of the engine.
///
/// Confirm and cancel are transitions back to `Idle`, not resting states: a
/// later re-open always runs a fresh load so no selection rectangle survives
/// across displays of the same image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropPhase {
    Idle,
    ImageLoading,
    Adjusting,
}

enum State {
    Idle,
    /// Holds the decoded selection while waiting for the host to report how
    /// large the image is actually rendered.
    ImageLoading {
        source: SourceImage,
        preview: ImagePreview,
    },
    Adjusting {
        source: SourceImage,
        preview: ImagePreview,
        viewport: Viewport,
        rect: CropRect,
    },
}

/// Interactive crop session over one decoded image.
pub struct CropEngine {
    ratio: f64,
    min_width: f64,
    quality: u8,
    state: State,
}

impl CropEngine {
    pub fn new(ratio: f64, min_width: f64, quality: u8) -> Self {
        CropEngine {
            ratio,
            min_width,
            quality,
            state: State::Idle,
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn phase(&self) -> CropPhase {
        match self.state {
            State::Idle => CropPhase::Idle,
            State::ImageLoading { .. } => CropPhase::ImageLoading,
            State::Adjusting { .. } => CropPhase::Adjusting,
        }
    }

    /// Current selection, once the image has loaded.
    pub fn rect(&self) -> Option<CropRect> {
        match &self.state {
            State::Adjusting { rect, .. } => Some(*rect),
            _ => None,
        }
    }

    /// Start a crop over a decoded selection. Whatever was in progress is
    /// discarded; the engine waits for the rendered dimensions next.
    pub fn open(&mut self, source: SourceImage, preview: ImagePreview) {
        debug!(
            "crop open: {} ({}x{} natural)",
            source.name, preview.natural_width, preview.natural_height
        );
        self.state = State::ImageLoading { source, preview };
    }

    /// The host reports the rendered size of the image element. Computes the
    /// initial centered selection and enters the adjusting phase.
    pub fn viewport_ready(&mut self, viewport: Viewport) -> Result<CropRect, CropError> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::ImageLoading { source, preview } => {
                let rect = initial_rect(viewport.width, viewport.height, self.ratio, self.min_width);
                debug!("crop initial rect {rect:?} in {}x{}", viewport.width, viewport.height);
                self.state = State::Adjusting {
                    source,
                    preview,
                    viewport,
                    rect,
                };
                Ok(rect)
            }
            other => {
                warn!("viewport report with no image loading");
                self.state = other;
                Err(CropError::NotActive)
            }
        }
    }

    /// Apply one user-driven change proposal, re-clamped to the viewport and
    /// the fixed ratio.
    pub fn propose(&mut self, change: RectChange) -> Result<CropRect, CropError> {
        match &mut self.state {
            State::Adjusting { viewport, rect, .. } => {
                *rect = apply_change(*rect, change, viewport.width, viewport.height, self.ratio, self.min_width);
                Ok(*rect)
            }
            _ => Err(CropError::NotActive),
        }
    }

    /// Render the current selection at natural resolution.
    ///
    /// On success the engine settles back to idle. A render failure keeps the
    /// adjusting phase so the user can retry or cancel.
    pub fn confirm(&mut self) -> Result<RenderedAsset, CropError> {
        let asset = match &self.state {
            State::Adjusting {
                source,
                preview,
                viewport,
                rect,
            } => render_crop(
                &preview.pixels,
                *rect,
                *viewport,
                &source.name,
                &source.mime,
                self.quality,
            )?,
            _ => return Err(CropError::NotActive),
        };
        self.state = State::Idle;
        Ok(asset)
    }

    /// Discard all in-flight state without producing anything.
    pub fn cancel(&mut self) {
        self.state = State::Idle;
    }
}
