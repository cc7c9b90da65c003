use crate::config::Config;
use crate::crop::engine::{CropEngine, CropPhase};
use crate::crop::render::RenderedAsset;
use crate::crop::RatioPreset;
use crate::errors::{ApiError, CropError, FieldError, SelectError, SessionError};
use crate::records::{Event, EventDraft, Member, MemberDraft};
use crate::selector::{FileCandidate, ImagePreview, ImageSelector};
use crate::site_api::SiteApi;
use crate::upload::UploadCoordinator;
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::instrument;

/// A form record the modal session can submit once its image URL is
/// resolved.
#[async_trait]
pub trait FormDraft: Clone + Send + Sync {
    type Record: Send;

    fn validate(&self) -> Result<(), Vec<FieldError>>;
    /// Existing image URL carried by the draft (empty when there is none).
    fn image_url(&self) -> &str;
    fn set_image_url(&mut self, url: String);
    /// Create or (with an id) update the record through the site api.
    async fn submit(
        &self,
        site: &(dyn SiteApi + Send + Sync),
        editing: Option<i64>,
    ) -> Result<Self::Record, ApiError>;
}

#[async_trait]
impl FormDraft for EventDraft {
    type Record = Event;

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        EventDraft::validate(self)
    }

    fn image_url(&self) -> &str {
        &self.image
    }

    fn set_image_url(&mut self, url: String) {
        self.image = url;
    }

    async fn submit(
        &self,
        site: &(dyn SiteApi + Send + Sync),
        editing: Option<i64>,
    ) -> Result<Event, ApiError> {
        match editing {
            Some(id) => site.update_event(id, self).await,
            None => site.create_event(self).await,
        }
    }
}

#[async_trait]
impl FormDraft for MemberDraft {
    type Record = Member;

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        MemberDraft::validate(self)
    }

    fn image_url(&self) -> &str {
        &self.picture
    }

    fn set_image_url(&mut self, url: String) {
        self.picture = url;
    }

    async fn submit(
        &self,
        site: &(dyn SiteApi + Send + Sync),
        editing: Option<i64>,
    ) -> Result<Member, ApiError> {
        match editing {
            Some(id) => site.update_member(id, self).await,
            None => site.create_member(self).await,
        }
    }
}

/// Identity of one open modal session. Async results are applied only while
/// the ticket is still current; closing the session invalidates every ticket
/// it issued.
#[derive(Clone)]
pub struct SessionTicket {
    epoch: Arc<AtomicU64>,
    issued: u64,
}

impl SessionTicket {
    pub fn is_current(&self) -> bool {
        self.epoch.load(Ordering::SeqCst) == self.issued
    }
}

/// One open create/edit modal: owns the select -> crop -> upload -> submit
/// chain and discards all of it on close.
pub struct FormSession {
    epoch: Arc<AtomicU64>,
    selector: ImageSelector,
    cropper: CropEngine,
    uploader: UploadCoordinator,
    site: Arc<dyn SiteApi + Send + Sync>,
    cropped: Option<RenderedAsset>,
}

impl FormSession {
    pub fn new(config: &Config, preset: RatioPreset) -> Self {
        FormSession {
            epoch: Arc::new(AtomicU64::new(0)),
            selector: ImageSelector::new(config.max_upload_bytes),
            cropper: CropEngine::new(preset.ratio(), config.min_crop_width, config.encode_quality),
            uploader: UploadCoordinator::new(config.assets.clone()),
            site: config.site.clone(),
            cropped: None,
        }
    }

    pub fn ticket(&self) -> SessionTicket {
        SessionTicket {
            epoch: self.epoch.clone(),
            issued: self.epoch.load(Ordering::SeqCst),
        }
    }

    /// Validate and take a newly picked file. A new selection invalidates the
    /// previous one together with any crop derived from it.
    pub fn select_file(&mut self, candidate: FileCandidate) -> Result<(), SelectError> {
        self.selector.select_file(candidate)?;
        self.cropper.cancel();
        self.cropped = None;
        Ok(())
    }

    /// Decode the current selection and hand it to the crop engine. Returns
    /// the preview so the host can display it while the user adjusts.
    pub async fn open_crop(&mut self) -> Result<ImagePreview, SessionError> {
        let source = self
            .selector
            .current()
            .cloned()
            .ok_or(SessionError::NoImageSelected)?;
        let preview = source.decode_preview().await?;
        self.cropper.open(source, preview.clone());
        Ok(preview)
    }

    /// The interactive crop surface for viewport reports and proposals.
    pub fn cropper(&mut self) -> &mut CropEngine {
        &mut self.cropper
    }

    pub fn crop_phase(&self) -> CropPhase {
        self.cropper.phase()
    }

    /// Render the adjusted crop and keep it for the next submission.
    pub fn confirm_crop(&mut self) -> Result<(), CropError> {
        self.cropped = Some(self.cropper.confirm()?);
        Ok(())
    }

    pub fn cancel_crop(&mut self) {
        self.cropper.cancel();
    }

    pub fn cropped(&self) -> Option<&RenderedAsset> {
        self.cropped.as_ref()
    }

    pub fn is_uploading(&self) -> bool {
        self.uploader.is_uploading()
    }

    /// Validate the draft and snapshot everything one submission needs.
    ///
    /// At most one upload may be in flight per session; overlapping attempts
    /// are rejected here rather than queued.
    pub fn prepare<D: FormDraft>(
        &self,
        editing: Option<i64>,
        draft: &D,
    ) -> Result<PendingSubmission<D>, SessionError> {
        if let Err(errors) = draft.validate() {
            return Err(SessionError::Validation(errors));
        }
        if self.uploader.is_uploading() {
            return Err(SessionError::UploadInFlight);
        }
        Ok(PendingSubmission {
            ticket: self.ticket(),
            uploader: self.uploader.clone(),
            site: self.site.clone(),
            asset: self.cropped.clone(),
            editing,
            draft: draft.clone(),
        })
    }

    /// Close the modal. Everything in flight becomes stale and every piece of
    /// pipeline state is discarded.
    pub fn close(&mut self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.selector.clear();
        self.cropper.cancel();
        self.cropped = None;
    }
}

/// Snapshot of one submission, detached from the session so the modal can
/// close while it is in flight.
pub struct PendingSubmission<D: FormDraft> {
    ticket: SessionTicket,
    uploader: UploadCoordinator,
    site: Arc<dyn SiteApi + Send + Sync>,
    asset: Option<RenderedAsset>,
    editing: Option<i64>,
    draft: D,
}

impl<D: FormDraft> std::fmt::Debug for PendingSubmission<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingSubmission")
            .field("editing", &self.editing)
            .finish_non_exhaustive()
    }
}

impl<D: FormDraft> PendingSubmission<D> {
    /// Resolve the image URL, embed it and submit the record.
    ///
    /// The session identity is checked after every suspend point; a result
    /// that arrives after the owning session closed is discarded as stale
    /// instead of being applied.
    #[instrument(skip_all)]
    pub async fn send(self) -> Result<D::Record, SessionError> {
        let existing = self.draft.image_url().to_string();
        let url = self
            .uploader
            .upload(self.asset.as_ref(), Some(&existing))
            .await?;
        if !self.ticket.is_current() {
            debug!("discarding resolved image url for a closed session");
            return Err(SessionError::Stale);
        }

        let mut draft = self.draft;
        draft.set_image_url(url);
        let record = draft.submit(self.site.as_ref(), self.editing).await?;
        if !self.ticket.is_current() {
            debug!("discarding submitted record for a closed session");
            return Err(SessionError::Stale);
        }
        Ok(record)
    }
}
