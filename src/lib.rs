//! Image pipeline behind the student-org admin forms: validate a picked
//! file, crop it interactively at a fixed ratio, re-render the crop at
//! natural resolution and upload it, then submit the event or member record
//! with the resolved URL embedded.

pub mod config;
pub mod crop;
pub mod errors;
pub mod image_types;
pub mod records;
pub mod selector;
pub mod session;
pub mod site_api;
pub mod upload;

pub use config::Config;
pub use crop::{CropEngine, CropPhase, CropRect, RatioPreset, RectChange, RenderedAsset, Viewport};
pub use errors::{ApiError, CropError, FieldError, SelectError, SessionError, UploadError};
pub use records::{Event, EventDraft, Member, MemberDraft};
pub use selector::{FileCandidate, ImagePreview, ImageSelector, SourceImage};
pub use session::{FormDraft, FormSession, PendingSubmission, SessionTicket};
pub use site_api::{HttpSiteApi, SiteApi};
pub use upload::{AssetStore, HttpAssetStore, MemoryTokenStore, TokenSource, UploadCoordinator};
