use thiserror::Error;

/// Selection-time failures. Both are recoverable by picking another file.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SelectError {
    #[error("not an image: {0}")]
    InvalidType(String),
    #[error("file too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: u64, limit: u64 },
}

/// Failures inside the crop engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CropError {
    /// The raster surface could not be produced. The engine stays in the
    /// adjusting phase so the user can retry or cancel.
    #[error("crop render failed: {0}")]
    Render(String),
    /// The engine has no crop in progress for the requested operation.
    #[error("no crop in progress")]
    NotActive,
}

/// Error while uploading an asset to the remote store
#[derive(Debug, Error, Clone, PartialEq)]
#[error("image upload failed: {detail}")]
pub struct UploadError {
    pub detail: String,
    pub http_error_code: Option<u16>,
}

impl UploadError {
    pub fn new(detail: impl Into<String>, http_error_code: Option<u16>) -> Self {
        UploadError {
            detail: detail.into(),
            http_error_code,
        }
    }
}

/// Error from the site CRUD api
#[derive(Debug, Error, Clone, PartialEq)]
#[error("request failed: {detail}")]
pub struct ApiError {
    pub detail: String,
    pub http_error_code: Option<u16>,
}

impl ApiError {
    pub fn new(detail: impl Into<String>, http_error_code: Option<u16>) -> Self {
        ApiError {
            detail: detail.into(),
            http_error_code,
        }
    }
}

/// A required form field that failed boundary validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Failures surfaced at the modal-session boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("no image selected")]
    NoImageSelected,
    #[error("an upload is already in progress")]
    UploadInFlight,
    /// The owning session was closed while the result was in flight. The
    /// result must be discarded, not applied.
    #[error("session is no longer current")]
    Stale,
    #[error("form validation failed ({} fields)", .0.len())]
    Validation(Vec<FieldError>),
    #[error(transparent)]
    Select(#[from] SelectError),
    #[error(transparent)]
    Crop(#[from] CropError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Api(#[from] ApiError),
}
