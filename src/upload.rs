/// Pushing finalized images to the remote asset store
use crate::crop::render::RenderedAsset;
use crate::errors::UploadError;
use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::instrument;

/// Read side of the host's credential store. Token issuance and persistence
/// live outside this crate.
pub trait TokenSource: Send + Sync {
    /// Current bearer token, if the admin is signed in.
    fn token(&self) -> Option<String>;
}

/// Token kept in process memory, set by the host after login.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        MemoryTokenStore::default()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.token.write().unwrap() = Some(token.into());
    }

    pub fn clear(&self) {
        *self.token.write().unwrap() = None;
    }
}

impl TokenSource for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.token.read().unwrap().clone()
    }
}

#[async_trait]
pub trait AssetStore {
    /// Push one image and return the stable URL the record should embed.
    async fn store_image(
        &self,
        bytes: Vec<u8>,
        filename: String,
        mime: String,
    ) -> Result<String, UploadError>;
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(rename = "imageUrl")]
    image_url: String,
}

/// Asset store backed by the site's upload endpoint.
pub struct HttpAssetStore {
    base_url: String,
    client: Client,
    tokens: Arc<dyn TokenSource>,
}

impl HttpAssetStore {
    pub fn new(base_url: String, timeout: Option<u32>, tokens: Arc<dyn TokenSource>) -> Self {
        let timeout = Duration::from_secs(timeout.unwrap_or(30) as u64);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout / 3)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("Failed to create upload client");

        HttpAssetStore {
            base_url: base_url.trim_end_matches("/").into(),
            client,
            tokens,
        }
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    async fn store_image(
        &self,
        bytes: Vec<u8>,
        filename: String,
        mime: String,
    ) -> Result<String, UploadError> {
        let part = Part::bytes(bytes)
            .file_name(filename)
            .mime_str(&mime)
            .map_err(|err| UploadError::new(format!("invalid mime type {mime}: {err}"), None))?;
        let form = Form::new().part("image", part);

        let mut request = self
            .client
            .post(format!("{}/api/upload/image", self.base_url))
            .multipart(form);
        if let Some(token) = self.tokens.token() {
            request = request.bearer_auth(token);
        }

        let resp = match request.send().await {
            Ok(resp) => resp,
            Err(err) => {
                debug!("upload request failed: {}", err);
                return Err(UploadError::new("Failed to reach the upload endpoint", None));
            }
        };

        let status = resp.status();
        if status != StatusCode::OK {
            debug!(
                "upload endpoint returned status={},resp={}",
                status,
                resp.text()
                    .await
                    .unwrap_or("unable to get response".into())
                    .chars()
                    .take(100)
                    .collect::<String>()
            );
            return Err(UploadError::new(
                "Upload endpoint rejected the image",
                Some(status.as_u16()),
            ));
        }

        let body: UploadResponse = resp
            .json()
            .await
            .map_err(|err| UploadError::new(format!("unexpected upload response: {err}"), None))?;
        Ok(body.image_url)
    }
}

/// Resolves the image URL for one form submission.
///
/// The coordinator itself does not serialize overlapping calls; the owning
/// session rejects a second submission while one is in flight.
#[derive(Clone)]
pub struct UploadCoordinator {
    store: Arc<dyn AssetStore + Send + Sync>,
    uploading: Arc<AtomicBool>,
}

impl UploadCoordinator {
    pub fn new(store: Arc<dyn AssetStore + Send + Sync>) -> Self {
        UploadCoordinator {
            store,
            uploading: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True while a network upload is in flight, so the host can disable
    /// conflicting actions.
    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::SeqCst)
    }

    /// Resolve the URL to embed in the record.
    ///
    /// No new asset means no network: an existing URL is kept as is (editing
    /// without changing the image) and no URL at all resolves to the empty
    /// string. With an asset, one upload is attempted and any failure is
    /// surfaced without retry.
    #[instrument(skip(self, asset), fields(has_asset = asset.is_some()))]
    pub async fn upload(
        &self,
        asset: Option<&RenderedAsset>,
        existing_url: Option<&str>,
    ) -> Result<String, UploadError> {
        let Some(asset) = asset else {
            return Ok(existing_url.unwrap_or("").to_string());
        };

        self.uploading.store(true, Ordering::SeqCst);
        let _clear = ClearFlag(&self.uploading);
        debug!("uploading {} ({} bytes)", asset.filename, asset.bytes.len());
        self.store
            .store_image(asset.bytes.clone(), asset.filename.clone(), asset.mime.clone())
            .await
    }
}

// Clears on every exit path, error or not.
struct ClearFlag<'a>(&'a AtomicBool);

impl Drop for ClearFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
