use crate::crop::RatioPreset;
use crate::site_api::{HttpSiteApi, SiteApi};
use crate::upload::{AssetStore, HttpAssetStore, MemoryTokenStore};
use envconfig::Envconfig;
use log::info;
use std::sync::Arc;

#[derive(Envconfig)]
struct EnvConfig {
    /// Base URL of the site backend, upload endpoint included
    #[envconfig(from = "API_URL", default = "http://localhost:8080")]
    pub api_url: String,

    /// Timeout (in seconds) applied to upload and api calls
    #[envconfig(from = "UPLOAD_TIMEOUT", default = "30")]
    pub upload_timeout: u32,

    // ------------------
    // Selection and crop settings
    /// Max accepted file size in bytes (10 MiB)
    #[envconfig(from = "MAX_UPLOAD_SIZE", default = "10485760")]
    pub max_upload_size: u64,
    /// Smallest crop width in displayed pixels the user can reach
    #[envconfig(from = "MIN_CROP_WIDTH", default = "30")]
    pub min_crop_width: f64,
    /// Lossy encode quality (percent) for rendered crops
    #[envconfig(from = "ENCODE_QUALITY", default = "95")]
    pub encode_quality: u8,
    /// Ratio preset used when a form does not pick one itself
    #[envconfig(from = "DEFAULT_CROP_PRESET", default = "Banner")]
    pub default_crop_preset: RatioPreset,
}

/// Wired object graph behind the admin forms.
pub struct Config {
    pub api_url: String,
    pub max_upload_bytes: u64,
    pub min_crop_width: f64,
    pub encode_quality: u8,
    pub default_preset: RatioPreset,
    /// Set by the host after login; mutations go out with this token.
    pub tokens: Arc<MemoryTokenStore>,
    pub assets: Arc<dyn AssetStore + Send + Sync>,
    pub site: Arc<dyn SiteApi + Send + Sync>,
}

impl Config {
    pub fn from_env() -> Config {
        let env_conf = EnvConfig::init_from_env().unwrap();

        let tokens = Arc::new(MemoryTokenStore::new());
        info!("Using site api at {}", env_conf.api_url);
        let assets = Arc::new(HttpAssetStore::new(
            env_conf.api_url.clone(),
            Some(env_conf.upload_timeout),
            tokens.clone(),
        ));
        let site = Arc::new(HttpSiteApi::new(
            env_conf.api_url.clone(),
            Some(env_conf.upload_timeout),
            tokens.clone(),
        ));

        Config {
            api_url: env_conf.api_url,
            max_upload_bytes: env_conf.max_upload_size,
            min_crop_width: env_conf.min_crop_width,
            encode_quality: env_conf.encode_quality,
            default_preset: env_conf.default_crop_preset,
            tokens,
            assets,
            site,
        }
    }
}
