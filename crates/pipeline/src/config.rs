use std::time::Duration;

use wardrobe_providers::PollConfig;
use wardrobe_providers::{fal, gemini, replicate, wavespeed};

use crate::fanout::DEFAULT_MAX_CONCURRENCY;
use crate::stage::RetryPolicy;
use crate::stages::EditBackend;

/// Replicate-hosted multimodal chat model used for every vision call.
pub const DEFAULT_VISION_MODEL: &str =
    "2c0a6a34916017ceafaaf5fdf63f9370cf9491866a9611f37d86138c8ef53fc6";

pub const DEFAULT_GENERATE_MODEL: &str = "gemini-3-pro-image-preview";
pub const DEFAULT_WAVESPEED_EDIT_MODEL: &str = "bytedance/seedream-v4/edit";
pub const DEFAULT_FAL_EDIT_MODEL: &str = "fal-ai/bytedance/seedream/v4/edit";

/// Provider credentials, models and execution limits for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub replicate_api_token: String,
    pub replicate_base_url: String,
    pub vision_model: String,

    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub generate_model: String,
    pub generate_aspect_ratio: String,
    pub generate_image_size: String,

    pub enhance_backend: EditBackend,
    pub wavespeed_api_key: String,
    pub wavespeed_base_url: String,
    pub fal_api_key: String,
    pub fal_base_url: String,
    /// Edit model for the selected enhance backend.
    pub enhance_model: String,

    pub poll: PollConfig,
    pub retry: RetryPolicy,
    pub fan_out_max_concurrency: usize,
    /// Timeout for provider API calls.
    pub http_timeout: Duration,
    /// Timeout for plain image downloads.
    pub image_download_timeout: Duration,
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                      |
    /// |-------------------------------|------------------------------|
    /// | `REPLICATE_API_TOKEN`         | (empty)                      |
    /// | `REPLICATE_BASE_URL`          | `https://api.replicate.com/v1` |
    /// | `VISION_MODEL`                | GPT-4o-mini version hash     |
    /// | `GOOGLE_AI_STUDIO_API_KEY`    | (empty)                      |
    /// | `GEMINI_BASE_URL`             | Generative Language v1beta   |
    /// | `GENERATE_MODEL`              | `gemini-3-pro-image-preview` |
    /// | `GENERATE_ASPECT_RATIO`       | `1:1`                        |
    /// | `GENERATE_IMAGE_SIZE`         | `4K`                         |
    /// | `ENHANCE_BACKEND`             | `wavespeed`                  |
    /// | `WAVESPEED_API_KEY`           | (empty)                      |
    /// | `WAVESPEED_BASE_URL`          | `https://api.wavespeed.ai/api/v3` |
    /// | `FAL_API_KEY`                 | (empty)                      |
    /// | `FAL_BASE_URL`                | `https://queue.fal.run`      |
    /// | `ENHANCE_MODEL`               | per backend                  |
    /// | `PROVIDER_POLL_INTERVAL_MS`   | `2000`                       |
    /// | `PROVIDER_MAX_WAIT_SECS`      | `300`                        |
    /// | `STAGE_MAX_ATTEMPTS`          | `3`                          |
    /// | `FAN_OUT_MAX_CONCURRENCY`     | `10`                         |
    /// | `HTTP_TIMEOUT_SECS`           | `600`                        |
    /// | `IMAGE_DOWNLOAD_TIMEOUT_SECS` | `60`                         |
    pub fn from_env() -> Self {
        let var = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.into());

        let enhance_backend = EditBackend::parse(&var("ENHANCE_BACKEND", "wavespeed"))
            .expect("ENHANCE_BACKEND must be 'wavespeed' or 'fal'");
        let default_enhance_model = match enhance_backend {
            EditBackend::Wavespeed => DEFAULT_WAVESPEED_EDIT_MODEL,
            EditBackend::Fal => DEFAULT_FAL_EDIT_MODEL,
        };

        let poll_interval_ms: u64 = var("PROVIDER_POLL_INTERVAL_MS", "2000")
            .parse()
            .expect("PROVIDER_POLL_INTERVAL_MS must be a valid u64");
        let max_wait_secs: u64 = var("PROVIDER_MAX_WAIT_SECS", "300")
            .parse()
            .expect("PROVIDER_MAX_WAIT_SECS must be a valid u64");
        let max_attempts: u32 = var("STAGE_MAX_ATTEMPTS", "3")
            .parse()
            .expect("STAGE_MAX_ATTEMPTS must be a valid u32");
        let fan_out_max_concurrency: usize = var(
            "FAN_OUT_MAX_CONCURRENCY",
            &DEFAULT_MAX_CONCURRENCY.to_string(),
        )
        .parse()
        .expect("FAN_OUT_MAX_CONCURRENCY must be a valid usize");
        let http_timeout_secs: u64 = var("HTTP_TIMEOUT_SECS", "600")
            .parse()
            .expect("HTTP_TIMEOUT_SECS must be a valid u64");
        let image_download_timeout_secs: u64 = var("IMAGE_DOWNLOAD_TIMEOUT_SECS", "60")
            .parse()
            .expect("IMAGE_DOWNLOAD_TIMEOUT_SECS must be a valid u64");

        Self {
            replicate_api_token: var("REPLICATE_API_TOKEN", ""),
            replicate_base_url: var("REPLICATE_BASE_URL", replicate::DEFAULT_BASE_URL),
            vision_model: var("VISION_MODEL", DEFAULT_VISION_MODEL),
            gemini_api_key: var("GOOGLE_AI_STUDIO_API_KEY", ""),
            gemini_base_url: var("GEMINI_BASE_URL", gemini::DEFAULT_BASE_URL),
            generate_model: var("GENERATE_MODEL", DEFAULT_GENERATE_MODEL),
            generate_aspect_ratio: var("GENERATE_ASPECT_RATIO", "1:1"),
            generate_image_size: var("GENERATE_IMAGE_SIZE", "4K"),
            enhance_backend,
            wavespeed_api_key: var("WAVESPEED_API_KEY", ""),
            wavespeed_base_url: var("WAVESPEED_BASE_URL", wavespeed::DEFAULT_BASE_URL),
            fal_api_key: var("FAL_API_KEY", ""),
            fal_base_url: var("FAL_BASE_URL", fal::DEFAULT_BASE_URL),
            enhance_model: var("ENHANCE_MODEL", default_enhance_model),
            poll: PollConfig {
                interval: Duration::from_millis(poll_interval_ms),
                max_wait: Duration::from_secs(max_wait_secs),
            },
            retry: RetryPolicy {
                max_attempts: max_attempts.max(1),
                ..RetryPolicy::default()
            },
            fan_out_max_concurrency: fan_out_max_concurrency.max(1),
            http_timeout: Duration::from_secs(http_timeout_secs),
            image_download_timeout: Duration::from_secs(image_download_timeout_secs),
        }
    }

    /// Names of required credentials that are empty.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.replicate_api_token.is_empty() {
            missing.push("REPLICATE_API_TOKEN");
        }
        if self.gemini_api_key.is_empty() {
            missing.push("GOOGLE_AI_STUDIO_API_KEY");
        }
        match self.enhance_backend {
            EditBackend::Wavespeed if self.wavespeed_api_key.is_empty() => missing.push("WAVESPEED_API_KEY"),
            EditBackend::Fal if self.fal_api_key.is_empty() => missing.push("FAL_API_KEY"),
            _ => {}
        }
        missing
    }
}
