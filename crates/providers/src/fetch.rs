//! Downloading provider outputs and input images.

use crate::error::ProviderError;
use crate::http::ensure_success;
use crate::job::ProviderOutput;

const SOURCE: &str = "download";

/// Raw image bytes with their content type.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Downloads images over HTTP with its own (shorter) timeout.
#[derive(Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
}

impl ImageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchedImage, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::transport(SOURCE, e))?;
        let response = ensure_success(SOURCE, response).await?;
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or_else(|| "image/png".to_string());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::transport(SOURCE, e))?;
        if bytes.is_empty() {
            return Err(ProviderError::malformed(SOURCE, format!("empty body from {url}")));
        }
        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            mime_type,
        })
    }

    /// Turn a provider output into image bytes, downloading the first URL
    /// when the output is hosted.
    pub async fn materialize(&self, output: ProviderOutput) -> Result<FetchedImage, ProviderError> {
        match output {
            ProviderOutput::Image { bytes, mime_type } => Ok(FetchedImage { bytes, mime_type }),
            ProviderOutput::Urls(urls) => match urls.first() {
                Some(url) => self.fetch(url).await,
                None => Err(ProviderError::malformed(SOURCE, "output has no URLs")),
            },
            ProviderOutput::Text(_) => Err(ProviderError::malformed(
                SOURCE,
                "expected an image output, got text",
            )),
        }
    }
}
