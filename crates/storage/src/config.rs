/// Object storage configuration loaded from environment variables.
///
/// | Env var                   | Default      |
/// |---------------------------|--------------|
/// | `STORAGE_BUCKET`          | (none)       |
/// | `STORAGE_ENDPOINT`        | AWS default  |
/// | `STORAGE_REGION`          | `us-east-1`  |
/// | `STORAGE_PUBLIC_BASE_URL` | derived      |
/// | `STORAGE_PREFIX`          | `images`     |
///
/// Credentials come from the standard AWS provider chain
/// (`AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`).
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Bucket name. `None` selects in-memory storage.
    pub bucket: Option<String>,
    /// Custom S3-compatible endpoint.
    pub endpoint: Option<String>,
    pub region: String,
    /// Base of public object URLs. Defaults to `{endpoint}/{bucket}`.
    pub public_base_url: Option<String>,
    /// Key prefix prepended to every object name.
    pub prefix: String,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            bucket: non_empty("STORAGE_BUCKET"),
            endpoint: non_empty("STORAGE_ENDPOINT"),
            region: non_empty("STORAGE_REGION").unwrap_or_else(|| "us-east-1".into()),
            public_base_url: non_empty("STORAGE_PUBLIC_BASE_URL"),
            prefix: std::env::var("STORAGE_PREFIX").unwrap_or_else(|_| "images".into()),
        }
    }

    /// Object key for `name` under the configured prefix.
    pub fn object_key(&self, name: &str) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        }
    }

    /// Public URL of an object key in `bucket`.
    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        match (&self.public_base_url, &self.endpoint) {
            (Some(base), _) => format!("{}/{key}", base.trim_end_matches('/')),
            (None, Some(endpoint)) => {
                format!("{}/{bucket}/{key}", endpoint.trim_end_matches('/'))
            }
            (None, None) => format!("https://{bucket}.s3.{}.amazonaws.com/{key}", self.region),
        }
    }
}
