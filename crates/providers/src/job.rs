//! The vendor-neutral job model.

/// What to run: a model identifier plus its vendor-specific input body.
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Model path, version hash, or model name, depending on the vendor.
    pub model: String,
    pub input: serde_json::Value,
}

impl JobSpec {
    pub fn new(model: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            model: model.into(),
            input,
        }
    }
}

/// Identifies a job created on the provider side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    /// Provider-assigned job id.
    pub id: String,
    /// Model the job was submitted to (some vendors address status
    /// endpoints by model path).
    pub model: String,
}

/// Provider status normalized into one vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedStatus {
    Queued,
    Running,
    Succeeded,
    Failed { message: String },
}

impl NormalizedStatus {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Output of a succeeded job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutput {
    /// One or more hosted result URLs.
    Urls(Vec<String>),
    /// An image returned inline.
    Image { bytes: Vec<u8>, mime_type: String },
    /// Text output (language / vision models).
    Text(String),
}

impl ProviderOutput {
    pub fn first_url(&self) -> Option<&str> {
        match self {
            Self::Urls(urls) => urls.first().map(String::as_str),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Urls(_) => "urls",
            Self::Image { .. } => "image",
            Self::Text(_) => "text",
        }
    }
}

/// Answer to a submit call.
///
/// Synchronous vendors return an already-terminal status together with
/// the output; asynchronous ones return `Queued`/`Running` and no output.
#[derive(Debug, Clone)]
pub struct Submission {
    pub handle: JobHandle,
    pub status: NormalizedStatus,
    pub output: Option<ProviderOutput>,
}

/// `true` if `value` looks like an absolute http(s) URL.
pub(crate) fn looks_like_url(value: &str) -> bool {
    value.starts_with("https://") || value.starts_with("http://")
}

/// Collect a JSON string or array of strings into owned strings.
pub(crate) fn string_list(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::String(s) => vec![s.clone()],
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect(),
        _ => Vec::new(),
    }
}
