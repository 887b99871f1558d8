use std::time::Duration;

/// Errors from a provider client.
///
/// [`Transport`](Self::Transport) and [`Api`](Self::Api) are network
/// level failures; the rest describe the job itself.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (connect, DNS, TLS, timeout).
    #[error("{provider}: HTTP request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with a non-2xx status code.
    #[error("{provider}: API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// The provider reported the job as terminally failed.
    #[error("{provider}: job {job_id} failed: {message}")]
    ProviderFailure {
        provider: &'static str,
        job_id: String,
        message: String,
    },

    /// The job did not reach a terminal status within the poll budget.
    #[error("{provider}: job {job_id} timed out after {}s", .waited.as_secs())]
    Timeout {
        provider: &'static str,
        job_id: String,
        waited: Duration,
    },

    /// The response was missing a field the client needs.
    #[error("{provider}: malformed response: {message}")]
    MalformedResponse {
        provider: &'static str,
        message: String,
    },

    /// The provider has no such operation (e.g. status on a synchronous API).
    #[error("{provider}: {operation} is not supported")]
    Unsupported {
        provider: &'static str,
        operation: &'static str,
    },
}

impl ProviderError {
    pub fn transport(provider: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { provider, source }
    }

    pub fn malformed(provider: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider,
            message: message.into(),
        }
    }

    /// `true` for network-level failures (connection errors and non-2xx).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Api { .. })
    }

    /// Name of the provider that produced this error.
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Transport { provider, .. }
            | Self::Api { provider, .. }
            | Self::ProviderFailure { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::MalformedResponse { provider, .. }
            | Self::Unsupported { provider, .. } => provider,
        }
    }
}
