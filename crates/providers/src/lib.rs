//! Clients for the external inference providers.
//!
//! Every vendor speaks its own wire dialect (status words, id fields,
//! output fields). Each client normalizes its dialect into the shared
//! job model in [`job`], so that [`polling::run_to_completion`] and the
//! pipeline stages above it never see vendor vocabulary.
//!
//! - [`replicate`]: asynchronous predictions, `succeeded` / `failed`.
//! - [`fal`]: queue API, `COMPLETED` / `FAILED`.
//! - [`wavespeed`]: asynchronous predictions nested under `data`.
//! - [`gemini`]: synchronous image generation, no polling.

pub mod error;
pub mod fal;
pub mod fetch;
pub mod gemini;
pub mod http;
pub mod job;
pub mod polling;
pub mod provider;
pub mod replicate;
pub mod vision;
pub mod wavespeed;

pub use error::ProviderError;
pub use job::{JobHandle, JobSpec, NormalizedStatus, ProviderOutput, Submission};
pub use polling::{run_to_completion, PollConfig};
pub use provider::Provider;
