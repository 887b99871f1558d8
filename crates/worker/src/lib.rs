//! Run execution outside the request path.
//!
//! [`launcher::RunLauncher`] spawns one task per run and routes panics to
//! the driver's failure recording. [`dispatcher::RunDispatcher`] claims
//! pending runs from the store for the multi-process deployment.
//! [`runtime`] wires collaborators from the environment for both binaries.

pub mod config;
pub mod dispatcher;
pub mod launcher;
pub mod runtime;
pub mod telemetry;

pub use config::WorkerConfig;
pub use dispatcher::RunDispatcher;
pub use launcher::RunLauncher;
pub use runtime::{Collaborators, RuntimeError};
