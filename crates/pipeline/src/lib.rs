//! Run orchestration: stages, retry, fan-out, progress and the driver.
//!
//! A run flows through three stages. Analyze runs once for the whole
//! run; generate and enhance fan out over the surviving presets, one unit
//! per preset. Stages are strictly sequential.
//!
//! | Stage    | Progress slice | Units                |
//! |----------|----------------|----------------------|
//! | analyze  | 0 - 25         | 1                    |
//! | generate | 25 - 75        | one per preset       |
//! | enhance  | 75 - 100       | one per survivor     |

pub mod config;
pub mod driver;
pub mod error;
pub mod fanout;
pub mod progress;
pub mod prompts;
pub mod stage;
pub mod stages;

pub use config::PipelineConfig;
pub use driver::{PipelineDriver, PipelineOutput, PipelineStages, RunOutcome};
pub use error::{PipelineError, ProgressError, StageError};
pub use fanout::FanOut;
pub use progress::{InMemoryProgressTracker, PersistedProgressTracker, ProgressTracker};
pub use stage::{BranchFailure, BranchOutcome, RetryPolicy, Stage, StageExecutor};
