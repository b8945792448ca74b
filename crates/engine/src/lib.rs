pub mod config;
pub mod idempotency;
pub mod pipeline;
pub mod prompts;
pub mod protocol;
pub mod repo_map;
pub mod scheduler;
pub mod validate;
pub mod workspace;

pub use config::Settings;
pub use pipeline::Pipeline;
pub use scheduler::{Scheduler, SubmitOutcome};
