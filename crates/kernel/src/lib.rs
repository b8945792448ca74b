pub mod error;
pub mod plan;
pub mod run;
pub mod task;
pub mod validation;

pub use error::{Error, Result};
