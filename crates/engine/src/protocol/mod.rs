//! Text protocols spoken between the engine and the model.
//!
//! The model replies in plain text; these parsers are deliberately
//! tolerant. A malformed block is skipped, never fatal, since a partial
//! plan or edit set still moves the run forward.

pub mod edit;
pub mod plan;
