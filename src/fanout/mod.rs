//! Query fan-out: prompt construction, response parsing and the sequential
//! batch runner over a list of lookup queries.

pub mod batch;
pub mod error;
pub mod labels;
mod mode;
pub mod parser;
pub mod prompt;
pub mod types;

pub use batch::{BatchOptions, BatchOutcome, LookupStatus, Progress, run_batch};
pub use mode::{Mode, PromptVariant};
