pub mod checkpoint;
pub mod document;
#[allow(clippy::module_inception)]
pub mod error;
pub mod executor;

pub use checkpoint::CheckpointError;
pub use document::{ErrorCode, InclusionError, ParseError};
pub use error::CliError;
pub use executor::ExecutorError;
