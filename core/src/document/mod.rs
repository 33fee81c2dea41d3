//! Task document model and parser.

mod include;
mod parser;
pub mod protocol;
mod types;

pub use include::{IncludeDiagnostic, IncludeResolver};
pub use parser::{
    parse_document, parse_str, ParseOptions, ParsedDocument, StandardDocumentParser,
    DEFAULT_MAX_WORKERS,
};
pub use protocol::{DocumentProtocolParser, FormatError, FormatValidation, FormatWarning};
pub use types::{Stage, StageMode, Task};
