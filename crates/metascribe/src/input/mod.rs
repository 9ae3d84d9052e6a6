//! Input parsing and data source handling.

mod context;
mod parser;
mod source;

pub use context::{ContextDocument, ContextExtractor, ContextFormat, PlainTextExtractor};
pub use parser::{Parser, ParserConfig};
pub use source::{DataTable, SourceMetadata};
