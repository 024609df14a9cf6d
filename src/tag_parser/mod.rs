//! Tag stream parser
//!
//! Converts raw assistant output into an ordered list of content blocks:
//! free narration text interleaved with `<tool>...</tool>` invocations
//! carrying `<param>...</param>` values. The parser is dual-mode: the
//! incremental form consumes arbitrarily chunked text and produces a
//! complete snapshot after every character, and the batch form produces the
//! identical result from the whole string at once.

pub mod parser;
pub mod registry;
pub mod stream;
pub mod types;

pub use parser::{parse_complete, TagStreamParser};
pub use registry::{RegistryError, TagRegistry, TagRegistryBuilder};
pub use stream::{parse_tag_stream, ParserEvent};
pub use types::{ContentBlock, TextBlock, ToolInvocation};
