//! Incremental assistant-message parsing and conversation turn coordination.
//!
//! The crate recovers structured content blocks (free text interleaved with
//! tagged tool invocations) from a chunk-delivered model output stream,
//! identically to a whole-string parse, and provides the surrounding
//! plumbing a conversation loop needs: a fan-out event channel with lazy
//! subscriber cleanup, lazy-stream combinators with cooperative
//! cancellation, and a coordinator that drives a provider delta stream
//! through the parser while maintaining a rollback-capable message log.

pub mod config;
pub mod conversation;
pub mod events;
pub mod observability;
pub mod provider;
pub mod stream_utils;
pub mod tag_parser;
pub mod task;

// Re-export types used outside this crate
pub use config::ParserConfig;
pub use conversation::{Conversation, ConversationEvent, Message, MessageKind, Role, TokenUsage};
pub use events::{EventChannel, EventSubscription};
pub use provider::{ContextMessage, Provider, ProviderDelta, ProviderError, ProviderStream};
pub use tag_parser::{
    parse_complete, parse_tag_stream, ContentBlock, ParserEvent, RegistryError, TagRegistry,
    TagStreamParser, TextBlock, ToolInvocation,
};
pub use task::{Task, TaskEvent};
