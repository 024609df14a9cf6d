//! Provider interface
//!
//! The adapters that turn wire responses into delta streams live outside
//! this crate; only their interface is specified here. A provider stream
//! yields typed deltas (text fragment, reasoning fragment, usage counters)
//! and terminates normally or with an error. Errors never cross past the
//! conversation coordinator: their only externally visible effect is the
//! rollback of the turn's message records.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// One element of a provider's response stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderDelta {
    /// Assistant output text fragment
    Text { text: String },
    /// Model reasoning fragment, never fed to the tag parser
    Reasoning { text: String },
    /// Token usage counters
    Usage {
        input_tokens: u64,
        output_tokens: u64,
    },
}

/// Failure at the provider boundary, the only failing boundary in the core.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(String),

    #[error("provider stream interrupted: {0}")]
    Stream(String),
}

/// One history entry projected for the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub role: crate::conversation::Role,
    pub text: String,
}

pub type ProviderStream = BoxStream<'static, Result<ProviderDelta, ProviderError>>;

/// A model backend able to stream a response for a conversation context.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn create_message(
        &self,
        system_prompt: &str,
        context: &[ContextMessage],
    ) -> Result<ProviderStream, ProviderError>;
}
