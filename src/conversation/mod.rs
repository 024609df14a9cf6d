//! Conversation coordinator
//!
//! Owns the message history and the event channel, and drives a provider's
//! delta stream through the tag parser: provider deltas are wrapped with the
//! cancelable combinator, absorbed into the message log (consecutive
//! same-kind fragments merge into one growing record), narrowed to the
//! text-or-reset subset, and parsed into content-block snapshots. A provider
//! failure mid-turn rolls the turn's message records back out of history;
//! nothing else escapes this boundary.

pub mod history;

use std::{future::Future, sync::Arc};

use async_stream::stream;
use chrono::Utc;
use futures::{pin_mut, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    events::{EventChannel, EventSubscription},
    provider::{ContextMessage, Provider, ProviderDelta},
    stream_utils::{cancelable_stream, filter_stream},
    tag_parser::{parse_tag_stream, ContentBlock, ParserEvent, TagRegistry},
};

/// Derived role of a message record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// What produced a message record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    UserInput,
    AssistantText,
    AssistantReasoning,
}

/// One entry in the conversation history. Mutated in place while its model
/// turn is still streaming, frozen once the turn completes or the fragment
/// kind changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Milliseconds since the Unix epoch
    pub ts: i64,
    pub kind: MessageKind,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl Message {
    fn now(kind: MessageKind, text: String, images: Option<Vec<String>>) -> Self {
        Self {
            ts: Utc::now().timestamp_millis(),
            kind,
            text,
            images,
        }
    }

    pub fn role(&self) -> Role {
        match self.kind {
            MessageKind::UserInput => Role::User,
            MessageKind::AssistantText | MessageKind::AssistantReasoning => Role::Assistant,
        }
    }
}

/// Message lifecycle events published on the conversation's channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationEvent {
    NewMessage(Message),
    MessageUpdated(Message),
    MessageRemoved(Message),
}

/// Cumulative token usage reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Conversation-level delta vocabulary, one step above the provider's:
/// reasoning is carried for history but filtered out before parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelDelta {
    /// Previously accumulated output must be discarded (new attempt)
    Reset,
    Text(String),
    Reasoning(String),
}

pub struct Conversation {
    provider: Arc<dyn Provider>,
    system_prompt: String,
    registry: Arc<TagRegistry>,
    messages: Vec<Message>,
    events: EventChannel<ConversationEvent>,
    usage: TokenUsage,
}

impl Conversation {
    pub fn new(
        provider: Arc<dyn Provider>,
        system_prompt: impl Into<String>,
        registry: Arc<TagRegistry>,
    ) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.into(),
            registry,
            messages: Vec::new(),
            events: EventChannel::new(),
            usage: TokenUsage::default(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn usage(&self) -> TokenUsage {
        self.usage
    }

    /// Subscribe to message lifecycle events.
    pub fn subscribe(&self) -> EventSubscription<ConversationEvent> {
        self.events.subscribe()
    }

    pub fn add_user_message(&mut self, text: impl Into<String>, images: Option<Vec<String>>) {
        let message = Message::now(MessageKind::UserInput, text.into(), images);
        self.messages.push(message.clone());
        self.events.publish(ConversationEvent::NewMessage(message));
    }

    pub fn add_assistant_message(&mut self, text: impl Into<String>) {
        let message = Message::now(MessageKind::AssistantText, text.into(), None);
        self.messages.push(message.clone());
        self.events.publish(ConversationEvent::NewMessage(message));
    }

    /// Project the history into provider context messages.
    pub fn generate_context(&self) -> Vec<ContextMessage> {
        self.messages
            .iter()
            .map(|m| ContextMessage {
                role: m.role(),
                text: m.text.clone(),
            })
            .collect()
    }

    /// Run one model turn: request a provider stream, race it against the
    /// cancellation signal, absorb fragments into history (publishing
    /// new/updated events), and yield conversation deltas.
    ///
    /// On a provider error mid-turn, every message created during this turn
    /// is removed from history with a `MessageRemoved` event published per
    /// message in reverse creation order, and the stream ends; the error
    /// itself does not propagate. Cancellation ends the stream without
    /// rollback: records created so far stay in history.
    pub fn stream_model_deltas<'a, C>(
        &'a mut self,
        context: Vec<ContextMessage>,
        cancel: C,
    ) -> impl Stream<Item = ModelDelta> + 'a
    where
        C: Future<Output = ()> + 'a,
    {
        stream! {
            // A new attempt always starts clean downstream.
            yield ModelDelta::Reset;

            let provider = Arc::clone(&self.provider);
            let source = match provider
                .create_message(&self.system_prompt, &context)
                .await
            {
                Ok(source) => source,
                Err(error) => {
                    warn!(%error, "provider request failed before any delta arrived");
                    return;
                }
            };

            // The signal carries a zero usage delta so the race has a value
            // to resolve with; it is absorbed like any other usage report.
            let cancel_value = async move {
                cancel.await;
                Ok(ProviderDelta::Usage {
                    input_tokens: 0,
                    output_tokens: 0,
                })
            };
            let guarded = cancelable_stream(source, cancel_value);
            pin_mut!(guarded);

            let mut created_this_turn = 0usize;
            while let Some(item) = guarded.next().await {
                match item {
                    Ok(ProviderDelta::Text { text }) => {
                        self.absorb_fragment(
                            MessageKind::AssistantText,
                            &text,
                            &mut created_this_turn,
                        );
                        yield ModelDelta::Text(text);
                    }
                    Ok(ProviderDelta::Reasoning { text }) => {
                        self.absorb_fragment(
                            MessageKind::AssistantReasoning,
                            &text,
                            &mut created_this_turn,
                        );
                        yield ModelDelta::Reasoning(text);
                    }
                    Ok(ProviderDelta::Usage {
                        input_tokens,
                        output_tokens,
                    }) => {
                        self.usage.input_tokens += input_tokens;
                        self.usage.output_tokens += output_tokens;
                        debug!(input_tokens, output_tokens, "usage delta");
                    }
                    Err(error) => {
                        warn!(
                            %error,
                            rolled_back = created_this_turn,
                            "provider stream failed mid-turn; rolling back message records"
                        );
                        self.rollback(created_this_turn);
                        return;
                    }
                }
            }
        }
    }

    /// Full turn pipeline: model deltas, narrowed to the text-or-reset
    /// subset, parsed into content-block snapshots.
    pub fn stream_parsed_blocks<'a, C>(
        &'a mut self,
        context: Vec<ContextMessage>,
        cancel: C,
    ) -> impl Stream<Item = Vec<ContentBlock>> + 'a
    where
        C: Future<Output = ()> + 'a,
    {
        let registry = Arc::clone(&self.registry);
        let deltas = self.stream_model_deltas(context, cancel);
        let parser_events = filter_stream(deltas, |delta| match delta {
            ModelDelta::Text(text) => Some(ParserEvent::Text(text)),
            ModelDelta::Reset => Some(ParserEvent::Reset),
            ModelDelta::Reasoning(_) => None,
        });
        parse_tag_stream(parser_events, registry)
    }

    /// Merge a fragment into the tail message when it was created this turn
    /// with the same kind; otherwise start a new record.
    fn absorb_fragment(&mut self, kind: MessageKind, text: &str, created_this_turn: &mut usize) {
        if *created_this_turn > 0 {
            if let Some(last) = self.messages.last_mut() {
                if last.kind == kind {
                    last.text.push_str(text);
                    let updated = last.clone();
                    self.events
                        .publish(ConversationEvent::MessageUpdated(updated));
                    return;
                }
            }
        }

        let message = Message::now(kind, text.to_string(), None);
        self.messages.push(message.clone());
        *created_this_turn += 1;
        self.events.publish(ConversationEvent::NewMessage(message));
    }

    /// Remove the turn's records from the tail of history, newest first, so
    /// the log never retains a half-written turn.
    fn rollback(&mut self, created_this_turn: usize) {
        for _ in 0..created_this_turn {
            let message = self
                .messages
                .pop()
                .expect("rollback count never exceeds history length");
            self.events
                .publish(ConversationEvent::MessageRemoved(message));
        }
    }
}
