//! Task wrapper: one task currently maps 1:1 onto a conversation, carrying
//! an identifier and a display name, and republishing conversation events on
//! its own channel.

use std::sync::Arc;

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    conversation::{Conversation, ConversationEvent},
    events::{EventChannel, EventSubscription},
    provider::Provider,
    tag_parser::TagRegistry,
};

#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    Conversation(ConversationEvent),
}

pub struct Task {
    id: Uuid,
    name: String,
    pub conversation: Conversation,
    events: Arc<EventChannel<TaskEvent>>,
    forwarder: JoinHandle<()>,
}

impl Task {
    /// Create a task seeded with an initial user message. Must be called
    /// within a tokio runtime: the event forwarder is a spawned task.
    pub fn from_text(
        provider: Arc<dyn Provider>,
        system_prompt: impl Into<String>,
        registry: Arc<TagRegistry>,
        text: impl Into<String>,
    ) -> Self {
        Self::build(provider, system_prompt, registry, text.into(), None)
    }

    /// As `from_text`, with images attached to the initial message.
    pub fn from_text_and_images(
        provider: Arc<dyn Provider>,
        system_prompt: impl Into<String>,
        registry: Arc<TagRegistry>,
        text: impl Into<String>,
        images: Vec<String>,
    ) -> Self {
        Self::build(provider, system_prompt, registry, text.into(), Some(images))
    }

    fn build(
        provider: Arc<dyn Provider>,
        system_prompt: impl Into<String>,
        registry: Arc<TagRegistry>,
        text: String,
        images: Option<Vec<String>>,
    ) -> Self {
        let mut conversation = Conversation::new(provider, system_prompt, registry);
        let events = Arc::new(EventChannel::new());

        let mut subscription = conversation.subscribe();
        let sink = Arc::clone(&events);
        let forwarder = tokio::spawn(async move {
            loop {
                let event = subscription.recv().await;
                sink.publish(TaskEvent::Conversation(event));
            }
        });

        conversation.add_user_message(text.clone(), images);

        Self {
            id: Uuid::new_v4(),
            name: text,
            conversation,
            events,
            forwarder,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscribe(&self) -> EventSubscription<TaskEvent> {
        self.events.subscribe()
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ContextMessage, ProviderError, ProviderStream};
    use async_trait::async_trait;

    struct NullProvider;

    #[async_trait]
    impl Provider for NullProvider {
        async fn create_message(
            &self,
            _system_prompt: &str,
            _context: &[ContextMessage],
        ) -> Result<ProviderStream, ProviderError> {
            Ok(Box::pin(futures::stream::empty()))
        }
    }

    fn registry() -> Arc<TagRegistry> {
        Arc::new(TagRegistry::builder().tool("search").build().unwrap())
    }

    #[tokio::test]
    async fn task_seeds_initial_user_message_and_forwards_its_event() {
        let task = Task::from_text(
            Arc::new(NullProvider),
            "be helpful",
            registry(),
            "find the bug",
        );
        assert_eq!(task.name(), "find the bug");
        assert_eq!(task.conversation.messages().len(), 1);

        // The seed event is queued on the forwarder's subscription; once the
        // forwarder runs it lands on the task channel.
        let mut sub = task.subscribe();
        let event = sub.recv().await;
        assert!(matches!(
            event,
            TaskEvent::Conversation(crate::conversation::ConversationEvent::NewMessage(_))
        ));
    }

    #[tokio::test]
    async fn tasks_get_distinct_ids() {
        let a = Task::from_text(Arc::new(NullProvider), "p", registry(), "one");
        let b = Task::from_text(Arc::new(NullProvider), "p", registry(), "two");
        assert_ne!(a.id(), b.id());
    }
}
