//! Conversational stage
//!
//! [`Conversation`] owns the session history and forwards each turn to a
//! [`ChatProvider`]. History only changes when a request succeeds.

mod history;
mod openai;

use async_trait::async_trait;

use crate::Result;

pub use history::{Exchange, Role};
pub use openai::{API_KEY_ENV, OpenAiChat, resolve_api_key};

/// A language-model API that answers an ordered list of messages
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Submit `messages` and return the generated reply
    async fn complete(&self, messages: &[Exchange]) -> Result<String>;

    /// Model identifier
    fn model(&self) -> &str;
}

/// A chat session with in-memory history
pub struct Conversation {
    provider: Box<dyn ChatProvider>,
    history: Vec<Exchange>,
}

impl Conversation {
    /// Start an empty conversation
    #[must_use]
    pub fn new(provider: Box<dyn ChatProvider>) -> Self {
        Self {
            provider,
            history: Vec::new(),
        }
    }

    /// Send `message` and return the reply
    ///
    /// The request carries the per-call `system_instruction` (if any), the
    /// history, then the message. A per-call instruction replaces the standing
    /// one for this request only. On success the user message and the reply
    /// are appended to history, in that order.
    ///
    /// # Errors
    ///
    /// Returns the provider's error; history is left untouched
    pub async fn send(&mut self, message: &str, system_instruction: Option<&str>) -> Result<String> {
        let system_instruction = system_instruction.filter(|s| !s.trim().is_empty());
        let messages = self.build_messages(message, system_instruction);

        tracing::info!(
            model = self.provider.model(),
            history = self.history.len(),
            "sending message"
        );

        let reply = self.provider.complete(&messages).await?;

        self.history.push(Exchange::user(message));
        self.history.push(Exchange::assistant(reply.clone()));

        tracing::info!(reply_chars = reply.chars().count(), "reply received");
        Ok(reply)
    }

    fn build_messages(&self, message: &str, system_instruction: Option<&str>) -> Vec<Exchange> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);

        match system_instruction {
            Some(instruction) => {
                messages.push(Exchange::system(instruction));
                messages.extend(
                    self.history
                        .iter()
                        .filter(|e| e.role() != Role::System)
                        .cloned(),
                );
            }
            None => messages.extend(self.history.iter().cloned()),
        }

        messages.push(Exchange::user(message));
        messages
    }

    /// Drop every exchange, including a standing system instruction
    pub fn clear(&mut self) {
        self.history.clear();
        tracing::info!("history cleared");
    }

    /// Install a standing system instruction at the head of history
    ///
    /// Replaces an instruction already at the head instead of stacking.
    pub fn set_system_instruction(&mut self, instruction: &str) {
        let exchange = Exchange::system(instruction);
        match self.history.first_mut() {
            Some(head) if head.role() == Role::System => *head = exchange,
            _ => self.history.insert(0, exchange),
        }
    }

    /// Exchanges in insertion order
    #[must_use]
    pub fn history(&self) -> &[Exchange] {
        &self.history
    }

    /// Model identifier of the underlying provider
    #[must_use]
    pub fn model(&self) -> &str {
        self.provider.model()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::Error;

    /// Records every request and answers with a canned reply
    struct ScriptedProvider {
        requests: Arc<Mutex<Vec<Vec<Exchange>>>>,
        fail: bool,
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn complete(&self, messages: &[Exchange]) -> Result<String> {
            let mut requests = self.requests.lock().unwrap();
            requests.push(messages.to_vec());
            if self.fail {
                return Err(Error::Chat("quota exceeded".to_string()));
            }
            Ok(format!("reply {}", requests.len()))
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn conversation(fail: bool) -> (Conversation, Arc<Mutex<Vec<Vec<Exchange>>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let provider = ScriptedProvider {
            requests: Arc::clone(&requests),
            fail,
        };
        (Conversation::new(Box::new(provider)), requests)
    }

    #[tokio::test]
    async fn test_send_appends_user_then_assistant() {
        let (mut chat, _) = conversation(false);

        let reply = chat.send("What is 2+2?", None).await.unwrap();

        assert_eq!(reply, "reply 1");
        assert_eq!(
            chat.history(),
            &[Exchange::user("What is 2+2?"), Exchange::assistant("reply 1")]
        );

        chat.clear();
        assert!(chat.history().is_empty());
    }

    #[tokio::test]
    async fn test_history_grows_by_two_per_send() {
        let (mut chat, requests) = conversation(false);

        for (i, msg) in ["one", "two", "three"].iter().enumerate() {
            chat.send(msg, None).await.unwrap();
            assert_eq!(chat.history().len(), 2 * (i + 1));
        }

        let roles: Vec<Role> = chat.history().iter().map(Exchange::role).collect();
        assert_eq!(
            roles,
            vec![
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant
            ]
        );

        // The third request carried the two previous turns plus the new message
        let third = &requests.lock().unwrap()[2];
        assert_eq!(third.len(), 5);
        assert_eq!(third[4], Exchange::user("three"));
    }

    #[tokio::test]
    async fn test_failed_send_leaves_history_untouched() {
        let (mut chat, requests) = conversation(true);
        chat.set_system_instruction("Be brief.");

        let err = chat.send("hello", None).await.unwrap_err();

        assert!(matches!(err, Error::Chat(_)));
        assert_eq!(chat.history(), &[Exchange::system("Be brief.")]);
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_per_call_instruction_comes_first() {
        let (mut chat, requests) = conversation(false);
        chat.send("first", None).await.unwrap();

        chat.send("second", Some("Answer in French.")).await.unwrap();

        let request = &requests.lock().unwrap()[1];
        assert_eq!(request[0], Exchange::system("Answer in French."));
        assert_eq!(request[1], Exchange::user("first"));
        assert_eq!(request.last(), Some(&Exchange::user("second")));
        // The per-call instruction is not recorded
        assert!(chat.history().iter().all(|e| e.role() != Role::System));
    }

    #[tokio::test]
    async fn test_standing_instruction_sent_with_history() {
        let (mut chat, requests) = conversation(false);
        chat.set_system_instruction("You are a tutor.");

        chat.send("hi", None).await.unwrap();

        let request = &requests.lock().unwrap()[0];
        assert_eq!(
            request,
            &vec![Exchange::system("You are a tutor."), Exchange::user("hi")]
        );
        assert_eq!(chat.history().len(), 3);
    }

    #[tokio::test]
    async fn test_per_call_instruction_overrides_standing() {
        let (mut chat, requests) = conversation(false);
        chat.set_system_instruction("You are a tutor.");

        chat.send("hi", Some("You are a pirate.")).await.unwrap();

        let request = &requests.lock().unwrap()[0];
        let systems: Vec<&str> = request
            .iter()
            .filter(|e| e.role() == Role::System)
            .map(Exchange::content)
            .collect();
        assert_eq!(systems, vec!["You are a pirate."]);
        // The standing instruction stays in history for later calls
        assert_eq!(chat.history()[0], Exchange::system("You are a tutor."));
    }

    #[tokio::test]
    async fn test_blank_per_call_instruction_ignored() {
        let (mut chat, requests) = conversation(false);
        chat.set_system_instruction("Standing.");

        chat.send("hi", Some("  ")).await.unwrap();

        let request = &requests.lock().unwrap()[0];
        assert_eq!(request[0], Exchange::system("Standing."));
    }

    #[test]
    fn test_set_system_instruction_replaces_head() {
        let (mut chat, _) = conversation(false);
        chat.set_system_instruction("first");
        chat.set_system_instruction("second");

        assert_eq!(chat.history(), &[Exchange::system("second")]);
        assert_eq!(chat.model(), "scripted");
    }
}
