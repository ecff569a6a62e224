//! Asynchronous abstraction over the user-facing layer.
//!
//! Hosts plug in a [`UiProxy`] so actions can show messages and ask for
//! choices. Every await on the proxy is a suspension point of the running
//! pass; nothing else suspends.

use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A message to show.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    /// Label of the acknowledge button.
    pub confirm: Option<String>,
    pub icon: Option<String>,
    /// Presentation effect tag, opaque to the engine.
    pub fx: Option<String>,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_confirm(mut self, confirm: impl Into<String>) -> Self {
        self.confirm = Some(confirm.into());
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn with_fx(mut self, fx: impl Into<String>) -> Self {
        self.fx = Some(fx.into());
        self
    }
}

/// One option of a choice prompt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub label: String,
    /// Index of the choice in its action's declaration order.
    pub index: usize,
}

/// A choice prompt. Only choices whose requirement held are offered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoicePrompt {
    pub text: String,
    pub icon: Option<String>,
    pub options: Vec<ChoiceOption>,
}

impl ChoicePrompt {
    /// Indices the UI may resolve to.
    pub fn offered(&self) -> impl Iterator<Item = usize> + '_ {
        self.options.iter().map(|o| o.index)
    }
}

/// The user-facing side of action execution.
///
/// Implementations can handle:
/// - An interactive frontend
/// - Scripted replays
/// - Headless simulation ([`HeadlessUi`])
#[async_trait(?Send)]
pub trait UiProxy {
    /// Show a message and resolve once it is acknowledged.
    async fn display_message(&self, message: &Message);

    /// Offer choices and resolve with the chosen [`ChoiceOption::index`].
    async fn display_choices(&self, prompt: &ChoicePrompt) -> usize;
}

#[async_trait(?Send)]
impl<T: UiProxy + ?Sized> UiProxy for Rc<T> {
    async fn display_message(&self, message: &Message) {
        (**self).display_message(message).await;
    }

    async fn display_choices(&self, prompt: &ChoicePrompt) -> usize {
        (**self).display_choices(prompt).await
    }
}

#[async_trait(?Send)]
impl<T: UiProxy + ?Sized> UiProxy for Box<T> {
    async fn display_message(&self, message: &Message) {
        (**self).display_message(message).await;
    }

    async fn display_choices(&self, prompt: &ChoicePrompt) -> usize {
        (**self).display_choices(prompt).await
    }
}

/// Acknowledges every message immediately and takes the first offered
/// choice. Useful for simulations and as a fallback.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessUi;

#[async_trait(?Send)]
impl UiProxy for HeadlessUi {
    async fn display_message(&self, message: &Message) {
        tracing::trace!(text = %message.text, "message acknowledged headlessly");
    }

    async fn display_choices(&self, prompt: &ChoicePrompt) -> usize {
        prompt.offered().next().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::FutureExt;

    use super::*;

    #[test]
    fn test_headless_picks_first_offered() {
        let prompt = ChoicePrompt {
            text: "Which way?".to_string(),
            icon: None,
            options: vec![
                ChoiceOption { label: "East".to_string(), index: 2 },
                ChoiceOption { label: "West".to_string(), index: 5 },
            ],
        };
        let chosen = HeadlessUi.display_choices(&prompt).now_or_never();
        assert_eq!(chosen, Some(2));
    }

    #[test]
    fn test_rc_forwards() {
        let ui = Rc::new(HeadlessUi);
        assert_eq!(ui.display_message(&Message::new("hi")).now_or_never(), Some(()));
    }

    #[test]
    fn test_message_builder() {
        let message = Message::new("A storm rolls in").with_confirm("Brace").with_icon("cloud");
        assert_eq!(message.confirm.as_deref(), Some("Brace"));
        assert_eq!(message.icon.as_deref(), Some("cloud"));
        assert_eq!(message.fx, None);
    }
}
