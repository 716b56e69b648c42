//! Publish/subscribe messaging between engine parts.
//!
//! Producers post a [`Message`] under a string code; every handler subscribed to
//! that code receives it. `High` priority messages are delivered before `post`
//! returns, `Normal` ones are queued and drained a few at a time by
//! [`MessageBus::update`] once per frame.
//!
//! # Key types
//!
//! - [`MessageBus`] owns the subscription table and the deferred queue
//! - [`Message`] is the immutable value delivered to handlers
//! - [`MessageHandler`] is implemented by anything that wants messages, closures included

use std::{any::Any, fmt::Debug, rc::Rc};

pub mod bus;

pub use bus::{DEFAULT_MESSAGE_LIMIT, MessageBus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MessagePriority {
    #[default]
    Normal,
    High,
}

#[derive(Clone)]
pub struct Message {
    pub code: String,
    pub sender: String,
    pub context: Option<Rc<dyn Any>>,
    pub priority: MessagePriority,
}

impl Message {
    pub fn new(code: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            sender: sender.into(),
            context: None,
            priority: MessagePriority::Normal,
        }
    }

    pub fn with_context(mut self, context: Rc<dyn Any>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    /// The payload, if there is one and it is a `T`.
    pub fn context_as<T: 'static>(&self) -> Option<&T> {
        self.context.as_deref()?.downcast_ref::<T>()
    }
}

impl Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("code", &self.code)
            .field("sender", &self.sender)
            .field("has_context", &self.context.is_some())
            .field("priority", &self.priority)
            .finish()
    }
}

pub trait MessageHandler {
    fn on_message(&self, message: &Message) -> anyhow::Result<()>;
}

impl<F> MessageHandler for F
where
    F: Fn(&Message) -> anyhow::Result<()>,
{
    fn on_message(&self, message: &Message) -> anyhow::Result<()> {
        self(message)
    }
}

/// Handlers are compared by identity, so keep the `Rc` to unsubscribe later.
pub type Handler = Rc<dyn MessageHandler>;
