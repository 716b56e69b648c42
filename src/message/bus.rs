use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    rc::Rc,
};

use crate::message::{Handler, Message, MessagePriority};

/// Queued units executed per [`MessageBus::update`] unless configured otherwise.
pub const DEFAULT_MESSAGE_LIMIT: usize = 10;

fn same_handler(a: &Handler, b: &Handler) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// One handler waiting to receive one message.
struct SubscriptionNode {
    message: Rc<Message>,
    handler: Handler,
}

#[derive(Default)]
struct BusState {
    subscriptions: HashMap<String, Vec<Handler>>,
    queue: VecDeque<SubscriptionNode>,
}

/// Cheaply clonable handle to one subscription table and one FIFO queue.
///
/// No borrow of the table is held while a handler runs, so handlers may post
/// and (un)subscribe freely.
#[derive(Clone)]
pub struct MessageBus {
    state: Rc<RefCell<BusState>>,
    limit: usize,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE_LIMIT)
    }
}

impl MessageBus {
    pub fn new(limit: usize) -> Self {
        Self {
            state: Rc::new(RefCell::new(BusState::default())),
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn subscribe(&self, code: &str, handler: Handler) {
        let mut state = self.state.borrow_mut();
        let handlers = state.subscriptions.entry(code.to_string()).or_default();
        if handlers.iter().any(|h| same_handler(h, &handler)) {
            log::warn!("Attempting to add a duplicate handler to code: {code}. Subscription not added.");
            return;
        }
        handlers.push(handler);
    }

    pub fn unsubscribe(&self, code: &str, handler: &Handler) {
        let mut state = self.state.borrow_mut();
        let Some(handlers) = state.subscriptions.get_mut(code) else {
            log::warn!("Cannot unsubscribe handler from code: {code} because that code is not subscribed to.");
            return;
        };
        handlers.retain(|h| !same_handler(h, handler));
        if handlers.is_empty() {
            state.subscriptions.remove(code);
        }
    }

    pub fn subscriber_count(&self, code: &str) -> usize {
        self.state
            .borrow()
            .subscriptions
            .get(code)
            .map_or(0, Vec::len)
    }

    /// Units of work waiting for [`update`](Self::update).
    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Delivers `message` to the handlers subscribed to its code.
    ///
    /// `High` priority runs every handler now, in subscription order, and returns
    /// the first handler error. `Normal` priority only enqueues. A code nobody
    /// listens to is ignored.
    pub fn post(&self, message: Message) -> anyhow::Result<()> {
        let handlers = self.state.borrow().subscriptions.get(&message.code).cloned();
        let Some(handlers) = handlers else {
            return Ok(());
        };
        match message.priority {
            MessagePriority::High => {
                for handler in handlers {
                    handler.on_message(&message)?;
                }
            }
            MessagePriority::Normal => {
                let message = Rc::new(message);
                let mut state = self.state.borrow_mut();
                state
                    .queue
                    .extend(handlers.into_iter().map(|handler| SubscriptionNode {
                        message: message.clone(),
                        handler,
                    }));
            }
        }
        Ok(())
    }

    /// Posts a `Normal` priority message.
    pub fn send(
        &self,
        code: impl Into<String>,
        sender: impl Into<String>,
        context: Option<Rc<dyn std::any::Any>>,
    ) -> anyhow::Result<()> {
        let mut message = Message::new(code, sender);
        message.context = context;
        self.post(message)
    }

    /// Posts a `High` priority message.
    pub fn send_priority(
        &self,
        code: impl Into<String>,
        sender: impl Into<String>,
        context: Option<Rc<dyn std::any::Any>>,
    ) -> anyhow::Result<()> {
        let mut message = Message::new(code, sender).with_priority(MessagePriority::High);
        message.context = context;
        self.post(message)
    }

    /// Runs up to `limit` queued units in FIFO order.
    ///
    /// Units queued by the handlers themselves wait for a later call. On a handler
    /// error the remaining units stay queued and the error is returned.
    pub fn update(&self) -> anyhow::Result<()> {
        let budget = self.limit.min(self.pending());
        for _ in 0..budget {
            let Some(node) = self.state.borrow_mut().queue.pop_front() else {
                break;
            };
            node.handler.on_message(&node.message)?;
        }
        Ok(())
    }

    /// Drops all subscriptions and queued work.
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.subscriptions.clear();
        state.queue.clear();
    }
}
