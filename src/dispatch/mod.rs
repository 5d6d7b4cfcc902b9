//! Synchronous publish/subscribe bus shared by every model.
//!
//! Broadcasts (`Message`) are queued and delivered in FIFO order. A send made
//! while the bus is idle drains the queue before returning; a send made from
//! inside a handler, or inside `Dispatcher::batch`, is delivered once the
//! outermost call completes. No handler is ever re-entered while it runs.
//!
//! A handler that is borrowed elsewhere when a broadcast reaches it keeps the
//! broadcast in its own backlog. Backlogs are retried, in order, on every
//! flush and before every request, so a stage never misses a delta.
//!
//! Requests (`Request`) are answered immediately by the first registered
//! handler returning `Some`.

mod message;
mod parameter;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{trace, warn};

use crate::core::{DateInterval, ModelState};

pub use message::{
    Message, ModelInfo, ModelParameters, ModelType, ParameterInfo, ParameterType, Request,
    Response, Topic,
};
pub use parameter::ModelParameter;

/// Participant on the bus.
pub trait DispatchHandler {
    /// Topics this handler listens to. Read once, at registration.
    fn topics(&self) -> Vec<Topic>;

    fn handle(&mut self, message: &Message);

    /// Answers a request addressed to this handler, `None` otherwise.
    fn respond(&self, request: &Request) -> Option<Response>;
}

pub type HandlerRef = Weak<RefCell<dyn DispatchHandler>>;

/// Broadcasts held for a handler that was busy when they arrived.
struct Backlog {
    handler: HandlerRef,
    messages: VecDeque<Message>,
}

#[derive(Default)]
struct DispatcherInner {
    handlers: RefCell<IndexMap<Topic, Vec<HandlerRef>>>,
    queue: RefCell<VecDeque<Message>>,
    backlogs: RefCell<Vec<Backlog>>,
    depth: Cell<usize>,
}

/// Cheaply clonable handle to a shared bus.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Rc<DispatcherInner>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("topics", &self.inner.handlers.borrow().len())
            .field("queued", &self.inner.queue.borrow().len())
            .field("held", &self.held())
            .finish()
    }
}

struct DepthGuard<'a>(&'a Cell<usize>);

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, topic: Topic, handler: HandlerRef) {
        trace!(%topic, "register handler");
        let mut handlers = self.inner.handlers.borrow_mut();
        let entry = handlers.entry(topic).or_default();
        entry.retain(|existing| existing.strong_count() > 0);
        entry.push(handler);
    }

    /// Registers `handler` on every topic it declares.
    pub fn register_handler(&self, handler: &Rc<RefCell<dyn DispatchHandler>>) {
        let topics = handler.borrow().topics();
        for topic in topics {
            self.register(topic, Rc::downgrade(handler));
        }
    }

    /// Queues a broadcast and delivers it unless a delivery is in progress.
    pub fn send(&self, message: Message) {
        self.inner.queue.borrow_mut().push_back(message);
        self.flush();
    }

    /// Runs `f` with delivery suspended, then drains everything it queued.
    ///
    /// Mutations of a registered model go through here so the model is no
    /// longer borrowed when its own broadcasts reach other handlers.
    pub fn batch<T>(&self, f: impl FnOnce() -> T) -> T {
        let output = {
            let _guard = DepthGuard::enter(&self.inner.depth);
            f()
        };
        self.flush();
        output
    }

    /// Number of broadcasts waiting for delivery.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Number of broadcasts held back for busy handlers.
    #[must_use]
    pub fn held(&self) -> usize {
        self.inner
            .backlogs
            .borrow()
            .iter()
            .map(|backlog| backlog.messages.len())
            .sum()
    }

    /// Number of topics with at least one live handler.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.inner.handlers.borrow().len()
    }

    /// Delivers queued and held broadcasts. Does nothing while a delivery or
    /// a batch is in progress; the outermost call drains everything.
    pub fn flush(&self) {
        if self.inner.depth.get() > 0 {
            return;
        }
        let _guard = DepthGuard::enter(&self.inner.depth);
        loop {
            self.retry_backlogs();
            let next = self.inner.queue.borrow_mut().pop_front();
            let Some(message) = next else {
                break;
            };
            self.deliver(&message);
        }
    }

    fn deliver(&self, message: &Message) {
        let topic = message.topic();
        let recipients = self.recipients(&topic);
        trace!(%topic, recipients = recipients.len(), "deliver message");
        for handler in recipients {
            if self.hold_behind_backlog(&handler, message) {
                continue;
            }
            match handler.try_borrow_mut() {
                Ok(mut handler) => handler.handle(message),
                Err(_) => {
                    warn!(%topic, "handler busy; holding message until it is released");
                    self.inner.backlogs.borrow_mut().push(Backlog {
                        handler: Rc::downgrade(&handler),
                        messages: VecDeque::from([message.clone()]),
                    });
                }
            }
        }
    }

    /// Appends `message` to the handler's backlog when it has one, keeping
    /// its broadcasts in order.
    fn hold_behind_backlog(
        &self,
        handler: &Rc<RefCell<dyn DispatchHandler>>,
        message: &Message,
    ) -> bool {
        let target = Rc::downgrade(handler);
        let mut backlogs = self.inner.backlogs.borrow_mut();
        match backlogs
            .iter_mut()
            .find(|backlog| Weak::ptr_eq(&backlog.handler, &target))
        {
            Some(backlog) => {
                backlog.messages.push_back(message.clone());
                true
            }
            None => false,
        }
    }

    /// Hands held broadcasts to handlers that are free again. Backlogs of
    /// dropped handlers are discarded.
    fn retry_backlogs(&self) {
        if self.inner.backlogs.borrow().is_empty() {
            return;
        }
        let backlogs = std::mem::take(&mut *self.inner.backlogs.borrow_mut());
        let mut still_busy = Vec::new();
        for mut backlog in backlogs {
            let Some(handler) = backlog.handler.upgrade() else {
                continue;
            };
            let Ok(mut borrowed) = handler.try_borrow_mut() else {
                still_busy.push(backlog);
                continue;
            };
            trace!(held = backlog.messages.len(), "delivering held messages");
            while let Some(message) = backlog.messages.pop_front() {
                borrowed.handle(&message);
            }
        }
        // Handlers that were busy keep their place ahead of any backlog
        // opened while retrying.
        let mut backlogs = self.inner.backlogs.borrow_mut();
        still_busy.append(&mut backlogs);
        *backlogs = still_busy;
    }

    /// Asks the handlers of the request's topic, in registration order, until
    /// one answers.
    ///
    /// A handler that is mutably borrowed is the one asking (or one further up
    /// the same call stack) and is skipped.
    ///
    /// Outside a delivery, pending and held broadcasts are flushed first so
    /// the answer reflects every delta sent so far.
    #[must_use]
    pub fn request(&self, request: &Request) -> Option<Response> {
        self.flush();
        let topic = request.topic();
        self.recipients(&topic)
            .into_iter()
            .find_map(|handler| match handler.try_borrow() {
                Ok(handler) => handler.respond(request),
                Err(_) => {
                    trace!(%topic, "skipping handler in use");
                    None
                }
            })
    }

    #[must_use]
    pub fn model_info(&self, model_id: &str) -> Option<ModelInfo> {
        match self.request(&Request::ModelGetInfo {
            model_id: model_id.to_owned(),
        })? {
            Response::ModelInfo(info) => Some(info),
            _ => None,
        }
    }

    #[must_use]
    pub fn model_state(&self, model_id: &str) -> Option<ModelState> {
        match self.request(&Request::ModelGetState {
            model_id: model_id.to_owned(),
        })? {
            Response::ModelState(state) => Some(state),
            _ => None,
        }
    }

    /// Current value behind a parameter get event. The outer `None` means
    /// nobody answered.
    #[must_use]
    pub fn parameter_value(&self, get_event: &str) -> Option<Option<DateInterval>> {
        match self.request(&Request::GetParameter {
            event: get_event.to_owned(),
        })? {
            Response::ParameterValue(value) => Some(value),
            _ => None,
        }
    }

    /// Queues an assignment on a parameter set event.
    pub fn set_parameter(&self, set_event: &str, value: Option<DateInterval>) {
        self.send(Message::SetParameter {
            event: set_event.to_owned(),
            value,
        });
    }

    /// Live handlers of `topic`. Dropped handlers are pruned, and a topic
    /// left without handlers is forgotten.
    fn recipients(&self, topic: &Topic) -> Vec<Rc<RefCell<dyn DispatchHandler>>> {
        let mut handlers = self.inner.handlers.borrow_mut();
        let Some(entry) = handlers.get_mut(topic) else {
            return Vec::new();
        };
        let live: Vec<_> = entry.iter().filter_map(Weak::upgrade).collect();
        if live.len() != entry.len() {
            entry.retain(|handler| handler.strong_count() > 0);
            if entry.is_empty() {
                trace!(%topic, "forgetting topic without handlers");
                handlers.shift_remove(topic);
            }
        }
        live
    }
}
