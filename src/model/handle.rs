use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::dispatch::{DispatchHandler, Dispatcher};

/// Owner of a model registered on a dispatcher.
///
/// The dispatcher only keeps a weak reference: dropping the last handle
/// unregisters the model.
pub struct ModelHandle<M> {
    model: Rc<RefCell<M>>,
    dispatcher: Dispatcher,
}

impl<M> Clone for ModelHandle<M> {
    fn clone(&self) -> Self {
        Self {
            model: Rc::clone(&self.model),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<M: DispatchHandler + 'static> ModelHandle<M> {
    /// Registers `model` on every topic it declares.
    pub fn install(dispatcher: &Dispatcher, model: M) -> Self {
        let model = Rc::new(RefCell::new(model));
        let handler: Rc<RefCell<dyn DispatchHandler>> = model.clone();
        dispatcher.register_handler(&handler);
        Self {
            model,
            dispatcher: dispatcher.clone(),
        }
    }
}

impl<M> ModelHandle<M> {
    /// Delivers anything the bus still holds, then borrows the model.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, M> {
        self.dispatcher.flush();
        self.model.borrow()
    }

    /// Mutates the model. Broadcasts it sends are delivered after `f`
    /// returns and the model is released.
    pub fn update<T>(&self, f: impl FnOnce(&mut M) -> T) -> T {
        self.dispatcher.batch(|| f(&mut self.model.borrow_mut()))
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}
