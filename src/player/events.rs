//! Event fan-out to registered handlers

use crate::player::{PlayerEvent, PlayerEventHandler};
use crossbeam_channel::Sender;
use log::trace;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

type SharedHandler = Arc<Mutex<Box<dyn PlayerEventHandler>>>;

/// Event dispatcher
///
/// The handler list is only locked long enough to copy it, so a handler may
/// register further handlers while it runs.
pub(crate) struct EventDispatcher {
    handlers: RwLock<Vec<SharedHandler>>,
}

impl EventDispatcher {
    pub fn new(handlers: Vec<Box<dyn PlayerEventHandler>>) -> Self {
        Self {
            handlers: RwLock::new(handlers.into_iter().map(|h| Arc::new(Mutex::new(h))).collect()),
        }
    }

    pub fn add(&self, handler: Box<dyn PlayerEventHandler>) {
        self.handlers.write().push(Arc::new(Mutex::new(handler)));
    }

    pub fn dispatch(&self, event: PlayerEvent) {
        self.dispatch_all(vec![event]);
    }

    pub fn dispatch_all(&self, events: Vec<PlayerEvent>) {
        if events.is_empty() {
            return;
        }
        let handlers = self.handlers.read().clone();
        for event in events {
            trace!("Event {:?} -> {} handler(s)", event, handlers.len());
            for handler in &handlers {
                handler.lock().handle_event(event.clone());
            }
        }
    }
}

/// Forwards events into a channel, for consumers that poll
pub struct ChannelEventHandler {
    tx: Sender<PlayerEvent>,
}

impl ChannelEventHandler {
    pub fn new(tx: Sender<PlayerEvent>) -> Self {
        Self { tx }
    }
}

impl PlayerEventHandler for ChannelEventHandler {
    fn handle_event(&mut self, event: PlayerEvent) {
        // A dropped receiver just means nobody is listening any more
        let _ = self.tx.send(event);
    }
}

/// Adapts a closure into a handler
pub struct CallbackHandler<F> {
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: FnMut(PlayerEvent) + Send,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> PlayerEventHandler for CallbackHandler<F>
where
    F: FnMut(PlayerEvent) + Send,
{
    fn handle_event(&mut self, event: PlayerEvent) {
        (self.callback)(event);
    }
}
