/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// Handle returned by [Signal::connect], used to disconnect the handler.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SubscriptionId(u64);

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// A list of callbacks interested in one kind of event.
///
/// Handlers are called synchronously on the emitting thread, in the order
/// they were connected. A handler may connect or disconnect handlers of the
/// same signal; the change takes effect from the next emission.
pub struct Signal<E> {
    handlers: Mutex<Vec<(SubscriptionId, Handler<E>)>>,
    next_id: AtomicU64,
}

impl<E> Signal<E> {
    pub fn new() -> Self {
        Signal {
            handlers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn connect<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(handler)));
        id
    }

    /// Returns false if the handler was not connected.
    pub fn disconnect(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.lock();
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    pub fn emit(&self, event: &E) {
        let handlers: Vec<Handler<E>> = self
            .lock()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Handler<E>)>> {
        self.handlers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<E> Default for Signal<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Signal<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signal ({} handlers)", self.len())
    }
}
