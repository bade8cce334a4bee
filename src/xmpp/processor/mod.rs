/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod error;

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::Weak;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::mpsc::SyncSender;
use std::sync::mpsc::sync_channel;
use std::thread;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::debug;
use log::warn;
use uuid::Uuid;

pub use error::ProcessorError;

use crate::Element;
use crate::Signal;
use crate::SubscriptionId;

use super::protocol::is_stanza_element;
use super::stanza::Stanza;
use super::stanza::StanzaKind;
use super::stream::IoEvent;
use super::stream::IoStreamMachine;
use super::stream::Outgoing;
use super::stream::StreamError;
use super::stream::StreamEvent;
use super::stream::Transmit;

/// Notifications of a [StanzaProcessor].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ProcessorEvent {
    /// An incoming stanza nobody waits for, or one whose waiter asked for
    /// it to be reported anyway.
    NewStanza(Stanza),
    /// A stanza element which could not be parsed.
    DefectiveStanza(Element),
}

/// How [StanzaProcessor::send] sets the id of the stanza.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub enum IdMode {
    /// Keep the id of the stanza, even if it has none.
    FromStanza,
    /// Generate an id if the stanza has none.
    #[default]
    Generate,
    /// Always generate a new id.
    GenerateImplicit,
    /// Use the given id.
    Implicit(String),
}

/// How long [StanzaProcessor::send] waits for a reply.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub enum Wait {
    #[default]
    No,
    /// [ProcessorConfig::default_wait], with a freshly generated id.
    Default,
    For(Duration),
    Forever,
}

impl From<bool> for Wait {
    fn from(wait: bool) -> Self {
        if wait { Wait::Default } else { Wait::No }
    }
}

/// Seconds to wait: zero does not wait and negative waits forever.
impl From<i64> for Wait {
    fn from(seconds: i64) -> Self {
        match seconds {
            0 => Wait::No,
            seconds if seconds < 0 => Wait::Forever,
            seconds => Wait::For(Duration::from_secs(seconds.unsigned_abs())),
        }
    }
}

impl From<Duration> for Wait {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() {
            Wait::No
        } else {
            Wait::For(duration)
        }
    }
}

/// Options of [StanzaProcessor::send].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SendOptions {
    pub id_mode: IdMode,
    pub wait: Wait,
    /// Report the reply as [ProcessorEvent::NewStanza] too.
    pub emit_reply_anyway: bool,
    /// Report replies which are messages as [ProcessorEvent::NewStanza].
    pub emit_reply_message: bool,
}

impl SendOptions {
    pub fn new() -> Self {
        SendOptions {
            id_mode: IdMode::Generate,
            wait: Wait::No,
            emit_reply_anyway: false,
            emit_reply_message: true,
        }
    }

    pub fn id_mode(mut self, id_mode: IdMode) -> Self {
        self.id_mode = id_mode;
        self
    }

    pub fn wait(mut self, wait: impl Into<Wait>) -> Self {
        self.wait = wait.into();
        self
    }

    pub fn emit_reply_anyway(mut self, emit: bool) -> Self {
        self.emit_reply_anyway = emit;
        self
    }

    pub fn emit_reply_message(mut self, emit: bool) -> Self {
        self.emit_reply_message = emit;
        self
    }
}

impl Default for SendOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of [StanzaProcessor::send].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SendResult {
    /// Sent without waiting, with the final id of the stanza.
    Sent(Option<String>),
    Reply(Stanza),
    TimedOut,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ProcessorConfig {
    /// Timeout of [Wait::Default].
    pub default_wait: Duration,
    /// Incoming elements which may wait for dispatching before the input
    /// stream blocks.
    pub dispatch_queue_capacity: usize,
}

impl ProcessorConfig {
    pub fn new() -> Self {
        ProcessorConfig {
            default_wait: Duration::from_secs(10),
            dispatch_queue_capacity: 256,
        }
    }

    pub fn default_wait(mut self, wait: Duration) -> Self {
        self.default_wait = wait;
        self
    }

    pub fn dispatch_queue_capacity(mut self, capacity: usize) -> Self {
        self.dispatch_queue_capacity = capacity;
        self
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self::new()
    }
}

struct WaitEntry {
    reply: SyncSender<Stanza>,
    emit_reply_anyway: bool,
    emit_reply_message: bool,
}

struct Connection {
    machine: Option<Arc<IoStreamMachine>>,
    subscription: Option<SubscriptionId>,
    sink: Arc<dyn Transmit>,
}

struct Inner {
    config: ProcessorConfig,
    events: Signal<ProcessorEvent>,
    waits: DashMap<String, WaitEntry>,
    epoch: String,
    counter: AtomicU64,
    connection: Mutex<Option<Connection>>,
    queue: SyncSender<Element>,
}

/// Removes a wait entry when the sender stops waiting, however it stops.
struct Registration<'a> {
    waits: &'a DashMap<String, WaitEntry>,
    id: String,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        debug!("Removing {} from wait table", self.id);
        self.waits.remove(&self.id);
    }
}

/// Sends stanzas and matches the replies to them.
///
/// Incoming elements are dispatched by a single thread. Handlers of
/// [events](StanzaProcessor::events) run on that thread, so they must not
/// wait for replies themselves.
pub struct StanzaProcessor {
    inner: Arc<Inner>,
}

impl StanzaProcessor {
    pub fn new(config: ProcessorConfig) -> Result<Self, ProcessorError> {
        let (queue, receiver) = sync_channel(config.dispatch_queue_capacity);
        let inner = Arc::new(Inner {
            config,
            events: Signal::new(),
            waits: DashMap::new(),
            epoch: Uuid::new_v4().simple().to_string(),
            counter: AtomicU64::new(0),
            connection: Mutex::new(None),
            queue,
        });
        let weak = Arc::downgrade(&inner);
        thread::Builder::new()
            .name("ikstream-dispatch".to_owned())
            .spawn(move || dispatch_loop(weak, receiver))
            .map_err(|err| StreamError::Spawn(Arc::new(err)))?;
        Ok(StanzaProcessor { inner })
    }

    pub fn events(&self) -> &Signal<ProcessorEvent> {
        &self.inner.events
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.inner.config
    }

    fn connection(&self) -> MutexGuard<'_, Option<Connection>> {
        self.inner
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends through the machine and processes the elements it reads.
    pub fn connect_io_machine(&self, machine: Arc<IoStreamMachine>) {
        self.disconnect_io_machine();
        let weak = Arc::downgrade(&self.inner);
        let subscription = machine.events().connect(move |event| {
            if let IoEvent::In(StreamEvent::ElementRead(element)) = event
                && let Some(inner) = weak.upgrade()
            {
                inner.enqueue(element.clone());
            }
        });
        *self.connection() = Some(Connection {
            machine: Some(machine.clone()),
            subscription: Some(subscription),
            sink: machine,
        });
    }

    /// Sends through `sink`. Incoming elements are passed to
    /// [receive](StanzaProcessor::receive) by the caller.
    pub fn connect_sink(&self, sink: Arc<dyn Transmit>) {
        self.disconnect_io_machine();
        *self.connection() = Some(Connection {
            machine: None,
            subscription: None,
            sink,
        });
    }

    pub fn disconnect_io_machine(&self) {
        if let Some(connection) = self.connection().take()
            && let (Some(machine), Some(subscription)) =
                (connection.machine, connection.subscription)
        {
            machine.events().disconnect(subscription);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection().is_some()
    }

    /// Queues an incoming element for dispatching.
    pub fn receive(&self, element: Element) {
        self.inner.enqueue(element);
    }

    /// Number of sends currently waiting for a reply.
    pub fn pending(&self) -> usize {
        self.inner.waits.len()
    }

    fn next_id(&self) -> String {
        let serial = self.inner.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-stanza-{:#x}", self.inner.epoch, serial)
    }

    /// Sends a stanza, assigning its id first.
    ///
    /// Without waiting the result is [SendResult::Sent] with the final id.
    /// Otherwise the call blocks until the reply with the same id arrives or
    /// the timeout expires.
    pub fn send(
        &self,
        stanza: &mut Stanza,
        options: SendOptions,
    ) -> Result<SendResult, ProcessorError> {
        let sink = self
            .connection()
            .as_ref()
            .map(|connection| connection.sink.clone())
            .ok_or(ProcessorError::NotConnected)?;

        let (id_mode, timeout) = match options.wait {
            Wait::No => (options.id_mode, None),
            Wait::Default => (
                IdMode::GenerateImplicit,
                Some(Some(self.inner.config.default_wait)),
            ),
            Wait::For(duration) if duration.is_zero() => (options.id_mode, None),
            Wait::For(duration) => (options.id_mode, Some(Some(duration))),
            Wait::Forever => (options.id_mode, Some(None)),
        };

        match id_mode {
            IdMode::FromStanza => {}
            IdMode::Generate => {
                if stanza.id().is_none_or(str::is_empty) {
                    stanza.set_id(Some(&self.next_id()));
                }
            }
            IdMode::GenerateImplicit => stanza.set_id(Some(&self.next_id())),
            IdMode::Implicit(id) => stanza.set_id(Some(&id)),
        }
        let id = stanza.id().map(str::to_owned);

        let Some(timeout) = timeout else {
            sink.transmit(Outgoing::Text(stanza.to_xml_string()))?;
            return Ok(SendResult::Sent(id));
        };

        let id = id.ok_or(ProcessorError::MissingId)?;
        let (reply, receiver) = sync_channel(1);
        match self.inner.waits.entry(id.clone()) {
            Entry::Occupied(_) => return Err(ProcessorError::DuplicateId(id)),
            Entry::Vacant(entry) => {
                debug!("Adding {id} to wait table");
                entry.insert(WaitEntry {
                    reply,
                    emit_reply_anyway: options.emit_reply_anyway,
                    emit_reply_message: options.emit_reply_message,
                });
            }
        }
        let _registration = Registration {
            waits: &self.inner.waits,
            id,
        };

        sink.transmit(Outgoing::Text(stanza.to_xml_string()))?;
        Ok(wait_reply(&receiver, timeout))
    }
}

fn wait_reply(receiver: &Receiver<Stanza>, timeout: Option<Duration>) -> SendResult {
    match timeout {
        Some(timeout) => match receiver.recv_timeout(timeout) {
            Ok(stanza) => SendResult::Reply(stanza),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                SendResult::TimedOut
            }
        },
        None => match receiver.recv() {
            Ok(stanza) => SendResult::Reply(stanza),
            Err(_) => SendResult::TimedOut,
        },
    }
}

impl std::fmt::Debug for StanzaProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StanzaProcessor")
            .field("epoch", &self.inner.epoch)
            .field("pending", &self.inner.waits.len())
            .finish()
    }
}

impl Inner {
    fn enqueue(&self, element: Element) {
        if self.queue.send(element).is_err() {
            warn!("Stanza dispatcher is gone, dropping element");
        }
    }

    fn dispatch(&self, element: Element) {
        if !is_stanza_element(&element) {
            debug!("Ignoring non-stanza element {}", element.clark_name());
            return;
        }
        let stanza = match Stanza::from_element(&element) {
            Ok(stanza) => stanza,
            Err(err) => {
                warn!(
                    "Defective stanza from `{}': {err}",
                    element.attribute("from").unwrap_or("")
                );
                self.events.emit(&ProcessorEvent::DefectiveStanza(element));
                return;
            }
        };

        let waiter = stanza.id().and_then(|id| {
            self.waits.get(id).map(|entry| {
                (
                    entry.reply.clone(),
                    entry.emit_reply_anyway,
                    entry.emit_reply_message,
                )
            })
        });
        match waiter {
            None => self.events.emit(&ProcessorEvent::NewStanza(stanza)),
            Some((reply, emit_anyway, emit_message)) => {
                if emit_anyway || (emit_message && stanza.kind() == StanzaKind::Message) {
                    self.events.emit(&ProcessorEvent::NewStanza(stanza.clone()));
                }
                debug!("Delivering reply {}", stanza.id().unwrap_or(""));
                // a full slot means an earlier reply is already waiting
                let _ = reply.try_send(stanza);
            }
        }
    }
}

fn dispatch_loop(inner: Weak<Inner>, receiver: Receiver<Element>) {
    while let Ok(element) = receiver.recv() {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.dispatch(element);
    }
    debug!("Stanza dispatcher exited");
}

#[cfg(test)]
mod tests;
