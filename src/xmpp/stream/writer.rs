/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::mpsc::SyncSender;
use std::sync::mpsc::sync_channel;

use log::debug;
use log::error;
use log::trace;
use log::warn;

use crate::Element;
use crate::Signal;
use crate::ToElement;

use super::StreamConfig;
use super::StreamError;
use super::StreamEvent;
use super::StreamParser;
use super::WorkerState;
use super::worker::Workers;

pub(super) type Sink = Box<dyn Write + Send>;

/// Something to write into an output stream.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Outgoing {
    Bytes(Vec<u8>),
    Text(String),
    Element(Element),
}

impl Outgoing {
    pub fn from_element<T: ToElement + ?Sized>(object: &T) -> Self {
        Outgoing::Element(object.to_element())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Outgoing::Bytes(bytes) => bytes,
            Outgoing::Text(text) => text.into_bytes(),
            Outgoing::Element(element) => element.to_string().into_bytes(),
        }
    }
}

impl From<Vec<u8>> for Outgoing {
    fn from(bytes: Vec<u8>) -> Self {
        Outgoing::Bytes(bytes)
    }
}

impl From<&[u8]> for Outgoing {
    fn from(bytes: &[u8]) -> Self {
        Outgoing::Bytes(bytes.to_vec())
    }
}

impl From<String> for Outgoing {
    fn from(text: String) -> Self {
        Outgoing::Text(text)
    }
}

impl From<&str> for Outgoing {
    fn from(text: &str) -> Self {
        Outgoing::Text(text.to_owned())
    }
}

impl From<Element> for Outgoing {
    fn from(element: Element) -> Self {
        Outgoing::Element(element)
    }
}

/// Writes items into a transport from a dedicated thread.
///
/// Everything written is parsed again, so the writer knows the state of
/// the stream it produces and reports it as [StreamEvent]s.
pub struct OutputStreamWriter {
    sink: Arc<Mutex<Option<Sink>>>,
    parser: Arc<Mutex<StreamParser>>,
    events: Arc<Signal<StreamEvent>>,
    config: StreamConfig,
    workers: Arc<Workers>,
    sender: Mutex<Option<SyncSender<Vec<u8>>>>,
}

impl OutputStreamWriter {
    pub(super) fn new(
        sink: Arc<Mutex<Option<Sink>>>,
        parser: Arc<Mutex<StreamParser>>,
        events: Arc<Signal<StreamEvent>>,
        config: StreamConfig,
    ) -> Self {
        OutputStreamWriter {
            sink,
            parser,
            events,
            config,
            workers: Workers::new("writer"),
            sender: Mutex::new(None),
        }
    }

    pub fn state(&self) -> WorkerState {
        self.workers.state()
    }

    pub fn start(&self) -> Result<(), StreamError> {
        if !self.workers.begin_start() {
            return Ok(());
        }
        let Some(sink) = lock(&self.sink).take() else {
            self.workers.request_stop();
            return Err(StreamError::NoTransport);
        };
        // zero capacity: send returns once the writer thread took the item
        let (sender, receiver) = sync_channel(0);
        let [guard] = self.workers.begin_work::<1>();
        let write_loop = WriteLoop {
            sink: Some(sink),
            slot: self.sink.clone(),
            receiver,
            parser: self.parser.clone(),
            events: self.events.clone(),
            workers: self.workers.clone(),
            config: self.config.clone(),
        };
        self.workers
            .spawn("write", guard, move || write_loop.run())
            .inspect_err(|err| error!("Cannot start output stream: {err}"))?;
        *lock(&self.sender) = Some(sender);
        debug!("Output stream started");
        Ok(())
    }

    pub fn stop(&self) {
        lock(&self.sender).take();
        if self.workers.request_stop() {
            self.workers
                .wait_for(WorkerState::Stopped, self.config.poll_interval, None);
            debug!("Output stream stopped");
        }
    }

    /// Waits until the writer thread exits, for example after a failed
    /// write.
    pub fn wait(&self) {
        self.workers
            .wait_for(WorkerState::Stopped, self.config.poll_interval, None);
    }

    /// Hands the item to the writer thread, blocking until it is dequeued.
    pub fn send(&self, item: Outgoing) -> Result<(), StreamError> {
        let sender = lock(&self.sender).clone().ok_or(StreamError::NotRunning)?;
        sender
            .send(item.into_bytes())
            .map_err(|_| StreamError::NotRunning)
    }
}

impl Drop for OutputStreamWriter {
    fn drop(&mut self) {
        lock(&self.sender).take();
        self.workers.request_stop();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct WriteLoop {
    sink: Option<Sink>,
    slot: Arc<Mutex<Option<Sink>>>,
    receiver: Receiver<Vec<u8>>,
    parser: Arc<Mutex<StreamParser>>,
    events: Arc<Signal<StreamEvent>>,
    workers: Arc<Workers>,
    config: StreamConfig,
}

impl WriteLoop {
    fn run(mut self) {
        let Some(mut sink) = self.sink.take() else {
            return;
        };
        loop {
            let bytes = match self.receiver.recv_timeout(self.config.poll_interval) {
                Ok(bytes) => bytes,
                Err(RecvTimeoutError::Timeout) => {
                    if !self.workers.is_working() {
                        break;
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            };
            trace!("Write: {}", String::from_utf8_lossy(&bytes));
            if let Err(err) = sink.write_all(&bytes).and_then(|()| sink.flush()) {
                error!("Output stream write failed: {err}");
                self.workers.request_stop();
                break;
            }
            if !self.parse(&bytes) {
                self.workers.request_stop();
                break;
            }
        }
        *lock(&self.slot) = Some(sink);
    }

    fn parse(&self, bytes: &[u8]) -> bool {
        let (result, events) = {
            let mut parser = lock(&self.parser);
            let result = parser.feed(bytes);
            (result, parser.take_events())
        };
        for event in &events {
            self.events.emit(event);
        }
        match result {
            Ok(()) => true,
            Err(err) => {
                warn!("Output stream parse failed: {err}");
                false
            }
        }
    }
}
