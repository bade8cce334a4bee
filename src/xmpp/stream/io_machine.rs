/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::io::Read;
use std::io::Write;
use std::sync::Arc;
use std::thread;

use log::warn;

use crate::Signal;

use super::Outgoing;
use super::StreamConfig;
use super::StreamError;
use super::StreamEvent;
use super::StreamMachine;
use super::WorkerState;

/// A stream event tagged with its direction.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum IoEvent {
    In(StreamEvent),
    Out(StreamEvent),
}

/// Something that can put items on the wire.
pub trait Transmit: Send + Sync {
    /// Returns once the item is handed to the writer.
    fn transmit(&self, item: Outgoing) -> Result<(), StreamError>;
}

/// The input and output machines of one connection.
pub struct IoStreamMachine {
    input: Arc<StreamMachine>,
    output: Arc<StreamMachine>,
    events: Arc<Signal<IoEvent>>,
}

impl IoStreamMachine {
    pub fn new<R, W>(source: R, sink: W, config: StreamConfig) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let input = Arc::new(StreamMachine::reader(source, config.clone()));
        let output = Arc::new(StreamMachine::writer(sink, config));
        let events: Arc<Signal<IoEvent>> = Arc::new(Signal::new());

        let sink_events = events.clone();
        input
            .events()
            .connect(move |event| sink_events.emit(&IoEvent::In(event.clone())));
        let sink_events = events.clone();
        output
            .events()
            .connect(move |event| sink_events.emit(&IoEvent::Out(event.clone())));

        IoStreamMachine {
            input,
            output,
            events,
        }
    }

    pub fn events(&self) -> &Signal<IoEvent> {
        &self.events
    }

    pub fn input(&self) -> &StreamMachine {
        &self.input
    }

    pub fn output(&self) -> &StreamMachine {
        &self.output
    }

    /// Starts reading first, so no answer to our header can be missed.
    pub fn start(&self) -> Result<(), StreamError> {
        self.input.start()?;
        if let Err(err) = self.output.start() {
            self.input.stop();
            return Err(err);
        }
        Ok(())
    }

    pub fn stop(&self) {
        self.output.stop();
        self.input.stop();
    }

    pub fn restart(&self) -> Result<(), StreamError> {
        self.stop();
        self.start()
    }

    /// Waits until both directions stopped.
    pub fn wait(&self) {
        self.input.wait();
        self.output.wait();
    }

    /// Common state of both directions, None while they differ.
    pub fn state(&self) -> Option<WorkerState> {
        let state = self.input.state();
        (state == self.output.state()).then_some(state)
    }

    pub fn is_input_open(&self) -> bool {
        self.input.is_open()
    }

    pub fn is_output_open(&self) -> bool {
        self.output.is_open()
    }

    /// Queues the item from a helper thread and returns at once.
    pub fn send(&self, item: Outgoing) {
        let output = self.output.clone();
        let spawned = thread::Builder::new()
            .name("ikstream-send".to_owned())
            .spawn(move || {
                if let Err(err) = output.send(item) {
                    warn!("Cannot send on output stream: {err}");
                }
            });
        if let Err(err) = spawned {
            warn!("Cannot start send thread: {err}");
        }
    }

    /// Returns once the writer thread dequeued the item.
    pub fn send_blocking(&self, item: Outgoing) -> Result<(), StreamError> {
        self.output.send(item)
    }
}

impl Transmit for IoStreamMachine {
    fn transmit(&self, item: Outgoing) -> Result<(), StreamError> {
        self.send_blocking(item)
    }
}

impl std::fmt::Debug for IoStreamMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoStreamMachine")
            .field("input", &self.input)
            .field("output", &self.output)
            .finish()
    }
}
