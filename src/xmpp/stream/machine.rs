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
use std::sync::Mutex;
use std::sync::PoisonError;

use log::debug;

use crate::Element;
use crate::Signal;

use super::InputStreamReader;
use super::Outgoing;
use super::OutputStreamWriter;
use super::StreamConfig;
use super::StreamError;
use super::StreamEvent;
use super::StreamParser;
use super::WorkerState;
use super::reader::Source;
use super::writer::Sink;

/// Direction of a [StreamMachine].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum StreamMode {
    Reader,
    Writer,
}

impl StreamMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamMode::Reader => "reader",
            StreamMode::Writer => "writer",
        }
    }
}

enum Transport {
    Source(Arc<Mutex<Option<Source>>>),
    Sink(Arc<Mutex<Option<Sink>>>),
}

#[derive(Clone)]
enum Pump {
    Reader(Arc<InputStreamReader>),
    Writer(Arc<OutputStreamWriter>),
}

impl Pump {
    fn state(&self) -> WorkerState {
        match self {
            Pump::Reader(reader) => reader.state(),
            Pump::Writer(writer) => writer.state(),
        }
    }

    fn stop(&self) {
        match self {
            Pump::Reader(reader) => reader.stop(),
            Pump::Writer(writer) => writer.stop(),
        }
    }

    fn wait(&self) {
        match self {
            Pump::Reader(reader) => reader.wait(),
            Pump::Writer(writer) => writer.wait(),
        }
    }
}

struct Run {
    parser: Arc<Mutex<StreamParser>>,
    pump: Pump,
}

/// One direction of an XMPP stream.
///
/// Every start begins a new document with a fresh parser, as required when
/// a stream is restarted after TLS or SASL negotiation. Handlers connected
/// to [events](StreamMachine::events) stay connected across restarts.
pub struct StreamMachine {
    mode: StreamMode,
    config: StreamConfig,
    transport: Transport,
    events: Arc<Signal<StreamEvent>>,
    run: Mutex<Option<Run>>,
}

impl StreamMachine {
    pub fn reader<R: Read + Send + 'static>(source: R, config: StreamConfig) -> Self {
        let source: Source = Box::new(source);
        Self::new(
            StreamMode::Reader,
            Transport::Source(Arc::new(Mutex::new(Some(source)))),
            config,
        )
    }

    pub fn writer<W: Write + Send + 'static>(sink: W, config: StreamConfig) -> Self {
        let sink: Sink = Box::new(sink);
        Self::new(
            StreamMode::Writer,
            Transport::Sink(Arc::new(Mutex::new(Some(sink)))),
            config,
        )
    }

    fn new(mode: StreamMode, transport: Transport, config: StreamConfig) -> Self {
        StreamMachine {
            mode,
            config,
            transport,
            events: Arc::new(Signal::new()),
            run: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    pub fn events(&self) -> &Signal<StreamEvent> {
        &self.events
    }

    fn pump(&self) -> Option<Pump> {
        self.run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|run| run.pump.clone())
    }

    /// Starts a new stream document. Does nothing if already running.
    pub fn start(&self) -> Result<(), StreamError> {
        let mut run = self.run.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = run.as_ref()
            && current.pump.state() != WorkerState::Stopped
        {
            return Ok(());
        }
        let parser = Arc::new(Mutex::new(StreamParser::new()));
        let pump = match &self.transport {
            Transport::Source(source) => {
                let reader = InputStreamReader::new(
                    source.clone(),
                    parser.clone(),
                    self.events.clone(),
                    self.config.clone(),
                );
                reader.start()?;
                Pump::Reader(Arc::new(reader))
            }
            Transport::Sink(sink) => {
                let writer = OutputStreamWriter::new(
                    sink.clone(),
                    parser.clone(),
                    self.events.clone(),
                    self.config.clone(),
                );
                writer.start()?;
                Pump::Writer(Arc::new(writer))
            }
        };
        debug!("{} stream machine started", self.mode.as_str());
        *run = Some(Run { parser, pump });
        Ok(())
    }

    pub fn stop(&self) {
        if let Some(pump) = self.pump() {
            pump.stop();
            debug!("{} stream machine stopped", self.mode.as_str());
        }
    }

    pub fn restart(&self) -> Result<(), StreamError> {
        self.stop();
        self.start()
    }

    /// Blocks until the pump stops, by [stop](StreamMachine::stop) or by
    /// itself.
    pub fn wait(&self) {
        if let Some(pump) = self.pump() {
            pump.wait();
        }
    }

    pub fn state(&self) -> WorkerState {
        self.pump().map_or(WorkerState::Stopped, |pump| pump.state())
    }

    /// True between the stream header and the stream end tag.
    pub fn is_open(&self) -> bool {
        let run = self.run.lock().unwrap_or_else(PoisonError::into_inner);
        run.as_ref().is_some_and(|run| {
            run.parser
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_open()
        })
    }

    /// The header of the current stream document, once parsed.
    pub fn header(&self) -> Option<Element> {
        let run = self.run.lock().unwrap_or_else(PoisonError::into_inner);
        run.as_ref().and_then(|run| {
            run.parser
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .target()
                .header()
                .cloned()
        })
    }

    /// Writes an item, returning once the writer thread dequeued it.
    pub fn send(&self, item: Outgoing) -> Result<(), StreamError> {
        match self.pump() {
            Some(Pump::Writer(writer)) => writer.send(item),
            Some(Pump::Reader(_)) => Err(StreamError::WrongMode(self.mode.as_str())),
            None if self.mode == StreamMode::Reader => {
                Err(StreamError::WrongMode(self.mode.as_str()))
            }
            None => Err(StreamError::NotRunning),
        }
    }
}

impl std::fmt::Debug for StreamMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamMachine")
            .field("mode", &self.mode)
            .field("state", &self.state())
            .finish()
    }
}
