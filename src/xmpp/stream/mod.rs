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
mod io_machine;
mod machine;
mod reader;
mod target;
mod worker;
mod writer;

use std::time::Duration;

pub use error::StreamError;
pub use io_machine::IoEvent;
pub use io_machine::IoStreamMachine;
pub use io_machine::Transmit;
pub use machine::StreamMachine;
pub use machine::StreamMode;
pub use reader::InputStreamReader;
pub use target::StreamEvent;
pub use target::StreamParser;
pub use target::StreamParserTarget;
pub use worker::WorkerState;
pub use writer::Outgoing;
pub use writer::OutputStreamWriter;

/// Tuning of the stream pumps.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StreamConfig {
    /// Largest piece read from the transport at once.
    pub read_chunk_size: usize,
    /// Read chunks which may wait for the parser before reading blocks.
    pub feed_queue_capacity: usize,
    /// Upper bound of the delay before a worker notices a stop request.
    pub poll_interval: Duration,
}

impl StreamConfig {
    pub fn new() -> Self {
        StreamConfig {
            read_chunk_size: 4096,
            feed_queue_capacity: 64,
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    pub fn feed_queue_capacity(mut self, capacity: usize) -> Self {
        self.feed_queue_capacity = capacity;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new()
    }
}
