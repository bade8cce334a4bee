/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::io::ErrorKind;
use std::io::Read;
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

use crate::Signal;

use super::StreamConfig;
use super::StreamError;
use super::StreamEvent;
use super::StreamParser;
use super::WorkerState;
use super::worker::Workers;

pub(super) type Source = Box<dyn Read + Send>;

/// Pumps bytes from a transport into a stream parser.
///
/// A read thread moves chunks of at most `read_chunk_size` bytes into a
/// bounded queue and a feed thread hands them to the parser. When the queue
/// is full the read thread blocks. The transport should have a read timeout
/// of about `poll_interval`, otherwise [stop](InputStreamReader::stop)
/// waits for the next read to return.
pub struct InputStreamReader {
    source: Arc<Mutex<Option<Source>>>,
    parser: Arc<Mutex<StreamParser>>,
    events: Arc<Signal<StreamEvent>>,
    config: StreamConfig,
    workers: Arc<Workers>,
}

impl InputStreamReader {
    pub(super) fn new(
        source: Arc<Mutex<Option<Source>>>,
        parser: Arc<Mutex<StreamParser>>,
        events: Arc<Signal<StreamEvent>>,
        config: StreamConfig,
    ) -> Self {
        InputStreamReader {
            source,
            parser,
            events,
            config,
            workers: Workers::new("reader"),
        }
    }

    pub fn state(&self) -> WorkerState {
        self.workers.state()
    }

    /// Starts the threads and waits until they are working.
    pub fn start(&self) -> Result<(), StreamError> {
        if !self.workers.begin_start() {
            return Ok(());
        }
        let Some(source) = lock(&self.source).take() else {
            self.workers.request_stop();
            return Err(StreamError::NoTransport);
        };
        let (sender, receiver) = sync_channel(self.config.feed_queue_capacity);
        let [read_guard, feed_guard] = self.workers.begin_work::<2>();

        let read_loop = ReadLoop {
            source: Some(source),
            slot: self.source.clone(),
            sender,
            workers: self.workers.clone(),
            chunk_size: self.config.read_chunk_size,
        };
        let feed_loop = FeedLoop {
            receiver,
            parser: self.parser.clone(),
            events: self.events.clone(),
            workers: self.workers.clone(),
            config: self.config.clone(),
        };

        let spawned = self
            .workers
            .spawn("read", read_guard, move || read_loop.run())
            .and_then(|()| self.workers.spawn("feed", feed_guard, move || feed_loop.run()));
        if let Err(err) = spawned {
            error!("Cannot start input stream: {err}");
            self.stop();
            return Err(err);
        }
        debug!("Input stream started");
        Ok(())
    }

    /// Asks the threads to exit and waits until both did.
    pub fn stop(&self) {
        if self.workers.request_stop() {
            self.workers
                .wait_for(WorkerState::Stopped, self.config.poll_interval, None);
            debug!("Input stream stopped");
        }
    }

    /// Waits until the threads exit by themselves, for example at the end
    /// of the input.
    pub fn wait(&self) {
        self.workers
            .wait_for(WorkerState::Stopped, self.config.poll_interval, None);
    }
}

impl Drop for InputStreamReader {
    fn drop(&mut self) {
        self.workers.request_stop();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ReadLoop {
    source: Option<Source>,
    slot: Arc<Mutex<Option<Source>>>,
    sender: SyncSender<Vec<u8>>,
    workers: Arc<Workers>,
    chunk_size: usize,
}

impl ReadLoop {
    fn run(mut self) {
        let Some(mut source) = self.source.take() else {
            return;
        };
        let mut buffer = vec![0u8; self.chunk_size.max(1)];
        while self.workers.is_working() {
            match source.read(&mut buffer) {
                Ok(0) => {
                    debug!("Input stream reached end of file");
                    break;
                }
                Ok(size) => {
                    trace!("Read: {}", String::from_utf8_lossy(&buffer[..size]));
                    if self.sender.send(buffer[..size].to_vec()).is_err() {
                        break;
                    }
                }
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) => {}
                Err(err) => {
                    error!("Input stream read failed: {err}");
                    break;
                }
            }
        }
        // kept for the next start
        *lock(&self.slot) = Some(source);
    }
}

struct FeedLoop {
    receiver: Receiver<Vec<u8>>,
    parser: Arc<Mutex<StreamParser>>,
    events: Arc<Signal<StreamEvent>>,
    workers: Arc<Workers>,
    config: StreamConfig,
}

impl FeedLoop {
    fn run(self) {
        loop {
            match self.receiver.recv_timeout(self.config.poll_interval) {
                Ok(bytes) => {
                    let (result, events) = {
                        let mut parser = lock(&self.parser);
                        let result = parser.feed(&bytes);
                        (result, parser.take_events())
                    };
                    for event in &events {
                        self.events.emit(event);
                    }
                    if let Err(err) = result {
                        warn!("Input stream parse failed: {err}");
                        self.workers.request_stop();
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if !self.workers.is_working() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }
}
