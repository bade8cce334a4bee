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
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::thread;
use std::time::Duration;

use log::debug;

use super::StreamError;

/// Life cycle of a pump.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum WorkerState {
    Stopped,
    Starting,
    Working,
    Stopping,
}

struct Inner {
    state: WorkerState,
    live: usize,
}

/// State of a group of worker threads.
///
/// The state drops to `Stopped` by itself when the last thread of the group
/// exits, see [ThreadExit].
pub(super) struct Workers {
    name: &'static str,
    inner: Mutex<Inner>,
    changed: Condvar,
}

impl Workers {
    pub(super) fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Workers {
            name,
            inner: Mutex::new(Inner {
                state: WorkerState::Stopped,
                live: 0,
            }),
            changed: Condvar::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn state(&self) -> WorkerState {
        self.lock().state
    }

    pub(super) fn is_working(&self) -> bool {
        self.state() == WorkerState::Working
    }

    fn set_locked(&self, inner: &mut Inner, state: WorkerState) {
        if inner.state != state {
            debug!("{} worker: {:?} -> {:?}", self.name, inner.state, state);
            inner.state = state;
            self.changed.notify_all();
        }
    }

    /// Moves from `Stopped` to `Starting`, false if the workers were not
    /// stopped.
    pub(super) fn begin_start(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != WorkerState::Stopped {
            return false;
        }
        self.set_locked(&mut inner, WorkerState::Starting);
        true
    }

    /// Registers `N` threads about to be spawned and marks the group as
    /// working. Each returned guard must be moved into its thread.
    pub(super) fn begin_work<const N: usize>(self: &Arc<Self>) -> [ThreadExit; N] {
        let mut inner = self.lock();
        inner.live += N;
        self.set_locked(&mut inner, WorkerState::Working);
        std::array::from_fn(|_| ThreadExit(self.clone()))
    }

    /// Asks running threads to exit, false if there were none.
    pub(super) fn request_stop(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            WorkerState::Stopped => false,
            WorkerState::Stopping => true,
            WorkerState::Starting | WorkerState::Working => {
                if inner.live == 0 {
                    self.set_locked(&mut inner, WorkerState::Stopped);
                    false
                } else {
                    self.set_locked(&mut inner, WorkerState::Stopping);
                    true
                }
            }
        }
    }

    /// Blocks until the state is `target`, rechecking at least every
    /// `poll_interval`. None waits forever.
    pub(super) fn wait_for(
        &self,
        target: WorkerState,
        poll_interval: Duration,
        limit: Option<Duration>,
    ) -> bool {
        let deadline = limit.map(|limit| std::time::Instant::now() + limit);
        let mut inner = self.lock();
        while inner.state != target {
            if let Some(deadline) = deadline
                && std::time::Instant::now() >= deadline
            {
                return false;
            }
            inner = self
                .changed
                .wait_timeout(inner, poll_interval)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    /// Starts a named thread of the group.
    pub(super) fn spawn<F>(&self, role: &str, guard: ThreadExit, body: F) -> Result<(), StreamError>
    where
        F: FnOnce() + Send + 'static,
    {
        thread::Builder::new()
            .name(format!("ikstream-{}-{role}", self.name))
            .spawn(move || {
                let _guard = guard;
                body();
            })
            .map(|_| ())
            .map_err(StreamError::spawn)
    }
}

/// Marks the exit of a worker thread when dropped.
pub(super) struct ThreadExit(Arc<Workers>);

impl Drop for ThreadExit {
    fn drop(&mut self) {
        let workers = &self.0;
        let mut inner = workers.lock();
        inner.live = inner.live.saturating_sub(1);
        if inner.live == 0 {
            workers.set_locked(&mut inner, WorkerState::Stopped);
        }
    }
}
