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

use thiserror::Error;

use crate::XmlError;

/// Failures of the stream pumps and machines.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    #[error("stream I/O failed: {0}")]
    Io(Arc<std::io::Error>),
    #[error("invalid stream XML: {0}")]
    Xml(#[from] XmlError),
    #[error("stream is not running")]
    NotRunning,
    #[error("operation is not supported by a {0} stream")]
    WrongMode(&'static str),
    #[error("cannot start stream thread: {0}")]
    Spawn(Arc<std::io::Error>),
    #[error("stream has no transport")]
    NoTransport,
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::Io(Arc::new(err))
    }
}

impl StreamError {
    pub(super) fn spawn(err: std::io::Error) -> Self {
        StreamError::Spawn(Arc::new(err))
    }
}
