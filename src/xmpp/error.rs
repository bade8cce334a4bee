/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use thiserror::Error;

use super::ProcessorError;
use super::StanzaError;
use super::StanzaErrorMalformed;
use super::StanzaMalformed;
use super::StreamError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    #[error("no reply in time")]
    Timeout,
    #[error("request rejected: {0}")]
    Rejected(StanzaError),
    #[error("malformed reply: {0}")]
    Malformed(#[from] StanzaMalformed),
    #[error("malformed error reply: {0}")]
    MalformedError(#[from] StanzaErrorMalformed),
    #[error("unexpected reply: {0}")]
    Unexpected(&'static str),
}

pub(super) mod description {
    pub(in super::super) const NO_ADDRESS: &str = "server name has no address";
    pub(in super::super) const NO_BIND: &str = "bind result without bind payload";
    pub(in super::super) const NO_JID: &str = "bind result without jid";
}
