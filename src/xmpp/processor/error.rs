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

use crate::xmpp::stream::StreamError;

#[derive(Debug, Clone, Error)]
pub enum ProcessorError {
    #[error("stanza processor is not connected to a stream")]
    NotConnected,
    #[error("cannot wait for a reply to a stanza without id")]
    MissingId,
    #[error("a reply to stanza '{0}' is already awaited")]
    DuplicateId(String),
    #[error(transparent)]
    Stream(#[from] StreamError),
}
