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

use crate::BadJid;

/// An element could not be turned into a stanza or one of its parts.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum StanzaMalformed {
    #[error("not a stanza element: {0}")]
    NotStanza(String),
    #[error("expected <{expected}/> but found {found}")]
    UnexpectedElement {
        expected: &'static str,
        found: String,
    },
    #[error("invalid stanza type: {0}")]
    InvalidType(String),
    #[error("invalid presence show value: {0}")]
    InvalidShow(String),
    #[error("invalid value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },
    #[error("invalid '{attribute}' address: {reason}")]
    InvalidJid {
        attribute: &'static str,
        reason: BadJid,
    },
}

/// The `<error/>` child of a stanza does not follow RFC 6120 section 8.3.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum StanzaErrorMalformed {
    #[error("not a stanza element")]
    NotStanza,
    #[error("stanza has no error element")]
    NoErrorElement,
    #[error("error element has no children")]
    NoChildren,
    #[error("error element has no type")]
    MissingType,
    #[error("invalid error type: {0}")]
    InvalidType(String),
    #[error("stanza error has invalid condition: {0}")]
    InvalidCondition(String),
}
