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

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum XmlError {
    #[error("invalid XML syntax: {0}")]
    BadXml(&'static str),
    #[error("invalid XML syntax: {0}")]
    Syntax(String),
    #[error("namespace prefix is not declared: {0}")]
    UnboundPrefix(String),
    #[error("parser failed earlier and must be reset")]
    ParserFailed,
    #[error("parser target is closed")]
    TargetClosed,
}

impl From<quick_xml::Error> for XmlError {
    fn from(err: quick_xml::Error) -> Self {
        XmlError::Syntax(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for XmlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        XmlError::Syntax(err.to_string())
    }
}

impl From<quick_xml::escape::EscapeError> for XmlError {
    fn from(err: quick_xml::escape::EscapeError) -> Self {
        XmlError::Syntax(err.to_string())
    }
}

impl From<std::str::Utf8Error> for XmlError {
    fn from(_: std::str::Utf8Error) -> Self {
        XmlError::BadXml(description::BAD_UTF8)
    }
}

pub(super) mod description {
    pub(in super::super) const BAD_UTF8: &str = "input is not valid UTF-8";
    pub(in super::super) const TAG_MISMATCH: &str = "start and end tags have different names";
    pub(in super::super) const UNEXPECTED_END: &str = "end tag without a start tag";
    pub(in super::super) const NO_START_TAG: &str = "document does not start with a tag";
    pub(in super::super) const MULTIPLE_ROOTS: &str = "document has more than one root element";
    pub(in super::super) const INCOMPLETE: &str = "document ended before the root element closed";
    pub(in super::super) const TEXT_OUTSIDE_ROOT: &str = "character data outside of the root element";
}
