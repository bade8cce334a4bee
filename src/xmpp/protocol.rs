/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use crate::Element;
use crate::Jid;
use crate::ToElement;
use crate::xml::escaped;

use super::StanzaMalformed;
use super::constants::BIND_NS;
use super::constants::CLIENT_NS;
use super::constants::DEFAULT_LANG;
use super::constants::SERVER_NS;
use super::constants::SESSION_NS;
use super::constants::STANZA_NAMES;
use super::constants::STREAM_ERROR_NAMES;
use super::constants::STREAM_ERRORS_NS;
use super::constants::STREAM_NS;
use super::constants::STREAM_VERSION;
use super::constants::TLS_NS;

/// Opening tag of an XMPP stream.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StreamHeader {
    pub from: String,
    pub to: String,
    pub version: String,
    pub lang: String,
    pub xmlns: String,
}

impl StreamHeader {
    pub fn new(from: &str, to: &str) -> Self {
        StreamHeader {
            from: from.to_owned(),
            to: to.to_owned(),
            version: STREAM_VERSION.to_owned(),
            lang: DEFAULT_LANG.to_owned(),
            xmlns: CLIENT_NS.to_owned(),
        }
    }

    pub fn xmlns(mut self, xmlns: &str) -> Self {
        self.xmlns = xmlns.to_owned();
        self
    }

    pub fn lang(mut self, lang: &str) -> Self {
        self.lang = lang.to_owned();
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_owned();
        self
    }

    /// XML declaration followed by the unclosed `stream:stream` tag.
    pub fn to_xml(&self) -> String {
        format!(
            "<?xml version=\"1.0\"?><stream:stream from=\"{}\" to=\"{}\" version=\"{}\" \
             xml:lang=\"{}\" xmlns=\"{}\" xmlns:stream=\"{}\">",
            escaped(&self.from),
            escaped(&self.to),
            escaped(&self.version),
            escaped(&self.lang),
            escaped(&self.xmlns),
            STREAM_NS,
        )
    }
}

/// Client stream opening with the default version, language and namespace.
pub fn start_stream_header(from: &str, to: &str) -> String {
    StreamHeader::new(from, to).to_xml()
}

pub fn stop_stream_tag() -> &'static str {
    "</stream:stream>"
}

/// True for message, presence and iq elements of client or server streams.
pub fn is_stanza_element(element: &Element) -> bool {
    (element.ns() == CLIENT_NS || element.ns() == SERVER_NS)
        && STANZA_NAMES.contains(&element.name())
}

pub fn is_features_element(element: &Element) -> bool {
    element.is("features", STREAM_NS)
}

/// Condition of a stream level error.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum StreamErrorName {
    /// One of [STREAM_ERROR_NAMES].
    Standard(&'static str),
    /// The peer used a condition RFC 6120 does not define.
    NonStandard(String),
    /// The error had no condition element.
    Absent,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StreamErrorInfo {
    pub name: StreamErrorName,
    pub text: Option<String>,
}

/// Recognizes a `<stream:error/>` element as described in RFC 6120
/// section 4.9. Returns None for any other element.
pub fn determine_stream_error(element: &Element) -> Option<StreamErrorInfo> {
    if !element.is("error", STREAM_NS) {
        return None;
    }
    let mut name = StreamErrorName::Absent;
    let mut text = None;
    for child in element.children() {
        if child.ns() != STREAM_ERRORS_NS {
            continue;
        }
        if child.name() == "text" {
            text = Some(child.text());
        } else if name == StreamErrorName::Absent {
            name = match STREAM_ERROR_NAMES.iter().find(|known| **known == child.name()) {
                Some(known) => StreamErrorName::Standard(known),
                None => StreamErrorName::NonStandard(child.name().to_owned()),
            };
        }
    }
    Some(StreamErrorInfo { name, text })
}

fn expect_element(
    element: &Element,
    name: &'static str,
    ns: &str,
) -> Result<(), StanzaMalformed> {
    if !element.is(name, ns) {
        return Err(StanzaMalformed::UnexpectedElement {
            expected: name,
            found: element.clark_name(),
        });
    }
    Ok(())
}

/// The STARTTLS request and stream feature.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct StartTls;

impl StartTls {
    pub fn from_element(element: &Element) -> Result<Self, StanzaMalformed> {
        expect_element(element, "starttls", TLS_NS)?;
        Ok(StartTls)
    }
}

impl ToElement for StartTls {
    fn to_element(&self) -> Element {
        Element::new("starttls", TLS_NS)
    }
}

/// Resource binding payload.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Bind {
    /// Request, optionally asking for a specific resource.
    Resource(Option<String>),
    /// Result carrying the full JID assigned by the server.
    Jid(Jid),
}

impl Bind {
    pub fn from_element(element: &Element) -> Result<Self, StanzaMalformed> {
        expect_element(element, "bind", BIND_NS)?;
        if let Some(jid) = element.get_child("jid", BIND_NS) {
            let jid = jid
                .text()
                .trim()
                .parse()
                .map_err(|reason| StanzaMalformed::InvalidJid {
                    attribute: "jid",
                    reason,
                })?;
            return Ok(Bind::Jid(jid));
        }
        let resource = element
            .get_child("resource", BIND_NS)
            .map(|resource| resource.text())
            .filter(|resource| !resource.is_empty());
        Ok(Bind::Resource(resource))
    }
}

impl ToElement for Bind {
    fn to_element(&self) -> Element {
        let element = Element::new("bind", BIND_NS);
        match self {
            Bind::Resource(None) => element,
            Bind::Resource(Some(resource)) => {
                element.with_child(Element::new("resource", BIND_NS).with_text(resource))
            }
            Bind::Jid(jid) => {
                element.with_child(Element::new("jid", BIND_NS).with_text(&jid.to_string()))
            }
        }
    }
}

/// Session establishment request of RFC 3920.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct Session;

impl Session {
    pub fn from_element(element: &Element) -> Result<Self, StanzaMalformed> {
        expect_element(element, "session", SESSION_NS)?;
        Ok(Session)
    }
}

impl ToElement for Session {
    fn to_element(&self) -> Element {
        Element::new("session", SESSION_NS)
    }
}
