/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::mem;

use crate::Element;
use crate::xml::NamespaceDecl;
use crate::xml::ParserTarget;
use crate::xml::TreeBuilder;
use crate::xml::XmlError;
use crate::xml::XmlParser;
use crate::xmpp::constants::STREAM_NS;

/// Events produced while parsing an XMPP stream.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum StreamEvent {
    /// The `<stream:stream>` header, with its attributes.
    Start(Element),
    /// The document did not start with a stream header.
    Error(Element),
    /// A complete top level element of the stream.
    ElementRead(Element),
    /// The stream was closed.
    Stop,
}

/// Turns the parsing events of a stream document into [StreamEvent]s.
///
/// Only first level children of an open stream are reported. Events are
/// queued until [take_events](StreamParserTarget::take_events) is called.
pub struct StreamParserTarget {
    depth: usize,
    open: bool,
    closed: bool,
    header: Option<Element>,
    namespaces: Vec<NamespaceDecl>,
    builder: TreeBuilder,
    events: Vec<StreamEvent>,
}

impl StreamParserTarget {
    pub fn new() -> Self {
        StreamParserTarget {
            depth: 0,
            open: false,
            closed: false,
            header: None,
            namespaces: Vec::new(),
            builder: TreeBuilder::new(),
            events: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The stream header element, once received.
    pub fn header(&self) -> Option<&Element> {
        self.header.as_ref()
    }

    /// Namespace declarations made by the stream header.
    pub fn namespaces(&self) -> &[NamespaceDecl] {
        &self.namespaces
    }

    pub fn take_events(&mut self) -> Vec<StreamEvent> {
        mem::take(&mut self.events)
    }

    fn check_closed(&self) -> Result<(), XmlError> {
        if self.closed {
            return Err(XmlError::TargetClosed);
        }
        Ok(())
    }
}

impl Default for StreamParserTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserTarget for StreamParserTarget {
    fn start(&mut self, tag: Element, namespaces: &[NamespaceDecl]) -> Result<(), XmlError> {
        self.check_closed()?;
        if self.depth == 0 {
            self.depth = 1;
            self.builder = TreeBuilder::new();
            if tag.is("stream", STREAM_NS) {
                self.open = true;
                self.namespaces = namespaces.to_vec();
                self.header = Some(tag.clone());
                self.events.push(StreamEvent::Start(tag));
            } else {
                self.open = false;
                self.events.push(StreamEvent::Error(tag));
            }
            return Ok(());
        }
        self.depth += 1;
        self.builder.open_element(tag)
    }

    fn end(&mut self, name: &str, ns: &str) -> Result<(), XmlError> {
        self.check_closed()?;
        match self.depth {
            0 => Ok(()),
            1 => {
                self.depth = 0;
                if name == "stream" && ns == STREAM_NS {
                    self.open = false;
                    self.closed = true;
                    self.events.push(StreamEvent::Stop);
                }
                Ok(())
            }
            _ => {
                self.depth -= 1;
                self.builder.close_element()?;
                if self.depth == 1 {
                    let element = self.builder.take_root()?;
                    if self.open {
                        self.events.push(StreamEvent::ElementRead(element));
                    }
                }
                Ok(())
            }
        }
    }

    fn data(&mut self, text: &str) -> Result<(), XmlError> {
        self.check_closed()?;
        // whitespace between stanzas is ignored
        if self.depth > 1 {
            self.builder.append_text(text)?;
        }
        Ok(())
    }

    fn comment(&mut self, text: &str) -> Result<(), XmlError> {
        self.check_closed()?;
        if self.depth > 1 {
            self.builder.append_comment(text);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), XmlError> {
        self.check_closed()?;
        if self.open {
            self.events.push(StreamEvent::Stop);
        }
        self.open = false;
        self.closed = true;
        Ok(())
    }
}

/// An [XmlParser] feeding a [StreamParserTarget].
pub struct StreamParser {
    parser: XmlParser,
    target: StreamParserTarget,
}

impl StreamParser {
    pub fn new() -> Self {
        StreamParser {
            parser: XmlParser::new(),
            target: StreamParserTarget::new(),
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), XmlError> {
        self.parser.feed(&mut self.target, bytes)
    }

    /// Marks the end of the input.
    pub fn close(&mut self) -> Result<(), XmlError> {
        self.target.close()
    }

    /// Events produced by the previous calls, in order.
    pub fn take_events(&mut self) -> Vec<StreamEvent> {
        self.target.take_events()
    }

    pub fn target(&self) -> &StreamParserTarget {
        &self.target
    }

    pub fn is_open(&self) -> bool {
        self.target.is_open()
    }

    pub fn bytes_consumed(&self) -> u64 {
        self.parser.bytes_consumed()
    }
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}
