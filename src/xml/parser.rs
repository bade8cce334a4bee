/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::errors::SyntaxError;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;

use super::Element;
use super::XML_NS;
use super::XmlError;
use super::error::description;

/// A namespace declaration made by a start tag.
///
/// `prefix` is `None` for a default namespace declaration.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NamespaceDecl {
    pub prefix: Option<String>,
    pub uri: String,
}

/// Receiver of the parsing events of an [XmlParser].
///
/// Names are delivered with their namespaces resolved. An error returned
/// from any method aborts the current `feed` call and the parser must be
/// reset before it can be used again.
pub trait ParserTarget {
    /// A start tag. The element carries the attributes but no content yet.
    fn start(&mut self, tag: Element, namespaces: &[NamespaceDecl]) -> Result<(), XmlError>;

    fn end(&mut self, name: &str, ns: &str) -> Result<(), XmlError>;

    fn data(&mut self, text: &str) -> Result<(), XmlError>;

    fn comment(&mut self, text: &str) -> Result<(), XmlError>;

    /// End of the input.
    fn close(&mut self) -> Result<(), XmlError>;
}

struct OpenTag {
    raw: String,
    name: String,
    ns: String,
    scope_len: usize,
}

/// Incremental XML parser.
///
/// Bytes can be fed in arbitrary pieces: incomplete markup and trailing
/// character data are kept until the next call completes them. Tokens are
/// produced by `quick_xml`, namespace resolution and tag nesting checks are
/// done here.
///
/// ```
/// use ikstream::{TreeBuilder, XmlParser};
///
/// let mut builder = TreeBuilder::new();
/// let mut parser = XmlParser::new();
/// parser.feed(&mut builder, b"<doc xmlns='urn:x'><a>hel").unwrap();
/// parser.feed(&mut builder, b"lo</a></doc>").unwrap();
/// let doc = builder.take_root().unwrap();
/// assert_eq!(doc.get_child("a", "urn:x").unwrap().text(), "hello");
/// ```
pub struct XmlParser {
    buffer: Vec<u8>,
    scopes: Vec<NamespaceDecl>,
    open: Vec<OpenTag>,
    consumed: u64,
    failed: bool,
}

impl XmlParser {
    pub fn new() -> Self {
        XmlParser {
            buffer: Vec::new(),
            scopes: Vec::new(),
            open: Vec::new(),
            consumed: 0,
            failed: false,
        }
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.scopes.clear();
        self.open.clear();
        self.consumed = 0;
        self.failed = false;
    }

    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Number of bytes turned into events so far.
    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    /// Number of bytes waiting for more input.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn feed<T: ParserTarget + ?Sized>(
        &mut self,
        target: &mut T,
        bytes: &[u8],
    ) -> Result<(), XmlError> {
        if self.failed {
            return Err(XmlError::ParserFailed);
        }
        self.buffer.extend_from_slice(bytes);
        let buffer = std::mem::take(&mut self.buffer);
        let result = self.drain(target, &buffer, false);
        self.settle(buffer, result)
    }

    /// Processes the remaining input as the end of the document.
    ///
    /// Fails if markup is incomplete or elements are still open.
    pub fn finish<T: ParserTarget + ?Sized>(&mut self, target: &mut T) -> Result<(), XmlError> {
        if self.failed {
            return Err(XmlError::ParserFailed);
        }
        let buffer = std::mem::take(&mut self.buffer);
        let result = self.drain(target, &buffer, true);
        self.settle(buffer, result)?;
        if !self.open.is_empty() {
            self.failed = true;
            return Err(XmlError::BadXml(description::INCOMPLETE));
        }
        Ok(())
    }

    fn settle(&mut self, mut buffer: Vec<u8>, result: Result<usize, XmlError>) -> Result<(), XmlError> {
        match result {
            Ok(used) => {
                buffer.drain(..used);
                self.buffer = buffer;
                self.consumed += used as u64;
                Ok(())
            }
            Err(err) => {
                self.failed = true;
                Err(err)
            }
        }
    }

    fn drain<T: ParserTarget + ?Sized>(
        &mut self,
        target: &mut T,
        input: &[u8],
        at_eof: bool,
    ) -> Result<usize, XmlError> {
        let mut reader = Reader::from_reader(input);
        let config = reader.config_mut();
        config.trim_text(false);
        // Nesting is checked here since tags span multiple feeds.
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        let mut used = 0;
        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(quick_xml::Error::Syntax(err))
                    if !at_eof && is_incomplete(&err, &input[used..]) =>
                {
                    break;
                }
                Err(err) => return Err(err.into()),
            };
            let end = reader.buffer_position() as usize;
            match event {
                Event::Start(tag) => self.start_tag(target, &tag)?,
                Event::Empty(tag) => {
                    self.start_tag(target, &tag)?;
                    self.end_tag(target, tag.name().as_ref())?;
                }
                Event::End(tag) => self.end_tag(target, tag.name().as_ref())?,
                Event::Text(text) => {
                    // An entity reference or a character might continue in
                    // the next piece, only the complete part is passed on.
                    if end == input.len() && !at_eof {
                        let len = complete_text_len(&text);
                        if len > 0 {
                            target.data(&unescape(std::str::from_utf8(&text[..len])?)?)?;
                            used += len;
                        }
                        break;
                    }
                    target.data(&text.unescape()?)?;
                }
                Event::CData(cdata) => target.data(std::str::from_utf8(&cdata)?)?,
                Event::Comment(comment) => target.comment(std::str::from_utf8(&comment)?)?,
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Eof => break,
            }
            used = end;
        }
        Ok(used)
    }

    fn start_tag<T: ParserTarget + ?Sized>(
        &mut self,
        target: &mut T,
        tag: &BytesStart<'_>,
    ) -> Result<(), XmlError> {
        let raw = std::str::from_utf8(tag.name().as_ref())?.to_owned();
        let scope_len = self.scopes.len();

        let mut declared = Vec::new();
        let mut plain = Vec::new();
        for attr in tag.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())?;
            let value = attr.unescape_value()?.into_owned();
            if key == "xmlns" {
                declared.push(NamespaceDecl {
                    prefix: None,
                    uri: value,
                });
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declared.push(NamespaceDecl {
                    prefix: Some(prefix.to_owned()),
                    uri: value,
                });
            } else {
                plain.push((key.to_owned(), value));
            }
        }
        self.scopes.extend(declared.iter().cloned());

        let (prefix, name) = split_name(&raw);
        let ns = self.resolve(prefix)?;
        let mut element = Element::new(name, &ns);
        for (key, value) in plain {
            match split_name(&key) {
                (None, name) => element.set_attribute(name, value),
                (Some(prefix), name) => {
                    let attr_ns = self.resolve(Some(prefix))?;
                    element.set_ns_attribute(&attr_ns, name, value);
                }
            }
        }

        self.open.push(OpenTag {
            name: name.to_owned(),
            ns,
            raw,
            scope_len,
        });
        target.start(element, &declared)
    }

    fn end_tag<T: ParserTarget + ?Sized>(
        &mut self,
        target: &mut T,
        raw: &[u8],
    ) -> Result<(), XmlError> {
        let raw = std::str::from_utf8(raw)?;
        let Some(open) = self.open.pop() else {
            return Err(XmlError::BadXml(description::UNEXPECTED_END));
        };
        if open.raw != raw {
            return Err(XmlError::BadXml(description::TAG_MISMATCH));
        }
        self.scopes.truncate(open.scope_len);
        target.end(&open.name, &open.ns)
    }

    fn resolve(&self, prefix: Option<&str>) -> Result<String, XmlError> {
        match prefix {
            Some("xml") => Ok(XML_NS.to_owned()),
            Some(prefix) => self
                .scopes
                .iter()
                .rev()
                .find(|decl| decl.prefix.as_deref() == Some(prefix))
                .map(|decl| decl.uri.clone())
                .ok_or_else(|| XmlError::UnboundPrefix(prefix.to_owned())),
            None => Ok(self
                .scopes
                .iter()
                .rev()
                .find(|decl| decl.prefix.is_none())
                .map(|decl| decl.uri.clone())
                .unwrap_or_default()),
        }
    }
}

impl Default for XmlParser {
    fn default() -> Self {
        Self::new()
    }
}

fn split_name(raw: &str) -> (Option<&str>, &str) {
    match raw.split_once(':') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, raw),
    }
}

/// True if the error only means the markup at `rest` is cut short.
fn is_incomplete(err: &SyntaxError, rest: &[u8]) -> bool {
    match err {
        SyntaxError::UnclosedTag
        | SyntaxError::UnclosedComment
        | SyntaxError::UnclosedCData
        | SyntaxError::UnclosedDoctype
        | SyntaxError::UnclosedPIOrXmlDecl => true,
        SyntaxError::InvalidBangMarkup => {
            rest.len() < b"<![CDATA[".len()
                && (b"<!--".starts_with(rest)
                    || b"<![CDATA[".starts_with(rest)
                    || b"<!DOCTYPE"
                        .get(..rest.len())
                        .is_some_and(|doctype| doctype.eq_ignore_ascii_case(rest)))
        }
        _ => false,
    }
}

/// Length of the leading part of `text` which can be unescaped on its own:
/// up to an unterminated entity reference or a partial UTF-8 sequence.
fn complete_text_len(text: &[u8]) -> usize {
    let mut len = text.len();
    if let Some(amp) = text.iter().rposition(|byte| *byte == b'&')
        && !text[amp..].contains(&b';')
    {
        len = amp;
    }
    match std::str::from_utf8(&text[..len]) {
        Ok(_) => len,
        Err(err) => err.valid_up_to(),
    }
}
