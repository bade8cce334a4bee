/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod builder;
mod entities;
mod error;
mod parser;

use std::fmt::Display;
use std::str::FromStr;

pub use builder::TreeBuilder;
pub use entities::escape;
pub use entities::escaped;
pub use error::XmlError;
pub use parser::NamespaceDecl;
pub use parser::ParserTarget;
pub use parser::XmlParser;

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// An attribute with its namespace resolved.
///
/// Unprefixed attributes have no namespace.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Attribute {
    ns: Option<String>,
    name: String,
    value: String,
}

impl Attribute {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Attribute {
            ns: None,
            name: name.to_owned(),
            value: value.into(),
        }
    }

    pub fn with_ns(ns: &str, name: &str, value: impl Into<String>) -> Self {
        Attribute {
            ns: Some(ns.to_owned()),
            name: name.to_owned(),
            value: value.into(),
        }
    }

    pub fn ns(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Content of an element.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

/// An owned, namespace aware XML element.
///
/// Elements are built either by the parser through [TreeBuilder] or by
/// hand with the `with_*` methods:
/// ```
/// use ikstream::Element;
///
/// let body = Element::new("body", "jabber:client").with_text("Hello!");
/// let message = Element::new("message", "jabber:client")
///     .with_attribute("to", "juliet@example.com")
///     .with_child(body);
/// assert_eq!(
///     message.to_string(),
///     "<message xmlns=\"jabber:client\" to=\"juliet@example.com\"><body>Hello!</body></message>"
/// );
/// ```
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Element {
    name: String,
    ns: String,
    attributes: Vec<Attribute>,
    nodes: Vec<Node>,
}

impl Element {
    /// Creates an empty element. An empty namespace means no namespace.
    pub fn new(name: &str, ns: &str) -> Self {
        Element {
            name: name.to_owned(),
            ns: ns.to_owned(),
            attributes: Vec::new(),
            nodes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_ns_attribute(mut self, ns: &str, name: &str, value: impl Into<String>) -> Self {
        self.set_ns_attribute(ns, name, value);
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.push_text(text);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.push_child(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ns(&self) -> &str {
        &self.ns
    }

    /// True if the element has the given local name and namespace.
    pub fn is(&self, name: &str, ns: &str) -> bool {
        self.name == name && self.ns == ns
    }

    /// Name in `{namespace}name` notation, mainly for logging.
    pub fn clark_name(&self) -> String {
        format!("{{{}}}{}", self.ns, self.name)
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Value of an attribute without a namespace.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.ns.is_none() && attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn ns_attribute(&self, ns: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.ns.as_deref() == Some(ns) && attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// The `xml:lang` attribute.
    pub fn lang(&self) -> Option<&str> {
        self.ns_attribute(XML_NS, "lang")
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        self.store_attribute(None, name, value.into());
    }

    pub fn set_ns_attribute(&mut self, ns: &str, name: &str, value: impl Into<String>) {
        self.store_attribute(Some(ns), name, value.into());
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self
            .attributes
            .iter()
            .position(|attr| attr.ns.is_none() && attr.name == name)?;
        Some(self.attributes.remove(pos).value)
    }

    fn store_attribute(&mut self, ns: Option<&str>, name: &str, value: String) {
        match self
            .attributes
            .iter_mut()
            .find(|attr| attr.ns.as_deref() == ns && attr.name == name)
        {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute {
                ns: ns.map(str::to_owned),
                name: name.to_owned(),
                value,
            }),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Child elements in document order.
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn children_named<'a>(
        &'a self,
        name: &'a str,
        ns: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children().filter(move |child| child.is(name, ns))
    }

    /// First child element with the given name and namespace.
    pub fn get_child(&self, name: &str, ns: &str) -> Option<&Element> {
        self.children().find(|child| child.is(name, ns))
    }

    pub fn has_children(&self) -> bool {
        self.children().next().is_some()
    }

    pub fn push_child(&mut self, child: Element) {
        self.nodes.push(Node::Element(child));
    }

    /// Appends character data, merging it with a preceding text node.
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Node::Text(last)) = self.nodes.last_mut() {
            last.push_str(text);
        } else {
            self.nodes.push(Node::Text(text.to_owned()));
        }
    }

    pub fn push_comment(&mut self, text: &str) {
        self.nodes.push(Node::Comment(text.to_owned()));
    }

    /// Concatenated character data of the direct text children.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.nodes {
            if let Node::Text(part) = node {
                text.push_str(part);
            }
        }
        text
    }

    /// Serializes the element as if it was a child of an element in
    /// `parent_ns`, so a matching default namespace is not repeated.
    pub fn to_string_in(&self, parent_ns: &str) -> String {
        let mut buf = String::new();
        self.write(&mut buf, parent_ns);
        buf
    }

    fn write(&self, buf: &mut String, parent_ns: &str) {
        buf.push('<');
        buf.push_str(&self.name);
        if self.ns != parent_ns {
            buf.push_str(" xmlns=\"");
            escape(&self.ns, buf);
            buf.push('"');
        }

        let mut prefixes: Vec<&str> = Vec::new();
        for attr in &self.attributes {
            if let Some(ns) = attr.ns.as_deref()
                && ns != XML_NS
                && !prefixes.contains(&ns)
            {
                buf.push_str(&format!(" xmlns:ns{}=\"", prefixes.len()));
                escape(ns, buf);
                buf.push('"');
                prefixes.push(ns);
            }
        }
        for attr in &self.attributes {
            buf.push(' ');
            match attr.ns.as_deref() {
                None => {}
                Some(XML_NS) => buf.push_str("xml:"),
                Some(ns) => {
                    let index = prefixes.iter().position(|p| *p == ns).unwrap_or(0);
                    buf.push_str(&format!("ns{index}:"));
                }
            }
            buf.push_str(&attr.name);
            buf.push_str("=\"");
            escape(&attr.value, buf);
            buf.push('"');
        }

        if self.nodes.is_empty() {
            buf.push_str("/>");
            return;
        }
        buf.push('>');
        for node in &self.nodes {
            match node {
                Node::Element(child) => child.write(buf, &self.ns),
                Node::Text(text) => escape(text, buf),
                Node::Comment(text) => {
                    buf.push_str("<!--");
                    buf.push_str(text);
                    buf.push_str("-->");
                }
            }
        }
        buf.push_str("</");
        buf.push_str(&self.name);
        buf.push('>');
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_string_in(""))
    }
}

impl FromStr for Element {
    type Err = XmlError;

    /// Parses a complete document into its root element.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut builder = TreeBuilder::new();
        let mut parser = XmlParser::new();
        parser.feed(&mut builder, s.as_bytes())?;
        parser.finish(&mut builder)?;
        builder.take_root()
    }
}

/// Types which have an XML element representation.
pub trait ToElement {
    fn to_element(&self) -> Element;
}

impl ToElement for Element {
    fn to_element(&self) -> Element {
        self.clone()
    }
}
