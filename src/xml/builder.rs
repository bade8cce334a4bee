/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use super::Element;
use super::NamespaceDecl;
use super::ParserTarget;
use super::XmlError;
use super::error::description;

/// Assembles parsing events into an [Element] tree.
pub struct TreeBuilder {
    stack: Vec<Element>,
    root: Option<Element>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        TreeBuilder {
            stack: Vec::new(),
            root: None,
        }
    }

    /// Number of elements opened but not yet closed.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn open_element(&mut self, tag: Element) -> Result<(), XmlError> {
        if self.stack.is_empty() && self.root.is_some() {
            return Err(XmlError::BadXml(description::MULTIPLE_ROOTS));
        }
        self.stack.push(tag);
        Ok(())
    }

    pub fn close_element(&mut self) -> Result<(), XmlError> {
        let element = self
            .stack
            .pop()
            .ok_or(XmlError::BadXml(description::UNEXPECTED_END))?;
        match self.stack.last_mut() {
            Some(parent) => parent.push_child(element),
            None => self.root = Some(element),
        }
        Ok(())
    }

    pub fn append_text(&mut self, text: &str) -> Result<(), XmlError> {
        match self.stack.last_mut() {
            Some(element) => element.push_text(text),
            None => {
                if !text.trim().is_empty() {
                    return Err(XmlError::BadXml(description::TEXT_OUTSIDE_ROOT));
                }
            }
        }
        Ok(())
    }

    pub fn append_comment(&mut self, text: &str) {
        if let Some(element) = self.stack.last_mut() {
            element.push_comment(text);
        }
    }

    /// The completed root element, if any.
    pub fn peek(&self) -> Option<&Element> {
        self.root.as_ref()
    }

    /// Takes the completed root element, leaving the builder empty.
    pub fn take_root(&mut self) -> Result<Element, XmlError> {
        if !self.stack.is_empty() {
            return Err(XmlError::BadXml(description::INCOMPLETE));
        }
        self.root
            .take()
            .ok_or(XmlError::BadXml(description::NO_START_TAG))
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserTarget for TreeBuilder {
    fn start(&mut self, tag: Element, _namespaces: &[NamespaceDecl]) -> Result<(), XmlError> {
        self.open_element(tag)
    }

    fn end(&mut self, _name: &str, _ns: &str) -> Result<(), XmlError> {
        self.close_element()
    }

    fn data(&mut self, text: &str) -> Result<(), XmlError> {
        self.append_text(text)
    }

    fn comment(&mut self, text: &str) -> Result<(), XmlError> {
        self.append_comment(text);
        Ok(())
    }

    fn close(&mut self) -> Result<(), XmlError> {
        if !self.stack.is_empty() {
            return Err(XmlError::BadXml(description::INCOMPLETE));
        }
        Ok(())
    }
}
