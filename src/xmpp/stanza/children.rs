/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::fmt::Display;
use std::str::FromStr;

use crate::Element;
use crate::ToElement;
use crate::xml::XML_NS;
use crate::xmpp::constants::CLIENT_NS;

use super::StanzaMalformed;

fn expect_name(element: &Element, name: &'static str) -> Result<(), StanzaMalformed> {
    if element.name() != name {
        return Err(StanzaMalformed::UnexpectedElement {
            expected: name,
            found: element.clark_name(),
        });
    }
    Ok(())
}

fn element_lang(element: &Element) -> Option<String> {
    element.lang().filter(|lang| !lang.is_empty()).map(str::to_owned)
}

fn text_element(name: &str, ns: &str, text: &str, lang: Option<&str>) -> Element {
    let mut element = Element::new(name, ns);
    if let Some(lang) = lang.filter(|lang| !lang.is_empty()) {
        element.set_ns_attribute(XML_NS, "lang", lang);
    }
    element.push_text(text);
    element
}

/// A `<body/>` of a message, optionally in a specific language.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MessageBody {
    pub text: String,
    pub lang: Option<String>,
}

impl MessageBody {
    pub fn new(text: &str, lang: Option<&str>) -> Self {
        MessageBody {
            text: text.to_owned(),
            lang: lang.filter(|lang| !lang.is_empty()).map(str::to_owned),
        }
    }

    pub fn from_element(element: &Element) -> Result<Self, StanzaMalformed> {
        expect_name(element, "body")?;
        Ok(MessageBody {
            text: element.text(),
            lang: element_lang(element),
        })
    }

    pub fn to_element_in(&self, ns: &str) -> Element {
        text_element("body", ns, &self.text, self.lang.as_deref())
    }
}

impl ToElement for MessageBody {
    fn to_element(&self) -> Element {
        self.to_element_in(CLIENT_NS)
    }
}

/// A `<subject/>` of a message, optionally in a specific language.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MessageSubject {
    pub text: String,
    pub lang: Option<String>,
}

impl MessageSubject {
    pub fn new(text: &str, lang: Option<&str>) -> Self {
        MessageSubject {
            text: text.to_owned(),
            lang: lang.filter(|lang| !lang.is_empty()).map(str::to_owned),
        }
    }

    pub fn from_element(element: &Element) -> Result<Self, StanzaMalformed> {
        expect_name(element, "subject")?;
        Ok(MessageSubject {
            text: element.text(),
            lang: element_lang(element),
        })
    }

    pub fn to_element_in(&self, ns: &str) -> Element {
        text_element("subject", ns, &self.text, self.lang.as_deref())
    }
}

impl ToElement for MessageSubject {
    fn to_element(&self) -> Element {
        self.to_element_in(CLIENT_NS)
    }
}

/// Conversation identifier of a message.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MessageThread {
    pub thread: String,
    pub parent: Option<String>,
}

impl MessageThread {
    pub fn new(thread: &str, parent: Option<&str>) -> Self {
        MessageThread {
            thread: thread.to_owned(),
            parent: parent.filter(|parent| !parent.is_empty()).map(str::to_owned),
        }
    }

    pub fn from_element(element: &Element) -> Result<Self, StanzaMalformed> {
        expect_name(element, "thread")?;
        Ok(MessageThread::new(&element.text(), element.attribute("parent")))
    }

    pub fn to_element_in(&self, ns: &str) -> Element {
        let mut element = Element::new("thread", ns);
        if let Some(parent) = &self.parent {
            element.set_attribute("parent", parent.as_str());
        }
        element.push_text(&self.thread);
        element
    }
}

impl ToElement for MessageThread {
    fn to_element(&self) -> Element {
        self.to_element_in(CLIENT_NS)
    }
}

/// Availability sub-state of a presence.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum PresenceShow {
    Away,
    Chat,
    Dnd,
    Xa,
}

impl PresenceShow {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceShow::Away => "away",
            PresenceShow::Chat => "chat",
            PresenceShow::Dnd => "dnd",
            PresenceShow::Xa => "xa",
        }
    }

    pub fn from_element(element: &Element) -> Result<Self, StanzaMalformed> {
        expect_name(element, "show")?;
        element.text().parse()
    }

    pub fn to_element_in(&self, ns: &str) -> Element {
        Element::new("show", ns).with_text(self.as_str())
    }
}

impl FromStr for PresenceShow {
    type Err = StanzaMalformed;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "away" => Ok(PresenceShow::Away),
            "chat" => Ok(PresenceShow::Chat),
            "dnd" => Ok(PresenceShow::Dnd),
            "xa" => Ok(PresenceShow::Xa),
            _ => Err(StanzaMalformed::InvalidShow(s.to_owned())),
        }
    }
}

impl Display for PresenceShow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToElement for PresenceShow {
    fn to_element(&self) -> Element {
        self.to_element_in(CLIENT_NS)
    }
}

/// Human readable availability text of a presence.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PresenceStatus {
    pub text: Option<String>,
    pub lang: Option<String>,
}

impl PresenceStatus {
    pub fn new(text: Option<&str>, lang: Option<&str>) -> Self {
        PresenceStatus {
            text: text.filter(|text| !text.is_empty()).map(str::to_owned),
            lang: lang.filter(|lang| !lang.is_empty()).map(str::to_owned),
        }
    }

    pub fn from_element(element: &Element) -> Result<Self, StanzaMalformed> {
        expect_name(element, "status")?;
        Ok(PresenceStatus::new(Some(&element.text()), element.lang()))
    }

    pub fn to_element_in(&self, ns: &str) -> Element {
        text_element(
            "status",
            ns,
            self.text.as_deref().unwrap_or(""),
            self.lang.as_deref(),
        )
    }
}

impl ToElement for PresenceStatus {
    fn to_element(&self) -> Element {
        self.to_element_in(CLIENT_NS)
    }
}
