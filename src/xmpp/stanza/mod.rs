/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod children;
mod condition;
mod error;

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use log::warn;

pub use children::MessageBody;
pub use children::MessageSubject;
pub use children::MessageThread;
pub use children::PresenceShow;
pub use children::PresenceStatus;
pub use condition::ErrorCondition;
pub use condition::ErrorType;
pub use condition::StanzaError;
pub use error::StanzaErrorMalformed;
pub use error::StanzaMalformed;

use crate::Element;
use crate::Jid;
use crate::ToElement;
use crate::xml::XML_NS;

use super::constants::CLIENT_NS;
use super::constants::SERVER_NS;

/// The three stanza elements.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum StanzaKind {
    Message,
    Presence,
    Iq,
}

impl StanzaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StanzaKind::Message => "message",
            StanzaKind::Presence => "presence",
            StanzaKind::Iq => "iq",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "message" => Some(StanzaKind::Message),
            "presence" => Some(StanzaKind::Presence),
            "iq" => Some(StanzaKind::Iq),
            _ => None,
        }
    }
}

/// Namespace of the stream a stanza travels in.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub enum StanzaNamespace {
    #[default]
    Client,
    Server,
}

impl StanzaNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            StanzaNamespace::Client => CLIENT_NS,
            StanzaNamespace::Server => SERVER_NS,
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            CLIENT_NS => Some(StanzaNamespace::Client),
            SERVER_NS => Some(StanzaNamespace::Server),
            _ => None,
        }
    }
}

/// Values of the `type` attribute of all stanza kinds.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum StanzaType {
    Error,
    Get,
    Result,
    Set,
    Chat,
    Groupchat,
    Headline,
    Normal,
    Probe,
    Subscribe,
    Subscribed,
    Unavailable,
    Unsubscribe,
    Unsubscribed,
}

impl StanzaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StanzaType::Error => "error",
            StanzaType::Get => "get",
            StanzaType::Result => "result",
            StanzaType::Set => "set",
            StanzaType::Chat => "chat",
            StanzaType::Groupchat => "groupchat",
            StanzaType::Headline => "headline",
            StanzaType::Normal => "normal",
            StanzaType::Probe => "probe",
            StanzaType::Subscribe => "subscribe",
            StanzaType::Subscribed => "subscribed",
            StanzaType::Unavailable => "unavailable",
            StanzaType::Unsubscribe => "unsubscribe",
            StanzaType::Unsubscribed => "unsubscribed",
        }
    }

    /// True if RFC 6120/6121 define this type for the stanza kind.
    pub fn is_valid_for(&self, kind: StanzaKind) -> bool {
        match self {
            StanzaType::Error => true,
            StanzaType::Get | StanzaType::Result | StanzaType::Set => kind == StanzaKind::Iq,
            StanzaType::Chat | StanzaType::Groupchat | StanzaType::Headline | StanzaType::Normal => {
                kind == StanzaKind::Message
            }
            StanzaType::Probe
            | StanzaType::Subscribe
            | StanzaType::Subscribed
            | StanzaType::Unavailable
            | StanzaType::Unsubscribe
            | StanzaType::Unsubscribed => kind == StanzaKind::Presence,
        }
    }
}

impl FromStr for StanzaType {
    type Err = StanzaMalformed;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "error" => StanzaType::Error,
            "get" => StanzaType::Get,
            "result" => StanzaType::Result,
            "set" => StanzaType::Set,
            "chat" => StanzaType::Chat,
            "groupchat" => StanzaType::Groupchat,
            "headline" => StanzaType::Headline,
            "normal" => StanzaType::Normal,
            "probe" => StanzaType::Probe,
            "subscribe" => StanzaType::Subscribe,
            "subscribed" => StanzaType::Subscribed,
            "unavailable" => StanzaType::Unavailable,
            "unsubscribe" => StanzaType::Unsubscribe,
            "unsubscribed" => StanzaType::Unsubscribed,
            _ => return Err(StanzaMalformed::InvalidType(s.to_owned())),
        })
    }
}

impl Display for StanzaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message, presence or iq stanza.
///
/// Children without a dedicated field, including `<error/>` and all
/// extension payloads, are kept as elements in [objects](Stanza::objects).
/// A stanza parsed from an element remembers that element; it is not part
/// of the equality comparison.
#[derive(Debug, Clone)]
pub struct Stanza {
    kind: StanzaKind,
    ns: StanzaNamespace,
    id: Option<String>,
    from: Option<Jid>,
    to: Option<Jid>,
    stanza_type: Option<StanzaType>,
    lang: Option<String>,
    thread: Option<MessageThread>,
    subjects: Vec<MessageSubject>,
    bodies: Vec<MessageBody>,
    show: Option<PresenceShow>,
    statuses: Vec<PresenceStatus>,
    priority: Option<i8>,
    objects: Vec<Element>,
    element: Option<Element>,
}

impl Stanza {
    pub fn new(kind: StanzaKind) -> Self {
        Stanza {
            kind,
            ns: StanzaNamespace::Client,
            id: None,
            from: None,
            to: None,
            stanza_type: None,
            lang: None,
            thread: None,
            subjects: Vec::new(),
            bodies: Vec::new(),
            show: None,
            statuses: Vec::new(),
            priority: None,
            objects: Vec::new(),
            element: None,
        }
    }

    pub fn message() -> Self {
        Stanza::new(StanzaKind::Message)
    }

    pub fn presence() -> Self {
        Stanza::new(StanzaKind::Presence)
    }

    pub fn iq(stanza_type: StanzaType) -> Self {
        Stanza::new(StanzaKind::Iq).with_type(stanza_type)
    }

    pub fn with_ns(mut self, ns: StanzaNamespace) -> Self {
        self.ns = ns;
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_owned());
        self
    }

    pub fn with_from_jid(mut self, from: Jid) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_to_jid(mut self, to: Jid) -> Self {
        self.to = Some(to);
        self
    }

    pub fn with_type(mut self, stanza_type: StanzaType) -> Self {
        self.stanza_type = Some(stanza_type);
        self
    }

    pub fn with_lang(mut self, lang: &str) -> Self {
        self.lang = Some(lang.to_owned());
        self
    }

    pub fn with_thread(mut self, thread: MessageThread) -> Self {
        self.thread = Some(thread);
        self
    }

    pub fn with_subject(mut self, subject: MessageSubject) -> Self {
        self.subjects.push(subject);
        self
    }

    pub fn with_body(mut self, body: MessageBody) -> Self {
        self.bodies.push(body);
        self
    }

    pub fn with_show(mut self, show: PresenceShow) -> Self {
        self.show = Some(show);
        self
    }

    pub fn with_status(mut self, status: PresenceStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_priority(mut self, priority: i8) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_object<T: ToElement + ?Sized>(mut self, object: &T) -> Self {
        self.objects.push(object.to_element());
        self
    }

    pub fn kind(&self) -> StanzaKind {
        self.kind
    }

    pub fn ns(&self) -> StanzaNamespace {
        self.ns
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn from_jid(&self) -> Option<&Jid> {
        self.from.as_ref()
    }

    pub fn to_jid(&self) -> Option<&Jid> {
        self.to.as_ref()
    }

    pub fn stanza_type(&self) -> Option<StanzaType> {
        self.stanza_type
    }

    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    pub fn thread(&self) -> Option<&MessageThread> {
        self.thread.as_ref()
    }

    pub fn subjects(&self) -> &[MessageSubject] {
        &self.subjects
    }

    pub fn bodies(&self) -> &[MessageBody] {
        &self.bodies
    }

    pub fn show(&self) -> Option<PresenceShow> {
        self.show
    }

    pub fn statuses(&self) -> &[PresenceStatus] {
        &self.statuses
    }

    pub fn priority(&self) -> Option<i8> {
        self.priority
    }

    pub fn objects(&self) -> &[Element] {
        &self.objects
    }

    /// The element this stanza was parsed from.
    pub fn element(&self) -> Option<&Element> {
        self.element.as_ref()
    }

    pub fn set_ns(&mut self, ns: StanzaNamespace) {
        self.ns = ns;
    }

    pub fn set_id(&mut self, id: Option<&str>) {
        self.id = id.map(str::to_owned);
    }

    pub fn set_from_jid(&mut self, from: Option<Jid>) {
        self.from = from;
    }

    pub fn set_to_jid(&mut self, to: Option<Jid>) {
        self.to = to;
    }

    pub fn set_type(&mut self, stanza_type: Option<StanzaType>) {
        self.stanza_type = stanza_type;
    }

    pub fn set_lang(&mut self, lang: Option<&str>) {
        self.lang = lang.map(str::to_owned);
    }

    pub fn set_thread(&mut self, thread: Option<MessageThread>) {
        self.thread = thread;
    }

    pub fn set_show(&mut self, show: Option<PresenceShow>) {
        self.show = show;
    }

    pub fn set_priority(&mut self, priority: Option<i8>) {
        self.priority = priority;
    }

    pub fn subjects_mut(&mut self) -> &mut Vec<MessageSubject> {
        &mut self.subjects
    }

    pub fn bodies_mut(&mut self) -> &mut Vec<MessageBody> {
        &mut self.bodies
    }

    pub fn statuses_mut(&mut self) -> &mut Vec<PresenceStatus> {
        &mut self.statuses
    }

    pub fn objects_mut(&mut self) -> &mut Vec<Element> {
        &mut self.objects
    }

    /// Body texts keyed by language, with `""` for the default language.
    pub fn body_map(&self) -> BTreeMap<String, String> {
        self.bodies
            .iter()
            .map(|body| (body.lang.clone().unwrap_or_default(), body.text.clone()))
            .collect()
    }

    pub fn set_body_map(&mut self, bodies: &BTreeMap<String, String>) {
        self.bodies = bodies
            .iter()
            .map(|(lang, text)| MessageBody::new(text, Some(lang)))
            .collect();
    }

    /// Subject texts keyed by language, with `""` for the default language.
    pub fn subject_map(&self) -> BTreeMap<String, String> {
        self.subjects
            .iter()
            .map(|subject| {
                (
                    subject.lang.clone().unwrap_or_default(),
                    subject.text.clone(),
                )
            })
            .collect()
    }

    pub fn set_subject_map(&mut self, subjects: &BTreeMap<String, String>) {
        self.subjects = subjects
            .iter()
            .map(|(lang, text)| MessageSubject::new(text, Some(lang)))
            .collect();
    }

    pub fn is_error(&self) -> bool {
        self.stanza_type == Some(StanzaType::Error)
    }

    /// The stanza error, or None if this is not an error stanza.
    pub fn error(&self) -> Result<Option<StanzaError>, StanzaErrorMalformed> {
        if !self.is_error() {
            return Ok(None);
        }
        StanzaError::from_stanza(self).map(Some)
    }

    pub fn from_element(element: &Element) -> Result<Stanza, StanzaMalformed> {
        let (Some(kind), Some(ns)) = (
            StanzaKind::from_name(element.name()),
            StanzaNamespace::from_uri(element.ns()),
        ) else {
            return Err(StanzaMalformed::NotStanza(element.clark_name()));
        };

        let mut stanza = Stanza::new(kind).with_ns(ns);
        stanza.id = element.attribute("id").map(str::to_owned);
        stanza.from = parse_address(element, "from")?;
        stanza.to = parse_address(element, "to")?;
        stanza.stanza_type = element
            .attribute("type")
            .map(str::parse::<StanzaType>)
            .transpose()?;
        stanza.lang = element.lang().map(str::to_owned);

        let mut show_seen = false;
        let mut priority_seen = false;
        for child in element.children() {
            if child.ns() != ns.as_str() {
                stanza.objects.push(child.clone());
                continue;
            }
            match child.name() {
                "thread" if stanza.thread.is_none() => {
                    stanza.thread = Some(MessageThread::from_element(child)?);
                }
                "show" if !show_seen => {
                    show_seen = true;
                    stanza.show = PresenceShow::from_element(child).ok();
                }
                "status" => stanza.statuses.push(PresenceStatus::from_element(child)?),
                "subject" => stanza.subjects.push(MessageSubject::from_element(child)?),
                "body" => stanza.bodies.push(MessageBody::from_element(child)?),
                "priority" if !priority_seen => {
                    priority_seen = true;
                    let text = child.text();
                    match text.trim().parse::<i8>() {
                        Ok(priority) => stanza.priority = Some(priority),
                        Err(_) => warn!("Received invalid priority value `{text}'"),
                    }
                }
                _ => stanza.objects.push(child.clone()),
            }
        }

        stanza.element = Some(element.clone());
        Ok(stanza)
    }

    /// Serialization without the namespace of the stanza itself, as it is
    /// written into a stream which declares that namespace as default.
    pub fn to_xml_string(&self) -> String {
        self.to_element().to_string_in(self.ns.as_str())
    }
}

fn parse_address(element: &Element, attribute: &'static str) -> Result<Option<Jid>, StanzaMalformed> {
    element
        .attribute(attribute)
        .map(|value| {
            value
                .parse::<Jid>()
                .map_err(|reason| StanzaMalformed::InvalidJid { attribute, reason })
        })
        .transpose()
}

impl ToElement for Stanza {
    fn to_element(&self) -> Element {
        let ns = self.ns.as_str();
        let mut element = Element::new(self.kind.as_str(), ns);

        if let Some(id) = &self.id {
            element.set_attribute("id", id.as_str());
        }
        if let Some(from) = &self.from {
            element.set_attribute("from", from.to_string());
        }
        if let Some(to) = &self.to {
            element.set_attribute("to", to.to_string());
        }
        if let Some(lang) = &self.lang {
            element.set_ns_attribute(XML_NS, "lang", lang.as_str());
        }
        if let Some(stanza_type) = &self.stanza_type {
            element.set_attribute("type", stanza_type.as_str());
        }

        if let Some(thread) = &self.thread {
            element.push_child(thread.to_element_in(ns));
        }
        if let Some(show) = &self.show {
            element.push_child(show.to_element_in(ns));
        }
        for status in &self.statuses {
            element.push_child(status.to_element_in(ns));
        }
        for subject in &self.subjects {
            element.push_child(subject.to_element_in(ns));
        }
        for body in &self.bodies {
            element.push_child(body.to_element_in(ns));
        }
        for object in &self.objects {
            element.push_child(object.clone());
        }
        if let Some(priority) = self.priority {
            element.push_child(Element::new("priority", ns).with_text(&priority.to_string()));
        }

        element
    }
}

impl PartialEq for Stanza {
    fn eq(&self, other: &Stanza) -> bool {
        self.kind == other.kind
            && self.ns == other.ns
            && self.id == other.id
            && self.from == other.from
            && self.to == other.to
            && self.stanza_type == other.stanza_type
            && self.lang == other.lang
            && self.thread == other.thread
            && self.subjects == other.subjects
            && self.bodies == other.bodies
            && self.show == other.show
            && self.statuses == other.statuses
            && self.priority == other.priority
            && self.objects == other.objects
    }
}

impl Eq for Stanza {}

impl Display for Stanza {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_xml_string())
    }
}

#[cfg(test)]
mod tests;
