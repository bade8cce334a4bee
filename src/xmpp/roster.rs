/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use crate::Element;
use crate::Jid;
use crate::ToElement;

use super::StanzaMalformed;
use super::constants::ROSTER_NS;

/// Presence subscription state of a roster item (RFC 6121 section 2.1.2.5).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Subscription {
    Both,
    From,
    None,
    Remove,
    To,
}

impl Subscription {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subscription::Both => "both",
            Subscription::From => "from",
            Subscription::None => "none",
            Subscription::Remove => "remove",
            Subscription::To => "to",
        }
    }
}

impl FromStr for Subscription {
    type Err = StanzaMalformed;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "both" => Ok(Subscription::Both),
            "from" => Ok(Subscription::From),
            "none" => Ok(Subscription::None),
            "remove" => Ok(Subscription::Remove),
            "to" => Ok(Subscription::To),
            _ => Err(StanzaMalformed::InvalidValue {
                field: "subscription",
                value: s.to_owned(),
            }),
        }
    }
}

impl Display for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contact in the roster.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RosterItem {
    pub jid: Jid,
    pub name: Option<String>,
    pub subscription: Option<Subscription>,
    /// A subscription request is pending (`ask="subscribe"`).
    pub ask: bool,
    /// Pre-approved subscription.
    pub approved: bool,
    pub groups: Vec<String>,
}

impl RosterItem {
    pub fn new(jid: Jid) -> Self {
        RosterItem {
            jid,
            name: None,
            subscription: None,
            ask: false,
            approved: false,
            groups: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    pub fn with_subscription(mut self, subscription: Subscription) -> Self {
        self.subscription = Some(subscription);
        self
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.groups.push(group.to_owned());
        self
    }

    pub fn from_element(element: &Element) -> Result<Self, StanzaMalformed> {
        if !element.is("item", ROSTER_NS) {
            return Err(StanzaMalformed::UnexpectedElement {
                expected: "item",
                found: element.clark_name(),
            });
        }
        let jid = element
            .attribute("jid")
            .unwrap_or("")
            .parse::<Jid>()
            .map_err(|reason| StanzaMalformed::InvalidJid {
                attribute: "jid",
                reason,
            })?;
        let subscription = element
            .attribute("subscription")
            .map(str::parse::<Subscription>)
            .transpose()?;
        let ask = match element.attribute("ask") {
            None => false,
            Some("subscribe") => true,
            Some(value) => {
                return Err(StanzaMalformed::InvalidValue {
                    field: "ask",
                    value: value.to_owned(),
                });
            }
        };
        let approved = match element.attribute("approved") {
            None | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(value) => {
                return Err(StanzaMalformed::InvalidValue {
                    field: "approved",
                    value: value.to_owned(),
                });
            }
        };
        let groups = element
            .children_named("group", ROSTER_NS)
            .map(|group| group.text())
            .collect();

        Ok(RosterItem {
            jid,
            name: element.attribute("name").map(str::to_owned),
            subscription,
            ask,
            approved,
            groups,
        })
    }
}

impl ToElement for RosterItem {
    fn to_element(&self) -> Element {
        let mut element = Element::new("item", ROSTER_NS).with_attribute("jid", self.jid.to_string());
        if let Some(name) = &self.name {
            element.set_attribute("name", name.as_str());
        }
        if let Some(subscription) = &self.subscription {
            element.set_attribute("subscription", subscription.as_str());
        }
        if self.ask {
            element.set_attribute("ask", "subscribe");
        }
        if self.approved {
            element.set_attribute("approved", "true");
        }
        for group in &self.groups {
            element.push_child(Element::new("group", ROSTER_NS).with_text(group));
        }
        element
    }
}

/// The `jabber:iq:roster` query payload of roster gets, results and pushes.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct RosterQuery {
    pub items: Vec<RosterItem>,
    pub ver: Option<String>,
}

impl RosterQuery {
    pub fn new() -> Self {
        RosterQuery::default()
    }

    pub fn with_item(mut self, item: RosterItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn from_element(element: &Element) -> Result<Self, StanzaMalformed> {
        if !element.is("query", ROSTER_NS) {
            return Err(StanzaMalformed::UnexpectedElement {
                expected: "query",
                found: element.clark_name(),
            });
        }
        let items = element
            .children_named("item", ROSTER_NS)
            .map(RosterItem::from_element)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RosterQuery {
            items,
            ver: element.attribute("ver").map(str::to_owned),
        })
    }

    /// Items keyed by their bare JID string.
    pub fn item_map(&self) -> BTreeMap<String, &RosterItem> {
        self.items
            .iter()
            .map(|item| (item.jid.bare(), item))
            .collect()
    }
}

impl ToElement for RosterQuery {
    fn to_element(&self) -> Element {
        let mut element = Element::new("query", ROSTER_NS);
        if let Some(ver) = &self.ver {
            element.set_attribute("ver", ver.as_str());
        }
        for item in &self.items {
            element.push_child(item.to_element());
        }
        element
    }
}
