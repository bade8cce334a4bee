/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod error;
mod watched;

use std::fmt::Display;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

pub use error::BadJid;
use error::description;
pub use watched::JidChange;
pub use watched::JidField;
pub use watched::WatchedJid;

use super::client::Authentication;
use super::client::ConnectionInfo;
use super::constants::DEFAULT_RESOURCE;

lazy_static! {
    static ref JID_PATTERN: Regex = Regex::new(
        r"^(?:(?P<localpart>[^@/]*)@)?(?P<domainpart>[^@/]*)(?:/(?P<resourcepart>.*))?$"
    )
    .expect("JID pattern is valid");
}

/// Classification of a JID by the parts it has.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum JidKind {
    /// `user@domain/resource`
    Full,
    /// `user@domain`
    Bare,
    /// `domain`
    Domain,
    /// `domain/resource`
    Resource,
    /// No domain part.
    Unknown,
}

/// String forms a JID can be converted to with [Jid::to_form].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum JidForm {
    Full,
    Bare,
    Domain,
    Resource,
}

/// The address of an entity in the XMPP protocol.
///
/// Each JID has three parts:
/// - User part: Optionally identifies a local entity on the domain.
/// - Domain part: Identifies an XMPP server.
/// - Resource part: Optionally identifies a session or an object.
///
/// User and domain parts are stored in lower case, the resource part keeps
/// its case. Empty parts are stored as absent.
///
/// More details can be found in [RFC7622](https://datatracker.ietf.org/doc/rfc7622/)
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Jid {
    user: Option<String>,
    domain: Option<String>,
    resource: Option<String>,
}

fn normalized(value: Option<&str>, lower: bool) -> Option<String> {
    match value {
        None | Some("") => None,
        Some(value) if lower => Some(value.to_lowercase()),
        Some(value) => Some(value.to_owned()),
    }
}

impl Jid {
    /// Creates a JID from its parts.
    pub fn new(user: Option<&str>, domain: Option<&str>, resource: Option<&str>) -> Self {
        Jid {
            user: normalized(user, true),
            domain: normalized(domain, true),
            resource: normalized(resource, false),
        }
    }

    /// Parses `[user@]domain[/resource]`, returning None if the string is
    /// not a valid JID.
    pub fn from_string(s: &str) -> Option<Jid> {
        s.parse().ok()
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    pub fn set_user(&mut self, user: Option<&str>) {
        self.user = normalized(user, true);
    }

    pub fn set_domain(&mut self, domain: Option<&str>) {
        self.domain = normalized(domain, true);
    }

    pub fn set_resource(&mut self, resource: Option<&str>) {
        self.resource = normalized(resource, false);
    }

    /// Creates another JID by overriding the resource part.
    pub fn with_resource(mut self, resource: &str) -> Jid {
        self.set_resource(Some(resource));
        self
    }

    /// Bare form of the JID without the resource part.
    pub fn bare(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.domain.as_deref().unwrap_or("")),
            None => self.domain.clone().unwrap_or_default(),
        }
    }

    /// Full form of the JID. A missing resource is written as `default`.
    pub fn full(&self) -> String {
        format!(
            "{}/{}",
            self.bare(),
            self.resource.as_deref().unwrap_or(DEFAULT_RESOURCE)
        )
    }

    pub fn bare_jid(&self) -> Jid {
        Jid {
            user: self.user.clone(),
            domain: self.domain.clone(),
            resource: None,
        }
    }

    pub fn domain_jid(&self) -> Jid {
        Jid {
            user: None,
            domain: self.domain.clone(),
            resource: None,
        }
    }

    pub fn kind(&self) -> JidKind {
        match (&self.user, &self.domain, &self.resource) {
            (_, None, _) => JidKind::Unknown,
            (None, Some(_), None) => JidKind::Domain,
            (None, Some(_), Some(_)) => JidKind::Resource,
            (Some(_), Some(_), None) => JidKind::Bare,
            (Some(_), Some(_), Some(_)) => JidKind::Full,
        }
    }

    pub fn is_full(&self) -> bool {
        self.kind() == JidKind::Full
    }

    /// True if the JID is exactly `user@domain`.
    pub fn is_bare(&self) -> bool {
        self.kind() == JidKind::Bare
    }

    pub fn is_domain(&self) -> bool {
        self.kind() == JidKind::Domain
    }

    pub fn is_resource(&self) -> bool {
        self.kind() == JidKind::Resource
    }

    pub fn is_unknown(&self) -> bool {
        self.kind() == JidKind::Unknown
    }

    pub fn to_form(&self, form: JidForm) -> Option<String> {
        match form {
            JidForm::Full => Some(self.full()),
            JidForm::Bare => Some(self.bare()),
            JidForm::Domain => self.domain.clone(),
            JidForm::Resource => self.resource.clone(),
        }
    }

    /// Copies all three parts from another JID.
    pub fn update(&mut self, other: &Jid) {
        self.clone_from(other);
    }

    /// Guesses the connection parameters for this JID.
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo::new(self.domain.as_deref().unwrap_or("localhost"))
    }

    /// Guesses the authentication parameters for this JID.
    pub fn authentication(&self) -> Authentication {
        let domain = self.domain.clone().unwrap_or_default();
        Authentication {
            service: "xmpp".to_string(),
            hostname: domain.clone(),
            authid: self.user.clone().unwrap_or_default(),
            authzid: None,
            realm: domain,
            password: None,
        }
    }
}

impl FromStr for Jid {
    type Err = BadJid;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = JID_PATTERN
            .captures(s)
            .ok_or(BadJid(description::DOMAIN_HAS_AT))?;
        let local = captures.name("localpart").map(|m| m.as_str());
        let mut domain = captures.name("domainpart").map_or("", |m| m.as_str());
        let resource = captures.name("resourcepart").map(|m| m.as_str());

        if domain.is_empty() {
            return Err(BadJid(description::DOMAIN_EMPTY));
        }
        if domain.len() > 1023 {
            return Err(BadJid(description::DOMAIN_TOO_LONG));
        }
        if domain.len() > 1 && domain.ends_with('.') {
            // Remove final dot as per RFC 7622 section 3.2
            domain = &domain[..domain.len() - 1];
        }
        if let Some(local) = local {
            if local.is_empty() {
                return Err(BadJid(description::LOCAL_EMPTY));
            }
            if local.len() > 1023 {
                return Err(BadJid(description::LOCAL_TOO_LONG));
            }
        }
        if let Some(resource) = resource {
            if resource.is_empty() {
                return Err(BadJid(description::RESOURCE_EMPTY));
            }
            if resource.len() > 1023 {
                return Err(BadJid(description::RESOURCE_TOO_LONG));
            }
        }

        Ok(Jid::new(local, Some(domain), resource))
    }
}

impl Display for Jid {
    /// Writes the JID with the parts it has, without a default resource.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(user) = &self.user {
            write!(f, "{user}@")?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "{domain}")?;
        }
        if let Some(resource) = &self.resource {
            write!(f, "/{resource}")?;
        }
        Ok(())
    }
}

impl PartialEq<str> for Jid {
    fn eq(&self, other: &str) -> bool {
        Jid::from_string(other).is_some_and(|other| *self == other)
    }
}

impl PartialEq<&str> for Jid {
    fn eq(&self, other: &&str) -> bool {
        *self == **other
    }
}
