/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::sync::Mutex;
use std::sync::PoisonError;

use crate::Signal;

use super::Jid;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum JidField {
    User,
    Domain,
    Resource,
}

/// Emitted by [WatchedJid] on every assignment of a part.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct JidChange {
    pub field: JidField,
    pub old: Option<String>,
    pub new: Option<String>,
    /// The whole JID before the assignment.
    pub previous: Jid,
}

/// A shared JID which announces modifications.
///
/// Used for the address of a session, which changes when the server
/// assigns a resource during binding.
#[derive(Debug, Default)]
pub struct WatchedJid {
    jid: Mutex<Jid>,
    changed: Signal<JidChange>,
}

impl WatchedJid {
    pub fn new(jid: Jid) -> Self {
        WatchedJid {
            jid: Mutex::new(jid),
            changed: Signal::new(),
        }
    }

    /// A copy of the current value.
    pub fn get(&self) -> Jid {
        self.jid
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn changed(&self) -> &Signal<JidChange> {
        &self.changed
    }

    pub fn set_user(&self, user: Option<&str>) {
        self.assign(JidField::User, user);
    }

    pub fn set_domain(&self, domain: Option<&str>) {
        self.assign(JidField::Domain, domain);
    }

    pub fn set_resource(&self, resource: Option<&str>) {
        self.assign(JidField::Resource, resource);
    }

    /// Assigns all parts from another JID, one notification per part.
    pub fn update(&self, other: &Jid) {
        self.set_user(other.user());
        self.set_domain(other.domain());
        self.set_resource(other.resource());
    }

    fn assign(&self, field: JidField, value: Option<&str>) {
        let change = {
            let mut jid = self.jid.lock().unwrap_or_else(PoisonError::into_inner);
            let previous = jid.clone();
            let (old, new) = match field {
                JidField::User => {
                    jid.set_user(value);
                    (previous.user(), jid.user())
                }
                JidField::Domain => {
                    jid.set_domain(value);
                    (previous.domain(), jid.domain())
                }
                JidField::Resource => {
                    jid.set_resource(value);
                    (previous.resource(), jid.resource())
                }
            };
            JidChange {
                field,
                old: old.map(str::to_owned),
                new: new.map(str::to_owned),
                previous: previous.clone(),
            }
        };
        self.changed.emit(&change);
    }
}
