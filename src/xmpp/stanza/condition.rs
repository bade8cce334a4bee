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
use crate::xmpp::constants::STANZA_ERROR_NAMES;
use crate::xmpp::constants::STANZA_ERRORS_NS;
use crate::xmpp::protocol::is_stanza_element;

use super::Stanza;
use super::StanzaErrorMalformed;
use super::StanzaNamespace;

/// How the sender should react to a stanza error.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ErrorType {
    Auth,
    Cancel,
    Continue,
    Modify,
    Wait,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Auth => "auth",
            ErrorType::Cancel => "cancel",
            ErrorType::Continue => "continue",
            ErrorType::Modify => "modify",
            ErrorType::Wait => "wait",
        }
    }
}

impl FromStr for ErrorType {
    type Err = StanzaErrorMalformed;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auth" => Ok(ErrorType::Auth),
            "cancel" => Ok(ErrorType::Cancel),
            "continue" => Ok(ErrorType::Continue),
            "modify" => Ok(ErrorType::Modify),
            "wait" => Ok(ErrorType::Wait),
            _ => Err(StanzaErrorMalformed::InvalidType(s.to_owned())),
        }
    }
}

impl Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Defined stanza error conditions, in the order of [STANZA_ERROR_NAMES].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ErrorCondition {
    BadRequest,
    Conflict,
    FeatureNotImplemented,
    Forbidden,
    Gone,
    InternalServerError,
    ItemNotFound,
    JidMalformed,
    NotAcceptable,
    NotAllowed,
    NotAuthorized,
    PolicyViolation,
    RecipientUnavailable,
    Redirect,
    RegistrationRequired,
    RemoteServerNotFound,
    RemoteServerTimeout,
    ResourceConstraint,
    ServiceUnavailable,
    SubscriptionRequired,
    UndefinedCondition,
    UnexpectedRequest,
}

const CONDITIONS: [ErrorCondition; 22] = [
    ErrorCondition::BadRequest,
    ErrorCondition::Conflict,
    ErrorCondition::FeatureNotImplemented,
    ErrorCondition::Forbidden,
    ErrorCondition::Gone,
    ErrorCondition::InternalServerError,
    ErrorCondition::ItemNotFound,
    ErrorCondition::JidMalformed,
    ErrorCondition::NotAcceptable,
    ErrorCondition::NotAllowed,
    ErrorCondition::NotAuthorized,
    ErrorCondition::PolicyViolation,
    ErrorCondition::RecipientUnavailable,
    ErrorCondition::Redirect,
    ErrorCondition::RegistrationRequired,
    ErrorCondition::RemoteServerNotFound,
    ErrorCondition::RemoteServerTimeout,
    ErrorCondition::ResourceConstraint,
    ErrorCondition::ServiceUnavailable,
    ErrorCondition::SubscriptionRequired,
    ErrorCondition::UndefinedCondition,
    ErrorCondition::UnexpectedRequest,
];

impl ErrorCondition {
    pub fn as_str(&self) -> &'static str {
        STANZA_ERROR_NAMES[*self as usize]
    }
}

impl FromStr for ErrorCondition {
    type Err = StanzaErrorMalformed;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        STANZA_ERROR_NAMES
            .iter()
            .position(|name| *name == s)
            .map(|pos| CONDITIONS[pos])
            .ok_or_else(|| StanzaErrorMalformed::InvalidCondition(s.to_owned()))
    }
}

impl Display for ErrorCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `<error/>` child of a stanza of type `error`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StanzaError {
    pub ns: StanzaNamespace,
    pub error_type: ErrorType,
    pub condition: ErrorCondition,
    pub text: Option<String>,
    /// Legacy numeric code.
    pub code: Option<String>,
}

impl StanzaError {
    pub fn new(error_type: ErrorType, condition: ErrorCondition) -> Self {
        StanzaError {
            ns: StanzaNamespace::Client,
            error_type,
            condition,
            text: None,
            code: None,
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_owned());
        self
    }

    /// Extracts the error from a stanza element.
    ///
    /// The last `error` child in the client or server namespace is used.
    /// Its text comes from the first `text` child in the stanza errors
    /// namespace and its condition from the first other child there.
    pub fn from_stanza_element(element: &Element) -> Result<Self, StanzaErrorMalformed> {
        if !is_stanza_element(element) {
            return Err(StanzaErrorMalformed::NotStanza);
        }
        let (error, ns) = element
            .children()
            .filter(|child| child.name() == "error")
            .filter_map(|child| StanzaNamespace::from_uri(child.ns()).map(|ns| (child, ns)))
            .last()
            .ok_or(StanzaErrorMalformed::NoErrorElement)?;

        if !error.has_children() {
            return Err(StanzaErrorMalformed::NoChildren);
        }
        let error_type: ErrorType = match error.attribute("type") {
            None | Some("") => return Err(StanzaErrorMalformed::MissingType),
            Some(value) => value.parse()?,
        };

        let text = error
            .children()
            .find(|child| child.is("text", STANZA_ERRORS_NS))
            .map(|child| child.text());
        let condition: ErrorCondition = error
            .children()
            .find(|child| child.ns() == STANZA_ERRORS_NS && child.name() != "text")
            .map_or(
                Err(StanzaErrorMalformed::InvalidCondition(String::new())),
                |child| child.name().parse::<ErrorCondition>(),
            )?;

        Ok(StanzaError {
            ns,
            error_type,
            condition,
            text,
            code: error.attribute("code").map(str::to_owned),
        })
    }

    /// Extracts the error from the current contents of the stanza.
    pub fn from_stanza(stanza: &Stanza) -> Result<Self, StanzaErrorMalformed> {
        Self::from_stanza_element(&stanza.to_element())
    }

    /// Multi-line human readable description.
    pub fn to_text(&self) -> String {
        format!(
            "Error Type: {}\nCondition: {}\nCode: {}\nText:\n{}",
            self.error_type,
            self.condition,
            self.code.as_deref().unwrap_or("None"),
            self.text.as_deref().unwrap_or("None"),
        )
    }
}

impl Display for StanzaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.condition, self.error_type)?;
        if let Some(text) = &self.text {
            write!(f, ": {text}")?;
        }
        Ok(())
    }
}

impl ToElement for StanzaError {
    fn to_element(&self) -> Element {
        let mut element =
            Element::new("error", self.ns.as_str()).with_attribute("type", self.error_type.as_str());
        if let Some(code) = &self.code {
            element.set_attribute("code", code.as_str());
        }
        element.push_child(Element::new(self.condition.as_str(), STANZA_ERRORS_NS));
        if let Some(text) = &self.text {
            element.push_child(Element::new("text", STANZA_ERRORS_NS).with_text(text));
        }
        element
    }
}
