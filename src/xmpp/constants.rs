/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

pub const CLIENT_PORT: u16 = 5222;

pub const SERVER_PORT: u16 = 5269;

pub const CLIENT_NS: &str = "jabber:client";

pub const SERVER_NS: &str = "jabber:server";

pub const STREAM_NS: &str = "http://etherx.jabber.org/streams";

pub const STREAM_ERRORS_NS: &str = "urn:ietf:params:xml:ns:xmpp-streams";

pub const STANZA_ERRORS_NS: &str = "urn:ietf:params:xml:ns:xmpp-stanzas";

pub const TLS_NS: &str = "urn:ietf:params:xml:ns:xmpp-tls";

pub const SASL_NS: &str = "urn:ietf:params:xml:ns:xmpp-sasl";

pub const BIND_NS: &str = "urn:ietf:params:xml:ns:xmpp-bind";

pub const SESSION_NS: &str = "urn:ietf:params:xml:ns:xmpp-session";

pub const ROSTER_NS: &str = "jabber:iq:roster";

pub const STANZA_NAMES: [&str; 3] = ["message", "iq", "presence"];

pub const STREAM_ERROR_NAMES: [&str; 25] = [
    "bad-format",
    "bad-namespace-prefix",
    "conflict",
    "connection-timeout",
    "host-gone",
    "host-unknown",
    "improper-addressing",
    "internal-server-error",
    "invalid-from",
    "invalid-namespace",
    "invalid-xml",
    "not-authorized",
    "not-well-formed",
    "policy-violation",
    "remote-connection-failed",
    "reset",
    "resource-constraint",
    "restricted-xml",
    "see-other-host",
    "system-shutdown",
    "undefined-condition",
    "unsupported-encoding",
    "unsupported-feature",
    "unsupported-stanza-type",
    "unsupported-version",
];

pub const STANZA_ERROR_NAMES: [&str; 22] = [
    "bad-request",
    "conflict",
    "feature-not-implemented",
    "forbidden",
    "gone",
    "internal-server-error",
    "item-not-found",
    "jid-malformed",
    "not-acceptable",
    "not-allowed",
    "not-authorized",
    "policy-violation",
    "recipient-unavailable",
    "redirect",
    "registration-required",
    "remote-server-not-found",
    "remote-server-timeout",
    "resource-constraint",
    "service-unavailable",
    "subscription-required",
    "undefined-condition",
    "unexpected-request",
];

pub const SASL_ERRORS: [&str; 11] = [
    "aborted",
    "account-disabled",
    "credentials-expired",
    "encryption-required",
    "incorrect-encoding",
    "invalid-authzid",
    "invalid-mechanism",
    "malformed-request",
    "mechanism-too-weak",
    "not-authorized",
    "temporary-auth-failure",
];

pub const STREAM_VERSION: &str = "1.0";

pub const DEFAULT_LANG: &str = "en";

/// Resource used by [Jid::full](crate::Jid::full) when none is set.
pub const DEFAULT_RESOURCE: &str = "default";
