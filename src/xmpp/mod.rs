/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod client;
pub mod constants;
mod error;
mod jid;
mod processor;
pub mod protocol;
mod roster;
mod stanza;
mod stream;

pub use client::Authentication;
pub use client::Client;
pub use client::ClientBuilder;
pub use client::ClientConfig;
pub use client::ConnectionInfo;
pub use error::ClientError;
pub use jid::BadJid;
pub use jid::Jid;
pub use jid::JidChange;
pub use jid::JidField;
pub use jid::JidForm;
pub use jid::JidKind;
pub use jid::WatchedJid;
pub use processor::IdMode;
pub use processor::ProcessorConfig;
pub use processor::ProcessorError;
pub use processor::ProcessorEvent;
pub use processor::SendOptions;
pub use processor::SendResult;
pub use processor::StanzaProcessor;
pub use processor::Wait;
pub use roster::RosterItem;
pub use roster::RosterQuery;
pub use roster::Subscription;
pub use stanza::ErrorCondition;
pub use stanza::ErrorType;
pub use stanza::MessageBody;
pub use stanza::MessageSubject;
pub use stanza::MessageThread;
pub use stanza::PresenceShow;
pub use stanza::PresenceStatus;
pub use stanza::Stanza;
pub use stanza::StanzaError;
pub use stanza::StanzaErrorMalformed;
pub use stanza::StanzaKind;
pub use stanza::StanzaMalformed;
pub use stanza::StanzaNamespace;
pub use stanza::StanzaType;
pub use stream::InputStreamReader;
pub use stream::IoEvent;
pub use stream::IoStreamMachine;
pub use stream::Outgoing;
pub use stream::OutputStreamWriter;
pub use stream::StreamConfig;
pub use stream::StreamError;
pub use stream::StreamEvent;
pub use stream::StreamMachine;
pub use stream::StreamMode;
pub use stream::StreamParser;
pub use stream::StreamParserTarget;
pub use stream::Transmit;
pub use stream::WorkerState;

#[cfg(test)]
mod tests;
