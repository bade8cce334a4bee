/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::io;
use std::io::Read;
use std::io::Write;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::sync::mpsc::channel;
use std::time::Duration;
use std::time::Instant;

use log::debug;
use log::warn;

use crate::Element;
use crate::Signal;
use crate::SubscriptionId;

use super::ClientError;
use super::Jid;
use super::constants::BIND_NS;
use super::constants::CLIENT_PORT;
use super::error::description;
use super::processor::IdMode;
use super::processor::ProcessorConfig;
use super::processor::SendOptions;
use super::processor::SendResult;
use super::processor::StanzaProcessor;
use super::processor::Wait;
use super::protocol::Bind;
use super::protocol::Session;
use super::protocol::is_features_element;
use super::protocol::start_stream_header;
use super::protocol::stop_stream_tag;
use super::stanza::Stanza;
use super::stanza::StanzaType;
use super::stream::IoEvent;
use super::stream::IoStreamMachine;
use super::stream::Outgoing;
use super::stream::StreamConfig;
use super::stream::StreamEvent;

/// Where to connect for a JID.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
    pub priority: String,
}

impl ConnectionInfo {
    pub fn new(host: &str) -> Self {
        ConnectionInfo {
            host: host.to_string(),
            port: CLIENT_PORT,
            priority: "default".to_string(),
        }
    }
}

/// SASL parameters for a JID.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Authentication {
    pub service: String,
    pub hostname: String,
    pub authid: String,
    pub authzid: Option<String>,
    pub realm: String,
    pub password: Option<String>,
}

/// Settings shared by all clients.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ClientConfig {
    pub stream: StreamConfig,
    pub processor: ProcessorConfig,
    /// How long [Client::stop] waits for the peer to close its stream.
    pub stop_timeout: Duration,
}

impl ClientConfig {
    pub fn new() -> Self {
        ClientConfig {
            stream: StreamConfig::new(),
            processor: ProcessorConfig::new(),
            stop_timeout: Duration::from_secs(5),
        }
    }

    pub fn stream(mut self, config: StreamConfig) -> Self {
        self.stream = config;
        self
    }

    pub fn processor(mut self, config: ProcessorConfig) -> Self {
        self.processor = config;
        self
    }

    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ClientBuilder {
    jid: Jid,
    server: Option<String>,
    port: u16,
    connection_timeout: Duration,
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn new(jid: Jid) -> Self {
        ClientBuilder {
            jid,
            server: None,
            port: CLIENT_PORT,
            connection_timeout: Duration::from_secs(30),
            config: ClientConfig::new(),
        }
    }

    pub fn server(mut self, server: Option<String>) -> Self {
        self.server = server;
        self
    }

    /// Port used when the server name does not carry one.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn connect(self) -> Result<Client, ClientError> {
        let host = match &self.server {
            Some(server) => server.as_str(),
            None => self.jid.domain().unwrap_or("localhost"),
        };
        let mut addresses = if needs_port(host) {
            (host, self.port).to_socket_addrs()
        } else {
            host.to_socket_addrs()
        }?;
        let address = addresses.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, description::NO_ADDRESS)
        })?;
        debug!("Connecting to {address}");
        let tcp_stream = TcpStream::connect_timeout(&address, self.connection_timeout)?;
        tcp_stream.set_read_timeout(Some(self.config.stream.poll_interval))?;
        let writer = tcp_stream.try_clone()?;
        Client::from_transport(tcp_stream, writer, self.jid, self.config)
    }
}

// The resolver requires a port number but has no way to give a default
// one. A colon inside brackets belongs to an IPv6 address.
pub(super) fn needs_port(host: &str) -> bool {
    let colon_pos = host.rfind(':');
    let bracket_pos = host.find(']');
    match (colon_pos, bracket_pos) {
        (None, None) | (None, Some(_)) => true,
        (Some(_), None) => false,
        (Some(colon), Some(bracket)) => colon < bracket,
    }
}

/// A client stream: an I/O machine with a stanza processor on top.
pub struct Client {
    jid: Jid,
    config: ClientConfig,
    machine: Arc<IoStreamMachine>,
    processor: StanzaProcessor,
    features: Arc<Signal<Element>>,
    features_subscription: SubscriptionId,
}

impl Client {
    pub fn build(jid: Jid) -> ClientBuilder {
        ClientBuilder::new(jid)
    }

    /// Wraps an established transport. Nothing is read or written until
    /// [start](Client::start).
    pub fn from_transport<R, W>(
        reader: R,
        writer: W,
        jid: Jid,
        config: ClientConfig,
    ) -> Result<Client, ClientError>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let machine = Arc::new(IoStreamMachine::new(reader, writer, config.stream.clone()));
        let processor = StanzaProcessor::new(config.processor.clone())?;
        processor.connect_io_machine(machine.clone());

        let features: Arc<Signal<Element>> = Arc::new(Signal::new());
        let sink = features.clone();
        let features_subscription = machine.events().connect(move |event| {
            if let IoEvent::In(StreamEvent::ElementRead(element)) = event
                && is_features_element(element)
            {
                sink.emit(element);
            }
        });

        Ok(Client {
            jid,
            config,
            machine,
            processor,
            features,
            features_subscription,
        })
    }

    pub fn jid(&self) -> &Jid {
        &self.jid
    }

    /// Emits the `<stream:features/>` elements the peer sends.
    pub fn features(&self) -> &Signal<Element> {
        &self.features
    }

    pub fn processor(&self) -> &StanzaProcessor {
        &self.processor
    }

    pub fn io_machine(&self) -> &IoStreamMachine {
        &self.machine
    }

    pub fn has_stream_in(&self) -> bool {
        self.machine.is_input_open()
    }

    pub fn has_stream_out(&self) -> bool {
        self.machine.is_output_open()
    }

    /// Starts the machines and opens our stream.
    pub fn start(&self, from: &str, to: &str) -> Result<(), ClientError> {
        self.machine.start()?;
        self.machine
            .send_blocking(Outgoing::Text(start_stream_header(from, to)))?;
        Ok(())
    }

    /// Closes our stream, gives the peer a chance to close its own and
    /// stops the machines.
    pub fn stop(&self) {
        let mut expected = usize::from(self.has_stream_in()) + usize::from(self.has_stream_out());
        let (stopped, stops) = channel();
        let subscription = self.machine.events().connect(move |event| {
            if matches!(
                event,
                IoEvent::In(StreamEvent::Stop) | IoEvent::Out(StreamEvent::Stop)
            ) {
                let _ = stopped.send(());
            }
        });

        if self.has_stream_out()
            && let Err(err) = self
                .machine
                .send_blocking(Outgoing::Text(stop_stream_tag().to_string()))
        {
            warn!("Cannot close output stream: {err}");
            expected = 0;
        }
        let deadline = Instant::now() + self.config.stop_timeout;
        while expected > 0 {
            let left = deadline.saturating_duration_since(Instant::now());
            if stops.recv_timeout(left).is_err() {
                debug!("Peer did not close its stream in time");
                break;
            }
            expected -= 1;
        }

        self.machine.events().disconnect(subscription);
        self.machine.stop();
    }

    fn request(&self, stanza: &mut Stanza, wait: Wait) -> Result<Stanza, ClientError> {
        let wait = match wait {
            Wait::No => Wait::Default,
            wait => wait,
        };
        let options = SendOptions::new()
            .id_mode(IdMode::GenerateImplicit)
            .wait(wait);
        match self.processor.send(stanza, options)? {
            SendResult::Reply(reply) => match reply.error()? {
                Some(error) => Err(ClientError::Rejected(error)),
                None => Ok(reply),
            },
            SendResult::TimedOut | SendResult::Sent(_) => Err(ClientError::Timeout),
        }
    }

    /// Binds a resource and returns the full JID assigned by the server.
    pub fn bind(
        &mut self,
        resource: Option<&str>,
        wait: impl Into<Wait>,
    ) -> Result<Jid, ClientError> {
        let request = Bind::Resource(resource.map(str::to_string));
        let mut stanza = Stanza::iq(StanzaType::Set).with_object(&request);
        let reply = self.request(&mut stanza, wait.into())?;
        let bind = reply
            .objects()
            .iter()
            .find(|object| object.is("bind", BIND_NS))
            .ok_or(ClientError::Unexpected(description::NO_BIND))?;
        match Bind::from_element(bind)? {
            Bind::Jid(jid) => {
                debug!("Bound to {jid}");
                self.jid.update(&jid);
                Ok(jid)
            }
            Bind::Resource(_) => Err(ClientError::Unexpected(description::NO_JID)),
        }
    }

    /// Requests an RFC 3920 session.
    pub fn session(&self, to: Option<Jid>, wait: impl Into<Wait>) -> Result<(), ClientError> {
        let mut stanza = Stanza::iq(StanzaType::Set).with_object(&Session);
        stanza.set_to_jid(to);
        self.request(&mut stanza, wait.into())?;
        Ok(())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.processor.disconnect_io_machine();
        self.machine.events().disconnect(self.features_subscription);
        self.machine.stop();
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("jid", &self.jid)
            .field("machine", &self.machine)
            .field("processor", &self.processor)
            .finish()
    }
}
