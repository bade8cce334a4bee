/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::collections::HashSet;
use std::sync::mpsc::Sender;
use std::sync::mpsc::channel;

use super::*;
use crate::Jid;
use crate::ToElement;
use crate::xmpp::constants::CLIENT_NS;
use crate::xmpp::roster::RosterItem;
use crate::xmpp::roster::RosterQuery;
use crate::xmpp::stanza::MessageBody;
use crate::xmpp::stanza::StanzaType;
use crate::xmpp::stream::tests::PEER_HEADER;
use crate::xmpp::stream::tests::fast_config;
use crate::xmpp::stream::tests::init_logging;
use crate::xmpp::stream::tests::pipe;
use crate::xmpp::stream::tests::record;
use crate::xmpp::stream::tests::wait_until;

/// Hands everything transmitted to the test as text.
struct MockSink(Mutex<Sender<String>>);

impl Transmit for MockSink {
    fn transmit(&self, item: Outgoing) -> Result<(), StreamError> {
        let text = String::from_utf8(item.into_bytes()).unwrap();
        self.0
            .lock()
            .unwrap()
            .send(text)
            .map_err(|_| StreamError::NotRunning)
    }
}

type Responder = Box<dyn Fn(&Element) -> Option<Element> + Send>;

/// Connects a processor to a peer thread which answers with `respond`.
fn connected(config: ProcessorConfig, respond: Responder) -> Arc<StanzaProcessor> {
    init_logging();
    let processor = Arc::new(StanzaProcessor::new(config).unwrap());
    let (sender, sent) = channel::<String>();
    processor.connect_sink(Arc::new(MockSink(Mutex::new(sender))));
    let peer = Arc::downgrade(&processor);
    thread::spawn(move || {
        for text in sent {
            let element: Element = text.parse().unwrap();
            let (Some(reply), Some(processor)) = (respond(&element), peer.upgrade()) else {
                continue;
            };
            processor.receive(reply);
        }
    });
    processor
}

fn silent() -> Responder {
    Box::new(|_: &Element| None)
}

/// Answers iq requests with an empty result addressed from their target.
fn iq_result() -> Responder {
    Box::new(|request: &Element| {
        let mut reply = Element::new("iq", CLIENT_NS)
            .with_attribute("type", "result")
            .with_attribute("id", request.attribute("id")?);
        if let Some(to) = request.attribute("to") {
            reply.set_attribute("from", to);
        }
        Some(reply)
    })
}

fn short_config() -> ProcessorConfig {
    ProcessorConfig::new().default_wait(Duration::from_millis(100))
}

#[test]
fn wait_conversions() {
    assert_eq!(Wait::from(true), Wait::Default);
    assert_eq!(Wait::from(false), Wait::No);
    assert_eq!(Wait::from(0i64), Wait::No);
    assert_eq!(Wait::from(-1i64), Wait::Forever);
    assert_eq!(Wait::from(3i64), Wait::For(Duration::from_secs(3)));
    assert_eq!(Wait::from(Duration::ZERO), Wait::No);
    assert_eq!(SendOptions::default().wait, Wait::No);
    assert_eq!(SendOptions::default().id_mode, IdMode::Generate);
    assert!(SendOptions::default().emit_reply_message);
}

#[test]
fn not_connected() {
    let processor = StanzaProcessor::new(ProcessorConfig::new()).unwrap();
    assert!(!processor.is_connected());
    let result = processor.send(&mut Stanza::message(), SendOptions::new());
    assert!(matches!(result, Err(ProcessorError::NotConnected)));
}

#[test]
fn send_without_waiting() {
    let processor = connected(ProcessorConfig::new(), silent());

    let mut stanza = Stanza::message().with_body(MessageBody::new("hi", None));
    let result = processor.send(&mut stanza, SendOptions::new()).unwrap();
    let SendResult::Sent(Some(id)) = result else {
        panic!("unexpected result {result:?}");
    };
    assert!(id.ends_with("-stanza-0x1"));
    assert_eq!(id.len(), 32 + "-stanza-0x1".len());
    assert_eq!(stanza.id(), Some(id.as_str()));

    // an existing id is kept
    let mut stanza = Stanza::presence().with_id("keep");
    let result = processor.send(&mut stanza, SendOptions::new().wait(false));
    assert_eq!(result.unwrap(), SendResult::Sent(Some("keep".into())));

    let mut stanza = Stanza::presence();
    let options = SendOptions::new().id_mode(IdMode::FromStanza);
    assert_eq!(
        processor.send(&mut stanza, options).unwrap(),
        SendResult::Sent(None)
    );

    let mut stanza = Stanza::presence().with_id("old");
    let options = SendOptions::new().id_mode(IdMode::GenerateImplicit);
    let SendResult::Sent(Some(id)) = processor.send(&mut stanza, options).unwrap() else {
        panic!("no id");
    };
    assert!(id.ends_with("-stanza-0x2"));
    assert_eq!(processor.pending(), 0);
}

#[test]
fn timeouts() {
    let processor = connected(short_config(), silent());

    let mut stanza = Stanza::iq(StanzaType::Get);
    let options = SendOptions::new().wait(Duration::from_millis(50));
    assert_eq!(processor.send(&mut stanza, options).unwrap(), SendResult::TimedOut);
    assert!(stanza.id().is_some());
    assert_eq!(processor.pending(), 0);

    // the default wait always uses a fresh id
    let mut stanza = Stanza::iq(StanzaType::Get).with_id("mine");
    let options = SendOptions::new()
        .id_mode(IdMode::FromStanza)
        .wait(true);
    assert_eq!(processor.send(&mut stanza, options).unwrap(), SendResult::TimedOut);
    assert_ne!(stanza.id(), Some("mine"));
    assert_eq!(processor.pending(), 0);
}

#[test]
fn wait_forever() {
    let processor = connected(ProcessorConfig::new(), iq_result());
    let mut stanza = Stanza::iq(StanzaType::Get).with_to_jid("example.com".parse().unwrap());
    let options = SendOptions::new().wait(-1i64);
    let result = processor.send(&mut stanza, options).unwrap();
    let SendResult::Reply(reply) = result else {
        panic!("unexpected result {result:?}");
    };
    assert_eq!(reply.stanza_type(), Some(StanzaType::Result));
    assert_eq!(reply.id(), stanza.id());
    assert_eq!(processor.pending(), 0);
}

#[test]
fn waiting_needs_an_id() {
    let processor = connected(ProcessorConfig::new(), silent());
    let mut stanza = Stanza::iq(StanzaType::Get);
    let options = SendOptions::new()
        .id_mode(IdMode::FromStanza)
        .wait(1i64);
    assert!(matches!(
        processor.send(&mut stanza, options),
        Err(ProcessorError::MissingId)
    ));
    assert_eq!(processor.pending(), 0);
}

#[test]
fn duplicate_wait() {
    let processor = connected(ProcessorConfig::new(), silent());
    let options = SendOptions::new()
        .id_mode(IdMode::Implicit("dup".into()))
        .wait(Duration::from_secs(5));

    let first = {
        let processor = processor.clone();
        let options = options.clone();
        thread::spawn(move || processor.send(&mut Stanza::iq(StanzaType::Get), options))
    };
    assert!(wait_until(|| processor.pending() == 1));

    let result = processor.send(&mut Stanza::iq(StanzaType::Get), options);
    assert!(matches!(result, Err(ProcessorError::DuplicateId(id)) if id == "dup"));

    processor.receive(
        Element::new("iq", CLIENT_NS)
            .with_attribute("type", "result")
            .with_attribute("id", "dup"),
    );
    let SendResult::Reply(reply) = first.join().unwrap().unwrap() else {
        panic!("no reply");
    };
    assert_eq!(reply.id(), Some("dup"));
    assert_eq!(processor.pending(), 0);
}

#[test]
fn roster_request() {
    let roster = Box::new(|request: &Element| {
        let query = RosterQuery::new()
            .with_item(RosterItem::new("romeo@example.net".parse().unwrap()).with_name("Romeo"));
        let reply = Element::new("iq", CLIENT_NS)
            .with_attribute("type", "result")
            .with_attribute("id", request.attribute("id")?)
            .with_child(query.to_element());
        Some(reply)
    });
    let processor = connected(ProcessorConfig::new(), roster);
    let events = record(processor.events());

    let mut stanza = Stanza::iq(StanzaType::Get).with_object(&RosterQuery::new());
    let options = SendOptions::new()
        .id_mode(IdMode::Implicit("x1".into()))
        .wait(5i64);
    let result = processor.send(&mut stanza, options).unwrap();
    let SendResult::Reply(reply) = result else {
        panic!("unexpected result {result:?}");
    };
    assert_eq!(reply.stanza_type(), Some(StanzaType::Result));
    assert_eq!(reply.id(), Some("x1"));
    let query = RosterQuery::from_element(&reply.objects()[0]).unwrap();
    assert_eq!(query.items[0].name.as_deref(), Some("Romeo"));
    assert_eq!(processor.pending(), 0);
    // replies to iq requests are not reported by default
    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn concurrent_sends() {
    let processor = connected(ProcessorConfig::new(), iq_result());
    let workers: Vec<_> = (0..8)
        .map(|i| {
            let processor = processor.clone();
            thread::spawn(move || {
                let to: Jid = format!("node{i}@example.com").parse().unwrap();
                let mut stanza = Stanza::iq(StanzaType::Get).with_to_jid(to.clone());
                let result = processor.send(&mut stanza, SendOptions::new().wait(true));
                let Ok(SendResult::Reply(reply)) = result else {
                    panic!("no reply for {i}: {result:?}");
                };
                assert_eq!(reply.from_jid(), Some(&to));
                assert_eq!(reply.id(), stanza.id());
                reply.id().unwrap().to_owned()
            })
        })
        .collect();
    let ids: HashSet<String> = workers
        .into_iter()
        .map(|worker| worker.join().unwrap())
        .collect();
    assert_eq!(ids.len(), 8);
    assert_eq!(processor.pending(), 0);
}

#[test]
fn dispatch_rules() {
    let processor = StanzaProcessor::new(ProcessorConfig::new()).unwrap();
    let events = record(processor.events());

    processor.receive("<features xmlns='http://etherx.jabber.org/streams'/>".parse().unwrap());
    processor.receive("<message xmlns='jabber:client' id='u1'/>".parse().unwrap());
    processor.receive("<iq xmlns='jabber:client' type='bogus'/>".parse().unwrap());
    assert!(wait_until(|| events.lock().unwrap().len() == 2));

    let events = events.lock().unwrap();
    assert!(matches!(&events[0], ProcessorEvent::NewStanza(stanza) if stanza.id() == Some("u1")));
    assert!(matches!(&events[1], ProcessorEvent::DefectiveStanza(element)
        if element.attribute("type") == Some("bogus")));
}

fn check_reply_emission(options: SendOptions, reply_kind: &str, emitted: bool) {
    let kind = reply_kind.to_owned();
    let responder: Responder = Box::new(move |request: &Element| {
        Some(
            Element::new(&kind, CLIENT_NS)
                .with_attribute("type", "result")
                .with_attribute("id", request.attribute("id")?),
        )
    });
    let processor = connected(ProcessorConfig::new(), responder);
    let events = record(processor.events());

    let options = options.wait(Duration::from_secs(5));
    let result = processor.send(&mut Stanza::iq(StanzaType::Get), options).unwrap();
    assert!(matches!(result, SendResult::Reply(_)));
    // dispatching is sequential, so a later stanza shows everything before
    processor.receive("<presence xmlns='jabber:client' id='marker'/>".parse().unwrap());
    assert!(wait_until(|| events
        .lock()
        .unwrap()
        .iter()
        .any(|event| matches!(event, ProcessorEvent::NewStanza(s) if s.id() == Some("marker")))));
    assert_eq!(events.lock().unwrap().len(), if emitted { 2 } else { 1 });
}

#[test]
fn reply_emission() {
    check_reply_emission(SendOptions::new(), "iq", false);
    check_reply_emission(SendOptions::new(), "message", true);
    check_reply_emission(SendOptions::new().emit_reply_message(false), "message", false);
    check_reply_emission(SendOptions::new().emit_reply_anyway(true), "iq", true);
}

#[test]
fn io_machine_connection() {
    let (peer, source) = pipe();
    let (sink, _written) = pipe();
    let machine = Arc::new(IoStreamMachine::new(source, sink, fast_config()));
    let processor = StanzaProcessor::new(ProcessorConfig::new()).unwrap();
    let events = record(processor.events());
    processor.connect_io_machine(machine.clone());
    assert!(processor.is_connected());

    machine.start().unwrap();
    peer.push(PEER_HEADER);
    peer.push("<message from='juliet@example.com' id='m1'><body>hi</body></message>");
    assert!(wait_until(|| events.lock().unwrap().len() == 1));
    {
        let events = events.lock().unwrap();
        let ProcessorEvent::NewStanza(stanza) = &events[0] else {
            panic!("expected a stanza");
        };
        assert_eq!(stanza.body_map()[""], "hi");
    }

    let result = processor.send(&mut Stanza::presence(), SendOptions::new());
    assert!(matches!(result, Ok(SendResult::Sent(Some(_)))));

    processor.disconnect_io_machine();
    assert!(!processor.is_connected());
    assert!(machine.events().is_empty());
    machine.stop();
}
