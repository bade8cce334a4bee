/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::io::Read;
use std::io::Write;
use std::net::TcpListener;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use super::client::needs_port;
use super::constants::BIND_NS;
use super::constants::SESSION_NS;
use super::constants::STANZA_ERRORS_NS;
use super::protocol::*;
use super::stream::tests::PEER_HEADER;
use super::stream::tests::SharedSink;
use super::stream::tests::fast_config;
use super::stream::tests::init_logging;
use super::stream::tests::pipe;
use super::stream::tests::record;
use super::stream::tests::wait_until;
use super::*;
use crate::Element;
use crate::ToElement;

fn parse(text: &str) -> Element {
    text.parse().unwrap()
}

#[test]
fn stream_header() {
    assert_eq!(
        start_stream_header("juliet@example.com", "example.com"),
        "<?xml version=\"1.0\"?><stream:stream from=\"juliet@example.com\" \
         to=\"example.com\" version=\"1.0\" xml:lang=\"en\" xmlns=\"jabber:client\" \
         xmlns:stream=\"http://etherx.jabber.org/streams\">"
    );
    let header = StreamHeader::new("a&b", "c\"d")
        .xmlns("jabber:server")
        .lang("tr");
    let text = header.to_xml();
    assert!(text.contains("from=\"a&amp;b\""));
    assert!(text.contains("to=\"c&quot;d\""));
    assert!(text.contains("xml:lang=\"tr\""));
    assert!(text.contains("xmlns=\"jabber:server\""));
    assert_eq!(stop_stream_tag(), "</stream:stream>");
}

#[test]
fn element_predicates() {
    assert!(is_stanza_element(&parse("<iq xmlns='jabber:client'/>")));
    assert!(is_stanza_element(&parse("<message xmlns='jabber:server'/>")));
    assert!(!is_stanza_element(&parse("<message xmlns='urn:example'/>")));
    assert!(!is_stanza_element(&parse("<query xmlns='jabber:client'/>")));
    assert!(is_features_element(&parse(
        "<stream:features xmlns:stream='http://etherx.jabber.org/streams'/>"
    )));
    assert!(!is_features_element(&parse("<features xmlns='jabber:client'/>")));
}

fn check_stream_error(text: &str, name: StreamErrorName, error_text: Option<&str>) {
    let info = determine_stream_error(&parse(text)).unwrap();
    assert_eq!(info.name, name);
    assert_eq!(info.text.as_deref(), error_text);
}

#[test]
fn stream_errors() {
    check_stream_error(
        "<stream:error xmlns:stream='http://etherx.jabber.org/streams'>\
            <host-unknown xmlns='urn:ietf:params:xml:ns:xmpp-streams'/>\
         </stream:error>",
        StreamErrorName::Standard("host-unknown"),
        None,
    );
    check_stream_error(
        "<stream:error xmlns:stream='http://etherx.jabber.org/streams'>\
            <text xmlns='urn:ietf:params:xml:ns:xmpp-streams'>Bye</text>\
            <ancient-error xmlns='urn:ietf:params:xml:ns:xmpp-streams'/>\
         </stream:error>",
        StreamErrorName::NonStandard("ancient-error".into()),
        Some("Bye"),
    );
    // conditions outside the streams namespace do not count
    check_stream_error(
        "<stream:error xmlns:stream='http://etherx.jabber.org/streams'>\
            <conflict xmlns='urn:example'/>\
         </stream:error>",
        StreamErrorName::Absent,
        None,
    );
    assert_eq!(
        determine_stream_error(&parse("<error xmlns='jabber:client'/>")),
        None
    );
}

#[test]
fn bind_payloads() {
    let request = parse(&format!(
        "<bind xmlns='{BIND_NS}'><resource>balcony</resource></bind>"
    ));
    assert_eq!(
        Bind::from_element(&request).unwrap(),
        Bind::Resource(Some("balcony".into()))
    );
    assert_eq!(
        Bind::from_element(&parse(&format!("<bind xmlns='{BIND_NS}'/>"))).unwrap(),
        Bind::Resource(None)
    );

    let jid: Jid = "juliet@example.com/balcony".parse().unwrap();
    let result = Bind::Jid(jid.clone()).to_element();
    assert_eq!(
        result.to_string(),
        format!("<bind xmlns=\"{BIND_NS}\"><jid>juliet@example.com/balcony</jid></bind>")
    );
    assert_eq!(Bind::from_element(&result).unwrap(), Bind::Jid(jid));

    let bad = parse(&format!("<bind xmlns='{BIND_NS}'><jid>a@b@c</jid></bind>"));
    assert!(matches!(
        Bind::from_element(&bad),
        Err(StanzaMalformed::InvalidJid { .. })
    ));
    assert!(matches!(
        Bind::from_element(&parse("<bind xmlns='urn:example'/>")),
        Err(StanzaMalformed::UnexpectedElement { .. })
    ));

    assert_eq!(
        Session::from_element(&parse(&format!("<session xmlns='{SESSION_NS}'/>"))),
        Ok(Session)
    );
    assert_eq!(StartTls::from_element(&StartTls.to_element()), Ok(StartTls));
}

#[test]
fn roster_query() {
    let query = RosterQuery::from_element(&parse(
        "<query xmlns='jabber:iq:roster' ver='ver11'>\
            <item jid='romeo@example.net' name='Romeo' subscription='both'>\
                <group>Friends</group>\
                <group>Lovers</group>\
            </item>\
            <item jid='nurse@example.com/chamber' ask='subscribe' approved='true'/>\
         </query>",
    ))
    .unwrap();
    assert_eq!(query.ver.as_deref(), Some("ver11"));
    assert_eq!(query.items.len(), 2);

    let romeo = &query.items[0];
    assert_eq!(romeo.name.as_deref(), Some("Romeo"));
    assert_eq!(romeo.subscription, Some(Subscription::Both));
    assert_eq!(romeo.groups, ["Friends", "Lovers"]);
    assert!(!romeo.ask);

    let nurse = &query.items[1];
    assert_eq!(nurse.subscription, None);
    assert!(nurse.ask);
    assert!(nurse.approved);

    let items = query.item_map();
    assert_eq!(
        items.keys().collect::<Vec<_>>(),
        ["nurse@example.com", "romeo@example.net"]
    );

    assert_eq!(RosterQuery::from_element(&query.to_element()).unwrap(), query);
}

#[test]
fn roster_rejects() {
    let bad_subscription = parse(
        "<query xmlns='jabber:iq:roster'><item jid='a@b' subscription='maybe'/></query>",
    );
    assert!(matches!(
        RosterQuery::from_element(&bad_subscription),
        Err(StanzaMalformed::InvalidValue { field: "subscription", .. })
    ));
    let bad_ask = parse("<item xmlns='jabber:iq:roster' jid='a@b' ask='please'/>");
    assert!(matches!(
        RosterItem::from_element(&bad_ask),
        Err(StanzaMalformed::InvalidValue { field: "ask", .. })
    ));
    assert!(RosterItem::from_element(&parse("<item xmlns='jabber:iq:roster'/>")).is_err());
    assert_eq!("remove".parse::<Subscription>(), Ok(Subscription::Remove));
    assert_eq!(Subscription::To.to_string(), "to");
}

#[test]
fn server_ports() {
    assert!(needs_port("example.com"));
    assert!(needs_port("[::1]"));
    assert!(!needs_port("example.com:5223"));
    assert!(!needs_port("[::1]:5223"));
    assert!(!needs_port("127.0.0.1:5222"));
}

#[test]
fn jid_parameters() {
    let jid: Jid = "juliet@example.com/balcony".parse().unwrap();
    let info = jid.connection_info();
    assert_eq!(info, ConnectionInfo::new("example.com"));
    assert_eq!(info.port, 5222);
    let auth = jid.authentication();
    assert_eq!(auth.authid, "juliet");
    assert_eq!(auth.realm, "example.com");
    assert_eq!(auth.service, "xmpp");
    assert_eq!(auth.password, None);
}

/// Answers bind requests, accepts sessions for example.com and rejects
/// everything else.
fn answer(request: &Element) -> String {
    let id = request.attribute("id").unwrap_or("");
    if let Some(bind) = request.get_child("bind", BIND_NS) {
        let resource = bind
            .get_child("resource", BIND_NS)
            .map_or("generated".to_string(), |resource| resource.text());
        return format!(
            "<iq type='result' id='{id}'><bind xmlns='{BIND_NS}'>\
             <jid>juliet@example.com/{resource}</jid></bind></iq>"
        );
    }
    match request.attribute("to") {
        Some("example.com") => format!("<iq type='result' id='{id}' from='example.com'/>"),
        _ => format!(
            "<iq type='error' id='{id}'><error type='cancel'>\
             <service-unavailable xmlns='{STANZA_ERRORS_NS}'/></error></iq>"
        ),
    }
}

fn serve(listener: TcpListener) {
    let (mut socket, _) = listener.accept().unwrap();
    let mut parser = StreamParser::new();
    let mut buffer = [0u8; 1024];
    loop {
        let count = socket.read(&mut buffer).unwrap();
        if count == 0 {
            return;
        }
        parser.feed(&buffer[..count]).unwrap();
        for event in parser.take_events() {
            let reply = match event {
                StreamEvent::Start(_) => format!(
                    "{PEER_HEADER}<stream:features><bind xmlns='{BIND_NS}'/>\
                     <session xmlns='{SESSION_NS}'/></stream:features>"
                ),
                StreamEvent::ElementRead(element) => answer(&element),
                StreamEvent::Stop => {
                    socket.write_all(stop_stream_tag().as_bytes()).unwrap();
                    return;
                }
                StreamEvent::Error(_) => return,
            };
            socket.write_all(reply.as_bytes()).unwrap();
        }
    }
}

#[test]
fn client_session() {
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    let server = thread::spawn(move || serve(listener));

    let mut client = ClientBuilder::new("juliet@example.com".parse().unwrap())
        .server(Some(address.to_string()))
        .config(ClientConfig::new().stream(fast_config()))
        .connect()
        .unwrap();
    let features = record(client.features());
    client.start("juliet@example.com", "example.com").unwrap();
    assert!(wait_until(|| features.lock().unwrap().len() == 1));
    assert!(
        features.lock().unwrap()[0]
            .get_child("bind", BIND_NS)
            .is_some()
    );
    assert!(client.has_stream_in());
    assert!(client.has_stream_out());

    let bound = client.bind(Some("balcony"), 5i64).unwrap();
    assert_eq!(bound.to_string(), "juliet@example.com/balcony");
    assert_eq!(client.jid(), &bound);

    client
        .session(Some("example.com".parse().unwrap()), true)
        .unwrap();
    let rejected = client.session(Some("elsewhere.example".parse().unwrap()), true);
    assert!(matches!(
        rejected,
        Err(ClientError::Rejected(error))
            if error.condition == ErrorCondition::ServiceUnavailable
                && error.error_type == ErrorType::Cancel
    ));
    assert_eq!(client.processor().pending(), 0);

    client.stop();
    assert!(!client.has_stream_in());
    assert!(!client.has_stream_out());
    server.join().unwrap();
}

#[test]
fn client_stop_without_peer_close() {
    let (peer, reader) = pipe();
    let sink = SharedSink::default();
    let config = ClientConfig::new()
        .stream(fast_config())
        .stop_timeout(Duration::from_millis(100));
    let client = Client::from_transport(
        reader,
        sink.clone(),
        "juliet@example.com".parse().unwrap(),
        config,
    )
    .unwrap();
    let features = record(client.features());

    client.start("juliet@example.com", "example.com").unwrap();
    peer.push(PEER_HEADER);
    peer.push("<stream:features/>");
    assert!(wait_until(|| features.lock().unwrap().len() == 1));
    assert!(client.has_stream_in());

    let started = Instant::now();
    client.stop();
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert!(!client.has_stream_out());
    assert!(sink.text().ends_with("</stream:stream>"));
    assert_eq!(client.io_machine().state(), Some(WorkerState::Stopped));
}

#[test]
fn client_without_answers() {
    let (peer, reader) = pipe();
    let config = ClientConfig::new()
        .stream(fast_config())
        .processor(ProcessorConfig::new().default_wait(Duration::from_millis(50)));
    let mut client = Client::from_transport(
        reader,
        SharedSink::default(),
        "juliet@example.com".parse().unwrap(),
        config,
    )
    .unwrap();
    client.start("juliet@example.com", "example.com").unwrap();
    peer.push(PEER_HEADER);

    // without waiting the default wait still applies
    assert!(matches!(client.bind(None, false), Err(ClientError::Timeout)));
    assert_eq!(client.jid().resource(), None);
}
