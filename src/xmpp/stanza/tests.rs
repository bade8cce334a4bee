/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use super::*;
use crate::xmpp::constants::STANZA_ERRORS_NS;

fn jid(s: &str) -> Jid {
    s.parse().unwrap()
}

fn parse(xml: &str) -> Result<Stanza, StanzaMalformed> {
    let element: Element = xml.parse().unwrap();
    Stanza::from_element(&element)
}

fn check_round_trip(stanza: Stanza) {
    let parsed = Stanza::from_element(&stanza.to_element()).unwrap();
    assert_eq!(parsed, stanza);
    assert!(parsed.element().is_some());
}

#[test]
fn round_trips() {
    check_round_trip(
        Stanza::message()
            .with_id("m1")
            .with_from_jid(jid("juliet@capulet.lit/balcony"))
            .with_to_jid(jid("romeo@montague.lit"))
            .with_type(StanzaType::Chat)
            .with_lang("en")
            .with_thread(MessageThread::new("t-1", Some("t-0")))
            .with_subject(MessageSubject::new("Hi", None))
            .with_body(MessageBody::new("Wherefore art thou?", None))
            .with_body(MessageBody::new("Pourquoi?", Some("fr"))),
    );
    check_round_trip(
        Stanza::presence()
            .with_show(PresenceShow::Dnd)
            .with_status(PresenceStatus::new(Some("busy"), Some("en")))
            .with_priority(-5),
    );
    check_round_trip(
        Stanza::iq(StanzaType::Get)
            .with_id("r1")
            .with_ns(StanzaNamespace::Server)
            .with_object(&Element::new("query", "jabber:iq:roster")),
    );
}

#[test]
fn serialization_order() {
    let stanza = Stanza::presence()
        .with_id("p1")
        .with_to_jid(jid("room@muc.lit"))
        .with_lang("en")
        .with_type(StanzaType::Unavailable)
        .with_priority(0)
        .with_object(&Element::new("x", "urn:x"))
        .with_status(PresenceStatus::new(Some("gone"), None))
        .with_show(PresenceShow::Xa);
    assert_eq!(
        stanza.to_xml_string(),
        "<presence id=\"p1\" to=\"room@muc.lit\" xml:lang=\"en\" type=\"unavailable\">\
         <show>xa</show><status>gone</status><x xmlns=\"urn:x\"/>\
         <priority>0</priority></presence>"
    );
    assert_eq!(
        Stanza::message().with_body(MessageBody::new("a<b", None)).to_string(),
        "<message><body>a&lt;b</body></message>"
    );
}

#[test]
fn not_stanzas() {
    assert_eq!(
        parse("<message xmlns='urn:other'/>"),
        Err(StanzaMalformed::NotStanza("{urn:other}message".into()))
    );
    assert_eq!(
        parse("<stanza xmlns='jabber:client'/>"),
        Err(StanzaMalformed::NotStanza("{jabber:client}stanza".into()))
    );
    assert_eq!(
        parse("<iq xmlns='jabber:client' type='fetch'/>"),
        Err(StanzaMalformed::InvalidType("fetch".into()))
    );
    assert!(matches!(
        parse("<iq xmlns='jabber:client' to='a@b@c'/>"),
        Err(StanzaMalformed::InvalidJid { attribute: "to", .. })
    ));
}

#[test]
fn lenient_children() {
    let stanza = parse(
        "<presence xmlns='jabber:client'>\
         <show>sleeping</show><show>away</show>\
         <priority>high</priority><priority>3</priority>\
         <c xmlns='http://jabber.org/protocol/caps' ver='1'/>\
         </presence>",
    )
    .unwrap();
    assert_eq!(stanza.show(), None);
    assert_eq!(stanza.priority(), None);
    assert_eq!(stanza.objects().len(), 3);
    assert!(stanza.objects()[0].is("show", CLIENT_NS));
    assert!(stanza.objects()[1].is("priority", CLIENT_NS));
    assert_eq!(
        stanza.objects()[2].attribute("ver"),
        Some("1"),
    );

    let stanza = parse("<presence xmlns='jabber:client'><priority>300</priority></presence>")
        .unwrap();
    assert_eq!(stanza.priority(), None);
    assert!(stanza.objects().is_empty());
}

#[test]
fn foreign_namespace_children_are_objects() {
    let stanza = parse(
        "<message xmlns='jabber:client'>\
         <body xmlns='urn:fake'>not a body</body><body>real</body>\
         </message>",
    )
    .unwrap();
    assert_eq!(stanza.bodies(), &[MessageBody::new("real", None)]);
    assert_eq!(stanza.objects().len(), 1);
    assert_eq!(stanza.objects()[0].ns(), "urn:fake");
}

#[test]
fn body_and_subject_maps() {
    let mut stanza = Stanza::message()
        .with_body(MessageBody::new("hello", None))
        .with_body(MessageBody::new("hallo", Some("de")));
    let bodies = stanza.body_map();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[""], "hello");
    assert_eq!(bodies["de"], "hallo");

    let mut subjects = BTreeMap::new();
    subjects.insert(String::new(), "topic".to_owned());
    subjects.insert("tr".to_owned(), "konu".to_owned());
    stanza.set_subject_map(&subjects);
    assert_eq!(stanza.subjects()[0], MessageSubject::new("topic", None));
    assert_eq!(stanza.subjects()[1], MessageSubject::new("konu", Some("tr")));
    assert_eq!(stanza.subject_map(), subjects);

    stanza.set_body_map(&BTreeMap::new());
    assert!(stanza.bodies().is_empty());
}

#[test]
fn stanza_errors() {
    let stanza = parse(
        "<iq xmlns='jabber:client' type='error' id='q1'>\
         <error type='cancel' code='503'>\
         <service-unavailable xmlns='urn:ietf:params:xml:ns:xmpp-stanzas'/>\
         <text xmlns='urn:ietf:params:xml:ns:xmpp-stanzas'>Nope</text>\
         </error></iq>",
    )
    .unwrap();
    assert!(stanza.is_error());
    let error = stanza.error().unwrap().unwrap();
    assert_eq!(error.error_type, ErrorType::Cancel);
    assert_eq!(error.condition, ErrorCondition::ServiceUnavailable);
    assert_eq!(error.text.as_deref(), Some("Nope"));
    assert_eq!(error.code.as_deref(), Some("503"));
    assert_eq!(error.to_string(), "service-unavailable (cancel): Nope");
    assert_eq!(
        error.to_text(),
        "Error Type: cancel\nCondition: service-unavailable\nCode: 503\nText:\nNope"
    );

    assert_eq!(Stanza::iq(StanzaType::Result).error(), Ok(None));
}

#[test]
fn edited_error_stanza() {
    let mut stanza = parse(
        "<message xmlns='jabber:client' type='error'><error type='cancel'>\
         <item-not-found xmlns='urn:ietf:params:xml:ns:xmpp-stanzas'/></error></message>",
    )
    .unwrap();
    let replacement = StanzaError::new(ErrorType::Modify, ErrorCondition::BadRequest);
    stanza.objects_mut().clear();
    stanza.objects_mut().push(replacement.to_element());
    assert_eq!(stanza.error(), Ok(Some(replacement)));

    stanza.objects_mut().clear();
    assert_eq!(
        StanzaError::from_stanza(&stanza),
        Err(StanzaErrorMalformed::NoErrorElement)
    );
}

fn check_error(xml: &str, expected: StanzaErrorMalformed) {
    let element: Element = xml.parse().unwrap();
    assert_eq!(StanzaError::from_stanza_element(&element), Err(expected));
}

#[test]
fn malformed_errors() {
    check_error(
        "<foo xmlns='jabber:client'/>",
        StanzaErrorMalformed::NotStanza,
    );
    check_error(
        "<message xmlns='jabber:client' type='error'/>",
        StanzaErrorMalformed::NoErrorElement,
    );
    check_error(
        "<message xmlns='jabber:client' type='error'><error type='auth'/></message>",
        StanzaErrorMalformed::NoChildren,
    );
    check_error(
        "<message xmlns='jabber:client' type='error'><error>\
         <forbidden xmlns='urn:ietf:params:xml:ns:xmpp-stanzas'/></error></message>",
        StanzaErrorMalformed::MissingType,
    );
    check_error(
        "<message xmlns='jabber:client' type='error'><error type='panic'>\
         <forbidden xmlns='urn:ietf:params:xml:ns:xmpp-stanzas'/></error></message>",
        StanzaErrorMalformed::InvalidType("panic".into()),
    );
    check_error(
        "<message xmlns='jabber:client' type='error'><error type='auth'>\
         <too-bad xmlns='urn:ietf:params:xml:ns:xmpp-stanzas'/></error></message>",
        StanzaErrorMalformed::InvalidCondition("too-bad".into()),
    );
    check_error(
        "<message xmlns='jabber:client' type='error'><error type='auth'>\
         <text xmlns='urn:ietf:params:xml:ns:xmpp-stanzas'>only text</text></error></message>",
        StanzaErrorMalformed::InvalidCondition(String::new()),
    );
}

#[test]
fn built_errors() {
    let error = StanzaError::new(ErrorType::Modify, ErrorCondition::BadRequest).with_text("bad");
    let element = error.to_element();
    assert!(element.is("error", CLIENT_NS));
    assert!(element.get_child("bad-request", STANZA_ERRORS_NS).is_some());

    let stanza = Stanza::message()
        .with_type(StanzaType::Error)
        .with_object(&error);
    assert_eq!(stanza.error(), Ok(Some(error)));
}

#[test]
fn type_validity() {
    assert!(StanzaType::Get.is_valid_for(StanzaKind::Iq));
    assert!(!StanzaType::Get.is_valid_for(StanzaKind::Message));
    assert!(StanzaType::Headline.is_valid_for(StanzaKind::Message));
    assert!(StanzaType::Probe.is_valid_for(StanzaKind::Presence));
    assert!(!StanzaType::Probe.is_valid_for(StanzaKind::Iq));
    for kind in [StanzaKind::Message, StanzaKind::Presence, StanzaKind::Iq] {
        assert!(StanzaType::Error.is_valid_for(kind));
    }
    // not enforced on parse
    let stanza = parse("<message xmlns='jabber:client' type='get'/>").unwrap();
    assert_eq!(stanza.stanza_type(), Some(StanzaType::Get));
}
