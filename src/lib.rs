/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod signal;
mod xml;
mod xmpp;

pub use signal::Signal;
pub use signal::SubscriptionId;

pub use xml::Attribute;
pub use xml::Element;
pub use xml::NamespaceDecl;
pub use xml::Node;
pub use xml::ParserTarget;
pub use xml::ToElement;
pub use xml::TreeBuilder;
pub use xml::XML_NS;
pub use xml::XmlError;
pub use xml::XmlParser;
pub use xml::escape;
pub use xml::escaped;

pub use xmpp::*;
