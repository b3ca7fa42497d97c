//! DAV request bodies and multistatus parsing for the calendar endpoints.
//!
//! Request documents are small enough to assemble as strings; responses are
//! walked with a `quick-xml` reader keyed on local element names, since the
//! host is free to pick its own namespace prefixes.

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;

use crate::error::{HostError, HostResult};
use crate::types::{Component, PropertyKind, ShareRecipient};

/// One response element of a multistatus document, reduced to the properties
/// the bridge asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarResponse {
    pub href: String,
    pub is_calendar: bool,
    pub id: Option<i64>,
    pub display_name: Option<String>,
    pub owner_principal: Option<String>,
    pub components: Vec<Component>,
    pub order: Option<i32>,
}

/// PROPFIND body requesting every calendar property the bridge consumes.
#[must_use]
pub fn propfind_calendars_body() -> &'static str {
    concat!(
        r#"<?xml version="1.0" encoding="utf-8"?>"#,
        r#"<d:propfind xmlns:d="DAV:" xmlns:cal="urn:ietf:params:xml:ns:caldav""#,
        r#" xmlns:oc="http://owncloud.org/ns" xmlns:x1="http://apple.com/ns/ical/">"#,
        "<d:prop>",
        "<d:resourcetype/>",
        "<d:displayname/>",
        "<oc:id/>",
        "<oc:owner-principal/>",
        "<x1:calendar-order/>",
        "<cal:supported-calendar-component-set/>",
        "</d:prop>",
        "</d:propfind>"
    )
}

/// MKCALENDAR body carrying the initial display name.
#[must_use]
pub fn mkcalendar_body(display_name: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<cal:mkcalendar xmlns:d="DAV:" xmlns:cal="urn:ietf:params:xml:ns:caldav">"#,
            "<d:set><d:prop><d:displayname>{}</d:displayname></d:prop></d:set>",
            "</cal:mkcalendar>"
        ),
        escape(display_name)
    )
}

/// PROPPATCH body setting a single property.
#[must_use]
pub fn proppatch_body(kind: PropertyKind, value: &str) -> String {
    let escaped = escape(value);
    let element = match kind {
        PropertyKind::DisplayName => format!("<d:displayname>{escaped}</d:displayname>"),
        PropertyKind::CalendarOrder => {
            format!("<x1:calendar-order>{escaped}</x1:calendar-order>")
        }
    };
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<d:propertyupdate xmlns:d="DAV:" xmlns:x1="http://apple.com/ns/ical/">"#,
            "<d:set><d:prop>{}</d:prop></d:set>",
            "</d:propertyupdate>"
        ),
        element
    )
}

/// Share mutation body in the host's sharing vocabulary.
#[must_use]
pub fn share_body(add: &[ShareRecipient], remove: &[String]) -> String {
    let mut body = String::from(concat!(
        r#"<?xml version="1.0" encoding="utf-8"?>"#,
        r#"<o:share xmlns:d="DAV:" xmlns:o="http://owncloud.org/ns">"#
    ));
    for recipient in add {
        body.push_str("<o:set>");
        body.push_str(&format!("<d:href>{}</d:href>", escape(recipient.href.as_str())));
        if !recipient.read_only {
            body.push_str("<o:read-write/>");
        }
        body.push_str("</o:set>");
    }
    for href in remove {
        body.push_str(&format!(
            "<o:remove><d:href>{}</d:href></o:remove>",
            escape(href.as_str())
        ));
    }
    body.push_str("</o:share>");
    body
}

/// Property whose text content is being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    DisplayName,
    OwnerPrincipal,
    Id,
    Order,
}

/// Parses a PROPFIND multistatus into calendar responses.
///
/// ## Errors
/// Returns an error if the XML is malformed.
pub fn parse_multistatus(xml: &[u8]) -> HostResult<Vec<CalendarResponse>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut responses = Vec::new();
    let mut current: Option<CalendarResponse> = None;
    let mut in_resourcetype = false;
    let mut pending: Option<Pending> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => {
                let local_name_bytes = e.local_name();
                let local_name = std::str::from_utf8(local_name_bytes.as_ref())
                    .map_err(|err| HostError::MalformedResponse(err.to_string()))?
                    .to_owned();

                match local_name.as_str() {
                    "response" => {
                        current = Some(CalendarResponse::default());
                        in_resourcetype = false;
                        pending = None;
                    }
                    "resourcetype" => in_resourcetype = true,
                    "calendar" if in_resourcetype => {
                        if let Some(response) = current.as_mut() {
                            response.is_calendar = true;
                        }
                    }
                    "href" => pending = None,
                    "displayname" => pending = Some(Pending::DisplayName),
                    "owner-principal" => pending = Some(Pending::OwnerPrincipal),
                    "id" => pending = Some(Pending::Id),
                    "calendar-order" => pending = Some(Pending::Order),
                    "comp" => {
                        if let Some(response) = current.as_mut() {
                            for attr in e.attributes().flatten() {
                                if attr.key.as_ref() == b"name" {
                                    let name = std::str::from_utf8(&attr.value).map_err(|err| {
                                        HostError::MalformedResponse(err.to_string())
                                    })?;
                                    if let Some(component) = Component::from_name(name) {
                                        response.components.push(component);
                                    }
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref t)) => {
                let decoded = reader
                    .decoder()
                    .decode(t.as_ref())
                    .map_err(|err| HostError::MalformedResponse(err.to_string()))?;
                let text = decoded.trim().to_string();
                if text.is_empty() {
                    // skip whitespace-only nodes
                } else if let Some(response) = current.as_mut() {
                    match pending {
                        Some(Pending::DisplayName) => response.display_name = Some(text),
                        Some(Pending::OwnerPrincipal) => {
                            response.owner_principal = Some(text);
                        }
                        Some(Pending::Id) => response.id = text.parse().ok(),
                        Some(Pending::Order) => response.order = text.parse().ok(),
                        None => {
                            if response.href.is_empty() {
                                response.href = text;
                            }
                        }
                    }
                } else {
                    // text outside any response element is ignored
                }
            }
            Ok(Event::End(ref e)) => {
                let local_name_bytes = e.local_name();
                match local_name_bytes.as_ref() {
                    b"response" => {
                        if let Some(response) = current.take() {
                            if !response.href.is_empty() {
                                responses.push(response);
                            }
                        }
                    }
                    b"resourcetype" => in_resourcetype = false,
                    _ => pending = None,
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(HostError::Xml(err)),
        }
        buf.clear();
    }

    Ok(responses)
}

/// Extracts the propstat status code reported for a property in a PROPPATCH
/// multistatus response.
///
/// ## Errors
/// Returns an error if the XML is malformed.
pub fn parse_proppatch_status(xml: &[u8], kind: PropertyKind) -> HostResult<Option<u16>> {
    let target: &[u8] = match kind {
        PropertyKind::DisplayName => b"displayname",
        PropertyKind::CalendarOrder => b"calendar-order",
    };

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut saw_target = false;
    let mut in_status = false;
    let mut status: Option<u16> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => {
                let local_name_bytes = e.local_name();
                match local_name_bytes.as_ref() {
                    b"propstat" => {
                        saw_target = false;
                        status = None;
                    }
                    b"status" => in_status = true,
                    name if name == target => saw_target = true,
                    _ => {}
                }
            }
            Ok(Event::Text(ref t)) => {
                if in_status {
                    let decoded = reader
                        .decoder()
                        .decode(t.as_ref())
                        .map_err(|err| HostError::MalformedResponse(err.to_string()))?;
                    status = parse_status_line(&decoded);
                }
            }
            Ok(Event::End(ref e)) => {
                let local_name_bytes = e.local_name();
                match local_name_bytes.as_ref() {
                    b"status" => in_status = false,
                    b"propstat" => {
                        if saw_target {
                            return Ok(status);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(HostError::Xml(err)),
        }
        buf.clear();
    }

    Ok(None)
}

/// Parses `HTTP/1.1 200 OK` into `200`.
fn parse_status_line(line: &str) -> Option<u16> {
    line.split_whitespace().nth(1)?.parse().ok()
}
