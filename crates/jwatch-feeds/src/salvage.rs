//! Lenient RSS/Atom scanner for documents the strict parser rejects.
//!
//! Walks the XML event stream without validating end tags and keeps every
//! `<item>`/`<entry>` it can read before the first hard syntax error.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::document::{Entry, FeedDocument, FeedVersion};
use crate::parse::decode_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Summary,
    Content,
    Link,
    Updated,
    Published,
}

impl Field {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "title" => Some(Field::Title),
            "description" | "summary" => Some(Field::Summary),
            "content" | "content:encoded" => Some(Field::Content),
            "link" => Some(Field::Link),
            "updated" | "atom:updated" => Some(Field::Updated),
            "pubdate" | "published" | "dc:date" => Some(Field::Published),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct RawEntry {
    title: String,
    summary: String,
    content: String,
    link: Option<String>,
    updated: String,
    published: String,
}

impl RawEntry {
    fn push(&mut self, field: Field, text: &str) {
        match field {
            Field::Title => self.title.push_str(text),
            Field::Summary => self.summary.push_str(text),
            Field::Content => self.content.push_str(text),
            Field::Link => {
                if self.link.is_none() && !text.trim().is_empty() {
                    self.link = Some(text.trim().to_owned());
                }
            }
            Field::Updated => self.updated.push_str(text),
            Field::Published => self.published.push_str(text),
        }
    }

    fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.link.is_none()
    }

    fn finish(self) -> Entry {
        let body = if self.summary.trim().is_empty() {
            &self.content
        } else {
            &self.summary
        };
        Entry {
            title: decode_text(&self.title).trim().to_owned(),
            body_text: decode_text(body).trim().to_owned(),
            link: self.link,
            timestamp: parse_timestamp(&self.updated).or_else(|| parse_timestamp(&self.published)),
        }
    }
}

/// Recover what can be read from a document the strict parser rejected.
///
/// The result is always `malformed`, with `reason` recorded as the cause.
pub(crate) fn salvage(bytes: &[u8], reason: String) -> FeedDocument {
    let text = String::from_utf8_lossy(bytes);
    let mut reader = Reader::from_str(&text);
    reader.config_mut().check_end_names = false;

    let mut version = FeedVersion::Unknown;
    let mut entries = Vec::new();
    let mut current: Option<RawEntry> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let tag = tag_name(e.name().as_ref());
                match tag.as_str() {
                    "item" | "entry" => {
                        current = Some(RawEntry::default());
                        field = None;
                    }
                    _ if current.is_some() => {
                        if let Some(next) = Field::from_tag(&tag) {
                            field = Some(next);
                            if next == Field::Link {
                                if let (Some(raw), Some(href)) = (current.as_mut(), href_of(&e)) {
                                    raw.push(Field::Link, &href);
                                }
                            }
                        }
                    }
                    _ => detect_root(&tag, &mut version),
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(raw) = current.as_mut() {
                    if tag_name(e.name().as_ref()) == "link" {
                        if let Some(href) = href_of(&e) {
                            raw.push(Field::Link, &href);
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                let tag = tag_name(e.name().as_ref());
                if tag == "item" || tag == "entry" {
                    if let Some(raw) = current.take() {
                        entries.push(raw.finish());
                    }
                    field = None;
                } else if Field::from_tag(&tag).is_some_and(|f| Some(f) == field) {
                    field = None;
                }
            }
            Ok(Event::Text(e)) => {
                if let (Some(raw), Some(f)) = (current.as_mut(), field) {
                    let text = e.unescape().map_or_else(
                        |_| String::from_utf8_lossy(&e).into_owned(),
                        std::borrow::Cow::into_owned,
                    );
                    raw.push(f, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if let (Some(raw), Some(f)) = (current.as_mut(), field) {
                    raw.push(f, &String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!(
                    position = reader.buffer_position(),
                    error = %e,
                    "salvage stopped at XML error"
                );
                break;
            }
            _ => {}
        }
    }

    // A document cut off mid-entry still yields that entry.
    if let Some(raw) = current.take().filter(|raw| !raw.is_empty()) {
        entries.push(raw.finish());
    }

    FeedDocument {
        version,
        malformed: true,
        malformed_reason: Some(reason),
        entries,
    }
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

fn detect_root(tag: &str, version: &mut FeedVersion) {
    if *version != FeedVersion::Unknown {
        return;
    }
    match tag {
        "rss" | "rdf:rdf" | "channel" => *version = FeedVersion::Rss,
        "feed" => *version = FeedVersion::Atom,
        _ => {}
    }
}

/// `href` of an Atom `<link>`, skipping non-alternate relations.
fn href_of(e: &BytesStart<'_>) -> Option<String> {
    let mut href = None;
    let mut alternate = true;
    for attr in e.attributes().flatten() {
        let value = attr
            .unescape_value()
            .map_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned(), |v| v.into_owned());
        match attr.key.as_ref() {
            b"href" => href = Some(value),
            b"rel" => alternate = value == "alternate",
            _ => {}
        }
    }
    href.filter(|_| alternate)
}

/// RFC 2822 (RSS) or RFC 3339 (Atom) timestamps.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
