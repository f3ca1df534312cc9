//! Extraction of entries from syndication documents.
//!
//! RSS (2.0 and the RDF-based 1.0) is read with a streaming `quick-xml`
//! reader so that element presence and the original `pubDate` text survive
//! untouched. Atom documents go through `feed-rs`.

use quick_xml::encoding::EncodingError;
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("undecodable text: {0}")]
    Encoding(#[from] EncodingError),
    #[error("undefined entity &{0};")]
    UnknownEntity(String),
    #[error("malformed Atom feed: {0}")]
    Atom(#[from] feed_rs::parser::ParseFeedError),
    #[error("document ended inside an open element")]
    Truncated,
    #[error("not a syndication document (root element <{0}>)")]
    UnknownRoot(String),
    #[error("document has no root element")]
    Empty,
}

/// One item as it appears in the feed. `None` means the element was absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Link,
    Published,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"link" => Some(Self::Link),
            b"pubDate" => Some(Self::Published),
            _ => None,
        }
    }
}

impl FeedEntry {
    /// Only the first occurrence of each child element counts.
    fn set_first(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Published => &mut self.published,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }
}

/// Returns the first `limit` items of the document that carry a `title`.
///
/// Truncation counts items, not kept entries: an untitled item among the
/// first `limit` still uses up a slot. The whole document must be
/// well-formed, even past the last item returned.
pub fn parse_entries(document: &[u8], limit: usize) -> Result<Vec<FeedEntry>, ParseError> {
    match root_element(document)?.as_str() {
        "rss" | "RDF" => parse_rss(document, limit),
        "feed" => parse_atom(document, limit),
        other => Err(ParseError::UnknownRoot(other.to_string())),
    }
}

fn root_element(document: &[u8]) -> Result<String, ParseError> {
    let mut reader = Reader::from_reader(document);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Event::Eof => return Err(ParseError::Empty),
            _ => {}
        }
    }
}

fn parse_rss(document: &[u8], limit: usize) -> Result<Vec<FeedEntry>, ParseError> {
    let mut reader = Reader::from_reader(document);
    let mut entries = Vec::new();
    let mut items_seen = 0usize;
    let mut depth = 0usize;
    // (depth of <item>, entry being filled)
    let mut item: Option<(usize, FeedEntry)> = None;
    // (field, depth of the field element, accumulated text)
    let mut field: Option<(Field, usize, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                let item_depth = item.as_ref().map(|(d, _)| *d);
                match item_depth {
                    None if e.name().as_ref() == b"item" => {
                        item = Some((depth, FeedEntry::default()));
                    }
                    Some(d) if depth == d + 1 => {
                        field = Field::from_name(e.name().as_ref())
                            .map(|f| (f, depth, String::new()));
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => match item.as_mut() {
                Some((d, entry)) if depth == *d => {
                    if let Some(f) = Field::from_name(e.name().as_ref()) {
                        entry.set_first(f, String::new());
                    }
                }
                None if e.name().as_ref() == b"item" => items_seen += 1,
                _ => {}
            },
            // Entity references arrive as separate `GeneralRef` events, so text
            // only needs decoding from the declared encoding.
            Event::Text(t) => {
                let text = reader.decoder().decode(&t)?;
                push_text(&mut field, depth, &text);
            }
            Event::CData(c) => {
                let text = reader.decoder().decode(&c)?;
                push_text(&mut field, depth, &text);
            }
            Event::GeneralRef(r) => {
                let name = reader.decoder().decode(&r)?;
                // Without a DTD only the predefined entities and character
                // references are defined.
                let entity = format!("&{};", name);
                let text = unescape(&entity)
                    .map_err(|_| ParseError::UnknownEntity(name.to_string()))?;
                push_text(&mut field, depth, &text);
            }
            Event::End(_) => {
                if let Some((f, field_depth, text)) = field.take() {
                    if field_depth == depth {
                        if let Some((_, entry)) = item.as_mut() {
                            entry.set_first(f, text);
                        }
                    } else {
                        field = Some((f, field_depth, text));
                    }
                }
                if matches!(item, Some((d, _)) if d == depth) {
                    if let Some((_, entry)) = item.take() {
                        if items_seen < limit && entry.title.is_some() {
                            entries.push(entry);
                        }
                        items_seen += 1;
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(ParseError::Truncated);
    }
    Ok(entries)
}

fn push_text(field: &mut Option<(Field, usize, String)>, depth: usize, text: &str) {
    if let Some((_, field_depth, buf)) = field.as_mut() {
        if *field_depth == depth {
            buf.push_str(text);
        }
    }
}

fn parse_atom(document: &[u8], limit: usize) -> Result<Vec<FeedEntry>, ParseError> {
    let feed = feed_rs::parser::parse(document)?;

    let entries = feed
        .entries
        .into_iter()
        .take(limit)
        .filter_map(|entry| {
            let title = entry.title?.content;
            let link = entry.links.first().map(|l| l.href.clone());
            let published = entry.published.or(entry.updated).map(|dt| dt.to_rfc3339());
            Some(FeedEntry {
                title: Some(title),
                link,
                published,
            })
        })
        .collect();

    Ok(entries)
}
