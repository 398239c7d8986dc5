//! Turns RSS `item` and Atom `entry` elements into [`NewsItem`]s.
//!
//! Each canonical field is read through an ordered list of [`Probe`]s; the
//! first probe that yields non-blank text wins. Every field has a default, so
//! normalization never fails.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::xml::{Element, XmlDocument};

pub const DEFAULT_TITLE: &str = "No title";
pub const DEFAULT_LINK: &str = "#";
pub const DEFAULT_DESCRIPTION: &str = "No description available.";
pub const DESCRIPTION_LIMIT: usize = 200;
pub const ELLIPSIS: &str = "...";

/// Element names that mark one article, RSS first.
pub const ENTRY_NAMES: &[&str] = &["item", "entry"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Text content of the first descendant with this name.
    Text(&'static str),
    /// An attribute on the first descendant with this name.
    Attribute {
        element: &'static str,
        name: &'static str,
    },
}

pub const TITLE_PROBES: &[Probe] = &[Probe::Text("title")];
pub const LINK_PROBES: &[Probe] = &[
    Probe::Attribute {
        element: "link",
        name: "href",
    },
    Probe::Text("link"),
];
pub const DATE_PROBES: &[Probe] = &[Probe::Text("pubDate"), Probe::Text("published")];
pub const DESCRIPTION_PROBES: &[Probe] = &[
    Probe::Text("description"),
    Probe::Text("summary"),
    Probe::Text("content"),
];

impl Probe {
    pub fn extract(&self, entry: &Element) -> Option<String> {
        let value = match *self {
            Probe::Text(element) => entry.find(element)?.text(),
            Probe::Attribute { element, name } => entry.find(element)?.attribute(name)?.to_string(),
        };
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}

pub fn first_match(entry: &Element, probes: &[Probe]) -> Option<String> {
    probes.iter().find_map(|probe| probe.extract(entry))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub publication_date: DateTime<Utc>,
    pub description: String,
    pub source_name: String,
}

/// All `item` and `entry` elements in document order.
pub fn entries(doc: &XmlDocument) -> Vec<&Element> {
    doc.find_all(ENTRY_NAMES)
}

pub fn normalize_document(doc: &XmlDocument, source_name: &str) -> Vec<NewsItem> {
    entries(doc)
        .into_iter()
        .map(|entry| normalize(entry, source_name))
        .collect()
}

pub fn normalize(entry: &Element, source_name: &str) -> NewsItem {
    let title = first_match(entry, TITLE_PROBES).unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let link = first_match(entry, LINK_PROBES).unwrap_or_else(|| DEFAULT_LINK.to_string());

    let publication_date = match first_match(entry, DATE_PROBES) {
        Some(raw) => parse_date(&raw).unwrap_or_else(|| {
            warn!("Invalid date '{}' on '{}' from {}, using now", raw, title, source_name);
            Utc::now()
        }),
        None => {
            warn!("No date on '{}' from {}, using now", title, source_name);
            Utc::now()
        }
    };

    let description = first_match(entry, DESCRIPTION_PROBES)
        .map(|raw| truncate(&strip_markup(&raw), DESCRIPTION_LIMIT))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    NewsItem {
        title,
        link,
        publication_date,
        description,
        source_name: source_name.to_string(),
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// RFC 2822 (RSS), RFC 3339 (Atom), or an offset-less ISO-8601 form read as UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Feeds often carry a weekday that disagrees with the date; the date wins.
    if let Some((day, rest)) = raw.split_once(',') {
        if day.chars().all(|c| c.is_ascii_alphabetic()) {
            if let Ok(dt) = DateTime::parse_from_rfc2822(rest.trim_start()) {
                return Some(dt.with_timezone(&Utc));
            }
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z/!?][^>]*>").expect("Invalid tag pattern"));

/// Drop markup tags, decode HTML entities, trim.
pub fn strip_markup(html: &str) -> String {
    let without_tags = TAG_PATTERN.replace_all(html, "");
    html_escape::decode_html_entities(&without_tags)
        .trim()
        .to_string()
}

/// Keep at most `limit` characters, marking a cut with [`ELLIPSIS`].
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}
