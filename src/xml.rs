//! Element tree over feed markup, queried by local name.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed XML: {0}")]
pub struct MalformedXml(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => element.collect_text(out),
            }
        }
    }

    /// Descendants only, not self.
    pub fn find(&self, name: &str) -> Option<&Element> {
        for child in &self.children {
            if let Node::Element(element) = child {
                if element.name == name {
                    return Some(element);
                }
                if let Some(found) = element.find(name) {
                    return Some(found);
                }
            }
        }
        None
    }

    pub fn find_all<'a>(&'a self, names: &[&str]) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_named(names, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, names: &[&str], found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if let Node::Element(element) = child {
                if names.contains(&element.name.as_str()) {
                    found.push(element);
                }
                element.collect_named(names, found);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: Element,
}

impl XmlDocument {
    pub fn parse(text: &str) -> Result<Self, MalformedXml> {
        let mut reader = Reader::from_str(text);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                MalformedXml(format!("{} at byte {}", e, reader.buffer_position()))
            })?;

            match event {
                Event::Start(start) => {
                    if stack.is_empty() && root.is_some() {
                        return Err(MalformedXml("content after document element".into()));
                    }
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(end) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| MalformedXml("unmatched closing tag".into()))?;
                    let closing = String::from_utf8_lossy(end.local_name().as_ref()).into_owned();
                    if closing != element.name {
                        return Err(MalformedXml(format!(
                            "expected </{}>, found </{}>",
                            element.name, closing
                        )));
                    }
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| MalformedXml(e.to_string()))?
                        .into_owned();
                    push_text(&mut stack, text)?;
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    push_text(&mut stack, text)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(MalformedXml(format!("unclosed element <{}>", open.name)));
        }

        root.map(|root| Self { root })
            .ok_or_else(|| MalformedXml("no root element".into()))
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Includes the root.
    pub fn find_all<'a>(&'a self, names: &[&str]) -> Vec<&'a Element> {
        let mut found = Vec::new();
        if names.contains(&self.root.name.as_str()) {
            found.push(&self.root);
        }
        found.extend(self.root.find_all(names));
        found
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, MalformedXml> {
    let mut element = Element::new(String::from_utf8_lossy(start.local_name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| MalformedXml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| MalformedXml(e.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), MalformedXml> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_some() => {
            return Err(MalformedXml("content after document element".into()));
        }
        None => *root = Some(element),
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: String) -> Result<(), MalformedXml> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Text(text)),
        None if is_blank(&text) => {}
        None => return Err(MalformedXml("text outside document element".into())),
    }
    Ok(())
}

fn is_blank(text: &str) -> bool {
    text.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
        .is_empty()
}
