//! Minimal owned element tree over `quick-xml` events.
//!
//! Tag and attribute names are stored by local name, so namespaced and
//! un-namespaced documents read the same way. Namespace URIs declared on an
//! element are kept on that element.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ParseError;

/// An element with its attributes, text and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Local tag name.
    pub name: String,
    /// Default namespace URI declared on this element, if any.
    pub namespace: Option<String>,
    /// Attributes by local name, in document order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    /// Direct text content, whitespace-joined.
    pub text: String,
}

impl XmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value that must be present and non-blank.
    pub fn require_attr(&self, name: &str) -> Result<&str, ParseError> {
        self.attr(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ParseError::MissingAttribute {
                element: self.name.clone(),
                attribute: name.to_string(),
            })
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// All descendants with the given name, depth-first in document order.
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        collect_descendants(self, name, &mut found);
        found
    }

    /// Text of this element and all descendants.
    pub fn text_content(&self) -> String {
        let mut parts = Vec::new();
        collect_text(self, &mut parts);
        parts.join(" ")
    }

    /// Trimmed text of the first child with this name.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name)
            .map(XmlElement::text_content)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

fn collect_descendants<'a>(element: &'a XmlElement, name: &str, found: &mut Vec<&'a XmlElement>) {
    for child in &element.children {
        if child.name == name {
            found.push(child);
        }
        collect_descendants(child, name, found);
    }
}

fn collect_text<'a>(element: &'a XmlElement, parts: &mut Vec<&'a str>) {
    if !element.text.is_empty() {
        parts.push(&element.text);
    }
    for child in &element.children {
        collect_text(child, parts);
    }
}

/// Parse a document into its root element.
pub fn parse_document(content: &str) -> Result<XmlElement, ParseError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(element_from(&e)?),
            Ok(Event::Empty(e)) => {
                let element = element_from(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ParseError::Xml("unmatched closing tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(t)) => {
                if let Some(top) = stack.last_mut() {
                    let text = match t.unescape() {
                        Ok(text) => text.into_owned(),
                        Err(_) => String::from_utf8_lossy(&t).into_owned(),
                    };
                    push_text(top, &text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(top) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    push_text(top, &text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ParseError::Xml(format!(
                    "{} at byte {}",
                    e,
                    reader.error_position()
                )))
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::Xml(format!(
            "unexpected end of document inside <{}>",
            open.name
        )));
    }

    root.ok_or_else(|| ParseError::Xml("document has no root element".to_string()))
}

/// Parse a document and check its root against the accepted names.
pub fn parse_expecting(content: &str, expected: &[&str]) -> Result<XmlElement, ParseError> {
    let root = parse_document(content)?;
    if !expected.is_empty() && !expected.contains(&root.name.as_str()) {
        return Err(ParseError::UnexpectedRoot {
            expected: expected.join("|"),
            found: root.name,
        });
    }
    Ok(root)
}

fn element_from(start: &BytesStart<'_>) -> Result<XmlElement, ParseError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut element = XmlElement {
        name,
        ..Default::default()
    };

    for attr in start.attributes() {
        let attr = attr.map_err(|e| ParseError::Xml(e.to_string()))?;
        let key = attr.key.as_ref();
        let value = attr
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());

        if key == b"xmlns" {
            element.namespace = Some(value);
            continue;
        }
        if key.starts_with(b"xmlns:") {
            continue;
        }
        let local = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        element.attributes.push((local, value));
    }

    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), ParseError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(ParseError::Xml(format!(
            "multiple root elements, second is <{}>",
            element.name
        )))
    }
}

fn push_text(element: &mut XmlElement, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !element.text.is_empty() {
        element.text.push(' ');
    }
    element.text.push_str(text);
}
