//! Owned XML tree for WordprocessingML parts.
//!
//! Parsing keeps every node the part contains (declaration, comments, PIs,
//! CDATA) and attribute values verbatim, so unmodified regions serialize back
//! to equivalent markup.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::docx::DocxError;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Unescaped character data.
    Text(String),
    CData(String),
    Comment(String),
    Decl(String),
    PI(String),
    DocType(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    /// Attribute values are kept in their escaped source form.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((key.to_string(), value.to_string())),
        }
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|c| c.is(name))
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Concatenated text of direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) | Node::CData(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replaces all children with a single text node.
    pub fn set_text(&mut self, text: &str) {
        self.children.clear();
        if !text.is_empty() {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, DocxError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| DocxError::Xml(e.to_string()))?;
            attrs.push((
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                String::from_utf8_lossy(&attr.value).into_owned(),
            ));
        }
        Ok(Element {
            name,
            attrs,
            children: Vec::new(),
        })
    }

    fn write(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attrs {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(&v.replace('"', "&quot;"));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            child.write(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

impl Node {
    fn write(&self, out: &mut String) {
        match self {
            Node::Element(e) => e.write(out),
            Node::Text(t) => out.push_str(&escape(t.as_str())),
            Node::CData(t) => {
                out.push_str("<![CDATA[");
                out.push_str(t);
                out.push_str("]]>");
            }
            Node::Comment(t) => {
                out.push_str("<!--");
                out.push_str(t);
                out.push_str("-->");
            }
            Node::Decl(t) | Node::PI(t) => {
                out.push_str("<?");
                out.push_str(t);
                out.push_str("?>");
            }
            Node::DocType(t) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(t);
                out.push('>');
            }
        }
    }
}

/// A parsed XML part. The root is a nameless container for top-level nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub root: Element,
}

impl XmlDocument {
    pub fn parse(xml: &str) -> Result<Self, DocxError> {
        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Element> = vec![Element::new("")];

        loop {
            let event = reader
                .read_event()
                .map_err(|e| DocxError::Xml(format!("at byte {}: {e}", reader.buffer_position())))?;
            match event {
                Event::Start(start) => stack.push(Element::from_start(&start)?),
                Event::Empty(start) => {
                    let el = Element::from_start(&start)?;
                    push_node(&mut stack, Node::Element(el))?;
                }
                Event::End(_) => {
                    if stack.len() < 2 {
                        return Err(DocxError::Xml("unbalanced end tag".to_string()));
                    }
                    let el = stack.pop().ok_or_else(|| {
                        DocxError::Xml("unbalanced end tag".to_string())
                    })?;
                    push_node(&mut stack, Node::Element(el))?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| DocxError::Xml(e.to_string()))?;
                    push_node(&mut stack, Node::Text(text.into_owned()))?;
                }
                Event::CData(data) => {
                    push_node(&mut stack, Node::CData(lossy(&data)))?;
                }
                Event::Comment(c) => push_node(&mut stack, Node::Comment(lossy(&c)))?,
                Event::Decl(d) => push_node(&mut stack, Node::Decl(lossy(&d)))?,
                Event::PI(p) => push_node(&mut stack, Node::PI(lossy(&p)))?,
                Event::DocType(d) => push_node(&mut stack, Node::DocType(lossy(&d)))?,
                Event::Eof => break,
            }
        }

        if stack.len() != 1 {
            return Err(DocxError::Xml("unclosed element at end of part".to_string()));
        }
        let root = stack
            .pop()
            .ok_or_else(|| DocxError::Xml("empty part".to_string()))?;
        Ok(XmlDocument { root })
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        for node in &self.root.children {
            node.write(&mut out);
        }
        out
    }

    /// First top-level element (e.g. `w:document`, `w:hdr`).
    pub fn document_element(&self) -> Option<&Element> {
        self.root.child_elements().next()
    }
}

fn push_node(stack: &mut [Element], node: Node) -> Result<(), DocxError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None => Err(DocxError::Xml("node outside of document".to_string())),
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
