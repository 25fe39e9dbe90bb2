//! XML-to-object primitive.
//!
//! Parses a byte slice into an owned element tree. The tree is owned by
//! whoever parsed it, so callers can mutate attributes and children in a
//! single pass and serialize the result without any shared-state
//! bookkeeping.

use xml::reader::{ParserConfig, XmlEvent as ReaderEvent};

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("XML read error: {0}")]
    Read(#[from] xml::reader::Error),
    #[error("document has no root element")]
    NoRootElement,
}

#[derive(Debug, Clone)]
pub struct XmlAttr {
    /// Attribute name as written, prefix included (e.g. `xlink:href`).
    pub name: String,
    pub value: String,
}

/// One element of a parsed document: name as written, attributes and
/// ordered content (child elements interleaved with text).
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub name: String,
    pub attrs: Vec<XmlAttr>,
    pub children: Vec<XmlContent>,
}

#[derive(Debug, Clone)]
pub enum XmlContent {
    Element(XmlNode),
    Text(String),
}

impl XmlNode {
    /// Parses `content` into an element tree rooted at the document
    /// element.
    pub fn parse(content: &[u8]) -> Result<Self, XmlError> {
        let reader = ParserConfig::new()
            .add_entity("nbsp", ' ')
            .add_entity("copy", '©')
            .add_entity("reg", '®')
            .add_entity("hellip", '…')
            .add_entity("mdash", '—')
            .add_entity("ndash", '–')
            .add_entity("lsquo", '‘')
            .add_entity("rsquo", '’')
            .add_entity("ldquo", '“')
            .add_entity("rdquo", '”')
            .add_entity("shy", '\u{ad}')
            .create_reader(content);

        let mut stack: Vec<XmlNode> = vec![];
        let mut root: Option<XmlNode> = None;

        for event in reader {
            match event? {
                ReaderEvent::StartElement {
                    name, attributes, ..
                } => {
                    let attrs = attributes
                        .iter()
                        .map(|a| XmlAttr {
                            name: qualify(&a.name.prefix, &a.name.local_name),
                            value: a.value.clone(),
                        })
                        .collect();
                    stack.push(XmlNode {
                        name: qualify(&name.prefix, &name.local_name),
                        attrs,
                        children: vec![],
                    });
                }
                ReaderEvent::EndElement { .. } => {
                    if let Some(node) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(XmlContent::Element(node)),
                            None => root = Some(node),
                        }
                    }
                }
                ReaderEvent::Characters(text)
                | ReaderEvent::CData(text)
                | ReaderEvent::Whitespace(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.push_text(&text);
                    }
                }
                _ => {}
            }
        }

        root.ok_or(XmlError::NoRootElement)
    }

    /// Element name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    /// Looks up an attribute by exact name first, then by local name,
    /// so `src` matches `src` and `xlink:href` matches either form.
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .or_else(|| {
                self.attrs
                    .iter()
                    .find(|a| a.name.rsplit(':').next() == Some(name))
            })
            .map(|a| a.value.as_str())
    }

    /// Replaces the attribute value, adding the attribute if absent.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        let existing = self
            .attrs
            .iter_mut()
            .find(|a| a.name == name || a.name.rsplit(':').next() == Some(name));
        match existing {
            Some(attr) => attr.value = value.to_string(),
            None => self.attrs.push(XmlAttr {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Depth-first search by local element name, this node included.
    pub fn find(&self, tag: &str) -> Option<&XmlNode> {
        if self.local_name() == tag {
            return Some(self);
        }
        for child in &self.children {
            if let XmlContent::Element(el) = child {
                if let Some(found) = el.find(tag) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Mutable variant of [`XmlNode::find`].
    pub fn find_mut(&mut self, tag: &str) -> Option<&mut XmlNode> {
        if self.local_name() == tag {
            return Some(self);
        }
        for child in &mut self.children {
            if let XmlContent::Element(el) = child {
                if let Some(found) = el.find_mut(tag) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Serializes this element's children, in document order, appending
    /// to `out`. Namespace declarations are not reconstructed; the output
    /// is an HTML fragment, not a standalone XML document.
    pub fn serialize_children_into(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlContent::Element(el) => el.serialize_into(out),
                XmlContent::Text(text) => escape_text(text, out),
            }
        }
    }

    /// Serializes this element and its subtree, appending to `out`.
    ///
    /// Empty elements self-close only for the HTML void set; an empty
    /// `<div/>` would read as an unclosed open tag to an HTML parser
    /// and swallow the rest of the fragment.
    pub fn serialize_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for attr in &self.attrs {
            out.push(' ');
            out.push_str(&attr.name);
            out.push_str("=\"");
            escape_attr(&attr.value, out);
            out.push('"');
        }
        if self.children.is_empty() {
            if VOID_ELEMENTS.contains(&self.local_name()) {
                out.push_str("/>");
            } else {
                out.push_str("></");
                out.push_str(&self.name);
                out.push('>');
            }
            return;
        }
        out.push('>');
        self.serialize_children_into(out);
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    fn push_text(&mut self, text: &str) {
        // merge adjacent runs so entity expansion doesn't split text nodes
        if let Some(XmlContent::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(XmlContent::Text(text.to_string()));
        }
    }
}

/// Element names HTML defines as void; everything else needs an
/// explicit closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

fn qualify(prefix: &Option<String>, local: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{}:{}", p, local),
        _ => local.to_string(),
    }
}

fn escape_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
