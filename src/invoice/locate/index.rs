use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::ops::Range;

use crate::core::error::{PatchError, Result};

const BOM: char = '\u{feff}';

/// One element of a parsed document. Ranges are byte offsets into the text
/// the index was built from, so callers can splice without re-serialising.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpan {
    /// Local name, namespace prefix dropped.
    pub name: String,
    pub range: Range<usize>,
    /// Between the end of the start tag and the start of the end tag.
    pub content: Range<usize>,
    /// Direct text children (CDATA included), entities decoded.
    pub text: String,
    pub attributes: Vec<(String, String)>,
    pub parent: Option<usize>,
}

impl ElementSpan {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Flat, document-ordered view of every element in a document.
#[derive(Debug, Clone)]
pub struct ElementIndex {
    elements: Vec<ElementSpan>,
    /// Every text and CDATA node in document order, markup and comments excluded.
    character_data: String,
}

impl ElementIndex {
    /// Strict parse first; a lenient event scan if that fails. Only when both
    /// give up is the document reported as malformed.
    pub fn parse(text: &str) -> Result<Self> {
        let offset = if text.starts_with(BOM) { BOM.len_utf8() } else { 0 };
        let body = &text[offset..];

        let (mut elements, character_data) = match strict(body) {
            Ok(parsed) => parsed,
            Err(strict_err) => {
                log::warn!("Strict XML parse failed ({}), retrying leniently", strict_err);
                lenient(body).map_err(|lenient_err| {
                    PatchError::Malformed(format!(
                        "strict parse: {}; lenient parse: {}",
                        strict_err, lenient_err
                    ))
                })?
            }
        };

        if offset > 0 {
            for element in &mut elements {
                element.range = element.range.start + offset..element.range.end + offset;
                element.content = element.content.start + offset..element.content.end + offset;
            }
        }

        Ok(Self {
            elements,
            character_data,
        })
    }

    pub fn get(&self, idx: usize) -> Option<&ElementSpan> {
        self.elements.get(idx)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.name == name)
    }

    pub fn find(&self, name: &str) -> Option<&ElementSpan> {
        self.position(name).and_then(|idx| self.get(idx))
    }

    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ElementSpan> + 'a {
        self.elements.iter().filter(move |e| e.name == name)
    }

    /// Concatenated character data of the whole document.
    pub fn text_content(&self) -> &str {
        &self.character_data
    }

    /// First element called `name` whose text is exactly `text`.
    pub fn position_with_text(&self, name: &str, text: &str) -> Option<usize> {
        self.positions_with_text(name, text).next()
    }

    /// Every element called `name` whose text is exactly `text`, in document order.
    pub fn positions_with_text<'a>(
        &'a self,
        name: &'a str,
        text: &'a str,
    ) -> impl Iterator<Item = usize> + 'a {
        self.elements
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.name == name && e.text == text)
            .map(|(idx, _)| idx)
    }

    /// Next element after `idx` that shares its parent and is called `name`.
    pub fn next_sibling_named(&self, idx: usize, name: &str) -> Option<&ElementSpan> {
        let parent = self.elements.get(idx)?.parent;
        self.elements[idx + 1..]
            .iter()
            .find(|e| e.parent == parent && e.name == name)
    }
}

type Parsed = (Vec<ElementSpan>, String);

fn strict(text: &str) -> std::result::Result<Parsed, roxmltree::Error> {
    let doc = roxmltree::Document::parse(text)?;
    let mut elements = Vec::new();
    collect(doc.root(), text, None, &mut elements);
    let character_data = doc
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    Ok((elements, character_data))
}

fn collect(node: roxmltree::Node, text: &str, parent: Option<usize>, out: &mut Vec<ElementSpan>) {
    for child in node.children().filter(|n| n.is_element()) {
        let range = child.range();
        let idx = out.len();
        out.push(ElementSpan {
            name: child.tag_name().name().to_string(),
            content: content_range(text, &range),
            range,
            text: child
                .children()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect(),
            attributes: child
                .attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect(),
            parent,
        });
        collect(child, text, Some(idx), out);
    }
}

fn lenient(text: &str) -> std::result::Result<Parsed, quick_xml::Error> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().check_end_names = false;

    let mut elements: Vec<ElementSpan> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut character_data = String::new();

    loop {
        let start = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(e) => {
                let end = reader.buffer_position() as usize;
                elements.push(lenient_span(&e, start..end, open.last().copied()));
                open.push(elements.len() - 1);
            }
            Event::Empty(e) => {
                let end = reader.buffer_position() as usize;
                let mut span = lenient_span(&e, start..end, open.last().copied());
                span.content = end..end;
                elements.push(span);
            }
            Event::Text(e) => {
                let decoded = e
                    .unescape()
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                character_data.push_str(&decoded);
                if let Some(&idx) = open.last() {
                    elements[idx].text.push_str(&decoded);
                }
            }
            Event::CData(e) => {
                let data = String::from_utf8_lossy(&e);
                character_data.push_str(&data);
                if let Some(&idx) = open.last() {
                    elements[idx].text.push_str(&data);
                }
            }
            Event::End(_) => {
                let end = reader.buffer_position() as usize;
                if let Some(idx) = open.pop() {
                    elements[idx].range.end = end;
                    elements[idx].content.end = start;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    // Unclosed elements run to the end of the buffer.
    for idx in open {
        elements[idx].range.end = text.len();
        elements[idx].content.end = text.len();
    }

    Ok((elements, character_data))
}

/// `tag` spans only the start tag; the caller fixes up the end once the
/// matching end tag (if any) is seen.
fn lenient_span(e: &BytesStart, tag: Range<usize>, parent: Option<usize>) -> ElementSpan {
    let mut attrs = e.attributes();
    attrs.with_checks(false);
    let attributes = attrs
        .flatten()
        .map(|a| {
            let value = a
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned());
            (String::from_utf8_lossy(a.key.local_name().as_ref()).into_owned(), value)
        })
        .collect();

    ElementSpan {
        name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
        range: tag.clone(),
        content: tag.end..tag.end,
        text: String::new(),
        attributes,
        parent,
    }
}

/// Byte offset just past the `>` closing the start tag at the beginning of
/// `element`. Quoted attribute values may contain `>`.
pub(crate) fn start_tag_end(element: &str) -> usize {
    let mut quote: Option<char> = None;
    for (i, c) in element.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return i + 1,
            None => {}
        }
    }
    element.len()
}

fn content_range(text: &str, range: &Range<usize>) -> Range<usize> {
    let element = &text[range.clone()];
    let open_end = start_tag_end(element);
    if element[..open_end].ends_with("/>") {
        let at = range.start + open_end;
        return at..at;
    }
    let close_start = element.rfind("</").filter(|&i| i >= open_end).unwrap_or(open_end);
    range.start + open_end..range.start + close_start
}
