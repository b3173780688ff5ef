use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::ops::Range;

use super::index::start_tag_end;
use super::{FieldLocator, LocatedField};
use crate::core::error::{PatchError, Result};
use crate::invoice::fields::{FieldDescriptor, NAME_ELEMENT};

/// Whitespace the upstream billing system emits between a `Name` element and
/// its `Value` slot.
pub const LITERAL_GAP: &str = "\n                  ";

static SCHEME_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"schemeID\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid schemeID pattern")
});

/// Exact-text matching of the unpatched shape as emitted upstream. Any
/// deviation in whitespace or attributes is a miss. Works on files that do
/// not parse, and ignores nested-document boundaries entirely.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiteralLocator;

impl LiteralLocator {
    pub fn pattern(field: &FieldDescriptor) -> String {
        format!(
            "<{tag}>{name}</{tag}>{gap}{slot}",
            tag = NAME_ELEMENT,
            name = field.name,
            gap = LITERAL_GAP,
            slot = field.literal_slot
        )
    }
}

impl FieldLocator for LiteralLocator {
    fn locate(&self, text: &str, field: &FieldDescriptor) -> Result<Vec<LocatedField>> {
        let pattern = Self::pattern(field);
        let located: Vec<LocatedField> = text
            .match_indices(&pattern)
            .map(|(start, _)| {
                let end = start + pattern.len();
                let slot = end - field.literal_slot.len()..end;
                let (value, scheme_id) = slot_parts(&text[slot.clone()]);
                LocatedField {
                    span: start..end,
                    slot,
                    value,
                    scheme_id,
                }
            })
            .collect();

        if located.is_empty() {
            log::debug!("{} not present in its upstream shape", field.name);
        }
        Ok(located)
    }

    /// The raw buffer, markup included.
    fn context<'a>(&self, text: &'a str) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(text))
    }

    fn locate_element(&self, text: &str, name: &str) -> Result<Option<Range<usize>>> {
        let (open, close) = tag_patterns(name)?;
        let Some(found) = open.find(text) else {
            return Ok(None);
        };
        let tag_end = found.start() + start_tag_end(&text[found.start()..]);
        if text[..tag_end].ends_with("/>") {
            return Ok(Some(found.start()..tag_end));
        }
        Ok(close
            .find_at(text, tag_end)
            .map(|closing| found.start()..closing.end()))
    }

    fn element_text(&self, text: &str, name: &str) -> Result<Option<String>> {
        let Some(range) = self.locate_element(text, name)? else {
            return Ok(None);
        };
        let element = &text[range];
        let open_end = start_tag_end(element);
        let close_start = element.rfind("</").filter(|&i| i >= open_end).unwrap_or(open_end);
        let inner = element[open_end..close_start].trim();
        let inner = inner
            .strip_prefix("<![CDATA[")
            .and_then(|s| s.strip_suffix("]]>"))
            .map(String::from)
            .unwrap_or_else(|| decode_html_entities(inner).into_owned());
        let inner = inner.trim();
        Ok((!inner.is_empty()).then(|| inner.to_string()))
    }
}

fn tag_patterns(name: &str) -> Result<(Regex, Regex)> {
    let name = regex::escape(name);
    let open = Regex::new(&format!(r"<(?:[\w.-]+:)?{}[\s/>]", name))
        .map_err(|e| PatchError::Malformed(e.to_string()))?;
    let close = Regex::new(&format!(r"</(?:[\w.-]+:)?{}\s*>", name))
        .map_err(|e| PatchError::Malformed(e.to_string()))?;
    Ok((open, close))
}

/// Trimmed text and `schemeID` of a serialized value element.
fn slot_parts(slot: &str) -> (Option<String>, Option<String>) {
    let open_end = start_tag_end(slot);
    let close_start = slot.rfind("</").filter(|&i| i >= open_end).unwrap_or(open_end);
    let text = decode_html_entities(slot[open_end..close_start].trim()).into_owned();
    let scheme_id = SCHEME_ID
        .captures(&slot[..open_end])
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string());
    ((!text.is_empty()).then_some(text), scheme_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FieldKind;
    use crate::invoice::fields::descriptor;

    #[test]
    fn test_exact_shape_matches() {
        let text = "<Ext>\n<Name>CODIGO_PRESTADOR</Name>\n                  <Value>Array</Value>\n</Ext>";
        let located = LiteralLocator
            .locate(text, descriptor(FieldKind::ProviderCode))
            .unwrap()
            .remove(0);
        assert_eq!(&text[located.slot.clone()], "<Value>Array</Value>");
        assert_eq!(located.value.as_deref(), Some("Array"));
        assert_eq!(located.scheme_id, None);
    }

    #[test]
    fn test_different_whitespace_is_a_miss() {
        let text = "<Name>CODIGO_PRESTADOR</Name>\n    <Value>Array</Value>";
        let located = LiteralLocator
            .locate(text, descriptor(FieldKind::ProviderCode))
            .unwrap();
        assert!(located.is_empty());
    }

    #[test]
    fn test_every_occurrence_is_located() {
        let block = format!("<Name>NUMERO_POLIZA</Name>{}<Value>Array</Value>", LITERAL_GAP);
        let text = format!("<a>{block}</a><a>{block}</a>");
        let located = LiteralLocator
            .locate(&text, descriptor(FieldKind::PolicyNumber))
            .unwrap();
        assert_eq!(located.len(), 2);
        assert_eq!(located[0].span, 3..3 + block.len());
        assert!(located.iter().all(|l| &text[l.slot.clone()] == "<Value>Array</Value>"));
    }

    #[test]
    fn test_scheme_slot_parts() {
        let text = format!(
            "<Name>MODALIDAD_PAGO</Name>{}{}",
            LITERAL_GAP,
            descriptor(FieldKind::PaymentModality).literal_slot
        );
        let located = LiteralLocator
            .locate(&text, descriptor(FieldKind::PaymentModality))
            .unwrap()
            .remove(0);
        assert_eq!(located.scheme_id.as_deref(), Some("Array"));
        assert_eq!(located.value, None);
        assert_eq!(located.span, 0..text.len());
    }

    #[test]
    fn test_locate_element_prefixed_and_bare() {
        let text = "<a><cbc:LineCountNumeric>3</cbc:LineCountNumeric><LineCountNumericX/></a>";
        let range = LiteralLocator.locate_element(text, "LineCountNumeric").unwrap().unwrap();
        assert_eq!(&text[range], "<cbc:LineCountNumeric>3</cbc:LineCountNumeric>");

        let text = "<a><InvoicePeriod/></a>";
        let range = LiteralLocator.locate_element(text, "InvoicePeriod").unwrap().unwrap();
        assert_eq!(&text[range], "<InvoicePeriod/>");
        assert!(LiteralLocator.locate_element(text, "LineCountNumeric").unwrap().is_none());
    }
}
