use std::ops::Range;

use super::locate::ElementIndex;
use crate::core::error::Result;
use crate::core::types::CarrierSelection;

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

/// An element of the outer document whose text is itself a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Carrier {
    /// Occurrence among all elements with the carrier tag.
    pub occurrence: usize,
    /// Inner content of the carrier element in the outer text.
    pub content: Range<usize>,
    /// Decoded nested document.
    pub text: String,
}

/// Carriers named `tag` (local name) picked by `selection`, in document order.
/// Carriers whose text is not markup are skipped.
pub fn find_carriers(outer: &str, tag: &str, selection: CarrierSelection) -> Result<Vec<Carrier>> {
    let index = ElementIndex::parse(outer)?;

    let carriers = index
        .find_all(tag)
        .enumerate()
        .filter(|(occurrence, _)| selection.includes(*occurrence))
        .filter_map(|(occurrence, element)| {
            if !element.text.trim_start().starts_with('<') {
                log::debug!("{} #{} holds no nested document", tag, occurrence);
                return None;
            }
            Some(Carrier {
                occurrence,
                content: element.content.clone(),
                text: element.text.clone(),
            })
        })
        .collect();

    Ok(carriers)
}

/// Serializes a patched nested document back into carrier content.
pub fn embed(nested: &str, strip_prolog: bool) -> String {
    let body = if strip_prolog { strip_first_prolog(nested) } else { nested };
    let escaped = body.replace(CDATA_CLOSE, "]]]]><![CDATA[>");
    format!("{}{}{}", CDATA_OPEN, escaped, CDATA_CLOSE)
}

/// Drops the leading `<?xml ...?>` line. Only the first line is touched.
fn strip_first_prolog(nested: &str) -> &str {
    if !nested.starts_with("<?xml") {
        return nested;
    }
    match nested.split_once('\n') {
        Some((_, rest)) => rest,
        None => nested
            .find("?>")
            .map(|end| &nested[end + 2..])
            .unwrap_or(nested),
    }
}
