use html_escape::encode_text;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

use super::fields::{FieldDescriptor, Replacement};
use super::locate::index::start_tag_end;
use super::locate::{FieldLocator, LocatedField};
use crate::core::error::Result;
use crate::core::types::FieldKind;

static SCHEME_ID_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"schemeID\s*=\s*(?:"[^"]*"|'[^']*')"#).expect("valid schemeID pattern")
});

/// Applies every eligible rule, in table order, splicing replacements into
/// `text`. Each rule patches every unpatched occurrence of its field. Returns
/// the rules that fired.
pub fn apply(
    text: &mut String,
    locator: &dyn FieldLocator,
    fields: &[FieldDescriptor],
) -> Result<Vec<FieldKind>> {
    let mut fired = Vec::new();

    for field in fields {
        let pending: Vec<LocatedField> = locator
            .locate(text, field)?
            .into_iter()
            .filter(|l| field.is_unpatched(l.value.as_deref(), l.scheme_id.as_deref()))
            .collect();
        if pending.is_empty() {
            log::debug!("{} has no unpatched slot", field.name);
            continue;
        }

        let Some(replacement) = field.select(&locator.context(text)?) else {
            log::debug!("{} left as placeholder: no context marker found", field.name);
            continue;
        };

        // Back to front so earlier slot ranges stay valid.
        for located in pending.iter().rev() {
            let patched = render_slot(&text[located.slot.clone()], replacement);
            text.replace_range(located.slot.clone(), &patched);
        }
        log::info!(
            "{} set to {:?} ({} slot(s))",
            field.name,
            replacement.value,
            pending.len()
        );
        fired.push(field.kind);
    }

    Ok(fired)
}

/// Rewrites a serialized value element: `schemeID` in place, content
/// replaced, every other byte of the start tag kept.
pub fn render_slot(slot: &str, replacement: &Replacement) -> String {
    let open_end = start_tag_end(slot);
    let open = &slot[..open_end];

    let (mut open, close) = match open.strip_suffix("/>") {
        Some(head) => (format!("{}>", head.trim_end()), format!("</{}>", tag_name(head))),
        None => {
            let close_start = slot.rfind("</").filter(|&i| i >= open_end).unwrap_or(slot.len());
            (open.to_string(), slot[close_start..].to_string())
        }
    };

    if let Some(scheme_id) = replacement.scheme_id {
        let attr = format!("schemeID=\"{}\"", scheme_id);
        open = SCHEME_ID_ATTR.replace(&open, NoExpand(&attr)).into_owned();
    }

    format!("{}{}{}", open, encode_text(replacement.value), close)
}

fn tag_name(open: &str) -> &str {
    let name = open.trim_start_matches('<');
    let end = name
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(name.len());
    &name[..end]
}
