use std::borrow::Cow;
use std::ops::Range;

use super::{ElementIndex, FieldLocator, LocatedField};
use crate::core::error::Result;
use crate::invoice::fields::{FieldDescriptor, NAME_ELEMENT, VALUE_ELEMENT};

/// Walks the parsed tree: a `Name` element holding the field token, then the
/// next `Value` element under the same parent.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralLocator;

impl FieldLocator for StructuralLocator {
    fn locate(&self, text: &str, field: &FieldDescriptor) -> Result<Vec<LocatedField>> {
        let index = ElementIndex::parse(text)?;
        let mut located: Vec<LocatedField> = Vec::new();

        for name_idx in index.positions_with_text(NAME_ELEMENT, field.name) {
            let Some(value) = index.next_sibling_named(name_idx, VALUE_ELEMENT) else {
                log::debug!("{} has no value slot", field.name);
                continue;
            };
            // Two names before a single value share it.
            if located.iter().any(|l| l.slot == value.range) {
                continue;
            }
            let name = index
                .get(name_idx)
                .map(|n| n.range.start)
                .unwrap_or(value.range.start);

            let trimmed = value.text.trim();
            located.push(LocatedField {
                span: name..value.range.end,
                slot: value.range.clone(),
                value: (!trimmed.is_empty()).then(|| trimmed.to_string()),
                scheme_id: value.attribute("schemeID").map(String::from),
            });
        }

        if located.is_empty() {
            log::debug!("{} not present", field.name);
        }
        Ok(located)
    }

    /// Character data only: markers inside comments or attributes do not count.
    fn context<'a>(&self, text: &'a str) -> Result<Cow<'a, str>> {
        let index = ElementIndex::parse(text)?;
        Ok(Cow::Owned(index.text_content().to_string()))
    }

    fn locate_element(&self, text: &str, name: &str) -> Result<Option<Range<usize>>> {
        let index = ElementIndex::parse(text)?;
        Ok(index.find(name).map(|e| e.range.clone()))
    }

    fn element_text(&self, text: &str, name: &str) -> Result<Option<String>> {
        let index = ElementIndex::parse(text)?;
        Ok(index
            .find(name)
            .map(|e| e.text.trim().to_string())
            .filter(|t| !t.is_empty()))
    }
}
