pub mod index;
pub mod literal;
pub mod structural;

use std::borrow::Cow;
use std::ops::Range;

use crate::core::error::Result;
use crate::core::types::Strategy;
use crate::invoice::fields::FieldDescriptor;

pub use index::{ElementIndex, ElementSpan};
pub use literal::LiteralLocator;
pub use structural::StructuralLocator;

/// A field found in a document: the name marker together with its value slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedField {
    /// From the start of the name marker to the end of the value slot.
    pub span: Range<usize>,
    /// The whole value element, tags included.
    pub slot: Range<usize>,
    /// Trimmed slot text, `None` when empty.
    pub value: Option<String>,
    pub scheme_id: Option<String>,
}

/// Finds fields and elements in a document's text. Absence is an empty
/// result; only an unreadable document is an error.
pub trait FieldLocator: Send + Sync {
    /// Every occurrence of `field`, in document order.
    fn locate(&self, text: &str, field: &FieldDescriptor) -> Result<Vec<LocatedField>>;

    /// The text context markers are searched in.
    fn context<'a>(&self, text: &'a str) -> Result<Cow<'a, str>>;

    /// Range of the first element with this local name.
    fn locate_element(&self, text: &str, name: &str) -> Result<Option<Range<usize>>>;

    /// Trimmed text content of the first element with this local name.
    fn element_text(&self, text: &str, name: &str) -> Result<Option<String>>;
}

static STRUCTURAL: StructuralLocator = StructuralLocator;
static LITERAL: LiteralLocator = LiteralLocator;

impl Strategy {
    pub fn locator(&self) -> &'static dyn FieldLocator {
        match self {
            Strategy::Structural => &STRUCTURAL,
            Strategy::Literal => &LITERAL,
        }
    }
}
