//! Repairs placeholder fields in health-invoice XML and adds the invoice
//! period block downstream validators require.

pub mod engine;
pub mod fields;
pub mod locate;
pub mod nested;
pub mod period;
pub mod rules;

#[cfg(test)]
pub(crate) mod tests;

pub use engine::Engine;
pub use locate::{FieldLocator, LiteralLocator, LocatedField, StructuralLocator};
pub use period::PeriodOutcome;
