//! Static definitions of the fields the billing system leaves unfilled.

use crate::core::types::FieldKind;

/// Emitted upstream in place of a real code.
pub const PLACEHOLDER: &str = "Array";

pub const NAME_ELEMENT: &str = "Name";
pub const VALUE_ELEMENT: &str = "Value";

/// What an unpatched value slot looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `<Value>Array</Value>`
    Value,
    /// `<Value schemeID="Array" ...></Value>`
    SchemeEmpty,
}

/// Condition over a document's context text deciding which replacement applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Always,
    Contains(&'static str),
}

impl Context {
    pub fn matches(&self, document: &str) -> bool {
        match self {
            Context::Always => true,
            Context::Contains(marker) => document.contains(marker),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Replacement {
    pub scheme_id: Option<&'static str>,
    pub value: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub kind: FieldKind,
    /// Text of the `Name` element.
    pub name: &'static str,
    pub placeholder: Placeholder,
    /// The slot exactly as emitted upstream, for literal matching.
    pub literal_slot: &'static str,
    /// Evaluated in order; the first matching context wins.
    pub outcomes: &'static [(Context, Replacement)],
}

impl FieldDescriptor {
    pub fn is_unpatched(&self, value: Option<&str>, scheme_id: Option<&str>) -> bool {
        match self.placeholder {
            Placeholder::Value => value == Some(PLACEHOLDER),
            Placeholder::SchemeEmpty => scheme_id == Some(PLACEHOLDER) && value.is_none(),
        }
    }

    pub fn select(&self, document: &str) -> Option<&'static Replacement> {
        let outcomes: &'static [(Context, Replacement)] = self.outcomes;
        outcomes
            .iter()
            .find(|(context, _)| context.matches(document))
            .map(|(_, replacement)| replacement)
    }
}

pub const FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor {
        kind: FieldKind::ProviderCode,
        name: "CODIGO_PRESTADOR",
        placeholder: Placeholder::Value,
        literal_slot: "<Value>Array</Value>",
        outcomes: &[(
            Context::Always,
            Replacement {
                scheme_id: None,
                value: "0800185010",
            },
        )],
    },
    FieldDescriptor {
        kind: FieldKind::PaymentModality,
        name: "MODALIDAD_PAGO",
        placeholder: Placeholder::SchemeEmpty,
        literal_slot: r#"<Value schemeID="Array" schemeName="salud_modalidad_pago.gc"></Value>"#,
        outcomes: &[(
            Context::Always,
            Replacement {
                scheme_id: Some("04"),
                value: "Pago por evento",
            },
        )],
    },
    FieldDescriptor {
        kind: FieldKind::BenefitCoverage,
        name: "COBERTURA_PLAN_BENEFICIOS",
        placeholder: Placeholder::SchemeEmpty,
        literal_slot: r#"<Value schemeID="Array" schemeName="salud_cobertura.gc"></Value>"#,
        outcomes: &[
            (
                Context::Contains("Evento NO PBS"),
                Replacement {
                    scheme_id: Some("02"),
                    value: "Presupuesto máximo",
                },
            ),
            (
                Context::Contains("Evento PBS"),
                Replacement {
                    scheme_id: Some("01"),
                    value: "Plan de beneficios en salud financiado con UPC",
                },
            ),
        ],
    },
    FieldDescriptor {
        kind: FieldKind::ContractNumber,
        name: "NUMERO_CONTRATO",
        placeholder: Placeholder::Value,
        literal_slot: "<Value>Array</Value>",
        outcomes: &[
            (
                Context::Contains("Subsidiado"),
                Replacement {
                    scheme_id: None,
                    value: "10787",
                },
            ),
            (
                Context::Contains("Contributivo"),
                Replacement {
                    scheme_id: None,
                    value: "3672",
                },
            ),
        ],
    },
    FieldDescriptor {
        kind: FieldKind::PolicyNumber,
        name: "NUMERO_POLIZA",
        placeholder: Placeholder::Value,
        literal_slot: "<Value>Array</Value>",
        outcomes: &[(
            Context::Always,
            Replacement {
                scheme_id: None,
                value: "NA",
            },
        )],
    },
];

pub fn descriptor(kind: FieldKind) -> &'static FieldDescriptor {
    FIELDS
        .iter()
        .find(|f| f.kind == kind)
        .unwrap_or_else(|| unreachable!("every FieldKind has a descriptor"))
}
