use anyhow::anyhow;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The coded fields the rule set knows how to repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    ProviderCode,
    PaymentModality,
    BenefitCoverage,
    ContractNumber,
    PolicyNumber,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldKind::ProviderCode => write!(f, "provider_code"),
            FieldKind::PaymentModality => write!(f, "payment_modality"),
            FieldKind::BenefitCoverage => write!(f, "benefit_coverage"),
            FieldKind::ContractNumber => write!(f, "contract_number"),
            FieldKind::PolicyNumber => write!(f, "policy_number"),
        }
    }
}

/// Result of one patch pass over a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatchStats {
    pub nested_documents: usize,
    pub period_added: bool,
    pub fired: Vec<FieldKind>,
}

impl PatchStats {
    pub fn changed(&self) -> bool {
        self.period_added || !self.fired.is_empty()
    }
}

/// How fields are found inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Parse each nested document and walk `Name`/`Value` siblings.
    #[default]
    Structural,
    /// Exact substring search over the whole file, ignoring nested boundaries.
    Literal,
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structural" | "tree" => Ok(Strategy::Structural),
            "literal" | "text" => Ok(Strategy::Literal),
            other => Err(anyhow!("unknown strategy: {}", other)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Strategy::Structural => write!(f, "structural"),
            Strategy::Literal => write!(f, "literal"),
        }
    }
}

/// Upstream files carry the invoice in the second carrier element; the first
/// one holds a plain description.
pub const DEFAULT_CARRIER_OCCURRENCE: usize = 1;

/// Which carrier elements of the outer document are patched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarrierSelection {
    /// Only the carrier at this zero-based occurrence index.
    Nth(usize),
    All,
}

impl Default for CarrierSelection {
    fn default() -> Self {
        CarrierSelection::Nth(DEFAULT_CARRIER_OCCURRENCE)
    }
}

impl CarrierSelection {
    pub fn includes(&self, occurrence: usize) -> bool {
        match self {
            CarrierSelection::Nth(n) => *n == occurrence,
            CarrierSelection::All => true,
        }
    }
}

impl FromStr for CarrierSelection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(CarrierSelection::All);
        }
        s.parse::<usize>()
            .map(CarrierSelection::Nth)
            .map_err(|_| anyhow!("carrier selection must be 'all' or an index, got: {}", s))
    }
}
