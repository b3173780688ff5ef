use anyhow::{anyhow, Context, Result};

use super::types::{CarrierSelection, Strategy};

pub const DEFAULT_CARRIER_TAG: &str = "Description";
pub const DEFAULT_OUTPUT_SUFFIX: &str = "-modificado";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatcherConfig {
    pub strategy: Strategy,
    pub carrier_tag: String,
    pub carriers: CarrierSelection,
    pub output_suffix: String,
    pub strip_prolog: bool,
}

impl Default for PatcherConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            carrier_tag: DEFAULT_CARRIER_TAG.to_string(),
            carriers: CarrierSelection::default(),
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            strip_prolog: true,
        }
    }
}

impl PatcherConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(strategy) = lookup("INVOICE_PATCHER_STRATEGY") {
            config.strategy = strategy
                .parse::<Strategy>()
                .context("invalid INVOICE_PATCHER_STRATEGY")?;
        }

        if let Some(tag) = lookup("INVOICE_PATCHER_CARRIER_TAG") {
            let tag = tag.trim();
            if tag.is_empty() {
                return Err(anyhow!("INVOICE_PATCHER_CARRIER_TAG must not be empty"));
            }
            config.carrier_tag = tag.to_string();
        }

        if let Some(carriers) = lookup("INVOICE_PATCHER_CARRIERS") {
            config.carriers = carriers
                .parse::<CarrierSelection>()
                .context("invalid INVOICE_PATCHER_CARRIERS")?;
        }

        if let Some(suffix) = lookup("INVOICE_PATCHER_OUTPUT_SUFFIX") {
            config.output_suffix = suffix;
        }

        if let Some(strip) = lookup("INVOICE_PATCHER_STRIP_PROLOG") {
            config.strip_prolog = parse_bool(&strip)
                .ok_or_else(|| anyhow!("invalid INVOICE_PATCHER_STRIP_PROLOG: {}", strip))?;
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
