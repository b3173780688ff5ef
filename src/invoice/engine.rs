use std::path::{Path, PathBuf};

use super::fields::FIELDS;
use super::locate::FieldLocator;
use super::nested::{self, Carrier};
use super::period::{self, PeriodOutcome};
use super::rules;
use crate::core::config::PatcherConfig;
use crate::core::error::Result;
use crate::core::types::{PatchStats, Strategy};
use crate::document::Document;

/// Runs the patch pipeline over whole documents. Holds configuration only,
/// so one engine can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: PatcherConfig,
}

impl Engine {
    pub fn new(config: PatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PatcherConfig {
        &self.config
    }

    pub fn process(&self, input: &Path, output: Option<&Path>) -> Result<(PathBuf, PatchStats)> {
        let mut document = Document::new(input);
        let stats = self.patch_document(&mut document)?;
        let written = document.write(output, &self.config.output_suffix)?;
        Ok((written, stats))
    }

    pub fn patch_document(&self, document: &mut Document) -> Result<PatchStats> {
        let (patched, stats) = self.patch_text(document.content()?)?;
        if stats.changed() {
            document.set_content(patched);
        }
        Ok(stats)
    }

    pub fn patch_text(&self, text: &str) -> Result<(String, PatchStats)> {
        let locator = self.config.strategy.locator();
        match self.config.strategy {
            Strategy::Structural => self.patch_nested(text, locator),
            Strategy::Literal => patch_flat(text, locator),
        }
    }

    fn patch_nested(&self, outer: &str, locator: &dyn FieldLocator) -> Result<(String, PatchStats)> {
        let carriers = nested::find_carriers(outer, &self.config.carrier_tag, self.config.carriers)?;
        let mut stats = PatchStats {
            nested_documents: carriers.len(),
            ..PatchStats::default()
        };
        let mut patched = outer.to_string();
        let mut fired_per_carrier = Vec::new();

        // Back to front so earlier carrier ranges stay valid.
        for Carrier { occurrence, content, text } in carriers.into_iter().rev() {
            let mut inner = text.clone();
            let fired = rules::apply(&mut inner, locator, FIELDS)?;
            let period = period::synthesize(&mut inner, locator)?;

            if inner != text {
                log::debug!("Re-embedding {} #{}", self.config.carrier_tag, occurrence);
                patched.replace_range(content, &nested::embed(&inner, self.config.strip_prolog));
            }

            stats.period_added |= period == PeriodOutcome::Added;
            fired_per_carrier.push(fired);
        }
        stats.fired = fired_per_carrier.into_iter().rev().flatten().collect();

        Ok((patched, stats))
    }
}

fn patch_flat(text: &str, locator: &dyn FieldLocator) -> Result<(String, PatchStats)> {
    let mut patched = text.to_string();
    let fired = rules::apply(&mut patched, locator, FIELDS)?;
    let period = period::synthesize(&mut patched, locator)?;

    Ok((
        patched,
        PatchStats {
            nested_documents: 0,
            period_added: period == PeriodOutcome::Added,
            fired,
        },
    ))
}
