use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use super::locate::FieldLocator;
use crate::core::error::Result;

pub const PERIOD_ELEMENT: &str = "InvoicePeriod";
pub const ANCHOR_ELEMENT: &str = "LineCountNumeric";
pub const ISSUE_DATE_ELEMENT: &str = "IssueDate";
pub const START_TIME: &str = "12:00:00";
pub const END_TIME: &str = "11:59:59";

static FEC_FAC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"FecFac: (\d{4}-\d{2}-\d{2})").expect("valid FecFac pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodOutcome {
    AlreadyPresent,
    Added,
    MissingAnchor,
    MissingIssueDate,
}

/// Inserts an invoice period right after the line-count element when the
/// document has none. Missing preconditions are logged and leave `text` as is.
pub fn synthesize(text: &mut String, locator: &dyn FieldLocator) -> Result<PeriodOutcome> {
    if locator.locate_element(text, PERIOD_ELEMENT)?.is_some() {
        return Ok(PeriodOutcome::AlreadyPresent);
    }
    log::info!("{} not found, synthesizing one", PERIOD_ELEMENT);

    let Some(anchor) = locator.locate_element(text, ANCHOR_ELEMENT)? else {
        log::warn!("Cannot add {}: no {} element", PERIOD_ELEMENT, ANCHOR_ELEMENT);
        return Ok(PeriodOutcome::MissingAnchor);
    };

    let Some(issue_date) = issue_date(text, locator)? else {
        log::warn!("Cannot add {}: no issue date found", PERIOD_ELEMENT);
        return Ok(PeriodOutcome::MissingIssueDate);
    };

    text.insert_str(anchor.end, &period_block(issue_date));
    log::info!("{} added for {}", PERIOD_ELEMENT, issue_date);
    Ok(PeriodOutcome::Added)
}

/// `FecFac: YYYY-MM-DD` in the document text, else the `IssueDate` element.
pub fn issue_date(text: &str, locator: &dyn FieldLocator) -> Result<Option<NaiveDate>> {
    if let Some(date) = FEC_FAC
        .captures(text)
        .and_then(|caps| parse_date(&caps[1]))
    {
        return Ok(Some(date));
    }
    Ok(locator
        .element_text(text, ISSUE_DATE_ELEMENT)?
        .and_then(|t| parse_date(&t)))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

pub fn period_block(date: NaiveDate) -> String {
    let date = date.format("%Y-%m-%d");
    format!(
        "\n<cac:InvoicePeriod>\n <cbc:StartDate>{date}</cbc:StartDate>\n <cbc:StartTime>{START_TIME}</cbc:StartTime>\n <cbc:EndDate>{date}</cbc:EndDate>\n <cbc:EndTime>{END_TIME}</cbc:EndTime>\n</cac:InvoicePeriod>"
    )
}
