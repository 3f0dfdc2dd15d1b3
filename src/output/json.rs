use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;
use crate::report::AssessmentReport;
use crate::rules::Status;

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a AssessmentReport,
    total: usize,
    counts: BTreeMap<Status, usize>,
}

/// Render the report as JSON, with totals alongside the results.
pub fn render(report: &AssessmentReport) -> Result<String> {
    let json = JsonReport {
        report,
        total: report.total(),
        counts: report.counts_by_status(),
    };
    Ok(serde_json::to_string_pretty(&json)?)
}
