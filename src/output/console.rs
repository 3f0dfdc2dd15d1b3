use std::collections::BTreeSet;

use crate::report::AssessmentReport;
use crate::rules::Status;

/// List the categories a target offers, one per line.
pub fn render_categories(target_name: &str, categories: &BTreeSet<String>) -> String {
    let mut output = format!("All categories available for {target_name}:\n\n");
    if categories.is_empty() {
        output.push_str("  (none: no checks apply to this target)\n");
    }
    for category in categories {
        output.push_str(&format!("  {category}\n"));
    }
    output.push('\n');
    output
}

/// Render results in evaluation order: status, check, message, help link.
pub fn render(report: &AssessmentReport) -> String {
    let mut output = String::new();

    if report.total() == 0 {
        if report.partial {
            output.push_str("\n  Run was cancelled before any check completed; results are partial.\n\n");
        } else {
            output.push_str("\n  No checks matched the selected categories.\n\n");
        }
        return output;
    }

    output.push_str(&format!(
        "\n  {} ({}, {} {}) - {} result(s):\n\n",
        report.target.name,
        report.target.edition,
        report.target.platform,
        report.target.version,
        report.total()
    ));

    for result in report.results() {
        let status_tag = match result.status {
            Status::Error => "[ERROR]  ",
            Status::Warning => "[WARNING]",
            Status::Information => "[INFO]   ",
            Status::Skipped => "[SKIPPED]",
            Status::Pass => "[PASS]   ",
        };

        output.push_str("  -------\n");
        output.push_str(&format!("  {} {}\n", status_tag, result.check_id));
        output.push_str(&format!("    {}\n", result.message));
        if let Some(link) = &result.help_link {
            output.push_str(&format!("    {}\n", link));
        }
    }
    output.push('\n');

    let summary: Vec<String> = report
        .counts_by_status()
        .iter()
        .map(|(status, count)| format!("{count} {status}"))
        .collect();
    output.push_str(&format!("  Summary: {}\n", summary.join(", ")));
    if report.partial {
        output.push_str("  Run was cancelled; results are partial.\n");
    }
    output.push('\n');

    output
}
