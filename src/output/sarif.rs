use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::error::Result;
use crate::report::AssessmentReport;
use crate::rules::{AssessmentResult, Status};

/// Render the report as SARIF 2.1.0.
///
/// Every result is emitted; passing and skipped checks use the `pass` and
/// `notApplicable` result kinds so consumers can tell them from findings.
pub fn render(report: &AssessmentReport) -> Result<String> {
    let rules_by_id: BTreeMap<&str, &AssessmentResult> = report
        .results()
        .map(|r| (r.check_id.as_str(), r))
        .collect();

    let rules: Vec<Value> = rules_by_id
        .values()
        .map(|r| {
            let mut rule = json!({
                "id": r.check_id,
                "name": r.display_name,
                "shortDescription": { "text": r.display_name },
            });
            if let Some(link) = &r.help_link {
                rule["helpUri"] = json!(link);
            }
            rule
        })
        .collect();

    let results: Vec<Value> = report
        .results()
        .map(|r| {
            let (kind, level) = sarif_kind_and_level(r.status);
            let mut result = json!({
                "ruleId": r.check_id,
                "kind": kind,
                "level": level,
                "message": { "text": r.message },
                "locations": [{
                    "logicalLocations": [{
                        "name": report.target.name,
                        "kind": report.target.kind.to_string().to_lowercase(),
                    }],
                }],
            });
            if !r.evidence.is_empty() {
                result["properties"] = json!({ "evidence": r.evidence });
            }
            result
        })
        .collect();

    let sarif = json!({
        "$schema": "https://docs.oasis-open.org/sarif/sarif/v2.1.0/errata01/os/schemas/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "sqlassess",
                    "version": env!("CARGO_PKG_VERSION"),
                    "semanticVersion": env!("CARGO_PKG_VERSION"),
                    "rules": rules,
                },
            },
            "results": results,
            "automationDetails": {
                "id": format!("sqlassess/{}/{}", report.target.name, report.run_id),
            },
        }],
    });

    let output = serde_json::to_string_pretty(&sarif)?;
    Ok(output)
}

fn sarif_kind_and_level(status: Status) -> (&'static str, &'static str) {
    match status {
        Status::Error => ("fail", "error"),
        Status::Warning => ("fail", "warning"),
        Status::Information => ("fail", "note"),
        Status::Pass => ("pass", "none"),
        Status::Skipped => ("notApplicable", "none"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{collect, RunContext};
    use crate::target::{EngineEdition, Target, TargetHandle, TargetKind};

    fn result(id: &str, status: Status) -> AssessmentResult {
        AssessmentResult {
            check_id: id.into(),
            display_name: format!("{id} name"),
            target: "SQL01".into(),
            status,
            message: "msg".into(),
            help_link: Some(format!("https://example.com/{id}")),
            evidence: Default::default(),
            fault: None,
        }
    }

    #[test]
    fn maps_statuses_to_sarif() {
        let target = Target {
            kind: TargetKind::Server,
            name: "SQL01".into(),
            version: "15.0".parse().unwrap(),
            platform: "Windows".into(),
            edition: EngineEdition::Standard,
            handle: TargetHandle::new("SQL01"),
        };
        let report = collect(
            RunContext::start(target, None, vec![]),
            vec![
                result("B", Status::Error),
                result("A", Status::Pass),
                result("C", Status::Information),
                result("D", Status::Skipped),
            ],
            false,
        );

        let value: Value = serde_json::from_str(&render(&report).unwrap()).unwrap();
        let run = &value["runs"][0];
        assert_eq!(run["tool"]["driver"]["rules"][0]["id"], "A");
        assert_eq!(run["tool"]["driver"]["rules"][1]["helpUri"], "https://example.com/B");
        assert_eq!(run["results"][0]["ruleId"], "B");
        assert_eq!(run["results"][0]["level"], "error");
        assert_eq!(run["results"][1]["kind"], "pass");
        assert_eq!(run["results"][2]["kind"], "fail");
        assert_eq!(run["results"][2]["level"], "note");

        for result in run["results"].as_array().unwrap() {
            assert!(result["kind"] == "fail" || result["level"] == "none");
        }
        assert_eq!(
            run["results"][0]["locations"][0]["logicalLocations"][0]["kind"],
            "server"
        );
    }
}
