use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::rules::condition::display_value;
use crate::rules::Evidence;
use crate::target::TargetMetadata;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_.]*)\}").expect("placeholder regex is valid"));

/// Fill `{name}` placeholders from evidence first, then from target facts.
/// Unknown placeholders are left as written.
pub fn render(template: &str, evidence: &Evidence, meta: &TargetMetadata) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let key = &caps[1];
            evidence
                .get(key)
                .cloned()
                .or_else(|| meta.fact(key).map(|v| display_value(&v)))
                .unwrap_or_else(|| caps[0].to_owned())
        })
        .into_owned()
}
