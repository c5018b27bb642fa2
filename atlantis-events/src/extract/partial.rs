//! Last-resort recovery of records from text that will not parse.
//!
//! Scans for complete records laid out with the fields in their canonical
//! order. Anything that does not match the full signature is ignored; the
//! results still go through normal validation.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Value};

const STR: &str = r#""((?:[^"\\]|\\.)*)""#;
const NUM: &str = r"(-?[0-9.]+(?:[eE][-+]?[0-9]+)?)";

static RECORD: LazyLock<Option<Regex>> = LazyLock::new(|| {
    let field = |name: &str, pattern: &str| format!(r#""{name}"\s*:\s*{pattern}"#);
    let fields = [
        field("event_id", STR),
        field("title", STR),
        field("date", STR),
        field("lat", NUM),
        field("lng", NUM),
        field("location_label", STR),
        field("category", STR),
        field("significance_score", NUM),
        field("one_liner", STR),
        field("confidence", NUM),
        field("positivity_scale", NUM),
    ];
    Regex::new(&format!(r"(?s)\{{\s*{}", fields.join(r"\s*,\s*"))).ok()
});

/// Recover records whose fields appear in canonical order in `raw`.
pub fn recover_records(raw: &str) -> Vec<Value> {
    let Some(re) = RECORD.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(raw)
        .filter_map(|caps| {
            let text = |i: usize| caps.get(i).map(|m| unescape(m.as_str()));
            let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<f64>().ok());
            Some(json!({
                "event_id": text(1)?,
                "title": text(2)?,
                "date": text(3)?,
                "lat": num(4)?,
                "lng": num(5)?,
                "location_label": text(6)?,
                "category": text(7)?,
                "significance_score": num(8)?,
                "one_liner": text(9)?,
                "confidence": num(10)?,
                "positivity_scale": num(11)?,
            }))
        })
        .collect()
}

fn unescape(s: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{s}\""))
        .unwrap_or_else(|_| s.replace("\\\"", "\"").replace("\\\\", "\\"))
}
