//! Parsing of `key=value` command-line assignments into courrier fields

use anyhow::{Result, bail};
use courrier::Fields;
use serde_json::Value;

/// Parse assignments like `subject=Convocation` or `pieces=3`.
///
/// Values that are valid JSON keep their JSON type; anything else is a string.
pub fn parse_assignments(assignments: &[String]) -> Result<Fields> {
    let mut fields = Fields::new();
    for assignment in assignments {
        let Some((key, raw)) = assignment.split_once('=') else {
            bail!("expected key=value, got '{assignment}'");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("empty field name in '{assignment}'");
        }
        fields.insert(key.to_string(), parse_value(raw));
    }
    Ok(fields)
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
