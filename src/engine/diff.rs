//! engine::diff
//!
//! Per-field textual diffs between two snapshots.
//!
//! Each field value is rendered to canonical text and the two renderings
//! are compared line by line with the `similar` crate (Myers diff),
//! producing unified-diff text. Missing fields render as empty text, so a
//! field added or removed between snapshots diffs against `""`.
//!
//! # Rendering
//!
//! | JSON value        | Text                                   |
//! |-------------------|----------------------------------------|
//! | `null`            | empty                                  |
//! | string            | the string itself                      |
//! | number, boolean   | JSON form (`12.5`, `true`)             |
//! | array, object     | pretty JSON, one element per line      |
//!
//! Non-empty text always ends with a newline.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use similar::TextDiff;

use crate::core::snapshot::Snapshot;

/// Context lines around each hunk.
const CONTEXT_LINES: usize = 3;

/// Render a field value to the text that gets diffed.
pub fn render_value(value: &Value) -> String {
    let mut text = match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
    };
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

/// Unified diff of two texts. Identical texts give an empty string.
pub fn unified_diff(old: &str, new: &str, old_label: &str, new_label: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    diff.unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(old_label, new_label)
        .to_string()
}

/// Diff every field present in either snapshot.
///
/// The result has one entry per key in the union of both `field` maps;
/// unchanged fields map to an empty string.
pub fn diff_snapshots(
    old: &Snapshot,
    new: &Snapshot,
    old_label: &str,
    new_label: &str,
) -> BTreeMap<String, String> {
    let keys: BTreeSet<&String> = old.field.keys().chain(new.field.keys()).collect();

    keys.into_iter()
        .map(|key| {
            let before = old.field.get(key).map(render_value).unwrap_or_default();
            let after = new.field.get(key).map(render_value).unwrap_or_default();
            (
                key.clone(),
                unified_diff(&before, &after, old_label, new_label),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod rendering {
        use super::*;

        #[test]
        fn scalars() {
            assert_eq!(render_value(&json!(null)), "");
            assert_eq!(render_value(&json!("paid")), "paid\n");
            assert_eq!(render_value(&json!("")), "");
            assert_eq!(render_value(&json!(12.5)), "12.5\n");
            assert_eq!(render_value(&json!(true)), "true\n");
        }

        #[test]
        fn strings_keep_their_lines() {
            assert_eq!(render_value(&json!("a\nb\n")), "a\nb\n");
        }

        #[test]
        fn structures_are_one_element_per_line() {
            let text = render_value(&json!(["x", "y"]));
            assert_eq!(text, "[\n  \"x\",\n  \"y\"\n]\n");
        }
    }

    mod diffs {
        use super::*;

        #[test]
        fn identical_text_gives_empty_diff() {
            assert_eq!(unified_diff("same\n", "same\n", "a", "b"), "");
        }

        #[test]
        fn changed_line_is_reported() {
            let diff = unified_diff("open\n", "paid\n", "r1", "r2");
            assert!(diff.starts_with("--- r1\n+++ r2\n"));
            assert!(diff.contains("-open\n"));
            assert!(diff.contains("+paid\n"));
        }

        #[test]
        fn context_is_three_lines() {
            let old: String = (1..=11).map(|n| format!("line {n}\n")).collect();
            let new = old.replace("line 6\n", "line six\n");

            let diff = unified_diff(&old, &new, "a", "b");
            assert!(diff.contains("@@ -3,7 +3,7 @@"));
            assert!(diff.contains(" line 3\n"));
            assert!(diff.contains(" line 9\n"));
            assert!(!diff.contains("line 2\n"));
            assert!(!diff.contains("line 10\n"));
        }

        #[test]
        fn union_of_keys_with_missing_sides_empty() {
            let old = Snapshot::new()
                .with_field("status", json!("open"))
                .with_field("note", json!("gone soon"));
            let new = Snapshot::new()
                .with_field("status", json!("open"))
                .with_field("total", json!(10));

            let diff = diff_snapshots(&old, &new, "a", "b");

            assert_eq!(
                diff.keys().map(String::as_str).collect::<Vec<_>>(),
                vec!["note", "status", "total"]
            );
            assert_eq!(diff["status"], "");
            assert!(diff["note"].contains("-gone soon"));
            assert!(diff["total"].contains("+10"));
        }

        #[test]
        fn empty_snapshots_have_no_entries() {
            assert!(diff_snapshots(&Snapshot::new(), &Snapshot::new(), "a", "b").is_empty());
        }
    }
}
