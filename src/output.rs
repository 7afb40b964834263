//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Each source leads with its positional index and `src`, followed by its
//! attributes as indented context lines. A failed source shows its error in
//! the same slot so one bad image never hides the others.
//!
//! ```text
//! 001 dawn.jpg
//!     srcset: /img/dawn.1a2b3c4d.9f3e….jpg 480w, /img/dawn.5e6f7a8b.9f3e….jpg 1024w
//!     srcset webp: /img/dawn.1a2b3c4d.9f3e….webp 480w, …
//!     aspect ratio: 1.5
//!     placeholder: inline, 1834 chars
//! 002 missing.jpg
//!     error: IO error on src/missing.jpg: No such file or directory (os error 2)
//!
//! Images: 12 reused, 3 encoded (15 total)
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>` or a JSON value)
//! for testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::attributes::{AttributeRecord, PlaceholderAttributes};
use crate::error::DeriveError;
use crate::hashing::DeriveStats;
use serde_json::json;
use std::path::PathBuf;

/// Outcome for one `src` on the command line.
pub type SourceOutcome = (PathBuf, Result<AttributeRecord, DeriveError>);

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Attribute lines for one successful source, at depth 1.
fn record_lines(record: &AttributeRecord) -> Vec<String> {
    let pad = indent(1);
    let mut lines = vec![format!("{pad}srcset: {}", record.srcset)];
    for (format, srcset) in &record.srcset_alternates {
        lines.push(format!("{pad}srcset {format}: {srcset}"));
    }
    lines.push(format!("{pad}aspect ratio: {}", record.aspect_ratio));
    match &record.placeholder {
        Some(PlaceholderAttributes::Inline(uri)) => {
            lines.push(format!(
                "{pad}placeholder: inline, {} chars",
                uri.chars().count()
            ));
            lines.push(format!("{pad}{pad}{}", truncate(uri, 60)));
        }
        Some(PlaceholderAttributes::Materialized { src, alternates }) => {
            lines.push(format!("{pad}placeholder: {src}"));
            for (format, src) in alternates {
                lines.push(format!("{pad}placeholder {format}: {src}"));
            }
        }
        None => {}
    }
    lines
}

/// Text view of every source, in command-line order.
pub fn format_attributes(outcomes: &[SourceOutcome]) -> Vec<String> {
    let mut lines = Vec::new();
    for (pos, (src, outcome)) in outcomes.iter().enumerate() {
        lines.push(format!("{} {}", format_index(pos + 1), src.display()));
        match outcome {
            Ok(record) => lines.extend(record_lines(record)),
            Err(e) => lines.push(format!("{}error: {}", indent(1), e)),
        }
    }
    lines
}

/// JSON view: an object keyed by `src`. Failed sources map to
/// `{"error": "<message>"}`.
pub fn format_attributes_json(
    outcomes: &[SourceOutcome],
) -> Result<serde_json::Value, serde_json::Error> {
    let mut map = serde_json::Map::new();
    for (src, outcome) in outcomes {
        let value = match outcome {
            Ok(record) => serde_json::to_value(record)?,
            Err(e) => json!({ "error": e.to_string() }),
        };
        map.insert(src.display().to_string(), value);
    }
    Ok(serde_json::Value::Object(map))
}

/// Closing summary line.
pub fn format_stats(stats: &DeriveStats) -> String {
    format!("Images: {}", stats)
}

/// Print the text view and summary to stdout.
pub fn print_attributes(outcomes: &[SourceOutcome], stats: &DeriveStats) {
    for line in format_attributes(outcomes) {
        println!("{}", line);
    }
    println!();
    println!("{}", format_stats(stats));
}

/// Print the JSON view to stdout.
pub fn print_attributes_json(outcomes: &[SourceOutcome]) -> Result<(), serde_json::Error> {
    println!(
        "{}",
        serde_json::to_string_pretty(&format_attributes_json(outcomes)?)?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Format;
    use std::collections::BTreeMap;

    fn record(placeholder: Option<PlaceholderAttributes>) -> AttributeRecord {
        AttributeRecord {
            srcset: "/img/a.1.f.jpg 480w".into(),
            srcset_alternates: BTreeMap::from([(Format::Webp, "/img/a.1.f.webp 480w".into())]),
            aspect_ratio: 1.5,
            placeholder,
        }
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn truncate_short_and_long() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate(&"a".repeat(12), 10), format!("{}...", "a".repeat(10)));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("ééé", 2), "éé...");
    }

    // =========================================================================
    // Text view
    // =========================================================================

    #[test]
    fn format_attributes_lists_sets_and_ratio() {
        let outcomes = vec![(PathBuf::from("a.jpg"), Ok(record(None)))];
        let lines = format_attributes(&outcomes);
        assert_eq!(
            lines,
            vec![
                "001 a.jpg",
                "    srcset: /img/a.1.f.jpg 480w",
                "    srcset webp: /img/a.1.f.webp 480w",
                "    aspect ratio: 1.5",
            ]
        );
    }

    #[test]
    fn format_attributes_inline_placeholder_is_summarized() {
        let uri = format!("data:image/svg+xml,{}", "x".repeat(200));
        let outcomes = vec![(
            PathBuf::from("a.jpg"),
            Ok(record(Some(PlaceholderAttributes::Inline(uri.clone())))),
        )];
        let lines = format_attributes(&outcomes);
        assert!(lines.contains(&format!("    placeholder: inline, {} chars", uri.len())));
        assert!(lines.last().unwrap().ends_with("..."));
    }

    #[test]
    fn format_attributes_materialized_placeholder() {
        let outcomes = vec![(
            PathBuf::from("a.jpg"),
            Ok(record(Some(PlaceholderAttributes::Materialized {
                src: "/img/a.64.jpg".into(),
                alternates: BTreeMap::from([(Format::Avif, "/img/a.64.avif".into())]),
            }))),
        )];
        let lines = format_attributes(&outcomes);
        assert!(lines.contains(&"    placeholder: /img/a.64.jpg".to_string()));
        assert!(lines.contains(&"    placeholder avif: /img/a.64.avif".to_string()));
    }

    #[test]
    fn format_attributes_shows_errors_in_place() {
        let outcomes = vec![
            (
                PathBuf::from("gone.jpg"),
                Err(DeriveError::InvalidInput("src is empty".into())),
            ),
            (PathBuf::from("a.jpg"), Ok(record(None))),
        ];
        let lines = format_attributes(&outcomes);
        assert_eq!(lines[0], "001 gone.jpg");
        assert!(lines[1].starts_with("    error: "));
        assert_eq!(lines[2], "002 a.jpg");
    }

    // =========================================================================
    // JSON view
    // =========================================================================

    #[test]
    fn json_view_keys_by_src() {
        let outcomes = vec![
            (PathBuf::from("a.jpg"), Ok(record(None))),
            (
                PathBuf::from("b.jpg"),
                Err(DeriveError::InvalidInput("bad".into())),
            ),
        ];
        let json = format_attributes_json(&outcomes).unwrap();
        assert_eq!(json["a.jpg"]["srcsetWebp"], "/img/a.1.f.webp 480w");
        assert_eq!(json["a.jpg"]["aspectRatio"], 1.5);
        assert!(json["b.jpg"]["error"].as_str().unwrap().contains("bad"));
    }

    #[test]
    fn stats_line() {
        let stats = DeriveStats::default();
        stats.encode();
        stats.reuse();
        assert_eq!(format_stats(&stats), "Images: 1 reused, 1 encoded (2 total)");
    }
}
