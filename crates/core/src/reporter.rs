//! Human readable renderings of a size comparison

use crate::classify::ChangedEntries;
use crate::data::MeasurementRecord;
use crate::diff::DiffByMetric;
use serde::Serialize;

/// Format a byte count, e.g. `512 B` or `1.50 kB`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["kB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

fn direction_symbol(delta: i64) -> &'static str {
    match delta.signum() {
        1 => "↑",
        -1 => "↓",
        _ => "",
    }
}

/// `+20%↑`, or nothing when the metric did not move
fn format_delta(diff: &DiffByMetric) -> String {
    if diff.delta == 0 {
        return String::new();
    }
    format!("{}{}", diff.percent, direction_symbol(diff.delta))
}

fn format_before(diff: &DiffByMetric, after: u64) -> String {
    diff.before(after).map(format_bytes).unwrap_or_else(|| "N/A".to_string())
}

fn format_after(diff: &DiffByMetric, after: u64) -> String {
    let delta = format_delta(diff);
    if delta.is_empty() {
        format_bytes(after)
    } else {
        format!("{} {}", delta, format_bytes(after))
    }
}

/// Render changed entries as a plain text table for the terminal
pub fn render_cli_table(changes: &ChangedEntries) -> String {
    let mut output = if changes.is_empty() {
        "[✔] No changes found".to_string()
    } else {
        render_table(changes)
    };

    for entry in &changes.grown_from_zero {
        output.push_str(&format!(
            "\n[!] {} ({}) grew from an empty baseline to {} / {}",
            entry.name,
            entry.path,
            format_bytes(entry.minified_size),
            format_bytes(entry.gzipped_size)
        ));
    }

    output
}

fn render_table(changes: &ChangedEntries) -> String {
    let header = ["Fixture", "Before", "After (minified/GZIP)"];
    let rows: Vec<[Vec<String>; 3]> = changes
        .changed_entries
        .iter()
        .map(|entry| {
            let marker = if entry.diff.empty { " (new)" } else { "" };
            [
                vec![entry.package_name.clone(), format!("{}{}", entry.name, marker)],
                vec![
                    format_before(&entry.diff.minified, entry.minified_size),
                    format_before(&entry.diff.gzip, entry.gzipped_size),
                ],
                vec![
                    format_after(&entry.diff.minified, entry.minified_size),
                    format_after(&entry.diff.gzip, entry.gzipped_size),
                ],
            ]
        })
        .collect();

    let mut widths = header.map(|h| h.chars().count());
    for row in &rows {
        for (col, cell) in row.iter().enumerate() {
            for line in cell {
                widths[col] = widths[col].max(line.chars().count());
            }
        }
    }

    let separator = format!(
        "+{}+",
        widths.iter().map(|w| "-".repeat(w + 2)).collect::<Vec<_>>().join("+")
    );
    // Fixture column is left aligned, sizes are right aligned.
    let render_line = |cells: [&str; 3]| {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(col, text)| {
                let pad = widths[col] - text.chars().count();
                if col == 0 {
                    format!(" {}{} ", text, " ".repeat(pad))
                } else {
                    format!(" {}{} ", " ".repeat(pad), text)
                }
            })
            .collect();
        format!("|{}|", padded.join("|"))
    };

    let mut lines = vec![separator.clone(), render_line(header), separator.clone()];
    for row in &rows {
        for line in 0..2 {
            lines.push(render_line([
                row[0][line].as_str(),
                row[1][line].as_str(),
                row[2][line].as_str(),
            ]));
        }
        lines.push(separator.clone());
    }

    lines.join("\n")
}

/// Render a markdown summary suitable for a pull request comment
pub fn render_markdown(changes: &ChangedEntries, removed: &[&MeasurementRecord]) -> String {
    let mut lines = vec!["## 📦 Bundle size report\n".to_string()];

    if changes.is_empty() && changes.grown_from_zero.is_empty() && removed.is_empty() {
        lines.push("✅ No changes found".to_string());
        return lines.join("\n");
    }

    if !changes.is_empty() {
        lines.push("| Package | Fixture | Minified | GZIP |".to_string());
        lines.push("|---------|---------|----------|------|".to_string());

        for entry in &changes.changed_entries {
            let name = if entry.diff.empty {
                format!("{} 🆕", entry.name)
            } else {
                entry.name.clone()
            };
            lines.push(format!(
                "| {} | {} | {} | {} |",
                entry.package_name,
                name,
                markdown_metric(&entry.diff.minified, entry.minified_size),
                markdown_metric(&entry.diff.gzip, entry.gzipped_size),
            ));
        }
        lines.push(String::new());
    }

    if !changes.grown_from_zero.is_empty() {
        lines.push("### Grown from an empty baseline\n".to_string());
        for entry in &changes.grown_from_zero {
            lines.push(format!(
                "- **{}** `{}` (0 B → {} / {})",
                entry.name,
                entry.path,
                format_bytes(entry.minified_size),
                format_bytes(entry.gzipped_size)
            ));
        }
        lines.push(String::new());
    }

    if !removed.is_empty() {
        lines.push("### Removed fixtures\n".to_string());
        for record in removed {
            lines.push(format!(
                "- **{}** `{}` (was {} / {})",
                record.name,
                record.path,
                format_bytes(record.minified_size),
                format_bytes(record.gzipped_size)
            ));
        }
        lines.push(String::new());
    }

    if changes.unchanged_count > 0 {
        lines.push(format!("{} fixture(s) unchanged.", changes.unchanged_count));
    }

    lines.join("\n")
}

fn markdown_metric(diff: &DiffByMetric, after: u64) -> String {
    match diff.before(after) {
        Some(before) if diff.delta != 0 => format!(
            "{} → {} ({})",
            format_bytes(before),
            format_bytes(after),
            format_delta(diff)
        ),
        _ => format_bytes(after),
    }
}

/// Machine readable comparison
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonReport<'a> {
    #[serde(flatten)]
    pub changes: &'a ChangedEntries,
    pub removed_fixtures: &'a [&'a MeasurementRecord],
}

pub fn render_json(
    changes: &ChangedEntries,
    removed: &[&MeasurementRecord],
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        changes,
        removed_fixtures: removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::changed_only;
    use crate::compare::{compare_reports, removed_fixtures};
    use crate::data::Report;
    use pretty_assertions::assert_eq;

    const BUTTON: &str = "packages/react-button/bundle-size/Button.fixture.js";
    const MENU: &str = "packages/react-menu/bundle-size/Menu.fixture.js";
    const SAME: &str = "packages/same/bundle-size/Same.fixture.js";
    const CARD: &str = "packages/react-card/bundle-size/Card.fixture.js";
    const EMPTY: &str = "bundle-size/empty.fixture.js";

    fn sample() -> (Report, Report) {
        let baseline = Report::new(vec![
            MeasurementRecord::new("Button", BUTTON, 2048, 1024),
            MeasurementRecord::new("Menu", MENU, 500, 200),
            MeasurementRecord::new("Same", SAME, 10, 10),
        ])
        .unwrap();
        let current = Report::new(vec![
            MeasurementRecord::new("Button", BUTTON, 2560, 1024),
            MeasurementRecord::new("Same", SAME, 10, 10),
            MeasurementRecord::new("Card", CARD, 300, 150),
        ])
        .unwrap();
        (baseline, current)
    }

    fn json(changes: &ChangedEntries, removed: &[&MeasurementRecord]) -> serde_json::Value {
        serde_json::from_str(&render_json(changes, removed).unwrap()).unwrap()
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.00 kB");
        assert_eq!(format_bytes(1536), "1.50 kB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_format_delta() {
        let grown = DiffByMetric {
            delta: 20,
            percent: "+20%".to_string(),
            empty: false,
        };
        let shrunk = DiffByMetric {
            delta: -5,
            percent: "-10%".to_string(),
            empty: false,
        };
        assert_eq!(format_delta(&grown), "+20%↑");
        assert_eq!(format_delta(&shrunk), "-10%↓");
        assert_eq!(format_delta(&DiffByMetric::empty()), "");
    }

    #[test]
    fn test_cli_table() {
        let (baseline, current) = sample();
        let table = render_cli_table(&changed_only(&compare_reports(&baseline, &current)));

        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[1].contains("Fixture") && lines[1].contains("After (minified/GZIP)"));
        assert!(table.contains("react-button"));
        assert!(table.contains("+25%↑ 2.50 kB"));
        assert!(table.contains("2.00 kB"));
        assert!(table.contains("Card (new)"));
        assert!(table.contains("N/A"));
        assert!(!table.contains("Same"));

        // every line has the same width
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
    }

    #[test]
    fn test_cli_table_without_changes() {
        let (baseline, _) = sample();
        let table = render_cli_table(&changed_only(&compare_reports(&baseline, &baseline)));
        assert_eq!(table, "[✔] No changes found");
    }

    #[test]
    fn test_markdown() {
        let (baseline, current) = sample();
        let changes = changed_only(&compare_reports(&baseline, &current));
        let removed = removed_fixtures(&baseline, &current);
        let markdown = render_markdown(&changes, &removed);

        assert!(
            markdown.contains("| react-button | Button | 2.00 kB → 2.50 kB (+25%↑) | 1.00 kB |")
        );
        assert!(markdown.contains("| react-card | Card 🆕 | 300 B | 150 B |"));
        assert!(markdown.contains("### Removed fixtures"));
        assert!(markdown.contains("**Menu**"));
        assert!(markdown.contains("1 fixture(s) unchanged."));
    }

    #[test]
    fn test_markdown_without_changes() {
        let (baseline, _) = sample();
        let changes = changed_only(&compare_reports(&baseline, &baseline));
        assert!(render_markdown(&changes, &[]).contains("No changes found"));
    }

    #[test]
    fn test_json() {
        let (baseline, current) = sample();
        let changes = changed_only(&compare_reports(&baseline, &current));
        let removed = removed_fixtures(&baseline, &current);

        let value = json(&changes, &removed);
        assert_eq!(value["changedEntries"].as_array().unwrap().len(), 2);
        assert_eq!(value["unchangedCount"], 1);
        assert_eq!(value["removedFixtures"][0]["name"], "Menu");
        assert_eq!(value["changedEntries"][1]["diff"]["empty"], true);
    }

    #[test]
    fn test_growth_from_zero_baseline_is_reported() {
        let baseline = Report::new(vec![MeasurementRecord::new("Empty", EMPTY, 0, 0)]).unwrap();
        let current =
            Report::new(vec![MeasurementRecord::new("Empty", EMPTY, 5000, 2000)]).unwrap();
        let changes = changed_only(&compare_reports(&baseline, &current));

        let table = render_cli_table(&changes);
        assert!(table.starts_with("[✔] No changes found"));
        assert!(table.contains(
            "Empty (bundle-size/empty.fixture.js) grew from an empty baseline to 4.88 kB / 1.95 kB"
        ));

        let markdown = render_markdown(&changes, &[]);
        assert!(markdown.contains("### Grown from an empty baseline"));
        assert!(!markdown.contains("unchanged"));

        let value = json(&changes, &[]);
        assert_eq!(value["unchangedCount"], 0);
        assert_eq!(value["grownFromZero"][0]["minifiedSize"], 5000);
    }
}
