//! Size regression alerts and GitHub Actions annotations

use bundle_size_core::reporter::format_bytes;
use bundle_size_core::{ChangedEntries, ComparedEntry};

/// Alert configuration
#[derive(Debug, Clone, Default)]
pub struct AlertConfig {
    /// Minified growth, in percent, above which the command fails
    pub fail_threshold: Option<f64>,
}

/// Whether we are running inside a GitHub Actions workflow
pub fn is_github_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true")
}

/// Entries whose minified size grew by more than the fail threshold
pub fn exceeding_threshold<'a>(
    changes: &'a ChangedEntries,
    config: &AlertConfig,
) -> Vec<&'a ComparedEntry> {
    let Some(threshold) = config.fail_threshold else {
        return Vec::new();
    };

    changes
        .changed_entries
        .iter()
        .filter(|entry| {
            entry
                .minified_change_percent()
                .is_some_and(|percent| percent > threshold)
        })
        .collect()
}

/// Check if the command should fail based on the changes and config
pub fn should_fail(changes: &ChangedEntries, config: &AlertConfig) -> bool {
    !exceeding_threshold(changes, config).is_empty()
}

/// Format changes as GitHub Actions workflow commands
pub fn format_github_actions_alert(changes: &ChangedEntries, config: &AlertConfig) -> String {
    let mut output = String::new();

    for entry in &changes.changed_entries {
        if entry.diff.empty {
            output.push_str(&format!(
                "::notice title=New fixture::Fixture '{}' ({}) added: {} minified, {} gzipped\n",
                entry.name,
                entry.path,
                format_bytes(entry.minified_size),
                format_bytes(entry.gzipped_size)
            ));
        } else if entry.diff.minified.delta > 0 {
            output.push_str(&format!(
                "::warning title=Bundle size increase::Fixture '{}' ({}) grew by {} \
                 ({} minified)\n",
                entry.name,
                entry.path,
                entry.diff.minified.percent,
                format_bytes(entry.minified_size)
            ));
        }
    }

    for entry in &changes.grown_from_zero {
        output.push_str(&format!(
            "::warning title=Bundle size increase::Fixture '{}' ({}) grew from an empty baseline \
             to {} minified\n",
            entry.name,
            entry.path,
            format_bytes(entry.minified_size)
        ));
    }

    for entry in exceeding_threshold(changes, config) {
        output.push_str(&format!(
            "::error title=Bundle size threshold exceeded::Fixture '{}' grew by {}, \
             exceeding threshold\n",
            entry.name, entry.diff.minified.percent
        ));
    }

    output
}
