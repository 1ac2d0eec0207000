//! Fixed-width listing report.

use std::fmt;

use crate::hf::RepoMeta;

/// Longest tag summary shown before truncation.
pub const TAGS_WIDTH: usize = 30;

const RULE_WIDTH: usize = 105;

/// Datasets to show, in Hub order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListReport {
    pub datasets: Vec<RepoMeta>,
}

impl fmt::Display for ListReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "Found following datasets on Hugging Face Hub:")?;
        writeln!(f)?;
        writeln!(
            f,
            "{:<40} {:<25} {:<10} {:<30}",
            "Dataset ID", "Last Modified", "Downloads", "Tags"
        )?;
        writeln!(f, "{}", "-".repeat(RULE_WIDTH))?;

        for dataset in &self.datasets {
            let last_modified = dataset
                .last_modified
                .map(|timestamp| timestamp.format("%Y-%m-%d %H:%M:%S%:z").to_string())
                .unwrap_or_default();
            writeln!(
                f,
                "{:<40} {:<25} {:<10} {:<30}",
                dataset.id,
                last_modified,
                dataset.downloads,
                summarize_tags(&dataset.tags)
            )?;
        }

        Ok(())
    }
}

/// Tags joined with `, `, cut to [`TAGS_WIDTH`] characters plus `...` when
/// longer.
pub fn summarize_tags(tags: &[String]) -> String {
    let joined = tags.join(", ");
    if joined.chars().count() > TAGS_WIDTH {
        let mut truncated: String = joined.chars().take(TAGS_WIDTH).collect();
        truncated.push_str("...");
        truncated
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn short_tags_are_untouched() {
        assert_eq!(summarize_tags(&tags(&["a", "b"])), "a, b");
        assert_eq!(summarize_tags(&[]), "");
    }

    #[test]
    fn exactly_thirty_characters_is_untouched() {
        let exact = "x".repeat(30);
        assert_eq!(summarize_tags(&[exact.clone()]), exact);
    }

    #[test]
    fn long_tags_get_ellipsis() {
        let summary = summarize_tags(&tags(&["region:us", "size_categories:1K<n<10K", "biology"]));
        assert_eq!(summary, "region:us, size_categories:1K<...");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let summary = summarize_tags(&["é".repeat(31)]);
        assert_eq!(summary, format!("{}...", "é".repeat(30)));
    }

    #[test]
    fn report_renders_fixed_columns() {
        let report = ListReport {
            datasets: vec![RepoMeta {
                id: "ATLASBIOINFO/cells".to_string(),
                last_modified: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()),
                downloads: 7,
                tags: tags(&["biology"]),
            }],
        };

        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "Found following datasets on Hugging Face Hub:");
        assert!(lines[3].starts_with("Dataset ID"));
        assert_eq!(lines[4], "-".repeat(105));
        assert_eq!(
            lines[5].trim_end(),
            format!(
                "{:<40} {:<25} {:<10} {}",
                "ATLASBIOINFO/cells", "2024-03-01 12:30:00+00:00", "7", "biology"
            )
        );
    }
}
