//! Terminal summary of a run

use cdr_callflow::{format_duration, BatchReport, CallStatistics, Directory};
use colored::*;
use indexmap::IndexMap;
use std::path::Path;

pub struct Summary {
    no_color: bool,
}

impl Summary {
    pub fn new(no_color: bool) -> Self {
        Self { no_color }
    }

    fn heading(&self, text: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            text.bold()
                .to_string()
        }
    }

    fn figure(&self, value: impl ToString, good: bool) -> String {
        let value = value.to_string();
        if self.no_color {
            value
        } else if good {
            value
                .green()
                .to_string()
        } else {
            value
                .yellow()
                .to_string()
        }
    }

    pub fn batch(&self, report: &BatchReport) {
        println!("{}", self.heading("Reconstruction"));
        println!("  groups:   {}", report.groups);
        println!("  calls:    {}", self.figure(report.calls.len(), true));
        println!(
            "  rejected: {}",
            self.figure(report.rejected, report.rejected == 0)
        );
        if report.failed > 0 {
            let failed = format!("{} groups failed", report.failed);
            if self.no_color {
                println!("  {}", failed);
            } else {
                println!("  {}", failed.red().bold());
            }
        }
    }

    pub fn statistics(&self, stats: &CallStatistics) {
        println!("{}", self.heading("Statistics"));
        println!(
            "  received: {} ({} missed), {}",
            stats.received,
            self.figure(stats.missed, stats.missed == 0),
            format_duration(stats.received_duration)
        );
        println!(
            "  emitted:  {} ({} reached), {}",
            stats.emitted,
            self.figure(stats.reached, true),
            format_duration(stats.emitted_duration)
        );
        println!(
            "  average answered call: {}",
            format_duration(stats.average_duration)
        );
        if stats.forwarded_received > 0 {
            println!(
                "  forwarded: {}, {}",
                stats.forwarded_received,
                format_duration(stats.forwarded_received_duration)
            );
        }
        if stats.click_to_call > 0 {
            println!("  click-to-call: {}", stats.click_to_call);
        }
    }

    /// Busiest internal endpoints, named through the directory.
    pub fn busiest(&self, report: &BatchReport, directory: &Directory, limit: usize) {
        let counts = tally_internal(
            report
                .calls
                .iter()
                .flat_map(|call| [call.source.as_str(), call.destination.as_str()]),
            directory,
        );
        if counts.is_empty() {
            return;
        }

        println!("{}", self.heading("Busiest extensions"));
        for (endpoint, n) in counts
            .into_iter()
            .take(limit)
        {
            println!(
                "  {:<8} {:<24} {}",
                endpoint,
                directory.display_name(endpoint),
                n
            );
        }
    }

    pub fn written(&self, path: &Path) {
        if self.no_color {
            println!("Wrote {}", path.display());
        } else {
            println!("{} {}", "✓ Wrote".green(), path.display());
        }
    }
}

/// Occurrences of internal endpoints, most frequent first. Ties keep first
/// appearance.
fn tally_internal<'a>(
    endpoints: impl IntoIterator<Item = &'a str>,
    directory: &Directory,
) -> Vec<(&'a str, usize)> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for endpoint in endpoints {
        if directory.is_internal(endpoint) {
            *counts
                .entry(endpoint)
                .or_insert(0) += 1;
        }
    }
    let mut counts: Vec<(&str, usize)> = counts
        .into_iter()
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_internal_endpoints_only() {
        let mut directory = Directory::default();
        directory
            .internal
            .extend(["101".to_string(), "102".to_string(), "103".to_string()]);

        let counts = tally_internal(
            ["0601020304", "102", "101", "103", "101", "0612345678", "102", "101"],
            &directory,
        );
        assert_eq!(counts, vec![("101", 3), ("102", 2), ("103", 1)]);
    }

    #[test]
    fn tally_ties_keep_first_appearance() {
        let mut directory = Directory::default();
        directory
            .internal
            .extend(["101".to_string(), "102".to_string()]);

        let counts = tally_internal(["102", "101"], &directory);
        assert_eq!(counts, vec![("102", 1), ("101", 1)]);
    }
}
