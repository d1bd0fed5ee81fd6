//! Run statistics and the end-of-run summary.

use console::style;

use crate::download::{DownloadRecord, DownloadStatus};
use crate::error::exit_codes;

/// Aggregated outcome of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub success: u64,
    /// Duplicates and unsupported content.
    pub skipped: u64,
    pub duplicates: u64,
    pub failed: u64,
    /// `(post id, reason)` for every failure, in completion order.
    pub failures: Vec<(String, String)>,
    pub interrupted: bool,
}

impl RunReport {
    /// Fold one record into the counts. Order does not matter.
    pub fn add(&mut self, record: &DownloadRecord) {
        match record.status {
            DownloadStatus::Success => self.success += 1,
            DownloadStatus::SkippedDuplicate => {
                self.skipped += 1;
                self.duplicates += 1;
            }
            DownloadStatus::Skipped => self.skipped += 1,
            DownloadStatus::Failed => {
                self.failed += 1;
                self.failures.push((
                    record.post_id.clone(),
                    record.error_reason.clone().unwrap_or_default(),
                ));
            }
        }
    }

    pub fn total(&self) -> u64 {
        self.success + self.skipped + self.failed
    }

    /// Process exit code for this run.
    ///
    /// Any failure is an error unless `tolerate_failures` is set, in which
    /// case only a run where every attempted download failed is.
    pub fn exit_code(&self, tolerate_failures: bool) -> i32 {
        if self.interrupted {
            exit_codes::ABORT
        } else if self.failed == 0 || (tolerate_failures && self.success > 0) {
            exit_codes::SUCCESS
        } else {
            exit_codes::DOWNLOAD_ERROR
        }
    }
}

/// Print the end-of-run summary.
pub fn print_summary(report: &RunReport) {
    println!();
    println!("{}", style("═".repeat(50)).dim());
    println!("{}", style("Summary:").bold());
    println!("  Downloaded: {}", style(report.success).green());
    println!(
        "  Skipped:    {} ({} already downloaded)",
        style(report.skipped).yellow(),
        report.duplicates
    );
    if report.failed > 0 {
        println!("  Failed:     {}", style(report.failed).red());
        for (post_id, reason) in &report.failures {
            println!("    {} {}: {}", style("✗").red(), post_id, reason);
        }
    } else {
        println!("  Failed:     0");
    }
    if report.interrupted {
        println!("  {}", style("Interrupted before completion").yellow());
    }
    println!("{}", style("═".repeat(50)).dim());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn report(records: &[DownloadRecord]) -> RunReport {
        let mut report = RunReport::default();
        for record in records {
            report.add(record);
        }
        report
    }

    #[test]
    fn test_counts() {
        let r = report(&[
            DownloadRecord::success("a", PathBuf::from("a.jpg")),
            DownloadRecord::duplicate("b", None),
            DownloadRecord::skipped("c", "text post"),
            DownloadRecord::failed("d", "HTTP 500"),
        ]);
        assert_eq!((r.success, r.skipped, r.failed), (1, 2, 1));
        assert_eq!(r.duplicates, 1);
        assert_eq!(r.total(), 4);
        assert_eq!(r.failures, vec![("d".to_string(), "HTTP 500".to_string())]);
    }

    #[test]
    fn test_exit_codes() {
        let ok = report(&[DownloadRecord::success("a", PathBuf::from("a.jpg"))]);
        assert_eq!(ok.exit_code(false), exit_codes::SUCCESS);

        let partial = report(&[
            DownloadRecord::success("a", PathBuf::from("a.jpg")),
            DownloadRecord::failed("b", "HTTP 404"),
        ]);
        assert_eq!(partial.exit_code(false), exit_codes::DOWNLOAD_ERROR);
        assert_eq!(partial.exit_code(true), exit_codes::SUCCESS);

        let all_failed = report(&[DownloadRecord::failed("b", "HTTP 404")]);
        assert_eq!(all_failed.exit_code(true), exit_codes::DOWNLOAD_ERROR);

        let mut interrupted = ok.clone();
        interrupted.interrupted = true;
        assert_eq!(interrupted.exit_code(false), exit_codes::ABORT);
    }

    #[test]
    fn test_empty_run_succeeds() {
        assert_eq!(RunReport::default().exit_code(false), exit_codes::SUCCESS);
    }
}
