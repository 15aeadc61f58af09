//! Services module - the per-file work of a scan, independent of scheduling.
//!
//! Nothing in here spawns tasks or knows about pause/cancel beyond polling the
//! [`RunSignals`](crate::engine::gate::RunSignals) it is handed; the
//! [`engine`](crate::engine) decides how many of these run at once.
//!
//! # Components
//!
//! - [`ForbiddenWords`] / [`WordMatcher`]: case-insensitive whole-word matching
//!   and redaction of a single line. Counts are taken per word against the
//!   original line, so they do not depend on word order.
//!
//! - [`FileScanner`]: reads one file, redacts it line by line, and writes the
//!   verbatim copy plus the `.replaced` artifact when anything matched.
//!
//! - [`WordStatistics`]: run-wide word counts behind the [`StatsSink`] seam.
//!
//! - [`collect_files`]: recursive enumeration that skips hidden entries.
//!
//! - [`ReportWriter`]: renders and saves `ForbiddenFinder_Report_<ts>.txt`.
//!
//! # Usage Example
//!
//! ```ignore
//! use forbidden_finder::services::{ForbiddenWords, WordMatcher};
//!
//! let words = ForbiddenWords::new(["bad"]);
//! let matcher = WordMatcher::new(&words)?;
//!
//! let line = matcher.scan("The bad word is BAD.");
//! assert_eq!(line.total(), 2);
//! assert_eq!(line.redacted, "The ******* word is *******.");
//! ```

pub mod discovery;
pub mod matcher;
pub mod report;
pub mod scanner;
pub mod statistics;

pub use discovery::{collect_files, is_hidden};
pub use matcher::{ForbiddenWords, LineMatch, MASK_TOKEN, WordMatcher};
pub use report::{ReportWriter, render_report, report_file_name, run_timestamp_ms};
pub use scanner::{FileScanner, REDACTED_SUFFIX};
pub use statistics::{StatsSink, WordStatistics};
