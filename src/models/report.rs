use camino::Utf8PathBuf;

/// One file that contained at least one forbidden word.
///
/// Produced by a worker and handed to the controller, which owns it from then on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    /// File name without its directory
    pub file_name: String,

    /// Total matches across all lines and all words
    pub match_count: u64,

    /// Absolute directory that holds the source file
    pub file_directory: Utf8PathBuf,

    /// Absolute root directory of the run
    pub search_directory: Utf8PathBuf,

    /// Size of the source file in bytes, taken before scanning
    pub file_size: u64,
}

impl ReportEntry {
    /// File size formatted for display, e.g. `512 B` or `1.5 KB`
    pub fn formatted_file_size(&self) -> String {
        format_file_size(self.file_size)
    }

    /// Single report line for this entry
    pub fn report_line(&self) -> String {
        format!(
            "File: {} | Replacements: {} | Size: {} | Path: {}",
            self.file_name,
            self.match_count,
            self.formatted_file_size(),
            self.file_directory
        )
    }
}

/// Format a byte count using binary (1024) units with one decimal place.
///
/// Values below 1 KiB are printed as whole bytes.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["KB", "MB", "GB", "TB", "PB", "EB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut exp = 0;
    let mut threshold = 1024u64;
    while exp + 1 < UNITS.len() && bytes / 1024 >= threshold {
        threshold *= 1024;
        exp += 1;
    }

    let value = bytes as f64 / 1024f64.powi(exp as i32 + 1);
    format!("{:.1} {}", value, UNITS[exp])
}
