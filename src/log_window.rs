//! Log window extraction.
//!
//! The window is every line carrying the same day token as the newest
//! entry in the access log. Dates are never parsed as calendar values;
//! the token is matched as a plain substring.

use std::path::Path;

use crate::error::NdefenceError;
use crate::fs_abstraction::FileSystem;

/// Read a whole file and split it into lines on `\n`.
///
/// A trailing newline produces a final empty element, which
/// [`reference_line`] accounts for.
pub fn tokenize_file(fs: &dyn FileSystem, path: &Path) -> Result<Vec<String>, NdefenceError> {
    let contents = fs.read_to_string(path).map_err(|e| {
        NdefenceError::FileSystem(format!("Unable to read {}: {}", path.display(), e))
    })?;

    if contents.is_empty() {
        return Err(NdefenceError::EmptyLog(path.display().to_string()));
    }

    Ok(contents.split('\n').map(str::to_string).collect())
}

/// Pick the line the reference date is taken from.
///
/// That is the second-to-last line, since the last one is normally the
/// blank remainder after the final newline. With fewer than two lines
/// the first line is used.
pub fn reference_line(lines: &[String]) -> Option<&str> {
    let idx = lines.len().saturating_sub(2);
    lines.get(idx).map(String::as_str)
}

/// Extract the day token (e.g. `18/Oct/2026`) from a combined-log line.
///
/// Field 3 holds `[18/Oct/2026:10:00:00`; brackets are stripped and
/// everything from the first `:` onwards is dropped.
///
/// # Examples
/// ```
/// use ndefence::log_window::latest_date;
/// let line = r#"10.0.0.5 - - [18/Oct/2026:10:00:00 +0000] "GET / HTTP/1.1" 200 12 "-" "curl""#;
/// assert_eq!(latest_date(line).unwrap(), "18/Oct/2026");
/// ```
pub fn latest_date(line: &str) -> Result<String, NdefenceError> {
    let fields: Vec<&str> = line.split(' ').collect();
    if fields.len() < 4 {
        return Err(NdefenceError::MalformedLine(format!(
            "expected at least 4 fields: {:?}",
            line
        )));
    }

    let datetime = fields[3].trim_matches(|c| c == '[' || c == ']');
    if datetime.is_empty() {
        return Err(NdefenceError::MalformedLine(format!(
            "empty timestamp field: {:?}",
            line
        )));
    }

    let day = datetime.split(':').next().unwrap_or_default();
    if day.is_empty() {
        return Err(NdefenceError::MalformedLine(format!(
            "timestamp has no date before ':': {:?}",
            line
        )));
    }

    Ok(day.to_string())
}

/// Lines of the access log that belong to the current reporting window.
#[derive(Debug, Clone)]
pub struct LogWindow<'a> {
    /// Day token every line in the window contains
    pub reference_date: String,
    lines: Vec<&'a str>,
}

impl<'a> LogWindow<'a> {
    /// Select the window from a tokenized log.
    pub fn select(lines: &'a [String]) -> Result<Self, NdefenceError> {
        let last = reference_line(lines)
            .ok_or_else(|| NdefenceError::InputValidation("no log lines given".to_string()))?;
        let reference_date = latest_date(last)?;

        let window = lines
            .iter()
            .map(String::as_str)
            .filter(|line| line.contains(reference_date.as_str()))
            .collect();

        Ok(Self {
            reference_date,
            lines: window,
        })
    }

    pub fn lines(&self) -> &[&'a str] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_abstraction::{MockFileSystem, RealFileSystem};
    use std::io;
    use tempfile::TempDir;

    fn line(ip: &str, date: &str) -> String {
        format!(
            r#"{} - - [{}:12:30:01 +0000] "GET /index.html HTTP/1.1" 200 512 "-" "Mozilla/5.0""#,
            ip, date
        )
    }

    #[test]
    fn test_latest_date_combined_log() {
        let l = line("10.0.0.5", "17/Oct/2026");
        assert_eq!(latest_date(&l).unwrap(), "17/Oct/2026");
    }

    #[test]
    fn test_latest_date_too_few_fields() {
        let result = latest_date("10.0.0.5 - -");
        assert!(matches!(result, Err(NdefenceError::MalformedLine(_))));
    }

    #[test]
    fn test_latest_date_empty_line() {
        assert!(matches!(latest_date(""), Err(NdefenceError::MalformedLine(_))));
    }

    #[test]
    fn test_latest_date_only_brackets() {
        let result = latest_date("10.0.0.5 - - [] rest");
        assert!(matches!(result, Err(NdefenceError::MalformedLine(_))));
    }

    #[test]
    fn test_latest_date_leading_colon() {
        let result = latest_date("10.0.0.5 - - [:12:30:01 rest");
        assert!(matches!(result, Err(NdefenceError::MalformedLine(_))));
    }

    #[test]
    fn test_latest_date_without_time() {
        assert_eq!(latest_date("a b c [18/Oct/2026]").unwrap(), "18/Oct/2026");
    }

    #[test]
    fn test_reference_line_skips_trailing_blank() {
        let lines = vec!["first".to_string(), "second".to_string(), String::new()];
        assert_eq!(reference_line(&lines), Some("second"));
    }

    #[test]
    fn test_reference_line_single_line() {
        let lines = vec!["only".to_string()];
        assert_eq!(reference_line(&lines), Some("only"));
        assert_eq!(reference_line(&[]), None);
    }

    #[test]
    fn test_window_selects_latest_day() {
        let lines = vec![
            line("10.0.0.1", "17/Oct/2026"),
            line("10.0.0.2", "18/Oct/2026"),
            line("10.0.0.3", "18/Oct/2026"),
            String::new(),
        ];
        let window = LogWindow::select(&lines).unwrap();
        assert_eq!(window.reference_date, "18/Oct/2026");
        assert_eq!(window.len(), 2);
        assert!(window.lines().iter().all(|l| !l.starts_with("10.0.0.1 ")));
    }

    #[test]
    fn test_window_malformed_reference_line() {
        let lines = vec![line("10.0.0.1", "18/Oct/2026"), "garbage".to_string(), String::new()];
        assert!(matches!(
            LogWindow::select(&lines),
            Err(NdefenceError::MalformedLine(_))
        ));
    }

    #[test]
    fn test_tokenize_file_real() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("access.log");
        std::fs::write(&path, "a\nb\n").unwrap();

        let lines = tokenize_file(&RealFileSystem, &path).unwrap();
        assert_eq!(lines, vec!["a", "b", ""]);
    }

    #[test]
    fn test_tokenize_file_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("access.log");
        std::fs::write(&path, "").unwrap();

        let result = tokenize_file(&RealFileSystem, &path);
        assert!(matches!(result, Err(NdefenceError::EmptyLog(_))));
    }

    #[test]
    fn test_tokenize_file_unreadable() {
        let mut mock = MockFileSystem::new();
        mock.expect_read_to_string()
            .returning(|_| Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")));

        let result = tokenize_file(&mock, Path::new("/var/log/nginx/access.log"));
        assert!(matches!(result, Err(NdefenceError::FileSystem(_))));
    }
}
