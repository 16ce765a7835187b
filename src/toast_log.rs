use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

pub const TOAST_LOG_FILE: &str = "toast.log";

/// Append a notification to the log file next to the settings.
pub fn append_toast_log(msg: &str) {
    append_to(Path::new(TOAST_LOG_FILE), msg);
}

pub fn append_to(path: &Path, msg: &str) {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(mut file) => {
            let _ = writeln!(file, "{} - {}", Local::now().to_rfc3339(), msg);
        }
        Err(e) => tracing::debug!(path = %path.display(), "cannot write notification log: {e}"),
    }
}

/// Last `limit` lines of the notification log, oldest first.
pub fn read_recent(path: &Path, limit: usize) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let lines: Vec<String> = content.lines().map(str::to_string).collect();
    let skip = lines.len().saturating_sub(limit);
    lines.into_iter().skip(skip).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn appends_timestamped_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("toast.log");
        append_to(&path, "Widget added");
        append_to(&path, "Widget removed");
        let lines = read_recent(&path, 10);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" - Widget added"));
        assert_eq!(read_recent(&path, 1).len(), 1);
    }

    #[test]
    fn missing_log_reads_as_empty() {
        let dir = tempdir().unwrap();
        assert!(read_recent(&dir.path().join("none.log"), 5).is_empty());
    }
}
