//! Source file ingestion.

use std::fs;
use std::io;
use std::path::Path;

/// A source line with its 1-indexed position in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// The line text, without the trailing newline.
    pub text: String,
    /// 1-indexed line number.
    pub number: usize,
}

/// Reads a source file into numbered lines.
///
/// # Errors
///
/// Returns the underlying I/O error when the file cannot be read; such
/// errors are fatal to the run.
pub fn read_lines(path: &Path) -> io::Result<Vec<SourceLine>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .enumerate()
        .map(|(i, text)| SourceLine {
            text: text.to_string(),
            number: i + 1,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_numbered_lines() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("input.asm");
        std::fs::write(&path, "nop\nretn\n").unwrap();

        let lines = read_lines(&path).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "nop");
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[1].text, "retn");
        assert_eq!(lines[1].number, 2);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_lines(Path::new("/nonexistent/input.asm")).is_err());
    }
}
