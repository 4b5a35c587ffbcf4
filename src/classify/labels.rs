//! Class label files.
//!
//! Teachable Machine exports `labels.txt` with one class per line, each
//! optionally prefixed with its index ("0 Background"). The loader strips
//! the prefix so display text stays clean.

use std::path::Path;

use anyhow::{anyhow, Context, Result};

pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read labels file {}", path.display()))?;
    let labels: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(strip_index_prefix)
        .collect();
    if labels.is_empty() {
        return Err(anyhow!("labels file {} contains no classes", path.display()));
    }
    Ok(labels)
}

fn strip_index_prefix(line: &str) -> String {
    if let Some((head, tail)) = line.split_once(' ') {
        if !head.is_empty() && head.chars().all(|c| c.is_ascii_digit()) {
            return tail.trim().to_string();
        }
    }
    line.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn strips_teachable_machine_index_prefixes() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "0 Background").unwrap();
        writeln!(file, "1 Rubber Duck").unwrap();
        writeln!(file, "Plain Label").unwrap();
        let labels = load_labels(file.path()).unwrap();
        assert_eq!(labels, ["Background", "Rubber Duck", "Plain Label"]);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "cat\n\n  \ndog").unwrap();
        let labels = load_labels(file.path()).unwrap();
        assert_eq!(labels, ["cat", "dog"]);
    }

    #[test]
    fn empty_file_is_an_error() {
        let file = NamedTempFile::new().unwrap();
        assert!(load_labels(file.path()).is_err());
    }
}
