//! Line-oriented input: files or stdin, one record per line.

use std::io::{self, BufRead};
use std::path::Path;

/// Open `path` for line reading; `-` is stdin.
pub fn open(path: &Path) -> io::Result<Box<dyn BufRead>> {
    if path.to_str() == Some("-") {
        return Ok(Box::new(io::stdin().lock()));
    }
    let f = std::fs::File::open(path)?;
    Ok(Box::new(io::BufReader::new(f)))
}

/// Non-empty, non-comment lines with their 1-based line numbers.
pub fn records(reader: impl BufRead) -> impl Iterator<Item = (usize, String)> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(i, line)| line.ok().map(|l| (i + 1, l)))
        .filter_map(|(n, line)| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                None
            } else {
                Some((n, trimmed.to_string()))
            }
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
