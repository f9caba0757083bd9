//! Exclusion patterns for skipping paths during the walk

use std::fs;
use std::io;
use std::path::Path;

use glob::Pattern;

/// Glob-based exclusion filter. A pattern containing a `/` is matched
/// against the whole path; any other pattern is matched against the file
/// name alone, so `--exclude='*.o'` skips object files anywhere in the
/// tree.
#[derive(Debug, Default)]
pub struct ExclusionFilter {
    name_patterns: Vec<Pattern>,
    path_patterns: Vec<Pattern>,
}

impl ExclusionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one pattern. Fails on malformed globs (e.g. an unclosed `[`).
    pub fn add(&mut self, pattern: &str) -> Result<(), glob::PatternError> {
        let compiled = Pattern::new(pattern)?;
        if pattern.contains('/') {
            self.path_patterns.push(compiled);
        } else {
            self.name_patterns.push(compiled);
        }
        Ok(())
    }

    /// Add every pattern from a file, one per line. Blank lines and lines
    /// starting with `#` are skipped.
    pub fn add_from_file(&mut self, path: &Path) -> io::Result<()> {
        let text = fs::read_to_string(path)?;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            self.add(line)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        }
        Ok(())
    }

    /// Verdict for one path. Excluded entries are skipped silently, subtree
    /// and all.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if !self.name_patterns.is_empty() {
            if let Some(name) = path.file_name() {
                let name = name.to_string_lossy();
                if self.name_patterns.iter().any(|p| p.matches(&name)) {
                    return true;
                }
            }
        }
        if !self.path_patterns.is_empty() {
            let full = path.to_string_lossy();
            if self.path_patterns.iter().any(|p| p.matches(&full)) {
                return true;
            }
        }
        false
    }
}
