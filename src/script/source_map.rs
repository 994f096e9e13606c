//! Line attribution for expanded scripts.
//!
//! Each macro expansion contributes a map from its line span in the
//! expanded `deploy.sql` back to the original file and line. The
//! orchestrator merges expansion maps at their splice offsets and consults
//! the result when the server reports an error position.

/// One contiguous attribution range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMapEntry {
    /// First expanded line covered, 1-based, inclusive.
    pub expanded_start: u32,
    /// Last expanded line covered, 1-based, inclusive.
    pub expanded_end: u32,
    /// Original file the range maps to.
    pub file: String,
    /// Original 1-based line within the file.
    pub line: u32,
    /// Human description of the mapped region.
    pub description: String,
}

/// An ordered collection of attribution ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    entries: Vec<SourceMapEntry>,
}

impl SourceMap {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds an attribution range.
    pub fn add(
        &mut self,
        expanded_start: u32,
        expanded_end: u32,
        file: impl Into<String>,
        line: u32,
        description: impl Into<String>,
    ) {
        self.entries.push(SourceMapEntry {
            expanded_start,
            expanded_end,
            file: file.into(),
            line,
            description: description.into(),
        });
    }

    /// Appends another map with its expanded ranges shifted by
    /// `line_offset`.
    pub fn merge(&mut self, other: Self, line_offset: u32) {
        for entry in other.entries {
            self.entries.push(SourceMapEntry {
                expanded_start: entry.expanded_start.saturating_add(line_offset),
                expanded_end: entry.expanded_end.saturating_add(line_offset),
                ..entry
            });
        }
    }

    /// Resolves an expanded line to `(file, line, description)`.
    ///
    /// Resolution is a linear scan; the first covering entry wins.
    #[must_use]
    pub fn resolve(&self, expanded_line: u32) -> Option<(&str, u32, &str)> {
        self.entries
            .iter()
            .find(|entry| {
                (entry.expanded_start..=entry.expanded_end).contains(&expanded_line)
            })
            .map(|entry| (entry.file.as_str(), entry.line, entry.description.as_str()))
    }
}
