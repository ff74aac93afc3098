//! Parsed document structure: headings, table of contents, slug index.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One heading as produced by the structure parser.
///
/// Slugs arrive pre-disambiguated (duplicate titles already resolved to
/// unique slugs), and `parent_index` links each heading to the closest
/// shallower heading above it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// Zero-based position in document order.
    pub index: usize,
    /// Heading depth (1 for `#`, 2 for `##`, ...).
    pub depth: u8,
    /// Heading text without markers.
    pub title: String,
    /// Unique slug for the heading.
    pub slug: String,
    /// Index of the parent heading, if any.
    pub parent_index: Option<usize>,
    /// Zero-based source line the heading starts on.
    pub line: usize,
}

/// One node of the hierarchical table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocNode {
    /// Heading text.
    pub title: String,
    /// Heading slug.
    pub slug: String,
    /// Heading depth.
    pub depth: u8,
    /// Nested child sections.
    pub children: Vec<TocNode>,
}

/// Parsed structure for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentStructure {
    /// Headings in document order.
    pub headings: Vec<Heading>,
    /// Hierarchical table of contents.
    pub toc: Vec<TocNode>,
    /// Slug → heading position, O(1) lookup.
    pub slug_index: HashMap<String, usize>,
}

impl DocumentStructure {
    /// Builds a structure from an ordered heading list and a prebuilt TOC.
    #[must_use]
    pub fn new(headings: Vec<Heading>, toc: Vec<TocNode>) -> Self {
        let slug_index = headings
            .iter()
            .map(|h| (h.slug.clone(), h.index))
            .collect();
        Self {
            headings,
            toc,
            slug_index,
        }
    }

    /// Looks up a heading by slug.
    #[must_use]
    pub fn heading_by_slug(&self, slug: &str) -> Option<&Heading> {
        self.slug_index
            .get(slug)
            .and_then(|&idx| self.headings.get(idx))
    }
}
