//! Markdown structure parsing seam.
//!
//! The cache consumes heading lists and tables of contents through the
//! [`StructureParser`] trait and relies only on its contract: slugs are
//! stable and unique (duplicate titles already disambiguated), and
//! `parent_index` links each heading to the closest shallower heading.
//! [`HeadingScanner`] is the built-in implementation.

mod front_matter;
mod scanner;

pub use front_matter::FrontMatter;
pub use scanner::HeadingScanner;

use crate::Result;
use crate::models::{Heading, TocNode};

/// Produces document structure from Markdown text.
pub trait StructureParser: Send + Sync {
    /// Lists headings in document order.
    ///
    /// # Errors
    ///
    /// Returns an error if the document exceeds structural limits.
    fn list_headings(&self, text: &str) -> Result<Vec<Heading>>;

    /// Builds the hierarchical table of contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the document exceeds structural limits.
    fn build_toc(&self, text: &str) -> Result<Vec<TocNode>>;
}
