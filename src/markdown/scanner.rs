//! ATX heading scanner.
//!
//! A line-oriented scanner that is fenced-code aware and produces
//! GitHub-style slugs with duplicate disambiguation.

use crate::markdown::StructureParser;
use crate::models::{Heading, TocNode};
use crate::{Error, Result};
use std::collections::HashSet;

/// Built-in [`StructureParser`] implementation.
#[derive(Debug, Clone)]
pub struct HeadingScanner {
    /// Maximum headings accepted per document.
    max_headings: usize,
    /// Maximum heading title length in characters.
    max_title_len: usize,
}

impl Default for HeadingScanner {
    fn default() -> Self {
        Self {
            max_headings: 1000,
            max_title_len: 200,
        }
    }
}

impl HeadingScanner {
    /// Creates a scanner with explicit structural limits.
    #[must_use]
    pub const fn new(max_headings: usize, max_title_len: usize) -> Self {
        Self {
            max_headings,
            max_title_len,
        }
    }

    fn scan(&self, text: &str) -> Result<Vec<Heading>> {
        let mut headings = Vec::new();
        let mut issued_slugs: HashSet<String> = HashSet::new();
        let mut in_fence = false;

        for (line_no, line) in text.lines().enumerate() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
                continue;
            }
            if in_fence {
                continue;
            }

            let Some((depth, title)) = parse_atx_line(trimmed) else {
                continue;
            };

            let char_len = title.chars().count();
            if char_len > self.max_title_len {
                return Err(Error::LimitExceeded {
                    what: "heading title length",
                    actual: char_len,
                    limit: self.max_title_len,
                });
            }

            let index = headings.len();
            if index >= self.max_headings {
                return Err(Error::LimitExceeded {
                    what: "heading count",
                    actual: index + 1,
                    limit: self.max_headings,
                });
            }

            // Disambiguate against every slug issued so far, not just the
            // same base: "a", "a", "a 1" must not collide on "a-1".
            let base_slug = slugify(&title);
            let mut slug = base_slug.clone();
            let mut suffix = 1;
            while !issued_slugs.insert(slug.clone()) {
                slug = format!("{base_slug}-{suffix}");
                suffix += 1;
            }

            let parent_index = headings
                .iter()
                .rev()
                .find(|h: &&Heading| h.depth < depth)
                .map(|h| h.index);

            headings.push(Heading {
                index,
                depth,
                title,
                slug,
                parent_index,
                line: line_no,
            });
        }

        Ok(headings)
    }
}

impl StructureParser for HeadingScanner {
    fn list_headings(&self, text: &str) -> Result<Vec<Heading>> {
        self.scan(text)
    }

    fn build_toc(&self, text: &str) -> Result<Vec<TocNode>> {
        let headings = self.scan(text)?;
        Ok(build_tree(&headings))
    }
}

/// Parses one ATX heading line into (depth, title).
fn parse_atx_line(line: &str) -> Option<(u8, String)> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    // Strip an optional closing hash run ("## Title ##"), but leave
    // trailing hashes that are part of the title ("## C#").
    let mut title = rest.trim();
    let stripped = title.trim_end_matches('#');
    if stripped.is_empty() || stripped.ends_with(char::is_whitespace) {
        title = stripped.trim_end();
    }
    let title = title.to_string();
    if title.is_empty() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some((hashes as u8, title))
}

/// Produces a GitHub-style slug from a heading title.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

/// Folds a flat heading list into a hierarchy by depth.
fn build_tree(headings: &[Heading]) -> Vec<TocNode> {
    let mut roots: Vec<TocNode> = Vec::new();
    // Stack of (depth, child-path index trail) replaced by a simpler
    // recursive fold over parent depth tracking.
    let mut stack: Vec<(u8, usize)> = Vec::new();

    for heading in headings {
        let node = TocNode {
            title: heading.title.clone(),
            slug: heading.slug.clone(),
            depth: heading.depth,
            children: Vec::new(),
        };

        while let Some(&(depth, _)) = stack.last() {
            if depth >= heading.depth {
                stack.pop();
            } else {
                break;
            }
        }

        if stack.is_empty() {
            roots.push(node);
            stack.push((heading.depth, roots.len() - 1));
        } else {
            let parent = {
                let mut current: &mut Vec<TocNode> = &mut roots;
                for &(_, idx) in &stack[..stack.len() - 1] {
                    current = &mut current[idx].children;
                }
                let &(_, last_idx) = stack.last().unwrap_or(&(0, 0));
                &mut current[last_idx].children
            };
            parent.push(node);
            stack.push((heading.depth, parent.len() - 1));
        }
    }

    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
# Overview

Intro text.

## Setup

```bash
# not a heading
```

## Setup

### Details
";

    #[test]
    fn test_list_headings_skips_fenced_code() {
        let scanner = HeadingScanner::default();
        let headings = scanner.list_headings(DOC).unwrap();
        let titles: Vec<_> = headings.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["Overview", "Setup", "Setup", "Details"]);
    }

    #[test]
    fn test_duplicate_titles_get_unique_slugs() {
        let scanner = HeadingScanner::default();
        let headings = scanner.list_headings(DOC).unwrap();
        assert_eq!(headings[1].slug, "setup");
        assert_eq!(headings[2].slug, "setup-1");
    }

    #[test]
    fn test_parent_index_links_to_shallower_heading() {
        let scanner = HeadingScanner::default();
        let headings = scanner.list_headings(DOC).unwrap();
        assert_eq!(headings[0].parent_index, None);
        assert_eq!(headings[1].parent_index, Some(0));
        assert_eq!(headings[3].parent_index, Some(2));
    }

    #[test]
    fn test_heading_count_limit() {
        let scanner = HeadingScanner::new(2, 200);
        let text = "# A\n# B\n# C\n";
        let err = scanner.list_headings(text).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::LimitExceeded {
                what: "heading count",
                ..
            }
        ));
    }

    #[test]
    fn test_title_length_limit() {
        let scanner = HeadingScanner::new(10, 5);
        let err = scanner.list_headings("# A very long title\n").unwrap_err();
        assert!(matches!(
            err,
            crate::Error::LimitExceeded {
                what: "heading title length",
                ..
            }
        ));
    }

    #[test]
    fn test_hash_without_space_is_not_a_heading() {
        let scanner = HeadingScanner::default();
        let headings = scanner.list_headings("#hashtag\n# Real\n").unwrap();
        assert_eq!(headings.len(), 1);
        assert_eq!(headings[0].title, "Real");
    }

    #[test]
    fn test_closing_hashes_stripped() {
        let scanner = HeadingScanner::default();
        let headings = scanner.list_headings("## Title ##\n## C#\n").unwrap();
        assert_eq!(headings[0].title, "Title");
        assert_eq!(headings[1].title, "C#");
    }

    #[test]
    fn test_slug_disambiguation_avoids_indirect_collisions() {
        let scanner = HeadingScanner::default();
        let headings = scanner.list_headings("## A\n## A\n## A 1\n").unwrap();
        let slugs: Vec<_> = headings.iter().map(|h| h.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "a-1", "a-1-1"]);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Getting Started"), "getting-started");
        assert_eq!(slugify("API & Tokens!"), "api-tokens");
        assert_eq!(slugify("___"), "section");
    }

    #[test]
    fn test_build_toc_nests_by_depth() {
        let scanner = HeadingScanner::default();
        let toc = scanner.build_toc(DOC).unwrap();
        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].title, "Overview");
        assert_eq!(toc[0].children.len(), 2);
        assert_eq!(toc[0].children[1].children[0].title, "Details");
    }

    #[test]
    fn test_toc_with_skipped_levels() {
        let scanner = HeadingScanner::default();
        let toc = scanner.build_toc("# A\n### Deep\n## Shallow\n").unwrap();
        assert_eq!(toc[0].children.len(), 2);
        assert_eq!(toc[0].children[0].title, "Deep");
        assert_eq!(toc[0].children[1].title, "Shallow");
    }
}
