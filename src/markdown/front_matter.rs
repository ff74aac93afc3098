//! YAML front matter parsing.
//!
//! Front matter format:
//! ```text
//! ---
//! keywords: [auth, tokens]
//! ---
//! The actual document content here.
//! ```

use crate::{Error, Result};

/// Parser for YAML front matter in document content.
pub struct FrontMatter;

impl FrontMatter {
    /// The front matter delimiter.
    const DELIMITER: &'static str = "---";

    /// Parses YAML front matter from content.
    ///
    /// Returns the parsed metadata and remaining body. Content without a
    /// leading delimiter yields empty metadata and the original content.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or the closing delimiter
    /// is missing.
    pub fn parse(content: &str) -> Result<(serde_json::Value, String)> {
        let content = content.trim_start();

        if !content.starts_with(Self::DELIMITER) {
            return Ok((
                serde_json::Value::Object(serde_json::Map::new()),
                content.to_string(),
            ));
        }

        let after_first = &content[Self::DELIMITER.len()..];
        let after_first = after_first.trim_start_matches(['\r', '\n']);

        if let Some((yaml_end, body_start)) = Self::find_closing_delimiter(after_first) {
            let yaml_content = after_first[..yaml_end].trim();
            let body = after_first[body_start..].trim_start_matches(['\r', '\n']);

            let metadata: serde_json::Value = serde_yaml_ng::from_str(yaml_content)
                .map_err(|e| Error::InvalidInput(format!("invalid YAML front matter: {e}")))?;

            Ok((metadata, body.to_string()))
        } else {
            Err(Error::InvalidInput(
                "front matter missing closing delimiter".to_string(),
            ))
        }
    }

    /// Finds the closing delimiter line, returning the byte offsets where
    /// the YAML ends and the body begins.
    ///
    /// Only a whole line equal to the delimiter closes the block; a value
    /// containing `---` mid-line must not split the front matter early.
    fn find_closing_delimiter(text: &str) -> Option<(usize, usize)> {
        let mut offset = 0;
        for line in text.split_inclusive('\n') {
            if line.trim_end() == Self::DELIMITER {
                return Some((offset, offset + line.len()));
            }
            offset += line.len();
        }
        None
    }

    /// Returns the body with any front matter removed.
    ///
    /// Lenient variant for extraction paths that must not fail on bad input:
    /// unparsable or unterminated front matter leaves the content untouched.
    #[must_use]
    pub fn body_of(content: &str) -> String {
        Self::parse(content).map_or_else(|_| content.to_string(), |(_, body)| body)
    }

    /// Extracts declared keywords from parsed front matter, if any.
    ///
    /// Accepts a YAML sequence or a comma-separated string. Keywords are
    /// trimmed and lowercased but otherwise passed through verbatim; the
    /// author's declaration is authoritative.
    #[must_use]
    pub fn keywords_of(metadata: &serde_json::Value) -> Option<Vec<String>> {
        let value = metadata.get("keywords")?;
        let keywords: Vec<String> = match value {
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            serde_json::Value::String(s) => s
                .split(',')
                .map(|part| part.trim().to_lowercase())
                .filter(|part| !part.is_empty())
                .collect(),
            _ => return None,
        };

        if keywords.is_empty() {
            None
        } else {
            Some(keywords)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_front_matter() {
        let content = "---\nkeywords: [auth, tokens]\n---\nBody text";
        let (metadata, body) = FrontMatter::parse(content).unwrap();
        assert_eq!(body, "Body text");
        assert_eq!(metadata["keywords"][0], "auth");
    }

    #[test]
    fn test_parse_without_front_matter() {
        let (metadata, body) = FrontMatter::parse("Just a document").unwrap();
        assert!(metadata.as_object().unwrap().is_empty());
        assert_eq!(body, "Just a document");
    }

    #[test]
    fn test_parse_missing_closing_delimiter() {
        let result = FrontMatter::parse("---\nkeywords: [a]\nno closing");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_value_containing_dashes() {
        let content = "---\ntitle: pre---release\nkeywords: [a]\n---\nBody";
        let (metadata, body) = FrontMatter::parse(content).unwrap();
        assert_eq!(metadata["title"], "pre---release");
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_closing_delimiter_must_fill_its_line() {
        // "--- trailing" is a value line, not a closing delimiter.
        let result = FrontMatter::parse("---\nnote: x --- y\nno closing");
        assert!(result.is_err());
    }

    #[test]
    fn test_body_of_is_lenient() {
        let content = "---\n: bad: yaml: [\nno closing";
        assert_eq!(FrontMatter::body_of(content), content);
    }

    #[test]
    fn test_keywords_from_sequence() {
        let (metadata, _) = FrontMatter::parse("---\nkeywords: [Auth, Tokens]\n---\nx").unwrap();
        let keywords = FrontMatter::keywords_of(&metadata).unwrap();
        assert_eq!(keywords, vec!["auth", "tokens"]);
    }

    #[test]
    fn test_keywords_from_comma_string() {
        let (metadata, _) =
            FrontMatter::parse("---\nkeywords: auth, tokens , refresh\n---\nx").unwrap();
        let keywords = FrontMatter::keywords_of(&metadata).unwrap();
        assert_eq!(keywords, vec!["auth", "tokens", "refresh"]);
    }

    #[test]
    fn test_keywords_absent() {
        let (metadata, _) = FrontMatter::parse("---\ntitle: Hello\n---\nx").unwrap();
        assert!(FrontMatter::keywords_of(&metadata).is_none());
    }
}
