use thiserror::Error;

use crate::ast::nodes::Declaration;

/// A failure reported by the concrete-syntax parser.
#[derive(Debug, Error)]
#[error("parse error: {0}")]
pub struct ParseError(pub String);

/// The boundary to the concrete-syntax parser.
///
/// Resolution never lexes or parses source text itself; it re-enters the
/// parser only to load an included header.
pub trait DocumentParser {
    /// Parse one document's source text into its declaration list.
    fn parse(&self, source: &str) -> Result<Vec<Declaration>, ParseError>;
}

/// Parser for pre-parsed declaration documents stored as JSON, the format
/// the front-end pipeline hands to `cartac`.
#[derive(Debug, Default)]
pub struct JsonParser;

impl DocumentParser for JsonParser {
    fn parse(&self, source: &str) -> Result<Vec<Declaration>, ParseError> {
        serde_json::from_str(source).map_err(|e| ParseError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_parser_reads_a_declaration_list() {
        let decls = JsonParser
            .parse(r#"[{"kind": "namespace", "name": "files"}]"#)
            .unwrap();
        assert_eq!(decls.len(), 1);
    }

    #[test]
    fn json_parser_reports_malformed_input() {
        assert!(JsonParser.parse("{not json").is_err());
    }
}
