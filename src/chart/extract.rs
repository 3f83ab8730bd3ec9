//! Fenced code block extraction from model responses.

use regex::Regex;

/// Return the body of the first fenced code block in `text`.
///
/// The opening fence may carry a language tag (```json, ```python). Blocks
/// with an empty body count as absent.
pub fn extract_code_block(text: &str) -> Option<String> {
    let re = Regex::new(r"(?s)```[\w+-]*[ \t]*\r?\n(.*?)```").ok()?;

    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|body| body.as_str().trim().to_string())
        .filter(|body| !body.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_tagged_block() {
        let text = "Here you go:\n```json\n{\"chart_type\": \"bar\"}\n```\nEnjoy!";
        assert_eq!(
            extract_code_block(text).as_deref(),
            Some("{\"chart_type\": \"bar\"}")
        );
    }

    #[test]
    fn test_extracts_untagged_block() {
        let text = "```\nline one\nline two\n```";
        assert_eq!(extract_code_block(text).as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn test_first_block_wins() {
        let text = "```json\n{\"a\": 1}\n```\nand\n```json\n{\"b\": 2}\n```";
        assert_eq!(extract_code_block(text).as_deref(), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_no_block() {
        assert_eq!(extract_code_block("I cannot draw charts, sorry."), None);
        assert_eq!(extract_code_block("Error: API error 401: unauthorized"), None);
        assert_eq!(extract_code_block("```json {\"inline\": true}```"), None);
    }

    #[test]
    fn test_empty_block_counts_as_absent() {
        assert_eq!(extract_code_block("```json\n   \n```"), None);
    }

    #[test]
    fn test_windows_line_endings() {
        let text = "```json\r\n{\"x\": 1}\r\n```";
        assert_eq!(extract_code_block(text).as_deref(), Some("{\"x\": 1}"));
    }
}
