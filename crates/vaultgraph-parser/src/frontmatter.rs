//! Leading `---` YAML block extraction.

use regex::Regex;
use std::sync::LazyLock;
use vaultgraph_core::Metadata;

/// Leading `---` ... `---` block; the closing fence must sit on its own line.
static FRONT_MATTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A---[ \t]*\r?\n(?s:(.*?)\r?\n)?---[ \t]*(?:\r?\n|\z)")
        .expect("front matter pattern is valid")
});

/// Result of splitting a document into front matter and body
#[derive(Debug)]
pub(crate) struct Split<'a> {
    pub metadata: Metadata,
    pub body: &'a str,
    pub warning: Option<String>,
}

/// Split `content` into its front-matter map and body.
///
/// A block that fails to parse as a YAML mapping stays in the body and
/// yields a warning instead of an error.
pub(crate) fn split(content: &str) -> Split<'_> {
    let Some(caps) = FRONT_MATTER.captures(content) else {
        return Split {
            metadata: Metadata::new(),
            body: content,
            warning: None,
        };
    };

    let block_end = caps.get(0).map_or(0, |m| m.end());
    let yaml = caps.get(1).map_or("", |m| m.as_str());

    match serde_yaml::from_str::<serde_json::Value>(yaml) {
        Ok(serde_json::Value::Object(map)) => Split {
            metadata: map,
            body: &content[block_end..],
            warning: None,
        },
        Ok(serde_json::Value::Null) => Split {
            metadata: Metadata::new(),
            body: &content[block_end..],
            warning: None,
        },
        Ok(other) => Split {
            metadata: Metadata::new(),
            body: content,
            warning: Some(format!(
                "front matter is not a mapping ({}), kept as body text",
                value_kind(&other)
            )),
        },
        Err(e) => Split {
            metadata: Metadata::new(),
            body: content,
            warning: Some(format!("malformed front matter kept as body text: {}", e)),
        },
    }
}

fn value_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_block() {
        let split = split("---\ntitle: Hello\ntags: [a, b]\n---\n# Body\n");
        assert_eq!(split.metadata["title"], "Hello");
        assert_eq!(split.body, "# Body\n");
        assert!(split.warning.is_none());
    }

    #[test]
    fn test_key_order_preserved() {
        let split = split("---\nzeta: 1\nalpha: 2\n---\n");
        let keys: Vec<_> = split.metadata.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(split.body, "");
    }

    #[test]
    fn test_empty_block() {
        let split = split("---\n---\nbody");
        assert!(split.metadata.is_empty());
        assert_eq!(split.body, "body");
    }

    #[test]
    fn test_no_block() {
        let content = "plain text\n---\nnot: front matter\n---\n";
        let split = split(content);
        assert!(split.metadata.is_empty());
        assert_eq!(split.body, content);
    }

    #[test]
    fn test_malformed_block_kept_in_body() {
        let content = "---\ntitle: [unclosed\n---\ntext";
        let split = split(content);
        assert!(split.metadata.is_empty());
        assert_eq!(split.body, content);
        assert!(split.warning.is_some());
    }

    #[test]
    fn test_non_mapping_block_kept_in_body() {
        let content = "---\n- a\n- b\n---\ntext";
        let split = split(content);
        assert_eq!(split.body, content);
        assert!(split.warning.unwrap().contains("list"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let split = split("---\r\ntitle: Win\r\n---\r\nbody");
        assert_eq!(split.metadata["title"], "Win");
        assert_eq!(split.body, "body");
    }
}
