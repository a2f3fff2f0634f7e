//! Tag extraction from front matter and inline `#tag` tokens.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use vaultgraph_core::Metadata;

use crate::engine::ExcludedRanges;

/// `#tag` or `#parent/child`, at line start or after whitespace, `(`, `[` or `,`
static INLINE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?:^|[\s(\[,])#([A-Za-z0-9_/\-]+)").expect("tag pattern is valid")
});

/// Normalize a front-matter tag entry
fn clean(tag: &str) -> Option<String> {
    let tag = tag.trim().trim_start_matches('#').trim();
    (!tag.is_empty()).then(|| tag.to_string())
}

/// Tags declared under the `tags` key: a YAML list or a comma-separated string.
pub(crate) fn front_matter_tags(metadata: &Metadata) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();

    match metadata.get("tags") {
        Some(serde_json::Value::Array(items)) => {
            for item in items {
                let text = match item {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Bool(b) => b.to_string(),
                    _ => continue,
                };
                tags.extend(clean(&text));
            }
        }
        Some(serde_json::Value::String(list)) => {
            tags.extend(list.split(',').filter_map(clean));
        }
        Some(serde_json::Value::Number(n)) => {
            tags.extend(clean(&n.to_string()));
        }
        _ => {}
    }

    tags
}

/// Inline tags in `body`, skipping excluded byte ranges.
pub(crate) fn inline_tags(body: &str, excluded: &ExcludedRanges) -> BTreeSet<String> {
    if !body.contains('#') {
        return BTreeSet::new();
    }

    INLINE_TAG
        .captures_iter(body)
        .filter_map(|caps| {
            let name = caps.get(1)?;
            // the `#` sits right before the captured name
            if excluded.contains(name.start() - 1) {
                return None;
            }
            let name = name.as_str().trim_end_matches('/');
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(value: serde_json::Value) -> Metadata {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_front_matter_list() {
        let tags = front_matter_tags(&metadata(json!({"tags": ["#project", " review ", 2024]})));
        assert_eq!(
            tags.into_iter().collect::<Vec<_>>(),
            vec!["2024", "project", "review"]
        );
    }

    #[test]
    fn test_front_matter_comma_string() {
        let tags = front_matter_tags(&metadata(json!({"tags": "a, #b,, c/d"})));
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["a", "b", "c/d"]);
    }

    #[test]
    fn test_front_matter_missing_or_odd() {
        assert!(front_matter_tags(&Metadata::new()).is_empty());
        assert!(front_matter_tags(&metadata(json!({"tags": {"x": 1}}))).is_empty());
    }

    #[test]
    fn test_inline_tags() {
        let body = "#rust at start, then #work/active and (#paren) [#bracket],#comma";
        let tags = inline_tags(body, &ExcludedRanges::default());
        assert_eq!(
            tags.into_iter().collect::<Vec<_>>(),
            vec!["bracket", "comma", "paren", "rust", "work/active"]
        );
    }

    #[test]
    fn test_headings_and_fragments_are_not_tags() {
        let body = "# Heading\n## Sub\nhttp://x.org/page#frag and word#inner";
        assert!(inline_tags(body, &ExcludedRanges::default()).is_empty());
    }

    #[test]
    fn test_excluded_ranges_skipped() {
        let body = "#keep `#code`";
        let mut excluded = ExcludedRanges::default();
        let start = body.find('`').unwrap();
        excluded.add(start..body.len());
        excluded.optimize();
        let tags = inline_tags(body, &excluded);
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["keep"]);
    }

    #[test]
    fn test_tags_case_sensitive() {
        let tags = inline_tags("#Rust #rust", &ExcludedRanges::default());
        assert_eq!(tags.len(), 2);
    }
}
