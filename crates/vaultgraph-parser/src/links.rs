//! Wikilink extraction: `[[target]]` and `[[target|display]]`.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;
use vaultgraph_core::RawReference;

/// Target stops at the first `|` or `]`; display runs to the closing brackets.
static WIKILINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([^\]|]+)(?:\|([^\]]+))?\]\]").expect("wikilink pattern is valid")
});

/// A wikilink occurrence with its byte span in the scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WikiLink {
    pub reference: RawReference,
    pub span: Range<usize>,
}

/// Extract wikilinks in document order.
///
/// Embeds (`![[...]]`) count as references too. Blank targets are skipped.
pub(crate) fn parse_wikilinks(text: &str) -> Vec<WikiLink> {
    if !text.contains("[[") {
        return Vec::new();
    }

    WIKILINK
        .captures_iter(text)
        .filter_map(|caps| {
            let span = caps.get(0)?.range();
            let target = caps.get(1)?.as_str().trim();
            if target.is_empty() {
                return None;
            }
            let display = caps
                .get(2)
                .map(|m| m.as_str().trim())
                .filter(|d| !d.is_empty())
                .map(str::to_string);

            Some(WikiLink {
                reference: RawReference {
                    target: target.to_string(),
                    display,
                },
                span,
            })
        })
        .collect()
}
