//! pulldown-cmark pass: first level-1 heading and byte ranges where
//! inline syntax must not be interpreted (code blocks, inline code, HTML).

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use std::ops::Range;

/// Byte ranges excluded from regex scanning
#[derive(Debug, Default, Clone)]
pub(crate) struct ExcludedRanges {
    ranges: Vec<Range<usize>>,
}

impl ExcludedRanges {
    /// Check if a byte offset falls within any excluded range.
    pub(crate) fn contains(&self, offset: usize) -> bool {
        let idx = self.ranges.partition_point(|r| r.start <= offset);
        idx > 0 && offset < self.ranges[idx - 1].end
    }

    pub(crate) fn add(&mut self, range: Range<usize>) {
        if !range.is_empty() {
            self.ranges.push(range);
        }
    }

    /// Sort and merge overlapping ranges so `contains` can binary search.
    pub(crate) fn optimize(&mut self) {
        self.ranges.sort_by_key(|r| r.start);

        let mut merged: Vec<Range<usize>> = Vec::with_capacity(self.ranges.len());
        for range in self.ranges.drain(..) {
            match merged.last_mut() {
                Some(current) if range.start <= current.end => {
                    current.end = current.end.max(range.end);
                }
                _ => merged.push(range),
            }
        }
        self.ranges = merged;
    }
}

/// Structural facts about a markdown body
#[derive(Debug, Default)]
pub(crate) struct MarkdownScan {
    pub first_heading: Option<String>,
    pub excluded: ExcludedRanges,
}

/// Walk the body once with pulldown-cmark.
pub(crate) fn scan(body: &str) -> MarkdownScan {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);

    let mut result = MarkdownScan::default();
    let mut code_block_start: Option<usize> = None;
    let mut in_h1 = false;
    let mut heading_text = String::new();

    for (event, range) in Parser::new_ext(body, opts).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(_)) => {
                code_block_start = Some(range.start);
            }
            Event::End(TagEnd::CodeBlock) => {
                let start = code_block_start.take().unwrap_or(range.start);
                result.excluded.add(start..range.end);
            }
            Event::Code(text) => {
                result.excluded.add(range.clone());
                if in_h1 {
                    heading_text.push_str(&text);
                }
            }
            Event::Html(_) | Event::InlineHtml(_) => {
                result.excluded.add(range);
            }

            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) if result.first_heading.is_none() => {
                in_h1 = true;
                heading_text.clear();
            }
            Event::End(TagEnd::Heading(HeadingLevel::H1)) if in_h1 => {
                in_h1 = false;
                let text = heading_text.trim();
                if !text.is_empty() {
                    result.first_heading = Some(text.to_string());
                }
            }
            Event::Text(text) if in_h1 => {
                heading_text.push_str(&text);
            }
            Event::SoftBreak | Event::HardBreak if in_h1 => {
                heading_text.push(' ');
            }
            _ => {}
        }
    }

    result.excluded.optimize();
    result
}
