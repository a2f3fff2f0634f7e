//! # vaultgraph parser
//!
//! Turns one raw markdown document into a normalized [`ParsedNote`]:
//! title, front matter, tags, outbound wikilinks, counts and timestamps.
//!
//! The parser is pure: it performs no I/O and never fails. Recoverable
//! oddities (malformed front matter, bad dates) land in
//! [`ParsedNote::warnings`].
//!
//! ## Architecture
//!
//! - Front matter: leading `---` block parsed with `serde_yaml`
//! - pulldown-cmark pass: first level-1 heading, plus code/HTML byte ranges
//! - Regex pass: wikilinks over the whole body, tags outside excluded ranges
//!
//! ## Example
//!
//! ```
//! use vaultgraph_parser::{DocumentParser, FileTimes};
//!
//! let content = "---\ntags: [draft]\n---\n# Weekly Plan\n\nSee [[Goals|my goals]] #work/active\n";
//! let note = DocumentParser::new().parse("plans/week.md", content, FileTimes::now());
//!
//! assert_eq!(note.title, "Weekly Plan");
//! assert!(note.tags.contains("draft"));
//! assert!(note.tags.contains("work/active"));
//! assert_eq!(note.references[0].target, "Goals");
//! ```

mod dates;
mod engine;
mod frontmatter;
mod links;
mod tags;

use chrono::{DateTime, Utc};
use std::path::Path;
use vaultgraph_core::{Metadata, ParsedNote};

pub use vaultgraph_core::RawReference;

/// Filesystem timestamps used when front matter does not override them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimes {
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl FileTimes {
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            created: now,
            modified: now,
        }
    }

    /// Read timestamps from file metadata; creation time falls back to
    /// modification time on filesystems that do not record it.
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let created = metadata
            .created()
            .map(DateTime::<Utc>::from)
            .unwrap_or(modified);
        Self { created, modified }
    }
}

/// Markdown document parser
#[derive(Debug, Clone, Default)]
pub struct DocumentParser;

impl DocumentParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse `content` found at the vault-relative `path`.
    pub fn parse(&self, path: &str, content: &str, times: FileTimes) -> ParsedNote {
        let mut warnings = Vec::new();

        let split = frontmatter::split(content);
        let malformed = split.warning.is_some();
        if let Some(warning) = split.warning {
            log::debug!("{}: {}", path, warning);
            warnings.push(warning);
        }
        let body = split.body;
        let front_matter = split.metadata;

        let scan = engine::scan(body);
        let wikilinks = links::parse_wikilinks(body);

        // `[[#Heading]]` must not read as a tag
        let mut excluded = scan.excluded;
        for link in &wikilinks {
            excluded.add(link.span.clone());
        }
        excluded.optimize();

        let mut tags = tags::front_matter_tags(&front_matter);
        tags.extend(tags::inline_tags(body, &excluded));

        // a rejected front matter block also rules out the heading
        let heading = scan.first_heading.filter(|_| !malformed);
        let title = front_matter_title(&front_matter)
            .or(heading)
            .unwrap_or_else(|| file_stem(path));

        let created_at = dates::resolve(
            "created",
            front_matter.get("created"),
            times.created,
            &mut warnings,
        );
        let (modified_key, modified_value) = match front_matter.get("modified") {
            Some(value) => ("modified", Some(value)),
            None => ("updated", front_matter.get("updated")),
        };
        let modified_at =
            dates::resolve(modified_key, modified_value, times.modified, &mut warnings);

        ParsedNote {
            path: path.to_string(),
            title,
            content: content.to_string(),
            body: body.to_string(),
            word_count: body.split_whitespace().count(),
            char_count: body.chars().count(),
            front_matter,
            tags,
            references: wikilinks.into_iter().map(|l| l.reference).collect(),
            created_at,
            modified_at,
            warnings,
        }
    }
}

fn front_matter_title(front_matter: &Metadata) -> Option<String> {
    let title = match front_matter.get("title")? {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!title.is_empty()).then_some(title)
}

fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
