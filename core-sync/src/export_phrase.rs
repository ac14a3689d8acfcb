//! # Export Phrases
//!
//! Export folders name the files they write from a phrase such as
//! `{hash} - (character) [series]`. A phrase mixes literal text with three
//! kinds of span:
//!
//! - `[namespace]` - the file's current tags in that namespace, prefix
//!   stripped, joined with `", "`
//! - `{predicate}` - a computed value: `hash`, `tags` or `nn tags`
//! - `(tag)` - the tag itself, if the file carries it
//!
//! Spans are found in three passes, `[]` first, then `{}`, then `()`. Each
//! pass only splits the literal text left by the previous one, so a span
//! never contains another span's delimiters after parsing.
//!
//! ## Usage
//!
//! ```ignore
//! use core_sync::export_phrase::{parse_export_phrase, render_export_filename, FilenameRules};
//!
//! let terms = parse_export_phrase("{hash} - [series]")?;
//! let filename = render_export_filename(&terms, &record, FilenameRules::host());
//! ```

use crate::error::{Result, SyncError};
use core_library::models::{strip_namespace, MediaRecord};

/// One parsed piece of an export phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTerm {
    Literal(String),
    Namespace(String),
    Predicate(String),
    Tag(String),
}

/// Which characters a destination filesystem rejects in filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenameRules {
    /// `\ / : * ? " < > |`
    Windows,
    /// `/` only
    Posix,
}

impl FilenameRules {
    /// Rules for the filesystem this process runs on.
    pub fn host() -> Self {
        if cfg!(windows) {
            FilenameRules::Windows
        } else {
            FilenameRules::Posix
        }
    }

    fn is_reserved(self, c: char) -> bool {
        match self {
            FilenameRules::Windows => {
                matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
            }
            FilenameRules::Posix => c == '/',
        }
    }
}

const SPANS: [(char, char, fn(String) -> ExportTerm); 3] = [
    ('[', ']', ExportTerm::Namespace),
    ('{', '}', ExportTerm::Predicate),
    ('(', ')', ExportTerm::Tag),
];

/// Parse a phrase into terms, in phrase order.
///
/// Fails with [`SyncError::Phrase`] when a delimiter is left unclosed, a
/// closing delimiter has no opener, or a span of one kind is opened twice.
/// Empty literal fragments are dropped.
pub fn parse_export_phrase(phrase: &str) -> Result<Vec<ExportTerm>> {
    let mut terms = vec![ExportTerm::Literal(phrase.to_string())];

    for (open, close, make) in SPANS {
        let mut split = Vec::with_capacity(terms.len());

        for term in terms {
            match term {
                ExportTerm::Literal(text) => split_spans(phrase, &text, open, close, make, &mut split)?,
                typed => split.push(typed),
            }
        }

        terms = split;
    }

    Ok(terms)
}

fn split_spans(
    phrase: &str,
    text: &str,
    open: char,
    close: char,
    make: fn(String) -> ExportTerm,
    out: &mut Vec<ExportTerm>,
) -> Result<()> {
    let malformed = |reason: String| SyncError::Phrase {
        phrase: phrase.to_string(),
        reason,
    };

    let mut rest = text;

    while let Some(start) = rest.find(open) {
        let before = &rest[..start];
        if before.contains(close) {
            return Err(malformed(format!("'{}' without a matching '{}'", close, open)));
        }
        push_literal(before, out);

        let after = &rest[start + open.len_utf8()..];
        let end = after
            .find(close)
            .ok_or_else(|| malformed(format!("'{}' is never closed", open)))?;

        let inner = &after[..end];
        if inner.contains(open) {
            return Err(malformed(format!("'{}' cannot be nested", open)));
        }
        out.push(make(inner.to_string()));

        rest = &after[end + close.len_utf8()..];
    }

    if rest.contains(close) {
        return Err(malformed(format!("'{}' without a matching '{}'", close, open)));
    }
    push_literal(rest, out);

    Ok(())
}

fn push_literal(text: &str, out: &mut Vec<ExportTerm>) {
    if !text.is_empty() {
        out.push(ExportTerm::Literal(text.to_string()));
    }
}

/// Build the destination filename for `record`.
///
/// The rendered terms are sanitised for `rules` and the record's mime
/// extension is appended afterwards.
pub fn render_export_filename(
    terms: &[ExportTerm],
    record: &MediaRecord,
    rules: FilenameRules,
) -> String {
    let mut filename = String::new();

    for term in terms {
        match term {
            ExportTerm::Literal(text) => filename.push_str(text),
            ExportTerm::Namespace(namespace) => {
                let subtags: Vec<&str> = record
                    .tags
                    .namespace_slice(namespace)
                    .into_iter()
                    .map(strip_namespace)
                    .collect();
                filename.push_str(&subtags.join(", "));
            }
            ExportTerm::Predicate(predicate) => render_predicate(predicate, record, &mut filename),
            ExportTerm::Tag(tag) => {
                let subtag = strip_namespace(tag);
                if record.tags.has_tag(subtag) {
                    filename.push_str(subtag);
                }
            }
        }
    }

    let mut filename = sanitize_filename(&filename, rules);
    filename.push_str(record.mime.extension());
    filename
}

fn render_predicate(predicate: &str, record: &MediaRecord, filename: &mut String) {
    match predicate {
        "hash" => filename.push_str(&record.hash.to_hex()),
        "tags" => {
            let mut tags: Vec<&str> = record
                .tags
                .combined()
                .into_iter()
                .map(strip_namespace)
                .collect();
            tags.sort_unstable();
            filename.push_str(&tags.join(", "));
        }
        "nn tags" | "nn-tags" => {
            let tags: Vec<&str> = record
                .tags
                .combined()
                .into_iter()
                .filter(|tag| !tag.contains(':'))
                .collect();
            filename.push_str(&tags.join(", "));
        }
        _ => {}
    }
}

/// Replace every character `rules` reserves with `_`.
pub fn sanitize_filename(filename: &str, rules: FilenameRules) -> String {
    filename
        .chars()
        .map(|c| if rules.is_reserved(c) { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_library::{ContentHash, Mime, TagsView};
    use std::collections::HashMap;

    fn literal(s: &str) -> ExportTerm {
        ExportTerm::Literal(s.to_string())
    }

    fn record(current: &[&str], pending: &[&str]) -> MediaRecord {
        MediaRecord::new(
            ContentHash::digest(b"hello"),
            Mime::Jpeg,
            5,
            TagsView::new(current.iter().copied(), pending.iter().copied()),
        )
    }

    #[test]
    fn test_parse_splits_spans_in_order() {
        let terms = parse_export_phrase("a[b]c{d}e(f)g").unwrap();

        assert_eq!(
            terms,
            vec![
                literal("a"),
                ExportTerm::Namespace("b".to_string()),
                literal("c"),
                ExportTerm::Predicate("d".to_string()),
                literal("e"),
                ExportTerm::Tag("f".to_string()),
                literal("g"),
            ]
        );
    }

    #[test]
    fn test_parse_does_not_resplit_typed_terms() {
        let terms = parse_export_phrase("[a(b){c}]").unwrap();
        assert_eq!(terms, vec![ExportTerm::Namespace("a(b){c}".to_string())]);

        let terms = parse_export_phrase("{x(y)} (z)").unwrap();
        assert_eq!(
            terms,
            vec![
                ExportTerm::Predicate("x(y)".to_string()),
                literal(" "),
                ExportTerm::Tag("z".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_plain_text() {
        assert_eq!(parse_export_phrase("export").unwrap(), vec![literal("export")]);
        assert!(parse_export_phrase("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_unbalanced_delimiters() {
        for phrase in ["[series", "series]", "{hash", "hash}", "(tag", "a)b(c)", "[a[b]"] {
            let err = parse_export_phrase(phrase).unwrap_err();
            assert!(matches!(err, SyncError::Phrase { .. }), "{}", phrase);
        }
    }

    #[test]
    fn test_render_hash() {
        let terms = parse_export_phrase("{hash}").unwrap();
        assert_eq!(terms, vec![ExportTerm::Predicate("hash".to_string())]);

        let filename = render_export_filename(&terms, &record(&[], &[]), FilenameRules::Posix);
        assert_eq!(
            filename,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824.jpg"
        );
    }

    #[test]
    fn test_render_namespace_collapses_siblings() {
        let siblings = HashMap::from([(
            "character:samus".to_string(),
            "character:samus aran".to_string(),
        )]);
        let mut rec = record(&["character:samus", "character:link", "series:metroid"], &[]);
        rec.tags = rec.tags.with_siblings(siblings);

        let terms = parse_export_phrase("[character] - [series] [creator]").unwrap();
        let filename = render_export_filename(&terms, &rec, FilenameRules::Posix);

        assert_eq!(filename, "link, samus aran - metroid .jpg");
    }

    #[test]
    fn test_render_tag_predicates() {
        let rec = record(&["series:metroid", "blue sky"], &["character:samus", "armour"]);

        let tags = parse_export_phrase("{tags}").unwrap();
        assert_eq!(
            render_export_filename(&tags, &rec, FilenameRules::Posix),
            "armour, blue sky, metroid, samus.jpg"
        );

        let nn_tags = parse_export_phrase("{nn tags}").unwrap();
        assert_eq!(
            render_export_filename(&nn_tags, &rec, FilenameRules::Posix),
            "armour, blue sky.jpg"
        );

        let unknown = parse_export_phrase("x{unknown}y").unwrap();
        assert_eq!(render_export_filename(&unknown, &rec, FilenameRules::Posix), "xy.jpg");
    }

    #[test]
    fn test_render_tag_matches_stripped_form() {
        let rec = record(&["blue sky", "samus"], &[]);

        let terms = parse_export_phrase("(blue sky)(character:samus)(red)").unwrap();
        assert_eq!(
            render_export_filename(&terms, &rec, FilenameRules::Posix),
            "blue skysamus.jpg"
        );

        let namespaced_only = record(&["character:samus"], &[]);
        assert_eq!(
            render_export_filename(&terms, &namespaced_only, FilenameRules::Posix),
            ".jpg"
        );
    }

    #[test]
    fn test_windows_rules_leave_no_reserved_characters() {
        let rec = record(&["title:what? <a|b> \"c\" d:e/f\\g*"], &[]);
        let terms = parse_export_phrase("[title]").unwrap();

        let filename = render_export_filename(&terms, &rec, FilenameRules::Windows);
        let stem = filename.trim_end_matches(".jpg");

        assert!(!stem.chars().any(|c| FilenameRules::Windows.is_reserved(c)));
        assert_eq!(stem, "what_ _a_b_ _c_ d_e_f_g_");
    }

    #[test]
    fn test_posix_rules_only_replace_slash() {
        assert_eq!(
            sanitize_filename("a/b:c*d?", FilenameRules::Posix),
            "a_b:c*d?"
        );
    }
}
