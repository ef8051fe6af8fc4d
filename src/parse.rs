//! Content parser for the two legacy markup dialects.
//!
//! Dialect A is MediaWiki: metadata lives in a `<pre>` preamble block (or
//! before the first `==` heading when the marker is missing), one
//! `Key: value` pair per line, abstract between `==Abstract==` and the next
//! heading. Dialect B is Markdown: metadata lives in a leading `---`
//! front-matter block, abstract between `## Abstract` and the next heading.
//!
//! Parsing is best-effort. Missing fields degrade to defaults in a single
//! resolution step; the only fatal condition is a filename from which no
//! document number can be derived, in which case the record is skipped.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Bip, BipStatus, BipType};

static FILENAME_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-(\d+)\.[^.]+$").unwrap());
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static AUTHOR_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:,|&|\band\b)\s*").unwrap());

/// Metadata as it appears in a preamble, before defaulting.
///
/// Every field is optional here so the defaulting policy lives in one
/// place ([`resolve`]) instead of scattered per-field checks.
#[derive(Debug, Default)]
struct RawMetadata {
    title: Option<String>,
    /// Raw author values, one per preamble line, unsplit.
    authors: Vec<String>,
    status: Option<String>,
    kind: Option<String>,
    created: Option<String>,
    layer: Option<String>,
    replaces: Option<String>,
    replaced_by: Option<String>,
}

enum Dialect {
    MediaWiki,
    Markdown,
}

fn dialect_of(filename: &str) -> Dialect {
    if filename.ends_with(".md") || filename.ends_with(".markdown") {
        Dialect::Markdown
    } else {
        Dialect::MediaWiki
    }
}

/// Derive the document number from a `*-<digits>.<ext>` filename.
pub fn number_from_filename(filename: &str) -> Option<u32> {
    FILENAME_NUMBER_RE
        .captures(filename)
        .and_then(|caps| caps[1].parse::<u32>().ok())
}

/// Parse one raw document. Returns `None` only when the document number
/// cannot be derived from the filename; every other missing field falls
/// back to a default instead of failing the parse.
pub fn parse_bip(raw: &str, filename: &str, source_url: &str) -> Option<Bip> {
    let number = number_from_filename(filename)?;

    let (meta, abstract_text) = match dialect_of(filename) {
        Dialect::MediaWiki => (
            parse_preamble(&mediawiki_preamble(raw)),
            extract_section(
                raw,
                |l| l.starts_with("==") && heading_name(l).eq_ignore_ascii_case("abstract"),
                |l| l.starts_with("=="),
            ),
        ),
        Dialect::Markdown => (
            parse_preamble(&markdown_front_matter(raw)),
            extract_section(
                raw,
                |l| {
                    l.starts_with("##")
                        && l.trim_start_matches('#').trim().eq_ignore_ascii_case("abstract")
                },
                |l| l.starts_with('#'),
            ),
        ),
    };

    Some(resolve(number, meta, abstract_text, raw, filename, source_url))
}

/// Strip `==` fencing from a MediaWiki heading line.
fn heading_name(line: &str) -> &str {
    line.trim_matches('=').trim()
}

/// The Dialect A preamble: lines inside the `<pre>` marker, or everything
/// before the first section heading when no marker exists.
fn mediawiki_preamble(raw: &str) -> Vec<&str> {
    if let Some(start) = raw.find("<pre>") {
        if let Some(end) = raw[start..].find("</pre>") {
            return raw[start + 5..start + end].lines().collect();
        }
    }
    raw.lines()
        .take_while(|l| !l.trim_start().starts_with("=="))
        .collect()
}

/// The Dialect B front-matter block: lines between a leading `---` pair.
/// Returns empty when the block is absent or unterminated.
fn markdown_front_matter(raw: &str) -> Vec<&str> {
    let mut collected = Vec::new();
    let mut started = false;
    for line in raw.lines() {
        let trimmed = line.trim();
        if !started {
            if trimmed.is_empty() {
                continue;
            }
            if trimmed == "---" {
                started = true;
                continue;
            }
            return Vec::new();
        }
        if trimmed == "---" {
            return collected;
        }
        collected.push(line);
    }
    Vec::new()
}

/// Parse `Key: value` preamble lines into [`RawMetadata`].
///
/// Preambles list additional authors on indented lines without a key;
/// those continuation lines extend the author value.
fn parse_preamble(lines: &[&str]) -> RawMetadata {
    let mut meta = RawMetadata::default();
    let mut last_key_author = false;

    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            last_key_author = false;
            continue;
        }

        match trimmed.split_once(':') {
            Some((key, value)) => {
                let key = key.trim().to_lowercase();
                let value = value.trim();
                last_key_author = key == "author";
                if value.is_empty() {
                    continue;
                }
                match key.as_str() {
                    "title" => meta.title = Some(value.to_string()),
                    "author" => meta.authors.push(value.to_string()),
                    "status" => meta.status = Some(value.to_string()),
                    "type" => meta.kind = Some(value.to_string()),
                    "created" => meta.created = Some(value.to_string()),
                    "layer" => meta.layer = Some(value.to_string()),
                    "replaces" => meta.replaces = Some(value.to_string()),
                    "superseded-by" | "replaced-by" => {
                        meta.replaced_by = Some(value.to_string())
                    }
                    _ => {}
                }
            }
            None => {
                if last_key_author {
                    meta.authors.push(trimmed.to_string());
                }
            }
        }
    }

    meta
}

/// Collect the lines between a matching heading and the next heading.
fn extract_section(
    raw: &str,
    is_heading: impl Fn(&str) -> bool,
    is_next: impl Fn(&str) -> bool,
) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut in_section = false;
    for line in raw.lines() {
        let trimmed = line.trim();
        if in_section {
            if is_next(trimmed) {
                break;
            }
            out.push(line);
        } else if is_heading(trimmed) {
            in_section = true;
        }
    }
    out.join("\n").trim().to_string()
}

/// Apply the defaulting policy and assemble the final document.
fn resolve(
    number: u32,
    meta: RawMetadata,
    abstract_text: String,
    raw: &str,
    filename: &str,
    source_url: &str,
) -> Bip {
    let authors = split_authors(&meta.authors);

    Bip {
        number,
        title: meta.title.unwrap_or_else(|| format!("BIP {}", number)),
        authors: if authors.is_empty() {
            vec!["Unknown".to_string()]
        } else {
            authors
        },
        status: meta
            .status
            .map(|s| BipStatus::from_text(&s))
            .unwrap_or(BipStatus::Draft),
        kind: meta
            .kind
            .map(|s| BipType::from_text(&s))
            .unwrap_or(BipType::StandardsTrack),
        created: meta.created.unwrap_or_default(),
        layer: meta.layer,
        abstract_text,
        content: raw.to_string(),
        explanation: None,
        source_filename: filename.to_string(),
        source_url: source_url.to_string(),
        replaces: meta
            .replaces
            .map(|v| parse_number_list(&v))
            .unwrap_or_default(),
        replaced_by: meta
            .replaced_by
            .map(|v| parse_number_list(&v))
            .unwrap_or_default(),
        categories: Vec::new(),
    }
}

/// Split raw author values on comma, `&`, and the word `and`, stripping
/// angle-bracket email addresses and dropping empty segments.
fn split_authors(values: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    for value in values {
        for part in AUTHOR_SPLIT_RE.split(value) {
            let name = EMAIL_RE.replace_all(part, "");
            let name = name.trim();
            if !name.is_empty() {
                out.push(name.to_string());
            }
        }
    }
    out
}

/// Parse a comma-separated list of document numbers, dropping anything
/// that does not parse.
fn parse_number_list(value: &str) -> Vec<u32> {
    value
        .split(',')
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .collect()
}
