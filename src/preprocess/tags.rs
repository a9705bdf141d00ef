//! Opening-tag scanner for the textual passes.
//!
//! Finds `<name ...>` spans in raw template text without being fooled by
//! `>` inside quoted values or mustaches, and records where each mustache in
//! the tag sits.

use crate::parse::find_mustache_end;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MustacheSpan {
    /// Offsets relative to the tag start, covering the braces.
    pub start: usize,
    pub end: usize,
    /// Inside a quoted value or directly after `=`.
    pub in_value: bool,
}

impl MustacheSpan {
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningTag {
    /// Absolute offset of `<`.
    pub start: usize,
    /// Absolute offset just past `>`.
    pub end: usize,
    pub mustaches: Vec<MustacheSpan>,
}

impl OpeningTag {
    pub fn text<'a>(&self, template: &'a str) -> &'a str {
        &template[self.start..self.end]
    }

    pub fn in_mustache(&self, offset: usize) -> bool {
        self.mustaches.iter().any(|m| m.contains(offset))
    }
}

/// End offset of the mustache opening at `start`, or `None` if unterminated.
fn mustache_end(src: &str, start: usize) -> Option<usize> {
    let rest = &src[start..];
    if rest.starts_with("{{!--") {
        return rest.find("--}}").map(|i| start + i + 4);
    }
    if rest.starts_with("{{!") {
        return rest.find("}}").map(|i| start + i + 2);
    }
    if rest.starts_with("{{{") {
        return find_mustache_end(src, start + 3, "}}}").map(|i| i + 3);
    }
    find_mustache_end(src, start + 2, "}}").map(|i| i + 2)
}

fn scan_tag(src: &str, start: usize) -> Option<OpeningTag> {
    let bytes = src.as_bytes();
    let mut quote: Option<u8> = None;
    let mut last_significant = b'<';
    let mut mustaches = Vec::new();
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i..].starts_with(b"{{") {
            let end = mustache_end(src, i)?;
            mustaches.push(MustacheSpan {
                start: i - start,
                end: end - start,
                in_value: quote.is_some() || last_significant == b'=',
            });
            last_significant = b'}';
            i = end;
            continue;
        }
        let c = bytes[i];
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                b'"' | b'\'' => quote = Some(c),
                b'>' => {
                    return Some(OpeningTag {
                        start,
                        end: i + 1,
                        mustaches,
                    })
                }
                _ => {}
            },
        }
        if !c.is_ascii_whitespace() {
            last_significant = c;
        }
        i += 1;
    }
    None
}

/// All opening tags of `src`, in order.
pub fn opening_tags(src: &str) -> Vec<OpeningTag> {
    let bytes = src.as_bytes();
    let mut tags = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(b"<!--") {
            i = src[i..].find("-->").map(|e| i + e + 3).unwrap_or(bytes.len());
            continue;
        }
        if bytes[i..].starts_with(b"{{") {
            i = mustache_end(src, i).unwrap_or(bytes.len());
            continue;
        }
        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic) {
            match scan_tag(src, i) {
                Some(tag) => {
                    i = tag.end;
                    tags.push(tag);
                }
                None => break,
            }
            continue;
        }
        i += 1;
    }
    tags
}
