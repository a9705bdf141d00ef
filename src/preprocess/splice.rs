//! Offset-based template splicing.

use crate::error::{CompileError, Result};

/// Replace `len` bytes at `start` with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub start: usize,
    pub len: usize,
    pub text: String,
}

impl Replacement {
    pub fn new(start: usize, len: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            len,
            text: text.into(),
        }
    }

    fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Applies non-overlapping replacements in offset order. A replacement that
/// would touch preceding non-whitespace gets a separating space.
pub fn splice(template: &str, mut replacements: Vec<Replacement>) -> Result<String> {
    replacements.sort_by_key(|r| r.start);

    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;
    for replacement in &replacements {
        if replacement.start < cursor || replacement.end() > template.len() {
            return Err(CompileError::OverlappingRewrite {
                offset: replacement.start,
            });
        }
        out.push_str(&template[cursor..replacement.start]);
        if replacement.start > 0 && !out.ends_with(char::is_whitespace) {
            out.push(' ');
        }
        out.push_str(&replacement.text);
        cursor = replacement.end();
    }
    out.push_str(&template[cursor..]);
    Ok(out)
}
