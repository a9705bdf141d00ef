//! Mustache tag parser.
//!
//! Parses the inner text of one `{{ ... }}` tag into a [`MustacheTag`]. The
//! template scanner in [`crate::parse`] finds tag boundaries and strips the
//! `~` whitespace-control markers; everything between the delimiters lands
//! here.

use lazy_static::lazy_static;
use regex::Regex;

use crate::ast::{
    Expression, Hash, HashPair, Literal, MustacheStatement, NodeIds, PartialStatement,
    PathExpression, SubExpression,
};
use crate::error::{CompileError, Result};

lazy_static! {
    static ref NUMBER_RE: Regex = Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub enum MustacheTag {
    Expression(MustacheStatement),
    Comment(String),
    Partial(PartialStatement),
    OpenBlock(BlockOpen),
    /// `{{else}}`, or `{{else if cond}}` which opens a chained block.
    Else(Option<BlockOpen>),
    CloseBlock(String),
}

/// Head of a block statement before its body is known.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockOpen {
    pub path: PathExpression,
    pub params: Vec<Expression>,
    pub hash: Hash,
}

/// Parses the content of a tag. `offset` is the byte position of `content`
/// in the template and is only used for error reporting.
pub fn parse_tag(
    content: &str,
    trusting: bool,
    offset: usize,
    ids: &mut NodeIds,
) -> Result<MustacheTag> {
    if let Some(comment) = content.strip_prefix('!') {
        let value = comment
            .strip_prefix("--")
            .and_then(|c| c.strip_suffix("--"))
            .unwrap_or(comment);
        return Ok(MustacheTag::Comment(value.to_string()));
    }

    let trimmed = content.trim();
    let lead = content.len() - content.trim_start().len();
    let mut parser = ExprParser {
        src: trimmed,
        pos: 0,
        offset: offset + lead,
        ids,
    };

    if trusting {
        let (path, params, hash) = parser.parse_call()?;
        parser.expect_end()?;
        return Ok(MustacheTag::Expression(MustacheStatement {
            path,
            params,
            hash,
            trusting,
        }));
    }

    match trimmed.chars().next() {
        Some('#') => {
            if trimmed.starts_with("#>") || trimmed.starts_with("#*") {
                return Err(parser.error("partial blocks and inline partials are not supported"));
            }
            parser.pos = 1;
            Ok(MustacheTag::OpenBlock(parser.parse_block_open()?))
        }
        Some('/') => {
            let name = trimmed[1..].trim();
            if name.is_empty() {
                return Err(parser.error("closing tag without a block name"));
            }
            Ok(MustacheTag::CloseBlock(name.to_string()))
        }
        Some('>') => {
            parser.pos = 1;
            Ok(MustacheTag::Partial(parser.parse_partial()?))
        }
        Some('^') => {
            if trimmed[1..].trim().is_empty() {
                Ok(MustacheTag::Else(None))
            } else {
                Err(parser.error("inverted sections are not supported, use `unless`"))
            }
        }
        Some('&') => {
            parser.pos = 1;
            let (path, params, hash) = parser.parse_call()?;
            parser.expect_end()?;
            Ok(MustacheTag::Expression(MustacheStatement {
                path,
                params,
                hash,
                trusting: true,
            }))
        }
        Some(_) if trimmed == "else" => Ok(MustacheTag::Else(None)),
        Some(_) if trimmed.starts_with("else ") => {
            parser.pos = "else ".len();
            Ok(MustacheTag::Else(Some(parser.parse_block_open()?)))
        }
        Some(_) => {
            let (path, params, hash) = parser.parse_call()?;
            parser.expect_end()?;
            Ok(MustacheTag::Expression(MustacheStatement {
                path,
                params,
                hash,
                trusting: false,
            }))
        }
        None => Err(parser.error("empty mustache")),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSION PARSER
// ═══════════════════════════════════════════════════════════════════════════════

struct ExprParser<'a, 'i> {
    src: &'a str,
    pos: usize,
    offset: usize,
    ids: &'i mut NodeIds,
}

impl<'a, 'i> ExprParser<'a, 'i> {
    fn error(&self, message: &str) -> CompileError {
        CompileError::parse(message, self.offset + self.pos)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn expect_end(&mut self) -> Result<()> {
        self.skip_ws();
        match self.peek() {
            None => Ok(()),
            Some(c) => Err(self.error(&format!("unexpected `{}`", c))),
        }
    }

    fn parse_block_open(&mut self) -> Result<BlockOpen> {
        let (head, params, hash) = self.parse_call()?;
        self.expect_end()?;
        match head {
            Expression::Path(path) => Ok(BlockOpen { path, params, hash }),
            other => Err(self.error(&format!(
                "block name must be a path, found {}",
                other.kind()
            ))),
        }
    }

    fn parse_partial(&mut self) -> Result<PartialStatement> {
        self.skip_ws();
        if self.peek() == Some('(') {
            return Err(self.error("dynamic partial names are not supported"));
        }
        let name = match self.peek() {
            Some('"') | Some('\'') => self.parse_string()?,
            _ => self.read_token().to_string(),
        };
        if name.is_empty() {
            return Err(self.error("partial without a name"));
        }
        let (params, hash) = self.parse_arguments()?;
        self.expect_end()?;
        Ok(PartialStatement { name, params, hash })
    }

    /// `head arg* key=value*`
    fn parse_call(&mut self) -> Result<(Expression, Vec<Expression>, Hash)> {
        self.skip_ws();
        let head = self.parse_expression()?;
        let (params, hash) = self.parse_arguments()?;
        Ok((head, params, hash))
    }

    fn parse_arguments(&mut self) -> Result<(Vec<Expression>, Hash)> {
        let mut params = Vec::new();
        let mut hash = Hash::default();
        loop {
            self.skip_ws();
            match self.peek() {
                None | Some(')') => break,
                _ => {}
            }
            if self.at_block_params() {
                return Err(self.error("block parameters (`as |x|`) are not supported"));
            }
            if let Some(key) = self.try_hash_key() {
                let value = self.parse_expression()?;
                hash.pairs.push(HashPair { key, value });
                continue;
            }
            if !hash.is_empty() {
                return Err(self.error("positional argument after hash argument"));
            }
            params.push(self.parse_expression()?);
        }
        Ok((params, hash))
    }

    fn at_block_params(&self) -> bool {
        let rest = self.rest();
        rest.strip_prefix("as")
            .map(|r| r.starts_with(char::is_whitespace) && r.trim_start().starts_with('|'))
            .unwrap_or(false)
    }

    fn try_hash_key(&mut self) -> Option<String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '-' || c == '@')
        {
            self.bump();
        }
        let key = &self.src[start..self.pos];
        self.skip_ws();
        if !key.is_empty() && self.peek() == Some('=') {
            self.bump();
            self.skip_ws();
            return Some(key.to_string());
        }
        self.pos = start;
        None
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        match self.peek() {
            Some('(') => {
                self.bump();
                let (path, params, hash) = self.parse_call()?;
                self.skip_ws();
                if self.bump() != Some(')') {
                    return Err(self.error("unterminated sub-expression"));
                }
                Ok(Expression::SubExpression(Box::new(SubExpression {
                    path,
                    params,
                    hash,
                })))
            }
            Some('"') | Some('\'') => Ok(Expression::Literal(Literal::String(self.parse_string()?))),
            _ => {
                let start = self.pos;
                let token = self.read_token();
                if token.is_empty() {
                    return Err(self.error("expected an expression"));
                }
                let literal = match token {
                    "true" => Some(Literal::Boolean(true)),
                    "false" => Some(Literal::Boolean(false)),
                    "null" => Some(Literal::Null),
                    "undefined" => Some(Literal::Undefined),
                    _ if NUMBER_RE.is_match(token) => {
                        token.parse::<f64>().ok().map(Literal::Number)
                    }
                    _ => None,
                };
                match literal {
                    Some(literal) => Ok(Expression::Literal(literal)),
                    None => {
                        let id = self.ids.next_id();
                        parse_path(token, id, self.offset + start).map(Expression::Path)
                    }
                }
            }
        }
    }

    fn parse_string(&mut self) -> Result<String> {
        let quote = self.bump().unwrap_or('"');
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string literal")),
                Some('\\') => match self.bump() {
                    Some(c) => value.push(c),
                    None => return Err(self.error("unterminated string literal")),
                },
                Some(c) if c == quote => return Ok(value),
                Some(c) => value.push(c),
            }
        }
    }

    /// Reads a bare token: a path, number or keyword. Bracketed segments may
    /// contain any character except `]`.
    fn read_token(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '[' {
                while let Some(c) = self.bump() {
                    if c == ']' {
                        break;
                    }
                }
                continue;
            }
            if c.is_whitespace() || matches!(c, '(' | ')' | '=' | '|' | '}') {
                break;
            }
            self.bump();
        }
        &self.src[start..self.pos]
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PATHS
// ═══════════════════════════════════════════════════════════════════════════════

/// Splits a path token into its head markers and segments.
pub fn parse_path(token: &str, id: crate::ast::NodeId, offset: usize) -> Result<PathExpression> {
    let mut rest = token;
    let data = rest.starts_with('@');
    if data {
        rest = &rest[1..];
    }

    let mut depth = 0;
    while let Some(r) = rest.strip_prefix("../") {
        depth += 1;
        rest = r;
    }
    if rest == ".." {
        depth += 1;
        rest = "";
    }

    if rest == "this" || rest == "." {
        rest = "";
    } else if let Some(r) = rest
        .strip_prefix("this.")
        .or_else(|| rest.strip_prefix("this/"))
        .or_else(|| rest.strip_prefix("./"))
    {
        rest = r;
    }

    let parts = split_segments(rest)
        .ok_or_else(|| CompileError::parse(format!("invalid path `{}`", token), offset))?;

    Ok(PathExpression {
        id,
        original: token.to_string(),
        parts,
        data,
        depth,
    })
}

fn split_segments(path: &str) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    if path.is_empty() {
        return Some(parts);
    }
    let mut current = String::new();
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        match c {
            '[' => {
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    current.push(c);
                }
                if !closed {
                    return None;
                }
            }
            '.' | '/' => {
                if current.is_empty() {
                    return None;
                }
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if current.is_empty() {
        return None;
    }
    parts.push(current);
    Some(parts)
}
