//! Parse Module
//!
//! Turns template text into a [`Template`]. Mustache tags are swapped for
//! placeholders that cannot occur in the source, the markup is tokenized with
//! html5ever, and the tokens are assembled into template nodes with the
//! placeholders restored.
//!
//! Elements nest exactly as written. There is no HTML insertion-mode
//! recovery: a closing tag that does not match the open element is an error.

use std::collections::HashSet;
use std::mem;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::ast::{
    AttrNode, AttrValue, Block, BlockStatement, CommentStatement, ElementNode, MustacheStatement,
    NodeIds, PartialStatement, Statement, Template, TextNode,
};
use crate::error::{CompileError, Result};
use crate::mustache::{parse_tag, BlockOpen, MustacheTag};

const BLOCK_TAG: &str = "hbs-block";
const ELSE_TAG: &str = "hbs-else";
const ID_ATTR: &str = "data-hbs-id";
const TAG_NAME_ATTR: &str = "data-hbs-tag";
const ATTR_NAMES_ATTR: &str = "data-hbs-attrs";

lazy_static! {
    static ref LONG_COMMENT_END_RE: Regex = Regex::new(r"--(~?)\}\}").unwrap();
    static ref VOID_ELEMENTS: HashSet<&'static str> = [
        "area", "base", "br", "col", "command", "embed", "hr", "img", "input", "keygen",
        "link", "meta", "param", "source", "track", "wbr",
    ]
    .into_iter()
    .collect();
}

// ═══════════════════════════════════════════════════════════════════════════════
// MUSTACHE NORMALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

/// A mustache tag lifted out of the markup, indexed by its placeholder number.
#[derive(Debug)]
enum Placeholder {
    Expression(MustacheStatement),
    Partial(PartialStatement),
    Comment(String),
    Block(BlockOpen),
    ElseIf(BlockOpen),
}

#[derive(Debug)]
struct Normalized {
    html: String,
    placeholders: Vec<Option<Placeholder>>,
    /// Attribute placeholders written without quotes (`id={{x}}`).
    unquoted: HashSet<usize>,
    /// Private-use character absent from the source; placeholders are `{marker}N{marker}`.
    marker: char,
    placeholder_re: Regex,
    whole_placeholder_re: Regex,
}

impl Normalized {
    fn new(source: &str) -> Result<Self> {
        let marker = ('\u{E000}'..='\u{F8FF}')
            .find(|c| !source.contains(*c))
            .ok_or_else(|| CompileError::parse("no free placeholder character for this template", 0))?;
        let escaped = regex::escape(&marker.to_string());
        let pattern = format!(r"{m}(\d+){m}", m = escaped);
        let placeholder_re = Regex::new(&pattern).map_err(|e| CompileError::parse(e.to_string(), 0))?;
        let whole_placeholder_re =
            Regex::new(&format!("^{}$", pattern)).map_err(|e| CompileError::parse(e.to_string(), 0))?;
        Ok(Self {
            html: String::with_capacity(source.len()),
            placeholders: Vec::new(),
            unquoted: HashSet::new(),
            marker,
            placeholder_re,
            whole_placeholder_re,
        })
    }

    fn push(&mut self, placeholder: Placeholder) -> usize {
        self.placeholders.push(Some(placeholder));
        self.placeholders.len() - 1
    }

    fn take(&mut self, index: usize) -> Option<Placeholder> {
        self.placeholders.get_mut(index).and_then(Option::take)
    }

    fn placeholder(&self, index: usize) -> String {
        format!("{m}{}{m}", index, m = self.marker)
    }

    fn whole_placeholder(&self, text: &str) -> Option<usize> {
        self.whole_placeholder_re
            .captures(text)
            .and_then(|caps| caps[1].parse().ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ValueState {
    None,
    AfterEquals,
    Unquoted,
    Quoted(char),
}

#[derive(Debug)]
struct OpenTag {
    name: String,
    value: ValueState,
    /// Attribute name being read.
    attribute: String,
    /// Attribute names the tokenizer would lower-case.
    cased: Vec<String>,
}

impl OpenTag {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: ValueState::None,
            attribute: String::new(),
            cased: Vec::new(),
        }
    }

    fn end_attribute_name(&mut self) {
        let name = mem::take(&mut self.attribute);
        if name.chars().any(|c| c.is_ascii_uppercase()) {
            self.cased.push(name);
        }
    }

    /// Records original attribute spellings before the tag closes.
    fn close(&mut self, html: &mut String) {
        self.end_attribute_name();
        if !self.cased.is_empty() {
            html.push_str(&format!(" {}=\"{}\"", ATTR_NAMES_ATTR, self.cased.join(" ")));
        }
    }
}

struct RawMustache<'a> {
    content: &'a str,
    trusting: bool,
    strip_left: bool,
    strip_right: bool,
    /// Byte offset of `content` in the source.
    offset: usize,
    /// Byte offset just past the closing delimiter.
    end: usize,
}

/// Locates the mustache starting at `start` (which points at `{{`).
fn read_mustache(src: &str, start: usize) -> Result<RawMustache<'_>> {
    let trusting = src[start..].starts_with("{{{");
    let mut content_start = start + if trusting { 3 } else { 2 };
    let strip_left = src[content_start..].starts_with('~');
    if strip_left {
        content_start += 1;
    }

    if src[content_start..].starts_with("!--") {
        let search_from = content_start + 3;
        let m = LONG_COMMENT_END_RE
            .captures(&src[search_from..])
            .ok_or_else(|| CompileError::parse("unterminated comment", start))?;
        let whole = m.get(0).map(|g| (g.start(), g.end())).unwrap_or((0, 0));
        let strip_right = m.get(1).map(|g| !g.as_str().is_empty()).unwrap_or(false);
        return Ok(RawMustache {
            content: &src[content_start..search_from + whole.0 + 2],
            trusting: false,
            strip_left,
            strip_right,
            offset: content_start,
            end: search_from + whole.1,
        });
    }

    let close = if trusting { "}}}" } else { "}}" };
    let close_at = find_mustache_end(src, content_start, close)
        .ok_or_else(|| CompileError::parse("unterminated mustache", start))?;
    let mut content = &src[content_start..close_at];
    let strip_right = content.ends_with('~');
    if strip_right {
        content = &content[..content.len() - 1];
    }
    Ok(RawMustache {
        content,
        trusting,
        strip_left,
        strip_right,
        offset: content_start,
        end: close_at + close.len(),
    })
}

/// Finds `close` outside string literals, returning its byte offset.
pub(crate) fn find_mustache_end(src: &str, from: usize, close: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in src[from..].char_indices() {
        let at = from + i;
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        if c == '"' || c == '\'' {
            quote = Some(c);
            continue;
        }
        if src[at..].starts_with(close) {
            return Some(at);
        }
    }
    None
}

fn trim_trailing_whitespace(out: &mut String) {
    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
}

/// Replaces every mustache with a placeholder the tokenizer passes through
/// untouched, and records the parsed tags.
fn normalize_mustaches(src: &str, ids: &mut NodeIds) -> Result<Normalized> {
    let mut normalized = Normalized::new(src)?;
    let mut blocks: Vec<(String, usize)> = Vec::new();
    let mut tag: Option<OpenTag> = None;
    let mut i = 0;

    while i < src.len() {
        let rest = &src[i..];

        if rest.starts_with("\\{{") {
            normalized.html.push_str("{{");
            i += 3;
            continue;
        }

        if rest.starts_with("{{") {
            let raw = read_mustache(src, i)?;
            let parsed = parse_tag(raw.content, raw.trusting, raw.offset, ids)?;
            if raw.strip_left && tag.is_none() {
                trim_trailing_whitespace(&mut normalized.html);
            }
            match tag.as_mut() {
                None => emit_text_mustache(&mut normalized, &mut blocks, parsed, i)?,
                Some(open) => emit_tag_mustache(&mut normalized, open, parsed, i)?,
            }
            i = raw.end;
            if raw.strip_right && tag.is_none() {
                while let Some(c) = src[i..].chars().next().filter(|c| c.is_whitespace()) {
                    i += c.len_utf8();
                }
            }
            continue;
        }

        let Some(c) = rest.chars().next() else { break };

        match tag.as_mut() {
            None => {
                if rest.starts_with("<!--") {
                    let end = rest.find("-->").map(|e| e + 3).unwrap_or(rest.len());
                    normalized.html.push_str(&rest[..end]);
                    i += end;
                    continue;
                }
                let starts_tag = rest.len() > 1
                    && c == '<'
                    && rest[1..].starts_with(|n: char| n.is_ascii_alphabetic());
                if starts_tag {
                    let name_len = rest[1..]
                        .find(|n: char| n.is_whitespace() || matches!(n, '/' | '>' | '{'))
                        .unwrap_or(rest.len() - 1);
                    let name = &rest[1..1 + name_len];
                    normalized.html.push('<');
                    normalized.html.push_str(name);
                    if name.chars().any(|n| n.is_ascii_uppercase()) {
                        normalized
                            .html
                            .push_str(&format!(" {}=\"{}\"", TAG_NAME_ATTR, name));
                    }
                    tag = Some(OpenTag::new(name));
                    i += 1 + name_len;
                    continue;
                }
                normalized.html.push(c);
            }
            Some(open) => {
                if let ValueState::Quoted(q) = open.value {
                    if c == q {
                        open.value = ValueState::None;
                    }
                    normalized.html.push(c);
                    i += c.len_utf8();
                    continue;
                }
                if rest.starts_with("/>") {
                    open.close(&mut normalized.html);
                    normalized.html.push_str("/>");
                    tag = None;
                    i += 2;
                    continue;
                }
                match c {
                    '>' => {
                        open.close(&mut normalized.html);
                        tag = None;
                    }
                    '"' | '\'' if open.value == ValueState::AfterEquals => {
                        open.value = ValueState::Quoted(c)
                    }
                    '=' => {
                        open.end_attribute_name();
                        open.value = ValueState::AfterEquals;
                    }
                    c if c.is_whitespace() => match open.value {
                        ValueState::Unquoted => open.value = ValueState::None,
                        ValueState::None => open.end_attribute_name(),
                        _ => {}
                    },
                    '/' if open.value == ValueState::None => open.end_attribute_name(),
                    _ => match open.value {
                        ValueState::AfterEquals => open.value = ValueState::Unquoted,
                        ValueState::None => open.attribute.push(c),
                        _ => {}
                    },
                }
                normalized.html.push(c);
            }
        }
        i += c.len_utf8();
    }

    if let Some((name, _)) = blocks.pop() {
        return Err(CompileError::parse(
            format!("unclosed block `{{{{#{}}}}}`", name),
            src.len(),
        ));
    }

    Ok(normalized)
}

fn emit_text_mustache(
    normalized: &mut Normalized,
    blocks: &mut Vec<(String, usize)>,
    tag: MustacheTag,
    offset: usize,
) -> Result<()> {
    match tag {
        MustacheTag::Expression(m) => {
            let n = normalized.push(Placeholder::Expression(m));
            let text = normalized.placeholder(n);
            normalized.html.push_str(&text);
        }
        MustacheTag::Partial(p) => {
            let n = normalized.push(Placeholder::Partial(p));
            let text = normalized.placeholder(n);
            normalized.html.push_str(&text);
        }
        MustacheTag::Comment(value) => {
            let n = normalized.push(Placeholder::Comment(value));
            let text = format!("<!--{}-->", normalized.placeholder(n));
            normalized.html.push_str(&text);
        }
        MustacheTag::OpenBlock(open) => {
            let name = open.path.original.clone();
            let n = normalized.push(Placeholder::Block(open));
            blocks.push((name, n));
            normalized
                .html
                .push_str(&format!("<{} {}=\"{}\">", BLOCK_TAG, ID_ATTR, n));
        }
        MustacheTag::Else(chain) => {
            if blocks.is_empty() {
                return Err(CompileError::parse("`{{else}}` outside of a block", offset));
            }
            match chain {
                Some(open) => {
                    let n = normalized.push(Placeholder::ElseIf(open));
                    normalized
                        .html
                        .push_str(&format!("<{} {}=\"{}\">", ELSE_TAG, ID_ATTR, n));
                }
                None => normalized.html.push_str(&format!("<{}>", ELSE_TAG)),
            }
        }
        MustacheTag::CloseBlock(name) => match blocks.pop() {
            Some((open, _)) if open == name => {
                normalized.html.push_str(&format!("</{}>", BLOCK_TAG));
            }
            Some((open, _)) => {
                return Err(CompileError::parse(
                    format!("`{{{{/{}}}}}` does not match `{{{{#{}}}}}`", name, open),
                    offset,
                ))
            }
            None => {
                return Err(CompileError::parse(
                    format!("`{{{{/{}}}}}` closes no open block", name),
                    offset,
                ))
            }
        },
    }
    Ok(())
}

fn emit_tag_mustache(
    normalized: &mut Normalized,
    open: &mut OpenTag,
    tag: MustacheTag,
    offset: usize,
) -> Result<()> {
    match (tag, open.value) {
        (MustacheTag::Comment(_), _) => {}
        (MustacheTag::Expression(m), ValueState::AfterEquals) => {
            let n = normalized.push(Placeholder::Expression(m));
            normalized.unquoted.insert(n);
            let text = format!("\"{}\"", normalized.placeholder(n));
            normalized.html.push_str(&text);
            open.value = ValueState::None;
        }
        (MustacheTag::Expression(m), ValueState::Quoted(_) | ValueState::Unquoted) => {
            let n = normalized.push(Placeholder::Expression(m));
            let text = normalized.placeholder(n);
            normalized.html.push_str(&text);
        }
        (MustacheTag::Expression(_), ValueState::None) => {
            return Err(CompileError::parse(
                format!("mustaches in element position are not supported on <{}>", open.name),
                offset,
            ))
        }
        (MustacheTag::Partial(_), _) => {
            return Err(CompileError::parse(
                format!("partials are not allowed inside the <{}> tag", open.name),
                offset,
            ))
        }
        (MustacheTag::OpenBlock(_) | MustacheTag::Else(_) | MustacheTag::CloseBlock(_), _) => {
            return Err(CompileError::parse(
                format!(
                    "block statements inside the <{}> tag need includeExperimentalFeatures",
                    open.name
                ),
                offset,
            ))
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// TREE BUILDING
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
enum Branch {
    Program,
    Else,
    /// `{{else if ...}}`, holding the placeholder of the chained block head.
    ElseIf(usize),
}

#[derive(Debug)]
struct OpenBlock {
    open: BlockOpen,
    closed: Vec<(Branch, Vec<Statement>)>,
    branch: Branch,
    body: Vec<Statement>,
}

#[derive(Debug)]
enum Frame {
    Element { local: String, node: ElementNode },
    Block(OpenBlock),
}

fn tag_attribute<'t>(tag: &'t Tag, name: &str) -> Option<&'t str> {
    tag.attrs
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| &*a.value)
}

fn raw_text_kind(local: &str) -> Option<RawKind> {
    match local {
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(RawKind::Rawtext),
        "script" => Some(RawKind::ScriptData),
        "textarea" | "title" => Some(RawKind::Rcdata),
        _ => None,
    }
}

/// Receives html5ever tokens and assembles template statements.
struct TemplateBuilder {
    normalized: Normalized,
    ids: NodeIds,
    stack: Vec<Frame>,
    body: Vec<Statement>,
    text: String,
    error: Option<CompileError>,
}

impl TokenSink for TemplateBuilder {
    type Handle = ();

    fn process_token(&mut self, token: Token, line_number: u64) -> TokenSinkResult<()> {
        if self.error.is_some() {
            return TokenSinkResult::Continue;
        }
        match self.process(token, line_number) {
            Ok(result) => result,
            Err(error) => {
                self.error = Some(error);
                TokenSinkResult::Continue
            }
        }
    }
}

impl TemplateBuilder {
    fn new(normalized: Normalized, ids: NodeIds) -> Self {
        Self {
            normalized,
            ids,
            stack: Vec::new(),
            body: Vec::new(),
            text: String::new(),
            error: None,
        }
    }

    fn children(&mut self) -> &mut Vec<Statement> {
        match self.stack.last_mut() {
            Some(Frame::Element { node, .. }) => &mut node.children,
            Some(Frame::Block(block)) => &mut block.body,
            None => &mut self.body,
        }
    }

    fn process(&mut self, token: Token, line: u64) -> Result<TokenSinkResult<()>> {
        match token {
            Token::CharacterTokens(text) => self.text.push_str(&text),
            Token::NullCharacterToken => self.text.push('\u{FFFD}'),
            Token::CommentToken(contents) => {
                self.flush_text()?;
                let statement = self.comment(contents.to_string())?;
                self.children().push(statement);
            }
            Token::TagToken(tag) => {
                self.flush_text()?;
                return match tag.kind {
                    TagKind::StartTag => self.start_tag(tag, line),
                    TagKind::EndTag => self.end_tag(tag, line).map(|_| TokenSinkResult::Continue),
                };
            }
            Token::EOFToken => self.flush_text()?,
            Token::DoctypeToken(_) | Token::ParseError(_) => {}
        }
        Ok(TokenSinkResult::Continue)
    }

    fn flush_text(&mut self) -> Result<()> {
        if self.text.is_empty() {
            return Ok(());
        }
        let text = mem::take(&mut self.text);
        let mut statements = Vec::new();
        self.split_text(&text, &mut statements)?;
        self.children().extend(statements);
        Ok(())
    }

    fn comment(&mut self, value: String) -> Result<Statement> {
        match self.normalized.whole_placeholder(&value) {
            None => Ok(Statement::Comment(CommentStatement { value })),
            Some(n) => match self.normalized.take(n) {
                Some(Placeholder::Comment(value)) => Ok(Statement::MustacheComment(CommentStatement { value })),
                _ => Err(CompileError::parse("misplaced template placeholder in comment", 0)),
            },
        }
    }

    fn start_tag(&mut self, tag: Tag, line: u64) -> Result<TokenSinkResult<()>> {
        let local = tag.name.to_string();

        if local == BLOCK_TAG {
            let index = tag_attribute(&tag, ID_ATTR).and_then(|v| v.parse::<usize>().ok());
            let open = match index.and_then(|n| self.normalized.take(n)) {
                Some(Placeholder::Block(open)) => open,
                _ => {
                    return Err(CompileError::parse(
                        format!("block marker without a block on line {}", line),
                        0,
                    ))
                }
            };
            self.stack.push(Frame::Block(OpenBlock {
                open,
                closed: Vec::new(),
                branch: Branch::Program,
                body: Vec::new(),
            }));
            return Ok(TokenSinkResult::Continue);
        }

        if local == ELSE_TAG {
            let branch = match tag_attribute(&tag, ID_ATTR).and_then(|v| v.parse::<usize>().ok()) {
                Some(n) => Branch::ElseIf(n),
                None => Branch::Else,
            };
            return match self.stack.last_mut() {
                Some(Frame::Block(block)) => {
                    let body = mem::take(&mut block.body);
                    let previous = mem::replace(&mut block.branch, branch);
                    block.closed.push((previous, body));
                    Ok(TokenSinkResult::Continue)
                }
                Some(Frame::Element { node, .. }) => Err(CompileError::parse(
                    format!(
                        "`{{{{else}}}}` inside <{}> must sit directly in its block (line {})",
                        node.tag, line
                    ),
                    0,
                )),
                None => Err(CompileError::parse("`{{else}}` outside of a block", 0)),
            };
        }

        let mut tag_name = local.clone();
        let mut spellings: Vec<&str> = Vec::new();
        for attr in &tag.attrs {
            match &*attr.name.local {
                TAG_NAME_ATTR => tag_name = attr.value.to_string(),
                ATTR_NAMES_ATTR => spellings = attr.value.split_whitespace().collect(),
                _ => {}
            }
        }

        let mut attributes = Vec::with_capacity(tag.attrs.len());
        for attr in &tag.attrs {
            let lowered = &*attr.name.local;
            if lowered == TAG_NAME_ATTR || lowered == ATTR_NAMES_ATTR {
                continue;
            }
            let name = spellings
                .iter()
                .find(|spelling| spelling.eq_ignore_ascii_case(lowered))
                .map_or_else(|| lowered.to_string(), |spelling| spelling.to_string());
            let value = self.convert_attr_value(&attr.value)?;
            attributes.push(AttrNode { name, value });
        }

        let node = ElementNode {
            tag: tag_name,
            attributes,
            children: Vec::new(),
            self_closing: tag.self_closing,
        };
        if tag.self_closing || VOID_ELEMENTS.contains(local.as_str()) {
            self.children().push(Statement::Element(node));
            return Ok(TokenSinkResult::Continue);
        }

        let raw = raw_text_kind(&local);
        self.stack.push(Frame::Element { local, node });
        Ok(raw.map_or(TokenSinkResult::Continue, TokenSinkResult::RawData))
    }

    fn end_tag(&mut self, tag: Tag, line: u64) -> Result<()> {
        let local = tag.name.to_string();

        if local == BLOCK_TAG {
            return match self.stack.pop() {
                Some(Frame::Block(block)) => {
                    let statement = self.close_block(block)?;
                    self.children().push(Statement::Block(statement));
                    Ok(())
                }
                Some(Frame::Element { node, .. }) => Err(CompileError::parse(
                    format!("block closed while <{}> is still open (line {})", node.tag, line),
                    0,
                )),
                None => Err(CompileError::parse("block closed twice", 0)),
            };
        }

        if VOID_ELEMENTS.contains(local.as_str()) {
            return Err(CompileError::parse(
                format!("<{}> elements do not need end tags (line {})", local, line),
                0,
            ));
        }

        match self.stack.pop() {
            Some(Frame::Element { local: open, node }) if open == local => {
                self.children().push(Statement::Element(node));
                Ok(())
            }
            Some(Frame::Element { node, .. }) => Err(CompileError::parse(
                format!(
                    "closing tag </{}> does not match the open <{}> (line {})",
                    local, node.tag, line
                ),
                0,
            )),
            Some(Frame::Block(block)) => Err(CompileError::parse(
                format!(
                    "closing tag </{}> crosses the `{{{{#{}}}}}` block (line {})",
                    local, block.open.path.original, line
                ),
                0,
            )),
            None => Err(CompileError::parse(
                format!("closing tag </{}> has no open element (line {})", local, line),
                0,
            )),
        }
    }

    /// Folds the branches of a finished block into its program and inverse chain.
    fn close_block(&mut self, block: OpenBlock) -> Result<BlockStatement> {
        let OpenBlock {
            open,
            mut closed,
            branch,
            body,
        } = block;
        closed.push((branch, body));

        let mut program = Vec::new();
        let mut inverse: Option<Block> = None;
        while let Some((branch, body)) = closed.pop() {
            match branch {
                Branch::Program => program = body,
                Branch::Else => {
                    if inverse.is_some() {
                        return Err(CompileError::parse(
                            format!("`{{{{#{}}}}}` has more than one `{{{{else}}}}`", open.path.original),
                            0,
                        ));
                    }
                    inverse = Some(Block {
                        id: self.ids.next_id(),
                        body,
                    });
                }
                Branch::ElseIf(n) => {
                    let chained = match self.normalized.take(n) {
                        Some(Placeholder::ElseIf(chained)) => chained,
                        _ => return Err(CompileError::parse("`{{else if}}` marker without a block", 0)),
                    };
                    let nested = BlockStatement {
                        path: chained.path,
                        params: chained.params,
                        hash: chained.hash,
                        program: Block {
                            id: self.ids.next_id(),
                            body,
                        },
                        inverse: inverse.take(),
                    };
                    inverse = Some(Block {
                        id: self.ids.next_id(),
                        body: vec![Statement::Block(nested)],
                    });
                }
            }
        }

        Ok(BlockStatement {
            path: open.path,
            params: open.params,
            hash: open.hash,
            program: Block {
                id: self.ids.next_id(),
                body: program,
            },
            inverse,
        })
    }

    /// Splits text on placeholders, restoring mustache and partial statements.
    fn split_text(&mut self, text: &str, out: &mut Vec<Statement>) -> Result<()> {
        let mut last_end = 0;
        let matches: Vec<(usize, usize, Option<usize>)> = self
            .normalized
            .placeholder_re
            .captures_iter(text)
            .filter_map(|caps| {
                let m = caps.get(0)?;
                Some((m.start(), m.end(), caps[1].parse::<usize>().ok()))
            })
            .collect();
        for (start, end, index) in matches {
            let statement = match index.and_then(|n| self.normalized.take(n)) {
                Some(Placeholder::Expression(m)) => Statement::Mustache(m),
                Some(Placeholder::Partial(p)) => Statement::Partial(p),
                Some(_) => return Err(CompileError::parse("misplaced template placeholder", 0)),
                None => return Err(CompileError::parse("unknown template placeholder", 0)),
            };
            if start > last_end {
                out.push(Statement::Text(TextNode {
                    chars: text[last_end..start].to_string(),
                }));
            }
            out.push(statement);
            last_end = end;
        }
        if last_end < text.len() {
            out.push(Statement::Text(TextNode {
                chars: text[last_end..].to_string(),
            }));
        }
        Ok(())
    }

    fn convert_attr_value(&mut self, value: &str) -> Result<AttrValue> {
        if let Some(n) = self.normalized.whole_placeholder(value) {
            if self.normalized.unquoted.contains(&n) {
                if let Some(Placeholder::Expression(m)) = self.normalized.take(n) {
                    return Ok(AttrValue::Mustache(m));
                }
            }
        }
        if !self.normalized.placeholder_re.is_match(value) {
            return Ok(AttrValue::Text(TextNode {
                chars: value.to_string(),
            }));
        }
        let mut parts = Vec::new();
        self.split_text(value, &mut parts)?;
        Ok(AttrValue::Concat(parts))
    }

    fn finish(mut self) -> Result<Template> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        self.flush_text()?;
        match self.stack.last() {
            Some(Frame::Element { node, .. }) => {
                return Err(CompileError::parse(format!("unclosed element <{}>", node.tag), 0))
            }
            Some(Frame::Block(block)) => {
                return Err(CompileError::parse(
                    format!("unclosed block `{{{{#{}}}}}`", block.open.path.original),
                    0,
                ))
            }
            None => {}
        }
        if self.normalized.placeholders.iter().any(Option::is_some) {
            return Err(CompileError::parse(
                "a template tag ended up where markup cannot hold it",
                0,
            ));
        }
        Ok(Template { body: self.body })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN PARSING FUNCTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Parses template text into a [`Template`].
pub fn parse_template(source: &str) -> Result<Template> {
    let mut ids = NodeIds::default();

    // Step 1: Lift mustaches out of the markup
    let normalized = normalize_mustaches(source, &mut ids)?;
    debug!(
        placeholders = normalized.placeholders.len(),
        "normalized template mustaches"
    );

    // Step 2: Tokenize the markup and build statements as written
    let html = StrTendril::from_slice(&normalized.html);
    let mut tokenizer = Tokenizer::new(TemplateBuilder::new(normalized, ids), TokenizerOpts::default());
    let mut input = BufferQueue::default();
    input.push_back(html);
    let _ = tokenizer.feed(&mut input);
    tokenizer.end();

    tokenizer.sink.finish()
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn element(statement: &Statement) -> &ElementNode {
        match statement {
            Statement::Element(el) => el,
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_find_mustache_end_skips_strings() {
        assert_eq!(find_mustache_end("{{a}}", 2, "}}"), Some(3));
        assert_eq!(find_mustache_end("{{t '}}'}}", 2, "}}"), Some(8));
        assert_eq!(find_mustache_end("{{a", 2, "}}"), None);
    }

    #[test]
    fn test_normalize_text_placeholders() {
        let mut ids = NodeIds::default();
        let n = normalize_mustaches("<div>{{a}} and {{> Card}}</div>", &mut ids).unwrap();
        assert_eq!(
            n.html,
            format!("<div>{} and {}</div>", n.placeholder(0), n.placeholder(1))
        );
        assert_eq!(n.placeholders.len(), 2);
    }

    #[test]
    fn test_placeholder_marker_avoids_source_characters() {
        let mut ids = NodeIds::default();
        let n = normalize_mustaches("<p>\u{E000}</p>", &mut ids).unwrap();
        assert_eq!(n.marker, '\u{E001}');
    }

    #[test]
    fn test_normalize_attribute_quoting() {
        let mut ids = NodeIds::default();
        let n = normalize_mustaches(r#"<div id={{a}} class="x {{b}}">"#, &mut ids).unwrap();
        assert_eq!(
            n.html,
            format!(r#"<div id="{}" class="x {}">"#, n.placeholder(0), n.placeholder(1))
        );
        assert!(n.unquoted.contains(&0));
        assert!(!n.unquoted.contains(&1));
    }

    #[test]
    fn test_normalize_records_cased_names() {
        let mut ids = NodeIds::default();
        let n = normalize_mustaches(r#"<MyCard userName="a" id="b" /><img/>"#, &mut ids).unwrap();
        assert_eq!(
            n.html,
            r#"<MyCard data-hbs-tag="MyCard" userName="a" id="b"  data-hbs-attrs="userName"/><img/>"#
        );
    }

    #[test]
    fn test_whitespace_control() {
        let mut ids = NodeIds::default();
        let n = normalize_mustaches("<div>  {{~a~}}  </div>", &mut ids).unwrap();
        assert_eq!(n.html, format!("<div>{}</div>", n.placeholder(0)));
    }

    #[test]
    fn test_block_mismatch_errors() {
        assert!(parse_template("{{#if a}}x{{/each}}").is_err());
        assert!(parse_template("{{#if a}}x").is_err());
        assert!(parse_template("x{{/if}}").is_err());
        assert!(parse_template("{{else}}").is_err());
    }

    #[test]
    fn test_rejects_mustache_modifiers_and_blocks_in_tags() {
        assert!(parse_template("<div {{action 'go'}}></div>").is_err());
        assert!(parse_template(r#"<div class="{{#if a}}b{{/if}}"></div>"#).is_err());
    }

    #[test]
    fn test_parse_element_tree() {
        let template = parse_template(r#"<div id="my-id">Value</div>"#).unwrap();
        assert_eq!(template.body.len(), 1);
        let el = element(&template.body[0]);
        assert_eq!(el.tag, "div");
        assert_eq!(el.attributes[0].name, "id");
        assert!(matches!(el.attributes[0].value, AttrValue::Text(_)));
        assert!(matches!(&el.children[0], Statement::Text(t) if t.chars == "Value"));
    }

    #[test]
    fn test_parse_preserves_component_case_and_self_closing() {
        let template = parse_template("<UserCard /><div />").unwrap();
        assert_eq!(template.body.len(), 2);
        let el = element(&template.body[0]);
        assert_eq!(el.tag, "UserCard");
        assert!(el.self_closing);
        assert!(el.attributes.is_empty());
        assert!(element(&template.body[1]).self_closing);
    }

    #[test]
    fn test_parse_preserves_attribute_case() {
        let template = parse_template(r#"<UserCard userName={{name}} /><div dataFoo="x" id="y"></div>"#).unwrap();
        assert_eq!(element(&template.body[0]).attributes[0].name, "userName");
        let div = element(&template.body[1]);
        assert_eq!(div.attributes[0].name, "dataFoo");
        assert_eq!(div.attributes[1].name, "id");
    }

    #[test]
    fn test_parse_attribute_value_kinds() {
        let template = parse_template(r#"<a id={{x}} href="/p/{{id}}" title="{{t}}"></a>"#).unwrap();
        let el = element(&template.body[0]);
        assert!(matches!(el.attributes[0].value, AttrValue::Mustache(_)));
        assert!(matches!(&el.attributes[1].value, AttrValue::Concat(parts) if parts.len() == 2));
        assert!(matches!(&el.attributes[2].value, AttrValue::Concat(parts) if parts.len() == 1));
    }

    #[test]
    fn test_parse_foreign_attribute_prefix() {
        let template =
            parse_template(r#"<svg xmlns:xlink="http://www.w3.org/1999/xlink" />"#).unwrap();
        assert_eq!(element(&template.body[0]).attributes[0].name, "xmlns:xlink");
    }

    #[test]
    fn test_parse_blocks_with_else_chain() {
        let template =
            parse_template("{{#if a}}<b></b>{{else if c}}<i></i>{{else}}<u></u>{{/if}}").unwrap();
        let Statement::Block(block) = &template.body[0] else {
            panic!("expected block")
        };
        assert_eq!(block.name(), "if");
        assert_eq!(block.program.body.len(), 1);
        let inverse = block.inverse.as_ref().unwrap();
        let Statement::Block(chained) = &inverse.body[0] else {
            panic!("expected chained block")
        };
        assert_eq!(chained.params[0].as_path().unwrap().parts, vec!["c"]);
        assert!(chained.inverse.is_some());
    }

    #[test]
    fn test_parse_keeps_table_rows_inside_blocks() {
        let template =
            parse_template("<table>{{#each rows}}<tr><td>{{name}}</td></tr>{{/each}}</table>").unwrap();
        let table = element(&template.body[0]);
        assert_eq!(table.children.len(), 1);
        let Statement::Block(block) = &table.children[0] else {
            panic!("expected block inside table")
        };
        let tr = element(&block.program.body[0]);
        assert_eq!(tr.tag, "tr");
        assert_eq!(element(&tr.children[0]).tag, "td");
    }

    #[test]
    fn test_parse_keeps_blocks_in_select_and_paragraphs() {
        let template =
            parse_template("<select>{{#each opts}}<option>{{label}}</option>{{/each}}</select>").unwrap();
        let select = element(&template.body[0]);
        assert!(matches!(&select.children[0], Statement::Block(b) if b.name() == "each"));

        let template = parse_template("<p>{{#if a}}<div></div>{{/if}}</p>").unwrap();
        assert_eq!(template.body.len(), 1);
        let p = element(&template.body[0]);
        let Statement::Block(block) = &p.children[0] else {
            panic!("expected block inside p")
        };
        assert_eq!(element(&block.program.body[0]).tag, "div");
    }

    #[test]
    fn test_parse_rejects_mismatched_nesting() {
        assert!(matches!(
            parse_template("<div><span></div></span>"),
            Err(CompileError::Parse { .. })
        ));
        assert!(parse_template("<div>{{#if a}}</div>{{/if}}").is_err());
        assert!(parse_template("{{#if a}}<div>{{/if}}</div>").is_err());
        assert!(parse_template("<div>").is_err());
        assert!(parse_template("<br></br>").is_err());
        assert!(parse_template("{{#if a}}<p>{{else}}</p>{{/if}}").is_err());
    }

    #[test]
    fn test_placeholder_lookalike_text_stays_text() {
        let template = parse_template("<div>__hbs_0__ {{a}}</div>").unwrap();
        let div = element(&template.body[0]);
        assert!(matches!(&div.children[0], Statement::Text(t) if t.chars == "__hbs_0__ "));
        assert!(matches!(&div.children[1], Statement::Mustache(_)));
    }

    #[test]
    fn test_mustache_inside_raw_text() {
        let template = parse_template("<style>.a { color: {{c}} }</style>").unwrap();
        let style = element(&template.body[0]);
        assert!(matches!(&style.children[1], Statement::Mustache(_)));
    }

    #[test]
    fn test_parse_comments() {
        let template = parse_template("<div>{{! hbs }}<!-- html --></div>").unwrap();
        let el = element(&template.body[0]);
        assert!(matches!(&el.children[0], Statement::MustacheComment(c) if c.value == " hbs "));
        assert!(matches!(&el.children[1], Statement::Comment(c) if c.value == " html "));
    }

    #[test]
    fn test_path_ids_are_distinct() {
        let template = parse_template("{{a}}{{b}}").unwrap();
        let ids: Vec<_> = template
            .body
            .iter()
            .filter_map(|s| match s {
                Statement::Mustache(m) => m.path.as_path().map(|p| p.id),
                _ => None,
            })
            .collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }
}
