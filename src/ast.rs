//! Template AST produced by [`crate::parse`].
//!
//! Nodes are plain owned data. Path expressions and block bodies carry a
//! parse-local [`NodeId`] so later passes can attach information to them
//! without mutating the tree.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Hands out node ids for one parse.
#[derive(Debug, Default)]
pub struct NodeIds {
    next: u32,
}

impl NodeIds {
    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct PathExpression {
    pub id: NodeId,
    /// Source spelling, e.g. `../title` or `this.id`.
    pub original: String,
    /// Segments after `this`, `../` and `@` have been stripped.
    pub parts: Vec<String>,
    /// `@index`, `@key` and friends.
    pub data: bool,
    /// Number of leading `../` segments.
    pub depth: usize,
}

impl PathExpression {
    pub fn head(&self) -> Option<&str> {
        self.parts.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Boolean(bool),
    Number(f64),
    String(String),
    Null,
    Undefined,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Path(PathExpression),
    Literal(Literal),
    SubExpression(Box<SubExpression>),
}

impl Expression {
    pub fn kind(&self) -> &'static str {
        match self {
            Expression::Path(_) => "PathExpression",
            Expression::Literal(Literal::Boolean(_)) => "BooleanLiteral",
            Expression::Literal(Literal::Number(_)) => "NumberLiteral",
            Expression::Literal(Literal::String(_)) => "StringLiteral",
            Expression::Literal(Literal::Null) => "NullLiteral",
            Expression::Literal(Literal::Undefined) => "UndefinedLiteral",
            Expression::SubExpression(_) => "SubExpression",
        }
    }

    pub fn as_path(&self) -> Option<&PathExpression> {
        match self {
            Expression::Path(p) => Some(p),
            _ => None,
        }
    }
}

/// `(helper arg key=value)`
#[derive(Debug, Clone, PartialEq)]
pub struct SubExpression {
    pub path: Expression,
    pub params: Vec<Expression>,
    pub hash: Hash,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hash {
    pub pairs: Vec<HashPair>,
}

impl Hash {
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: String,
    pub value: Expression,
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct MustacheStatement {
    pub path: Expression,
    pub params: Vec<Expression>,
    pub hash: Hash,
    /// `{{{raw}}}`
    pub trusting: bool,
}

impl MustacheStatement {
    /// A mustache with arguments calls a helper; without, it reads a value.
    pub fn is_helper_call(&self) -> bool {
        !self.params.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: NodeId,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    pub path: PathExpression,
    pub params: Vec<Expression>,
    pub hash: Hash,
    pub program: Block,
    pub inverse: Option<Block>,
}

impl BlockStatement {
    pub fn name(&self) -> &str {
        &self.path.original
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartialStatement {
    pub name: String,
    pub params: Vec<Expression>,
    pub hash: Hash,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentStatement {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub chars: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(TextNode),
    Mustache(MustacheStatement),
    Concat(Vec<Statement>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrNode {
    pub name: String,
    pub value: AttrValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub tag: String,
    pub attributes: Vec<AttrNode>,
    pub children: Vec<Statement>,
    pub self_closing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Element(ElementNode),
    Text(TextNode),
    Mustache(MustacheStatement),
    Block(BlockStatement),
    Partial(PartialStatement),
    /// `{{! ... }}`
    MustacheComment(CommentStatement),
    /// `<!-- ... -->`
    Comment(CommentStatement),
}

impl Statement {
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Element(_) => "ElementNode",
            Statement::Text(_) => "TextNode",
            Statement::Mustache(_) => "MustacheStatement",
            Statement::Block(_) => "BlockStatement",
            Statement::Partial(_) => "PartialStatement",
            Statement::MustacheComment(_) => "MustacheCommentStatement",
            Statement::Comment(_) => "CommentStatement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub body: Vec<Statement>,
}
