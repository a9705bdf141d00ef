//! Expression and statement resolution.
//!
//! `resolve_statement` produces a stand-alone expression (template root,
//! block bodies); `resolve_element_child` produces JSX children.

use lazy_static::lazy_static;
use oxc_allocator::Vec as ArenaVec;
use oxc_ast::ast::{
    Argument, BinaryOperator, Expression as JsExpression, FormalParameterKind, JSXChild,
    LogicalOperator, PropertyKind, UnaryOperator,
};
use oxc_ast::NONE;
use oxc_span::SPAN;
use regex::Regex;

use crate::ast::{Expression, Hash, Literal, MustacheStatement, PathExpression, Statement};
use crate::context::CompileContext;
use crate::error::{CompileError, Result};
use crate::scope::helper_name;

lazy_static! {
    static ref IDENTIFIER_RE: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
}

pub(crate) fn is_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Characters that cannot appear bare in JSX text. `<` and `>` are included
/// because the JSX parser rejects both inside children.
fn is_jsx_text_syntax(c: char) -> bool {
    matches!(c, '{' | '}' | '<' | '>')
}

impl<'a> CompileContext<'a> {
    pub fn ident(&self, name: &str) -> JsExpression<'a> {
        self.ast.expression_identifier(SPAN, self.ast.atom(name))
    }

    pub fn string(&self, value: &str) -> JsExpression<'a> {
        self.ast.expression_string_literal(SPAN, self.ast.atom(value), None)
    }

    /// `object.property`, or `object["property"]` when not an identifier.
    pub fn member(&self, object: JsExpression<'a>, property: &str) -> JsExpression<'a> {
        let member = if is_identifier(property) {
            self.ast.member_expression_static(
                SPAN,
                object,
                self.ast.identifier_name(SPAN, self.ast.atom(property)),
                false,
            )
        } else {
            self.ast
                .member_expression_computed(SPAN, object, self.string(property), false)
        };
        JsExpression::from(member)
    }

    pub fn call(&self, callee: JsExpression<'a>, arguments: Vec<JsExpression<'a>>) -> JsExpression<'a> {
        let arguments = self.ast.vec_from_iter(arguments.into_iter().map(Argument::from));
        self.ast.expression_call(SPAN, callee, NONE, arguments, false)
    }

    pub fn add(&self, left: JsExpression<'a>, right: JsExpression<'a>) -> JsExpression<'a> {
        self.ast
            .expression_binary(SPAN, left, BinaryOperator::Addition, right)
    }

    pub fn not(&self, argument: JsExpression<'a>) -> JsExpression<'a> {
        self.ast
            .expression_unary(SPAN, UnaryOperator::LogicalNot, argument)
    }

    pub fn and(&self, left: JsExpression<'a>, right: JsExpression<'a>) -> JsExpression<'a> {
        self.ast
            .expression_logical(SPAN, left, LogicalOperator::And, right)
    }

    pub fn conditional(
        &self,
        test: JsExpression<'a>,
        consequent: JsExpression<'a>,
        alternate: JsExpression<'a>,
    ) -> JsExpression<'a> {
        self.ast
            .expression_conditional(SPAN, test, consequent, alternate)
    }

    /// `(a, b) => body`
    pub fn arrow<S: AsRef<str>>(&self, params: &[S], body: JsExpression<'a>) -> JsExpression<'a> {
        let items = self.ast.vec_from_iter(params.iter().map(|param| {
            let pattern = self
                .ast
                .binding_pattern_binding_identifier(SPAN, self.ast.atom(param.as_ref()));
            self.ast.plain_formal_parameter(SPAN, pattern)
        }));
        let params = self.ast.formal_parameters(
            SPAN,
            FormalParameterKind::ArrowFormalParameters,
            items,
            NONE,
        );
        let statements = self.ast.vec1(self.ast.statement_expression(SPAN, body));
        let body = self.ast.function_body(SPAN, self.ast.vec(), statements);
        self.ast
            .expression_arrow_function(SPAN, true, false, NONE, params, NONE, body)
    }

    /// `Boolean(value)`
    pub fn boolean_of(&self, value: JsExpression<'a>) -> JsExpression<'a> {
        self.call(self.ident("Boolean"), vec![value])
    }

    /// Builds `a.b.c` from resolved path segments.
    pub fn create_member_expression(&self, segments: &[String]) -> Result<JsExpression<'a>> {
        let (first, rest) = segments.split_first().ok_or(CompileError::EmptyPath)?;
        Ok(rest
            .iter()
            .fold(self.ident(first), |object, part| self.member(object, part)))
    }

    /// Splits JSX text so characters that are syntax in JSX children end up
    /// in their own `{"{"}` container.
    pub fn create_text_children(&self, text: &str) -> Vec<JSXChild<'a>> {
        let mut children = Vec::new();
        let mut current = String::new();
        for c in text.chars() {
            if is_jsx_text_syntax(c) {
                if !current.is_empty() {
                    children.push(self.text_child(&std::mem::take(&mut current)));
                }
                let escaped = self.string(c.encode_utf8(&mut [0; 4]));
                children.push(self.expression_child(escaped));
            } else {
                current.push(c);
            }
        }
        if !current.is_empty() {
            children.push(self.text_child(&current));
        }
        children
    }

    fn text_child(&self, text: &str) -> JSXChild<'a> {
        let value = self.ast.atom(text);
        self.ast.jsx_child_text(SPAN, value, Some(value))
    }

    pub fn expression_child(&self, expression: JsExpression<'a>) -> JSXChild<'a> {
        self.ast
            .jsx_child_expression_container(SPAN, expression.into())
    }

    pub fn resolve_expression(&self, expression: &Expression) -> Result<JsExpression<'a>> {
        match expression {
            Expression::Path(path) => self.create_path(path),
            Expression::Literal(Literal::Boolean(value)) => {
                Ok(self.ast.expression_boolean_literal(SPAN, *value))
            }
            Expression::Literal(Literal::Number(value)) => Ok(self.ast.expression_numeric_literal(
                SPAN,
                *value,
                None,
                oxc_ast::ast::NumberBase::Decimal,
            )),
            Expression::Literal(Literal::String(value)) => Ok(self.string(value)),
            Expression::Literal(Literal::Null) => Ok(self.ast.expression_null_literal(SPAN)),
            Expression::Literal(Literal::Undefined) => Ok(self.ident("undefined")),
            Expression::SubExpression(sub) => {
                self.create_helper_call(&sub.path, &sub.params, &sub.hash)
            }
        }
    }

    pub fn create_path(&self, path: &PathExpression) -> Result<JsExpression<'a>> {
        self.create_member_expression(self.scopes.segments(path))
    }

    /// `helper(arg, ..., { key: value })`
    pub fn create_helper_call(
        &self,
        callee: &Expression,
        params: &[Expression],
        hash: &Hash,
    ) -> Result<JsExpression<'a>> {
        let name = callee
            .as_path()
            .and_then(helper_name)
            .ok_or_else(|| CompileError::UnsupportedExpression {
                kind: format!("{} as helper name", callee.kind()),
            })?;

        let mut arguments = params
            .iter()
            .map(|param| self.resolve_expression(param))
            .collect::<Result<Vec<_>>>()?;
        if !hash.is_empty() {
            arguments.push(self.create_hash_object(hash)?);
        }
        Ok(self.call(self.ident(name), arguments))
    }

    fn create_hash_object(&self, hash: &Hash) -> Result<JsExpression<'a>> {
        let mut properties = self.ast.vec_with_capacity(hash.pairs.len());
        for pair in &hash.pairs {
            let key = if is_identifier(&pair.key) {
                self.ast
                    .property_key_static_identifier(SPAN, self.ast.atom(&pair.key))
            } else {
                self.string(&pair.key).into()
            };
            properties.push(self.ast.object_property_kind_object_property(
                SPAN,
                PropertyKind::Init,
                key,
                self.resolve_expression(&pair.value)?,
                false,
                false,
                false,
            ));
        }
        Ok(self.ast.expression_object(SPAN, properties))
    }

    pub fn resolve_mustache(&self, mustache: &MustacheStatement) -> Result<JsExpression<'a>> {
        if mustache.is_helper_call() {
            self.create_helper_call(&mustache.path, &mustache.params, &mustache.hash)
        } else {
            self.resolve_expression(&mustache.path)
        }
    }

    /// Converts a statement to a stand-alone expression.
    pub fn resolve_statement(&self, statement: &Statement) -> Result<JsExpression<'a>> {
        match statement {
            Statement::Element(element) => self.convert_element(element),
            Statement::Text(text) => Ok(self.string(&text.chars)),
            Statement::Mustache(mustache) => self.resolve_mustache(mustache),
            Statement::Block(block) => self.resolve_block_statement(block),
            Statement::Partial(partial) => self.create_partial(partial),
            Statement::MustacheComment(_) | Statement::Comment(_) => {
                Err(CompileError::TopLevelCommentUnsupported)
            }
        }
    }

    /// Converts a statement to JSX children. Text may split into several.
    pub fn resolve_element_child(&self, statement: &Statement) -> Result<Vec<JSXChild<'a>>> {
        match statement {
            Statement::Text(text) => Ok(self.create_text_children(&text.chars)),
            Statement::MustacheComment(comment) | Statement::Comment(comment) => {
                Ok(vec![self.create_comment(&comment.value)])
            }
            Statement::Element(_) | Statement::Partial(_) => {
                match self.resolve_statement(statement)? {
                    JsExpression::JSXElement(element) => Ok(vec![JSXChild::Element(element)]),
                    other => Ok(vec![self.expression_child(other)]),
                }
            }
            Statement::Mustache(_) | Statement::Block(_) => {
                Ok(vec![self.expression_child(self.resolve_statement(statement)?)])
            }
        }
    }

    /// `{/* value */}`. The printer never sees comment trivia, so the
    /// container is emitted as raw JSX text.
    pub fn create_comment(&self, value: &str) -> JSXChild<'a> {
        self.text_child(&format!("{{/*{}*/}}", value.replace("*/", "* /")))
    }

    pub fn create_children(&self, body: &[Statement]) -> Result<ArenaVec<'a, JSXChild<'a>>> {
        let mut children = self.ast.vec_with_capacity(body.len());
        for statement in body {
            children.extend(self.resolve_element_child(statement)?);
        }
        Ok(children)
    }

    /// A single statement converts directly; anything else is wrapped in a fragment.
    pub fn create_root_children(&self, body: &[Statement]) -> Result<JsExpression<'a>> {
        match body {
            [single] => self.resolve_statement(single),
            _ => Ok(JsExpression::JSXElement(self.create_fragment(self.create_children(body)?))),
        }
    }

    /// Left fold of the parts with `+`.
    pub fn create_concat(&self, parts: &[Statement]) -> Result<JsExpression<'a>> {
        let mut result: Option<JsExpression<'a>> = None;
        for part in parts {
            let converted = match part {
                Statement::Text(_) | Statement::Mustache(_) => self.resolve_statement(part)?,
                other => {
                    return Err(CompileError::UnexpectedStatement {
                        kind: other.kind().to_string(),
                    })
                }
            };
            result = Some(match result {
                None => converted,
                Some(acc) => self.add(acc, converted),
            });
        }
        Ok(result.unwrap_or_else(|| self.string("")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::print_expression;
    use crate::options::CompileOptions;
    use crate::scope::ScopeAnnotations;
    use oxc_allocator::Allocator;

    #[test]
    fn test_member_expression_chain() {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let scopes = ScopeAnnotations::default();
        let ctx = CompileContext::new(&allocator, &options, &scopes);
        let segments = vec!["props".to_string(), "in".to_string(), "foo-bar".to_string()];
        let member = ctx.create_member_expression(&segments).unwrap();
        assert_eq!(print_expression(ctx.ast, member), r#"props.in["foo-bar"]"#);
        assert!(matches!(
            ctx.create_member_expression(&[]),
            Err(CompileError::EmptyPath)
        ));
    }

    #[test]
    fn test_text_children_escape_jsx_syntax() {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let scopes = ScopeAnnotations::default();
        let ctx = CompileContext::new(&allocator, &options, &scopes);
        assert_eq!(ctx.create_text_children("plain").len(), 1);
        let children = ctx.create_text_children("a {b} < c");
        assert_eq!(children.len(), 7);
        assert!(matches!(&children[0], JSXChild::Text(t) if t.value.as_str() == "a "));
        assert!(matches!(&children[1], JSXChild::ExpressionContainer(_)));
        assert!(matches!(&children[5], JSXChild::ExpressionContainer(_)));
    }

    #[test]
    fn test_literals_resolve_directly() {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let scopes = ScopeAnnotations::default();
        let ctx = CompileContext::new(&allocator, &options, &scopes);
        let undefined = ctx
            .resolve_expression(&Expression::Literal(Literal::Undefined))
            .unwrap();
        assert_eq!(print_expression(ctx.ast, undefined), "undefined");
        let number = ctx
            .resolve_expression(&Expression::Literal(Literal::Number(4.0)))
            .unwrap();
        assert_eq!(print_expression(ctx.ast, number), "4");
    }

    #[test]
    fn test_concat_short_circuits_single_part() {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let scopes = ScopeAnnotations::default();
        let ctx = CompileContext::new(&allocator, &options, &scopes);
        let single = vec![Statement::Text(crate::ast::TextNode { chars: "x".into() })];
        let concat = ctx.create_concat(&single).unwrap();
        assert_eq!(print_expression(ctx.ast, concat), r#""x""#);
    }
}
