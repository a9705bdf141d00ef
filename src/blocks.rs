//! Block statement conversion: `if`, `unless`, `with`, `each`, `linkTo`.

use oxc_allocator::CloneIn;
use oxc_ast::ast::Expression as JsExpression;

use crate::ast::{BlockStatement, Expression, Literal};
use crate::context::CompileContext;
use crate::error::{CompileError, Result};
use crate::options::{EACH_INDEX, EACH_ITEM, LINK_COMPONENT};

impl<'a> CompileContext<'a> {
    pub fn resolve_block_statement(&self, block: &BlockStatement) -> Result<JsExpression<'a>> {
        match block.name() {
            "if" | "with" => self.create_condition_statement(block, false),
            "unless" => self.create_condition_statement(block, true),
            "each" => self.create_each_statement(block),
            "linkTo" => self.create_link(block),
            name => Err(CompileError::UnexpectedBlockStatement {
                name: name.to_string(),
            }),
        }
    }

    fn first_param<'b>(&self, block: &'b BlockStatement, expected: &str) -> Result<&'b Expression> {
        block.params.first().ok_or_else(|| CompileError::InvalidBlockParams {
            name: block.name().to_string(),
            expected: expected.to_string(),
        })
    }

    /// `Boolean(x) && body` or `Boolean(x) ? body : inverse`, negated for `unless`.
    pub fn create_condition_statement(
        &self,
        block: &BlockStatement,
        negate: bool,
    ) -> Result<JsExpression<'a>> {
        let subject = self.resolve_expression(self.first_param(block, "a condition argument")?)?;
        let mut test = self.boolean_of(subject);
        if negate {
            test = self.not(test);
        }

        let consequent = self.create_root_children(&block.program.body)?;
        match &block.inverse {
            None => Ok(self.and(test, consequent)),
            Some(inverse) => Ok(self.conditional(
                test,
                consequent,
                self.create_root_children(&inverse.body)?,
            )),
        }
    }

    /// `list.map((item, i) => <body key={i} />)`
    pub fn create_each_statement(&self, block: &BlockStatement) -> Result<JsExpression<'a>> {
        let collection = match self.first_param(block, "a collection argument")? {
            param @ (Expression::Path(_) | Expression::SubExpression(_)) => {
                self.resolve_expression(param)?
            }
            Expression::Literal(_) => {
                return Err(CompileError::InvalidBlockParams {
                    name: "each".into(),
                    expected: "a path or helper call as collection".into(),
                })
            }
        };

        let mut body = match self.create_root_children(&block.program.body)? {
            JsExpression::JSXElement(element) => element,
            other => self.create_fragment(self.ast.vec1(self.expression_child(other))),
        };
        body.opening_element
            .attributes
            .push(self.attribute_expression("key", self.ident(EACH_INDEX)));

        let callback = self.arrow(&[EACH_ITEM, EACH_INDEX], JsExpression::JSXElement(body));
        let inverse_test = block
            .inverse
            .as_ref()
            .map(|_| self.boolean_of(self.member(collection.clone_in(self.ast.allocator), "length")));
        let mapped = self.call(self.member(collection, "map"), vec![callback]);

        match (&block.inverse, inverse_test) {
            (Some(inverse), Some(test)) => Ok(self.conditional(
                test,
                mapped,
                self.create_root_children(&inverse.body)?,
            )),
            _ => Ok(mapped),
        }
    }

    /// `{{#linkTo href text className}}body{{/linkTo}}` renders a `Link` element.
    fn create_link(&self, block: &BlockStatement) -> Result<JsExpression<'a>> {
        let href = self.first_param(block, "an href argument")?;
        let mut attributes = self
            .ast
            .vec1(self.attribute_expression("href", self.resolve_expression(href)?));
        if let Some(class_name) = block.params.get(2) {
            attributes.push(self.attribute_expression("className", self.resolve_expression(class_name)?));
        }

        let children = if block.program.body.is_empty() {
            match block.params.get(1) {
                Some(Expression::Literal(Literal::String(text))) => {
                    self.ast.vec_from_iter(self.create_text_children(text))
                }
                Some(text) => self
                    .ast
                    .vec1(self.expression_child(self.resolve_expression(text)?)),
                None => self.ast.vec(),
            }
        } else {
            self.create_children(&block.program.body)?
        };

        Ok(self.jsx_element(LINK_COMPONENT, attributes, children, false))
    }
}
