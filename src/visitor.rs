use crate::ast::{
    AttrNode, AttrValue, Block, BlockStatement, ElementNode, Expression, Hash, MustacheStatement,
    PartialStatement, PathExpression, Statement, SubExpression, Template,
};

/// The TemplateVisitor trait defines the single traversal mechanism for template ASTs.
///
/// Rules:
/// 1. Traversal order is depth-first and follows source order.
/// 2. Implementers override `visit_*` methods to add behavior.
/// 3. Implementers MUST call the matching `walk_*` function to continue traversal unless pruning is intended.
pub trait TemplateVisitor {
    fn visit_template(&mut self, template: &Template) {
        walk_template(self, template);
    }

    fn visit_statements(&mut self, statements: &[Statement]) {
        walk_statements(self, statements);
    }

    fn visit_statement(&mut self, statement: &Statement) {
        walk_statement(self, statement);
    }

    fn visit_element(&mut self, element: &ElementNode) {
        walk_element(self, element);
    }

    fn visit_attribute(&mut self, attribute: &AttrNode) {
        walk_attribute(self, attribute);
    }

    fn visit_mustache(&mut self, mustache: &MustacheStatement) {
        walk_mustache(self, mustache);
    }

    fn visit_block_statement(&mut self, block: &BlockStatement) {
        walk_block_statement(self, block);
    }

    /// Program or inverse body of a block statement.
    fn visit_block(&mut self, block: &Block) {
        walk_block(self, block);
    }

    fn visit_partial(&mut self, partial: &PartialStatement) {
        walk_partial(self, partial);
    }

    fn visit_expression(&mut self, expression: &Expression) {
        walk_expression(self, expression);
    }

    fn visit_sub_expression(&mut self, sub: &SubExpression) {
        walk_sub_expression(self, sub);
    }

    fn visit_hash(&mut self, hash: &Hash) {
        walk_hash(self, hash);
    }

    fn visit_path(&mut self, _path: &PathExpression) {
        // Leaf node
    }
}

pub fn walk_template<V: TemplateVisitor + ?Sized>(visitor: &mut V, template: &Template) {
    visitor.visit_statements(&template.body);
}

pub fn walk_statements<V: TemplateVisitor + ?Sized>(visitor: &mut V, statements: &[Statement]) {
    for statement in statements {
        visitor.visit_statement(statement);
    }
}

pub fn walk_statement<V: TemplateVisitor + ?Sized>(visitor: &mut V, statement: &Statement) {
    match statement {
        Statement::Element(el) => visitor.visit_element(el),
        Statement::Mustache(m) => visitor.visit_mustache(m),
        Statement::Block(b) => visitor.visit_block_statement(b),
        Statement::Partial(p) => visitor.visit_partial(p),
        Statement::Text(_) | Statement::MustacheComment(_) | Statement::Comment(_) => {}
    }
}

pub fn walk_element<V: TemplateVisitor + ?Sized>(visitor: &mut V, element: &ElementNode) {
    for attribute in &element.attributes {
        visitor.visit_attribute(attribute);
    }
    visitor.visit_statements(&element.children);
}

pub fn walk_attribute<V: TemplateVisitor + ?Sized>(visitor: &mut V, attribute: &AttrNode) {
    match &attribute.value {
        AttrValue::Text(_) => {}
        AttrValue::Mustache(m) => visitor.visit_mustache(m),
        AttrValue::Concat(parts) => visitor.visit_statements(parts),
    }
}

pub fn walk_mustache<V: TemplateVisitor + ?Sized>(visitor: &mut V, mustache: &MustacheStatement) {
    visitor.visit_expression(&mustache.path);
    for param in &mustache.params {
        visitor.visit_expression(param);
    }
    visitor.visit_hash(&mustache.hash);
}

pub fn walk_block_statement<V: TemplateVisitor + ?Sized>(visitor: &mut V, block: &BlockStatement) {
    for param in &block.params {
        visitor.visit_expression(param);
    }
    visitor.visit_hash(&block.hash);
    visitor.visit_block(&block.program);
    if let Some(inverse) = &block.inverse {
        visitor.visit_block(inverse);
    }
}

pub fn walk_block<V: TemplateVisitor + ?Sized>(visitor: &mut V, block: &Block) {
    visitor.visit_statements(&block.body);
}

pub fn walk_partial<V: TemplateVisitor + ?Sized>(visitor: &mut V, partial: &PartialStatement) {
    for param in &partial.params {
        visitor.visit_expression(param);
    }
    visitor.visit_hash(&partial.hash);
}

pub fn walk_expression<V: TemplateVisitor + ?Sized>(visitor: &mut V, expression: &Expression) {
    match expression {
        Expression::Path(p) => visitor.visit_path(p),
        Expression::Literal(_) => {}
        Expression::SubExpression(sub) => visitor.visit_sub_expression(sub),
    }
}

pub fn walk_sub_expression<V: TemplateVisitor + ?Sized>(visitor: &mut V, sub: &SubExpression) {
    visitor.visit_expression(&sub.path);
    for param in &sub.params {
        visitor.visit_expression(param);
    }
    visitor.visit_hash(&sub.hash);
}

pub fn walk_hash<V: TemplateVisitor + ?Sized>(visitor: &mut V, hash: &Hash) {
    for pair in &hash.pairs {
        visitor.visit_expression(&pair.value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_template;

    struct PathCounter {
        paths: Vec<String>,
    }

    impl TemplateVisitor for PathCounter {
        fn visit_path(&mut self, path: &PathExpression) {
            self.paths.push(path.original.clone());
        }
    }

    #[test]
    fn test_walks_every_path_in_source_order() {
        let template = parse_template(
            r#"<a href="{{url}}">{{#if (eq a b)}}{{> Card c x=d}}{{else}}{{e}}{{/if}}</a>"#,
        )
        .unwrap();
        let mut counter = PathCounter { paths: vec![] };
        counter.visit_template(&template);
        assert_eq!(counter.paths, vec!["url", "eq", "a", "b", "c", "d", "e"]);
    }
}
