//! Program assembly: imports, synthesized helpers and the root statement.

use oxc_ast::ast::{
    Expression as JsExpression, ImportOrExportKind, Program, Statement, VariableDeclarationKind,
};
use oxc_ast::NONE;
use oxc_span::SPAN;
use tracing::debug;

use crate::ast::Template;
use crate::codegen::build_program;
use crate::context::CompileContext;
use crate::error::Result;
use crate::options::{FRAMEWORK_NAME, FRAMEWORK_SOURCE, ROOT_PARAM};
use crate::preprocess::{ConditionalHelper, HelperPart};

impl<'a> CompileContext<'a> {
    /// `import local from "source";`
    fn default_import(&self, local: &str, source: &str) -> Statement<'a> {
        let specifier = self.ast.import_declaration_specifier_import_default_specifier(
            SPAN,
            self.ast.binding_identifier(SPAN, self.ast.atom(local)),
        );
        Statement::from(self.ast.module_declaration_import_declaration(
            SPAN,
            Some(self.ast.vec1(specifier)),
            self.ast.string_literal(SPAN, self.ast.atom(source), None),
            None,
            NONE,
            ImportOrExportKind::Value,
        ))
    }

    /// `const name = init;`
    fn const_declaration(&self, name: &str, init: JsExpression<'a>) -> Statement<'a> {
        let declarator = self.ast.variable_declarator(
            SPAN,
            VariableDeclarationKind::Const,
            self.ast
                .binding_pattern_binding_identifier(SPAN, self.ast.atom(name)),
            NONE,
            Some(init),
            false,
        );
        Statement::from(self.ast.declaration_variable(
            SPAN,
            VariableDeclarationKind::Const,
            self.ast.vec1(declarator),
            false,
        ))
    }

    /// `const name = (condition, value) => condition ? "a" + value : "b";`
    pub fn create_helper(&self, helper: &ConditionalHelper) -> Statement<'a> {
        let condition = helper.params.first().map_or("condition", String::as_str);
        let mut test = self.ident(condition);
        if helper.negate {
            test = self.not(test);
        }

        let consequent = helper
            .consequent
            .iter()
            .map(|part| match part {
                HelperPart::Text(text) => self.string(text),
                HelperPart::Param(name) => self.ident(name),
            })
            .reduce(|acc, part| self.add(acc, part))
            .unwrap_or_else(|| self.string(""));
        let alternate = match &helper.alternate {
            Some(text) => self.string(text),
            None => self.ident("undefined"),
        };

        let body = self.conditional(test, consequent, alternate);
        self.const_declaration(&helper.name, self.arrow(&helper.params, body))
    }

    /// Wraps the converted template in a component and/or default export.
    pub fn create_program(
        &self,
        template: &Template,
        helpers: &[ConditionalHelper],
    ) -> Result<Program<'a>> {
        let root = self.create_root_children(&template.body)?;
        let expression = if self.options.is_component {
            self.arrow(&[ROOT_PARAM], root)
        } else {
            root
        };
        let statement = if self.options.is_module {
            Statement::from(
                self.ast
                    .module_declaration_export_default_declaration(SPAN, expression.into()),
            )
        } else {
            self.ast.statement_expression(SPAN, expression)
        };

        let mut body = self.ast.vec();
        if self.options.emits_imports() {
            body.extend(self.create_imports(helpers));
        }
        body.extend(helpers.iter().map(|helper| self.create_helper(helper)));
        body.push(statement);

        debug!(statements = body.len(), "assembled program");
        Ok(build_program(self.ast, body))
    }

    /// Framework import, then partials, then helpers not defined inline.
    fn create_imports(&self, helpers: &[ConditionalHelper]) -> Vec<Statement<'a>> {
        let mut imports = vec![self.default_import(FRAMEWORK_NAME, FRAMEWORK_SOURCE)];
        imports.extend(
            self.scopes
                .partials
                .iter()
                .map(|partial| self.default_import(partial, &format!("./{}", partial))),
        );
        imports.extend(
            self.scopes
                .helpers
                .iter()
                .filter(|name| !helpers.iter().any(|helper| &helper.name == *name))
                .map(|name| self.default_import(name, &format!("./{}", name))),
        );
        imports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::print_program;
    use crate::finalize::finalize_output;
    use crate::options::CompileOptions;
    use crate::parse::parse_template;
    use crate::scope::resolve_namespaces;
    use oxc_allocator::Allocator;

    fn assemble(source: &str, options: CompileOptions, helpers: &[ConditionalHelper]) -> String {
        let allocator = Allocator::default();
        let template = parse_template(source).unwrap();
        let scopes = resolve_namespaces(&template, &options).unwrap();
        let ctx = CompileContext::new(&allocator, &options, &scopes);
        finalize_output(&print_program(&ctx.create_program(&template, helpers).unwrap()))
    }

    #[test]
    fn test_imports_partials_and_external_helpers() {
        let options = CompileOptions {
            is_module: true,
            include_import: true,
            ..Default::default()
        };
        let inline = vec![ConditionalHelper {
            name: "classIfHelper".into(),
            params: vec!["a".into()],
            negate: false,
            consequent: vec![HelperPart::Text("on".into())],
            alternate: Some(String::new()),
        }];
        let out = assemble(
            r#"<div class="{{classIfHelper a}}">{{> Card}}{{format b c}}</div>"#,
            options,
            &inline,
        );
        assert_eq!(
            out,
            "import React from \"react\";\n\
             import Card from \"./Card\";\n\
             import format from \"./format\";\n\
             const classIfHelper = (a) => a ? \"on\" : \"\"; \
             export default (props) => <div className={classIfHelper(props.a)}><Card />{format(props.b, props.c)}</div>;"
        );
    }

    #[test]
    fn test_negated_helper_with_value() {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let scopes = crate::scope::ScopeAnnotations::default();
        let ctx = CompileContext::new(&allocator, &options, &scopes);
        let helper = ConditionalHelper {
            name: "titleUnlessHelper".into(),
            params: vec!["hidden".into(), "name".into()],
            negate: true,
            consequent: vec![
                HelperPart::Text("Hi ".into()),
                HelperPart::Param("name".into()),
                HelperPart::Text("!".into()),
            ],
            alternate: None,
        };
        assert_eq!(
            crate::codegen::print_statement(ctx.ast, ctx.create_helper(&helper)),
            r#"const titleUnlessHelper = (hidden, name) => !hidden ? "Hi " + name + "!" : undefined;"#
        );
    }

    #[test]
    fn test_imports_require_module() {
        let options = CompileOptions {
            include_import: true,
            ..Default::default()
        };
        assert_eq!(assemble("<div></div>", options, &[]), "(props) => <div></div>;");
    }
}
